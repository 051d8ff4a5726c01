use crate::config::{CompressionType, ExportConfig, ExportFormat};
use crate::db::Database;
use crate::query::QueryTemplate;
use crate::session::Session;
use anyhow::{Context, Result};
use csv::{Terminator, WriterBuilder};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Collects `retriever(i)` for every `i` in `0..num_fields`.
pub fn retrieve_fields<F, S>(num_fields: usize, mut retriever: F) -> Result<Vec<String>>
where
    F: FnMut(usize) -> Result<S>,
    S: Into<String>,
{
    (0..num_fields).map(|i| retriever(i).map(Into::into)).collect()
}

/// Joins the values produced by `retriever` for `0..num_fields` with `separator`.
/// There is no trailing separator and zero fields give an empty string.
pub fn join_fields<F, S>(num_fields: usize, separator: &str, retriever: F) -> Result<String>
where
    F: FnMut(usize) -> Result<S>,
    S: Into<String>,
{
    Ok(retrieve_fields(num_fields, retriever)?.join(separator))
}

/// Reads the record count out of the count query's first field.
pub fn parse_record_count(text: &str) -> Result<usize> {
    text.trim()
        .parse::<usize>()
        .with_context(|| format!("Record count is not a number: {:?}", text))
}

pub struct Exporter {
    config: ExportConfig,
    template: QueryTemplate,
}

impl Exporter {
    pub fn new(config: ExportConfig, template: QueryTemplate) -> Self {
        Self { config, template }
    }

    /// Runs both queries, then writes the lines to the configured output.
    /// The output is only created once every line has been fetched.
    pub fn export<D: Database>(&mut self, session: &mut Session<D>) -> Result<ExportStats> {
        let start_time = Instant::now();
        let batch = self.collect_lines(session)?;

        let mut sink = self.open_sink()?;
        write_lines(&mut sink, &batch.lines)?;
        sink.finish()?;

        let output = self
            .config
            .output_file
            .clone()
            .unwrap_or_else(|| "stdout".to_string());
        Ok(batch.into_stats(start_time, output))
    }

    pub fn export_to<D: Database, W: Write>(
        &self,
        session: &mut Session<D>,
        writer: &mut W,
    ) -> Result<ExportStats> {
        let start_time = Instant::now();
        let batch = self.collect_lines(session)?;
        write_lines(writer, &batch.lines)?;
        Ok(batch.into_stats(start_time, "stdout".to_string()))
    }

    /// Header first, then at most as many records as the count query reported.
    fn collect_lines<D: Database>(&self, session: &mut Session<D>) -> Result<Batch> {
        let start_time = Instant::now();

        let expected_rows = self.record_count(session)?;
        debug!("Count query reported {} records", expected_rows);

        let data_sql = self.template.data_sql();
        if !session.open(&data_sql)? {
            debug!("Data query returned no records");
        }

        let mut lines = Vec::with_capacity(expected_rows.min(1 << 16) + 1);
        lines.push(self.header_line(session)?);

        for fetched in 0..expected_rows {
            if session.is_eof() {
                warn!(
                    "Data query ended after {} of {} counted records",
                    fetched, expected_rows
                );
                break;
            }
            lines.push(self.record_line_and_advance(session)?);
        }

        Ok(Batch {
            expected_rows,
            lines,
            db_read_time_secs: start_time.elapsed().as_secs_f64(),
        })
    }

    fn record_count<D: Database>(&self, session: &mut Session<D>) -> Result<usize> {
        let count_sql = self.template.count_sql();
        if !session.open(&count_sql)? {
            warn!("Count query returned no records, treating the count as 0");
            return Ok(0);
        }
        parse_record_count(session.field_value(0)?)
    }

    pub fn header_line<D: Database>(&self, session: &Session<D>) -> Result<String> {
        self.build_line(session.field_count(), |i| session.field_name(i))
    }

    /// Renders the current record, then moves the cursor forward.
    pub fn record_line_and_advance<D: Database>(&self, session: &mut Session<D>) -> Result<String> {
        let line = self.build_line(session.field_count(), |i| {
            session.field_value(i).map(String::from)
        })?;
        session.move_next();
        Ok(line)
    }

    fn build_line<F, S>(&self, num_fields: usize, retriever: F) -> Result<String>
    where
        F: FnMut(usize) -> Result<S>,
        S: Into<String>,
    {
        match self.config.format {
            ExportFormat::Joined => join_fields(num_fields, &self.config.separator, retriever),
            ExportFormat::Csv => quoted_line(&retrieve_fields(num_fields, retriever)?, b','),
            ExportFormat::Tsv => quoted_line(&retrieve_fields(num_fields, retriever)?, b'\t'),
        }
    }

    fn open_sink(&self) -> Result<Sink> {
        let base: Box<dyn Write> = match &self.config.output_file {
            Some(path) => Box::new(
                File::create(path)
                    .with_context(|| format!("Failed to create output file {}", path))?,
            ),
            None => Box::new(io::stdout()),
        };

        let capacity = self.config.buffer_size.max(1);
        Ok(match self.config.compression {
            CompressionType::Gzip => Sink::Gzip(BufWriter::with_capacity(
                capacity,
                GzEncoder::new(base, Compression::default()),
            )),
            CompressionType::None => Sink::Plain(BufWriter::with_capacity(capacity, base)),
        })
    }
}

struct Batch {
    expected_rows: usize,
    lines: Vec<String>,
    db_read_time_secs: f64,
}

impl Batch {
    fn into_stats(self, start_time: Instant, output: String) -> ExportStats {
        ExportStats {
            expected_rows: self.expected_rows,
            rows_exported: (self.lines.len() - 1) as u64,
            duration_secs: start_time.elapsed().as_secs_f64(),
            db_read_time_secs: self.db_read_time_secs,
            output,
        }
    }
}

fn write_lines<W: Write>(writer: &mut W, lines: &[String]) -> Result<()> {
    for line in lines {
        writeln!(writer, "{}", line)?;
    }
    writer.flush()?;
    Ok(())
}

fn quoted_line(values: &[String], delimiter: u8) -> Result<String> {
    let buffer = Vec::with_capacity(1024);
    let mut csv_writer = WriterBuilder::new()
        .delimiter(delimiter)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(buffer);

    csv_writer.write_record(values)?;
    let data = csv_writer.into_inner()?;
    let mut line = String::from_utf8(data)?;
    if line.ends_with('\n') {
        line.pop();
    }
    Ok(line)
}

enum Sink {
    Plain(BufWriter<Box<dyn Write>>),
    Gzip(BufWriter<GzEncoder<Box<dyn Write>>>),
}

impl Sink {
    fn finish(self) -> Result<()> {
        match self {
            Sink::Plain(mut writer) => writer.flush()?,
            Sink::Gzip(writer) => {
                let encoder = writer.into_inner().map_err(|e| e.into_error())?;
                encoder.finish()?.flush()?;
            }
        }
        Ok(())
    }
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Sink::Plain(writer) => writer.write(buf),
            Sink::Gzip(writer) => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Sink::Plain(writer) => writer.flush(),
            Sink::Gzip(writer) => writer.flush(),
        }
    }
}

#[derive(Debug)]
pub struct ExportStats {
    pub expected_rows: usize,
    pub rows_exported: u64,
    pub duration_secs: f64,
    pub db_read_time_secs: f64,
    pub output: String,
}

impl ExportStats {
    pub fn print_summary(&self) {
        info!("Run Summary:");
        info!("  Output: {}", self.output);
        info!("  Records counted: {}", self.expected_rows);
        info!("  Records printed: {}", self.rows_exported);
        info!("  Duration: {:.2} seconds", self.duration_secs);

        if self.duration_secs > 0.0 {
            info!(
                "  DB read time: {:.2} seconds ({:.1}%)",
                self.db_read_time_secs,
                (self.db_read_time_secs / self.duration_secs) * 100.0
            );
        }
    }
}
