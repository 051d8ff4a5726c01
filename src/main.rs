mod config;
mod db;
mod export;
mod query;
mod session;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use config::{CompressionType, Config, DatabaseConfig, ExportFormat, LoggingConfig};
use db::oracle::OracleDatabase;
use export::Exporter;
use query::{read_fragment_or_file, QueryTemplate};
use session::Session;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ictest")]
#[command(about = "Counts and prints the matching rows of an Oracle table", long_about = None)]
struct Cli {
    /// Config file path (TOML)
    #[arg(short, long)]
    config: Option<String>,

    /// Database connection string: host:port/service_name
    #[arg(long)]
    conn: Option<String>,

    /// Username
    #[arg(long)]
    username: Option<String>,

    /// Password
    #[arg(long, env = "ICTEST_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Table to query
    #[arg(long)]
    table: Option<String>,

    /// Column list of the data query, or a file holding it
    #[arg(long)]
    columns: Option<String>,

    /// WHERE condition shared by both queries, or a file holding it
    #[arg(long)]
    filter: Option<String>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<String>,

    /// Output format: joined/csv/tsv
    #[arg(long)]
    format: Option<String>,

    /// Separator for the joined format
    #[arg(long)]
    separator: Option<String>,

    /// Compression type: none/gzip
    #[arg(long)]
    compression: Option<String>,

    /// Fetch array size
    #[arg(long)]
    fetch: Option<usize>,

    /// Output buffer size in bytes
    #[arg(long)]
    buffer_size: Option<usize>,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<String>,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, default_value = "false")]
    verbose: bool,
}

fn build_config(cli: Cli) -> Result<Config> {
    let mut config = if let Some(config_path) = &cli.config {
        Config::from_file(config_path)?
    } else {
        Config {
            database: DatabaseConfig {
                connection_string: cli
                    .conn
                    .clone()
                    .ok_or_else(|| anyhow!("Connection string is required"))?,
                username: cli
                    .username
                    .clone()
                    .ok_or_else(|| anyhow!("Username is required"))?,
                password: cli
                    .password
                    .clone()
                    .ok_or_else(|| anyhow!("Password is required"))?,
                ..DatabaseConfig::default()
            },
            query: Default::default(),
            export: Default::default(),
            logging: LoggingConfig::default(),
        }
    };

    // flags win over the file
    if let Some(conn) = cli.conn {
        config.database.connection_string = conn;
    }
    if let Some(username) = cli.username {
        config.database.username = username;
    }
    if let Some(password) = cli.password {
        config.database.password = password;
    }
    if let Some(fetch) = cli.fetch {
        config.database.fetch_size = fetch;
    }
    if let Some(table) = cli.table {
        config.query.table = table;
    }
    if let Some(columns) = cli.columns {
        config.query.columns = columns;
    }
    if let Some(filter) = cli.filter {
        config.query.filter = filter;
    }
    config.query.columns = read_fragment_or_file(&config.query.columns)?;
    config.query.filter = read_fragment_or_file(&config.query.filter)?;

    if let Some(output) = cli.output {
        config.export.output_file = Some(output);
    }
    if let Some(format) = cli.format {
        config.export.format = ExportFormat::parse(&format)?;
    }
    if let Some(separator) = cli.separator {
        config.export.separator = separator;
    }
    if let Some(compression) = cli.compression {
        config.export.compression = CompressionType::parse(&compression)?;
    }
    if let Some(buffer_size) = cli.buffer_size {
        config.export.buffer_size = buffer_size;
    }
    if let Some(log_file) = cli.log_file {
        config.logging.log_file = Some(log_file);
    }
    config.logging.verbose |= cli.verbose;

    Ok(config)
}

fn init_logging(config: &LoggingConfig) -> Result<()> {
    let default_level = if config.verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path))?;
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|e| anyhow!("Failed to initialise logging: {}", e))?;
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| anyhow!("Failed to initialise logging: {}", e))?;
        }
    }
    Ok(())
}

/// Reports a failed connection and ends the process.
fn connection_failed(message: &str) {
    eprintln!("Failed to connect to the Oracle database. Message from the Oracle client follows:");
    eprintln!("{}", message);
    std::process::exit(1);
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = build_config(cli)?;
    init_logging(&config.logging)?;

    info!("Connecting to {}", config.database.connection_string);
    let db = OracleDatabase::new(config.database.clone());
    let mut session = Session::connect(db, Some(connection_failed))?;
    info!("Connected successfully");

    let template = QueryTemplate::new(&config.query);
    let mut exporter = Exporter::new(config.export, template);
    let stats = exporter.export(&mut session)?;

    stats.print_summary();
    Ok(())
}
