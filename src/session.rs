use crate::db::{Database, QueryResult};
use anyhow::{anyhow, bail, Result};
use tracing::debug;

/// Called with a message when the session cannot reach the database.
pub type ErrorProc = fn(&str);

/// A connection plus the record set of the last opened query, walked one record at a time.
pub struct Session<D: Database> {
    db: D,
    current: Option<QueryResult>,
    position: usize,
}

impl<D: Database> Session<D> {
    /// Connects `db`. On failure `error_proc` sees the message before the error is returned.
    pub fn connect(mut db: D, error_proc: Option<ErrorProc>) -> Result<Self> {
        if let Err(err) = db.connect() {
            if let Some(proc_) = error_proc {
                proc_(&format!("{:#}", err));
            }
            return Err(err);
        }

        Ok(Self {
            db,
            current: None,
            position: 0,
        })
    }

    /// Runs `query` and makes its result set current.
    /// Returns true when at least one record came back.
    pub fn open(&mut self, query: &str) -> Result<bool> {
        self.current = None;
        self.position = 0;

        let result = self.db.execute_query(query)?;
        debug!(
            "Opened query with {} fields and {} records",
            result.columns.len(),
            result.rows.len()
        );
        let has_records = !result.rows.is_empty();
        self.current = Some(result);
        Ok(has_records)
    }

    pub fn field_count(&self) -> usize {
        self.current.as_ref().map_or(0, |r| r.columns.len())
    }

    pub fn field_name(&self, n: usize) -> Result<&str> {
        let result = self.current()?;
        result
            .columns
            .get(n)
            .map(String::as_str)
            .ok_or_else(|| anyhow!("Field index {} out of range ({} fields)", n, result.columns.len()))
    }

    pub fn field_value(&self, n: usize) -> Result<&str> {
        let result = self.current()?;
        let Some(row) = result.rows.get(self.position) else {
            bail!("No current record: the record set is at EOF");
        };
        row.get(n)
            .map(String::as_str)
            .ok_or_else(|| anyhow!("Field index {} out of range ({} fields)", n, row.len()))
    }

    /// Advances one record. False if no query is open or the cursor is already at the end.
    pub fn move_next(&mut self) -> bool {
        match &self.current {
            Some(result) if self.position < result.rows.len() => {
                self.position += 1;
                true
            }
            _ => false,
        }
    }

    pub fn is_eof(&self) -> bool {
        self.current
            .as_ref()
            .map_or(true, |r| self.position >= r.rows.len())
    }

    fn current(&self) -> Result<&QueryResult> {
        self.current.as_ref().ok_or_else(|| anyhow!("No query has been opened"))
    }
}
