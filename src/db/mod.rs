pub mod oracle;

use anyhow::Result;

pub trait Database {
    fn connect(&mut self) -> Result<()>;
    fn execute_query(&mut self, query: &str) -> Result<QueryResult>;
}

/// A fully fetched result set with every value rendered as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl QueryResult {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
pub mod memory {
    use super::{Database, QueryResult};
    use anyhow::{bail, Result};
    use std::collections::HashMap;

    /// In-memory backend keyed by exact query text.
    #[derive(Default)]
    pub struct MemoryDatabase {
        pub results: HashMap<String, QueryResult>,
        pub connect_error: Option<String>,
        pub connected: bool,
    }

    impl MemoryDatabase {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_result(mut self, query: &str, columns: &[&str], rows: &[&[&str]]) -> Self {
            let result = QueryResult {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                rows: rows
                    .iter()
                    .map(|row| row.iter().map(|v| v.to_string()).collect())
                    .collect(),
            };
            self.results.insert(query.to_string(), result);
            self
        }

        pub fn failing(message: &str) -> Self {
            Self {
                connect_error: Some(message.to_string()),
                ..Self::default()
            }
        }
    }

    impl Database for MemoryDatabase {
        fn connect(&mut self) -> Result<()> {
            if let Some(message) = &self.connect_error {
                bail!("{}", message);
            }
            self.connected = true;
            Ok(())
        }

        fn execute_query(&mut self, query: &str) -> Result<QueryResult> {
            if !self.connected {
                bail!("Database not connected");
            }
            match self.results.get(query) {
                Some(result) => Ok(result.clone()),
                None => bail!("ORA-00942: table or view does not exist"),
            }
        }
    }
}
