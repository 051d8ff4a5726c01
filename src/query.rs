use crate::config::QueryConfig;
use anyhow::Result;
use std::fs;
use std::path::Path;

/// Builds the count and data statements over one table and filter.
#[derive(Debug, Clone)]
pub struct QueryTemplate {
    table: String,
    columns: String,
    filter: String,
}

impl QueryTemplate {
    pub fn new(config: &QueryConfig) -> Self {
        Self {
            table: config.table.trim().to_string(),
            columns: config.columns.trim().to_string(),
            filter: config.filter.trim().to_string(),
        }
    }

    pub fn select(&self, projection: &str) -> String {
        if self.filter.is_empty() {
            format!("SELECT {} FROM {}", projection, self.table)
        } else {
            format!("SELECT {} FROM {} WHERE {}", projection, self.table, self.filter)
        }
    }

    pub fn count_sql(&self) -> String {
        self.select("COUNT(*)")
    }

    pub fn data_sql(&self) -> String {
        self.select(&self.columns)
    }
}

/// Reads an SQL fragment, accepting either the text itself or a path to a file holding it.
pub fn read_fragment_or_file(input: &str) -> Result<String> {
    let path = Path::new(input);

    if path.exists() && path.is_file() {
        let content = fs::read_to_string(path)?;
        Ok(content.trim().to_string())
    } else {
        Ok(input.to_string())
    }
}
