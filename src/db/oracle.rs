use crate::config::DatabaseConfig;
use crate::db::{Database, QueryResult};
use anyhow::{Context, Result};
use oracle::{Connection, Row};
use tracing::debug;

pub struct OracleDatabase {
    config: DatabaseConfig,
    connection: Option<Connection>,
}

impl OracleDatabase {
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            connection: None,
        }
    }

    fn build_connection_string(&self) -> String {
        // EZConnect form: //host:port/service_name
        format!("//{}", self.config.connection_string)
    }

    fn row_to_strings(&self, row: &Row, col_count: usize) -> Result<Vec<String>> {
        let mut values = Vec::with_capacity(col_count);

        for i in 0..col_count {
            let value: Option<String> = row.get(i)?;
            values.push(value.unwrap_or_default());
        }

        Ok(values)
    }

    fn fetch_array_size(&self) -> u32 {
        u32::try_from(self.config.fetch_size.max(1)).unwrap_or(u32::MAX)
    }
}

impl Database for OracleDatabase {
    fn connect(&mut self) -> Result<()> {
        let conn_str = self.build_connection_string();
        debug!("Connecting to {} as {}", conn_str, self.config.username);
        let conn = Connection::connect(&self.config.username, &self.config.password, &conn_str)
            .context("Failed to connect to Oracle database")?;

        self.connection = Some(conn);
        Ok(())
    }

    fn execute_query(&mut self, query: &str) -> Result<QueryResult> {
        let conn = self
            .connection
            .as_ref()
            .context("Database not connected")?;

        debug!("Executing: {}", query);
        let mut stmt = conn
            .statement(query)
            .fetch_array_size(self.fetch_array_size())
            .build()
            .with_context(|| format!("Failed to prepare query: {}", query))?;
        let rows = stmt
            .query(&[])
            .with_context(|| format!("Failed to execute query: {}", query))?;

        let columns: Vec<String> = rows
            .column_info()
            .iter()
            .map(|col| col.name().to_string())
            .collect();

        let col_count = columns.len();

        let mut result = QueryResult::new();
        result.columns = columns;

        for row_result in rows {
            let row = row_result?;
            let values = self.row_to_strings(&row, col_count)?;
            result.rows.push(values);
        }

        debug!("Fetched {} rows", result.rows.len());
        Ok(result)
    }
}
