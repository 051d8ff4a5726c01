use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub log_file: Option<String>,
    #[serde(default)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// host:port/service_name
    pub connection_string: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_columns")]
    pub columns: String,
    #[serde(default = "default_filter")]
    pub filter: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Standard output when unset.
    #[serde(default)]
    pub output_file: Option<String>,
    #[serde(default)]
    pub format: ExportFormat,
    #[serde(default = "default_separator")]
    pub separator: String,
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    #[serde(default)]
    pub compression: CompressionType,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Joined,
    Csv,
    Tsv,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionType {
    #[default]
    None,
    Gzip,
}

impl ExportFormat {
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "joined" => Ok(ExportFormat::Joined),
            "csv" => Ok(ExportFormat::Csv),
            "tsv" => Ok(ExportFormat::Tsv),
            other => anyhow::bail!("Unknown output format: {}", other),
        }
    }
}

impl CompressionType {
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "none" => Ok(CompressionType::None),
            "gzip" => Ok(CompressionType::Gzip),
            other => anyhow::bail!("Unknown compression type: {}", other),
        }
    }
}

fn default_fetch_size() -> usize {
    1000
}

fn default_table() -> String {
    "testing".to_string()
}

fn default_columns() -> String {
    "OBJECT_ID, AUTHOR, TITLE".to_string()
}

fn default_filter() -> String {
    r"AUTHOR = 'iconect\london' OR OBJECT_ID >= 5".to_string()
}

fn default_separator() -> String {
    ", ".to_string()
}

fn default_buffer_size() -> usize {
    1024 * 1024 // 1MB
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            connection_string: "localhost:1521/ORCL".to_string(),
            username: String::new(),
            password: String::new(),
            fetch_size: default_fetch_size(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            table: default_table(),
            columns: default_columns(),
            filter: default_filter(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_file: None,
            format: ExportFormat::default(),
            separator: default_separator(),
            buffer_size: default_buffer_size(),
            compression: CompressionType::default(),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config file {}", path))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}
