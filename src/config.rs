use std::env;

use clickhouse::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

use crate::table_catalog::DEFAULT_TIMESTAMP_COLUMN;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Process configuration with validation
#[derive(Clone, Debug, Validate, Serialize, Deserialize)]
pub struct AppConfig {
    /// ClickHouse HTTP endpoint
    #[validate(length(min = 1, message = "ClickHouse URL cannot be empty"))]
    pub clickhouse_url: String,

    #[serde(default)]
    pub clickhouse_user: Option<String>,

    #[serde(default)]
    pub clickhouse_password: Option<String>,

    /// Database whose tables are exposed as data sources
    #[validate(length(min = 1, message = "Database cannot be empty"))]
    pub database: String,

    /// Optional YAML catalog with pre-seeded tables
    #[serde(default)]
    pub catalog_file: Option<String>,

    /// Timestamp column assumed for discovered tables
    #[validate(length(min = 1, message = "Timestamp column cannot be empty"))]
    pub timestamp_column: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            clickhouse_url: "http://localhost:8123".to_string(),
            clickhouse_user: None,
            clickhouse_password: None,
            database: "default".to_string(),
            catalog_file: None,
            timestamp_column: DEFAULT_TIMESTAMP_COLUMN.to_string(),
        }
    }
}

impl AppConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            clickhouse_url: env::var("CLICKHOUSE_URL").unwrap_or(defaults.clickhouse_url),
            clickhouse_user: env::var("CLICKHOUSE_USER").ok(),
            clickhouse_password: env::var("CLICKHOUSE_PASSWORD").ok(),
            database: parse_env_var("CLICKHOUSE_DATABASE", &defaults.database)?,
            catalog_file: env::var("CLICKSERIES_CATALOG").ok(),
            timestamp_column: parse_env_var(
                "CLICKSERIES_TIMESTAMP_COLUMN",
                &defaults.timestamp_column,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from CLI arguments with validation
    pub fn from_cli(cli: CliConfig) -> Result<Self, ConfigError> {
        let config = Self {
            clickhouse_url: cli.clickhouse_url,
            clickhouse_user: cli.clickhouse_user,
            clickhouse_password: cli.clickhouse_password,
            database: cli.database,
            catalog_file: cli.catalog_file,
            timestamp_column: cli.timestamp_column,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Build a ClickHouse client for the configured endpoint
    pub fn clickhouse_client(&self) -> Client {
        let mut client = Client::default()
            .with_url(&self.clickhouse_url)
            .with_database(&self.database);
        if let Some(user) = &self.clickhouse_user {
            client = client.with_user(user);
        }
        if let Some(password) = &self.clickhouse_password {
            client = client.with_password(password);
        }
        client
    }
}

/// CLI configuration (parsed from command line arguments)
#[derive(Clone, Debug)]
pub struct CliConfig {
    pub clickhouse_url: String,
    pub clickhouse_user: Option<String>,
    pub clickhouse_password: Option<String>,
    pub database: String,
    pub catalog_file: Option<String>,
    pub timestamp_column: String,
}

/// Parse an environment variable with a default value
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}
