//! Configuration for the chat data core.
//!
//! Supports YAML file and environment variable overrides.

use serde::Deserialize;
use std::path::Path;

use crate::index::DEFAULT_RECENCY_LIMIT;

/// Core configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Table store configuration.
    pub store: StoreConfig,
    /// Query behavior configuration.
    pub query: QueryConfig,
}

/// Table store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Store type (`memory` or `dynamo`).
    #[serde(rename = "type")]
    pub store_type: String,
    /// Physical table name.
    pub table: String,
    /// Endpoint override for local DynamoDB. `None` uses the AWS default.
    pub endpoint_url: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: "memory".to_string(),
            table: "chat".to_string(),
            endpoint_url: None,
        }
    }
}

/// Query behavior configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Result cap for recency-ordered message reads when the caller omits one.
    pub recency_limit: u32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            recency_limit: DEFAULT_RECENCY_LIMIT,
        }
    }
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. Config file
    /// 3. Defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("CONFAB_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());

        let mut config = if Path::new(&config_path).exists() {
            Self::from_file(&config_path)?
        } else {
            Self::default()
        };

        config.apply_env_overrides();

        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;

        serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(store_type) = std::env::var("CHAT_STORE_TYPE") {
            self.store.store_type = store_type;
        }

        if let Ok(table) = std::env::var("CHAT_TABLE") {
            self.store.table = table;
        }

        if let Ok(endpoint) = std::env::var("CHAT_STORE_ENDPOINT") {
            self.store.endpoint_url = Some(endpoint);
        }

        if let Ok(limit) = std::env::var("CHAT_RECENCY_LIMIT") {
            if let Ok(l) = limit.parse() {
                self.query.recency_limit = l;
            }
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{0}': {1}")]
    FileRead(String, String),

    #[error("Failed to parse config: {0}")]
    Parse(String),
}
