use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use shopmigrate_common::DEFAULT_LEDGER_TABLE;

/// Top-level configuration, read from `config.yml` or `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub catalog: CatalogConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file to migrate. Relative paths resolve against the config dir.
    pub path: Option<PathBuf>,
    pub ledger_table: String,
    pub busy_timeout_ms: u64,
    pub foreign_keys: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            ledger_table: DEFAULT_LEDGER_TABLE.to_string(),
            busy_timeout_ms: 5000,
            foreign_keys: true,
        }
    }
}

/// Where migration units come from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CatalogConfig {
    /// Register the built-in shop schema before any manifest.
    pub builtin: bool,
    /// Extra unit manifests (`.yml`, `.yaml` or `.toml`), registered in order.
    pub manifests: Vec<PathBuf>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            builtin: true,
            manifests: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
