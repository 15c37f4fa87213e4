//! Configuration system for the query wizard.
//!
//! Supports TOML-based configuration listing the browsable database/schema targets,
//! preview/paging limits and catalog caching behaviour.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WizardError};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct WizardConfig {
    /// Database/schema pairs whose objects are offered in the table picker.
    pub targets: Vec<CatalogTarget>,
    pub query: QueryConfig,
    pub catalog: CatalogConfig,
}

/// One browsable database/schema pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct CatalogTarget {
    pub database: String,
    pub schema: String,
}

impl CatalogTarget {
    pub fn new(database: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            schema: schema.into(),
        }
    }
}

/// Query execution configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Row cap appended to preview executions (default: 100).
    pub preview_row_limit: u64,
    /// Rows per page when paging through a compiled statement (default: 50).
    pub page_size: u32,
}

/// Catalog listing and caching configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Cache TTL in seconds (default: 300).
    pub ttl_secs: u64,
    /// Maximum cached entries (default: 1000).
    pub max_size: usize,
    /// Offer views alongside tables (default: true).
    pub include_views: bool,
    /// Offer materialized views (default: false).
    pub include_materialized_views: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            preview_row_limit: 100,
            page_size: 50,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            max_size: 1000,
            include_views: true,
            include_materialized_views: false,
        }
    }
}

impl WizardConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| WizardError::Config(format!("failed to read config file: {e}")))?;
        Self::from_toml(&contents)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| WizardError::Config(format!("failed to parse config: {e}")))
    }

    /// Load from default locations (env var, cwd, user config dir, or defaults).
    ///
    /// Search order:
    /// 1. `SQLWIZARD_CONFIG` environment variable
    /// 2. `./sqlwizard.toml` (current directory)
    /// 3. `~/.config/sqlwizard/config.toml` (user config dir)
    /// 4. Built-in defaults
    pub fn load_default() -> Self {
        if let Ok(path) = std::env::var("SQLWIZARD_CONFIG") {
            match Self::from_file(&path) {
                Ok(cfg) => {
                    tracing::info!(path = %path, "loaded config from SQLWIZARD_CONFIG");
                    return cfg;
                }
                Err(e) => tracing::warn!(path = %path, error = %e, "ignoring SQLWIZARD_CONFIG"),
            }
        }

        if let Ok(cfg) = Self::from_file("sqlwizard.toml") {
            tracing::info!("loaded config from ./sqlwizard.toml");
            return cfg;
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("sqlwizard").join("config.toml");
            if let Ok(cfg) = Self::from_file(&user_config) {
                tracing::info!(path = %user_config.display(), "loaded config from user config dir");
                return cfg;
            }
        }

        tracing::debug!("no config file found, using defaults");
        Self::default()
    }
}
