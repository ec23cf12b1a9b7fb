//! Configuration management for the approval service

use crate::error::{ApprovalError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Raw configuration structure matching the config file exactly
#[derive(Debug, Deserialize)]
struct RawConfig {
    pub database: DatabaseConfig,

    #[serde(default)]
    pub numbering: NumberingConfig,
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub database: DatabaseConfig,
    pub numbering: NumberingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(alias = "database_url")] // Accept both 'url' and 'database_url'
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_auto_migrate")]
    pub auto_migrate: bool,
}

fn default_max_connections() -> u32 {
    5
}

fn default_auto_migrate() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumberingConfig {
    /// Zero-padding width of the numeric part of workflow references
    #[serde(default = "default_pad_width")]
    pub pad_width: usize,
}

fn default_pad_width() -> usize {
    6
}

impl Default for NumberingConfig {
    fn default() -> Self {
        Self {
            pad_width: default_pad_width(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ApprovalError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let raw: RawConfig = serde_json::from_str(&content).map_err(|e| {
            ApprovalError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        Ok(Self {
            database: raw.database,
            numbering: raw.numbering,
        })
    }

    /// Build a configuration from a database url alone, with defaults for
    /// everything else. Used by the server when no config file is given.
    pub fn from_database_url(url: impl Into<String>) -> Self {
        Self {
            database: DatabaseConfig {
                url: url.into(),
                max_connections: default_max_connections(),
                auto_migrate: default_auto_migrate(),
            },
            numbering: NumberingConfig::default(),
        }
    }
}
