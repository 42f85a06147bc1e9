//! Mapper configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::dialect::DialectKind;
use crate::error::{Error, Result};

/// Mapper configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// SQL dialect of the target provider.
    pub dialect: DialectKind,

    /// Log full SQL text at debug level. Off logs only table and operation.
    pub log_statements: bool,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            dialect: DialectKind::default(),
            log_statements: false,
        }
    }
}

impl MapperConfig {
    /// Create a configuration for the given dialect.
    pub fn new(dialect: DialectKind) -> Self {
        Self {
            dialect,
            ..Default::default()
        }
    }

    /// Enable or disable SQL text logging.
    pub fn with_statement_logging(mut self, enabled: bool) -> Self {
        self.log_statements = enabled;
        self
    }

    /// Parse a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json(&text)
    }
}
