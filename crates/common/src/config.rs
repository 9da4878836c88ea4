//! Observability configuration shared by rotator binaries.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use thiserror::Error;

/// Default log level when neither `RUST_LOG` nor `LOG_LEVEL` is set
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Errors raised while reading observability settings
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ObservabilityConfigError {
    /// `LOG_FORMAT` holds something other than `json` or `text`
    #[error("Invalid LOG_FORMAT '{0}': expected 'json' or 'text'")]
    InvalidLogFormat(String),
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable single-line output
    Text,
    /// One JSON object per event, for log shippers
    Json,
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive
    pub log_level: String,
    /// Output format
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_format: LogFormat::Text,
        }
    }
}

impl ObservabilityConfig {
    /// Load observability settings from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `LOG_FORMAT` is set to an unknown value.
    pub fn from_env() -> Result<Self, ObservabilityConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load observability settings from a `HashMap` (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if `LOG_FORMAT` is set to an unknown value.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ObservabilityConfigError> {
        let log_level = vars
            .get("LOG_LEVEL")
            .filter(|v| !v.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        let log_format = match vars.get("LOG_FORMAT").map(|v| v.to_ascii_lowercase()) {
            None => LogFormat::Text,
            Some(v) if v == "text" => LogFormat::Text,
            Some(v) if v == "json" => LogFormat::Json,
            Some(other) => return Err(ObservabilityConfigError::InvalidLogFormat(other)),
        };

        Ok(Self {
            log_level,
            log_format,
        })
    }
}
