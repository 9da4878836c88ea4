use crate::models::KeyAlgorithm;
use std::collections::HashMap;
use std::env;
use std::num::NonZeroUsize;
use thiserror::Error;

/// Default name of the Secret holding the JWKS and private key manifest
pub const DEFAULT_SECRET_NAME: &str = "jwt-keys";

/// Default retention bound
pub const DEFAULT_MAX_KEYS: usize = 2;

/// Default signing key algorithm
pub const DEFAULT_KEY_ALGORITHM: KeyAlgorithm = KeyAlgorithm::Ed448;

/// Immutable per-run rotation configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub namespace: String,
    pub secret_name: String,
    pub max_keys: NonZeroUsize,
    pub key_algorithm: KeyAlgorithm,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Environment variable {0} must not be empty")]
    EmptyValue(String),

    #[error("Invalid MAX_KEYS: {0}")]
    InvalidMaxKeys(String),

    #[error("Invalid KEY_ALGORITHM: {0}")]
    InvalidKeyAlgorithm(String),
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing)
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let namespace = vars
            .get("NAMESPACE")
            .ok_or_else(|| ConfigError::MissingEnvVar("NAMESPACE".to_string()))?
            .trim()
            .to_string();
        if namespace.is_empty() {
            return Err(ConfigError::EmptyValue("NAMESPACE".to_string()));
        }

        let secret_name = vars
            .get("SECRET_NAME")
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|| DEFAULT_SECRET_NAME.to_string());
        if secret_name.is_empty() {
            return Err(ConfigError::EmptyValue("SECRET_NAME".to_string()));
        }

        let max_keys = match vars.get("MAX_KEYS") {
            Some(raw) => raw
                .trim()
                .parse::<NonZeroUsize>()
                .map_err(|e| ConfigError::InvalidMaxKeys(format!("'{}': {}", raw, e)))?,
            None => NonZeroUsize::new(DEFAULT_MAX_KEYS)
                .ok_or_else(|| ConfigError::InvalidMaxKeys("default is zero".to_string()))?,
        };

        let key_algorithm = match vars.get("KEY_ALGORITHM") {
            Some(raw) => raw
                .trim()
                .parse::<KeyAlgorithm>()
                .map_err(ConfigError::InvalidKeyAlgorithm)?,
            None => DEFAULT_KEY_ALGORITHM,
        };

        Ok(Config {
            namespace,
            secret_name,
            max_keys,
            key_algorithm,
        })
    }
}
