//! Secret store capability.
//!
//! The rotation engine only needs three operations against the cluster's
//! secret store: read a record, create it when absent, and merge-patch named
//! fields. [`SecretStore`] captures exactly that so the engine can run against
//! [`kube::KubeSecretStore`] in production and [`mock::InMemorySecretStore`]
//! in tests.

pub mod kube;
pub mod mock;

use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Errors reported by a secret store implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The store answered with a non-success status.
    ///
    /// This is the only classifiable shape: status, message and raw body are
    /// all available for diagnostics.
    #[error("Secret store returned status {status}: {message}")]
    Api {
        status: u16,
        message: String,
        body: String,
    },

    /// The request never produced a response (DNS, TLS, timeout, reset).
    #[error("Secret store connection failed: {0}")]
    Connection(String),

    /// A response arrived but could not be decoded.
    #[error("Invalid secret store response: {0}")]
    InvalidResponse(String),

    /// The client could not be constructed.
    #[error("Secret store configuration error: {0}")]
    Configuration(String),
}

/// Diagnostics of a request the store answered with a non-success status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiFailure<'a> {
    pub status: u16,
    pub message: &'a str,
    pub body: &'a str,
}

impl StoreError {
    /// Status, message and raw body, when the store answered at all
    pub fn classify(&self) -> Option<ApiFailure<'_>> {
        match self {
            StoreError::Api {
                status,
                message,
                body,
            } => Some(ApiFailure {
                status: *status,
                message,
                body,
            }),
            _ => None,
        }
    }
}

/// Field name to UTF-8 value map of a secret record.
///
/// Values may hold private key material, so `Debug` lists field names only.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretData(BTreeMap<String, String>);

impl SecretData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Overwrite fields present in `other`, keep the rest
    pub fn merge(&mut self, other: SecretData) {
        self.0.extend(other.0);
    }
}

impl fmt::Debug for SecretData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretData")
            .field("fields", &self.field_names())
            .field("values", &"[REDACTED]")
            .finish()
    }
}

impl FromIterator<(String, String)> for SecretData {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Narrow secret store capability consumed by the rotation engine.
#[async_trait::async_trait]
pub trait SecretStore: Send + Sync {
    /// Read a secret. `Ok(None)` means it does not exist.
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<SecretData>, StoreError>;

    /// Create a secret with the given initial fields.
    async fn create(
        &self,
        namespace: &str,
        name: &str,
        data: SecretData,
    ) -> Result<SecretData, StoreError>;

    /// Merge-patch the given fields into an existing secret in one request.
    async fn patch(&self, namespace: &str, name: &str, fields: SecretData)
        -> Result<(), StoreError>;
}
