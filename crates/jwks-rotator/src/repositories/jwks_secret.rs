//! Loading and writing the JWKS secret.
//!
//! The secret holds two fields: the public JWKS (`jwks.json`) and the
//! manifest of the most recent private key (`private-key-manifest.json`).
//! Both are rewritten together by a single patch.

use crate::errors::RotatorError;
use crate::models::{Jwks, PrivateKeyManifest, JWKS_FIELD, MANIFEST_FIELD};
use crate::store::{SecretData, SecretStore};
use tracing::{info, instrument, warn};

/// Manifest stored before the first key has been generated
const EMPTY_MANIFEST: &str = "{}";

/// JWKS loaded at the start of a cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedState {
    pub jwks: Jwks,
    /// True when this load created the secret
    pub bootstrapped: bool,
}

/// Initial contents of a newly created secret: no keys, empty manifest
pub fn initial_record() -> Result<SecretData, RotatorError> {
    let jwks = serde_json::to_string(&Jwks::default())
        .map_err(|e| RotatorError::Serialization(format!("Failed to encode JWKS: {}", e)))?;

    Ok(SecretData::new()
        .with(JWKS_FIELD, jwks)
        .with(MANIFEST_FIELD, EMPTY_MANIFEST))
}

/// Extract and parse the JWKS field of a secret record
pub fn parse_jwks(data: &SecretData) -> Result<Jwks, RotatorError> {
    let raw = data.get(JWKS_FIELD).ok_or_else(|| {
        RotatorError::MalformedState(format!(
            "field {} not found in secret (fields present: {:?})",
            JWKS_FIELD,
            data.field_names()
        ))
    })?;

    serde_json::from_str(raw).map_err(|e| {
        RotatorError::MalformedState(format!("field {} is not a valid JWKS: {}", JWKS_FIELD, e))
    })
}

/// Load the current JWKS, creating the secret when it does not exist.
///
/// A missing secret is the bootstrap case, not an error. A secret whose JWKS
/// field is missing or unparsable is `MalformedState`; nothing is guessed or
/// overwritten. Store failures propagate unchanged.
#[instrument(skip_all, fields(namespace = %namespace, secret = %name))]
pub async fn load_jwks(
    store: &dyn SecretStore,
    namespace: &str,
    name: &str,
) -> Result<LoadedState, RotatorError> {
    match store.get(namespace, name).await? {
        Some(data) => {
            let jwks = parse_jwks(&data).map_err(|e| {
                warn!(
                    target: "rotator.repositories.jwks_secret",
                    error = %e,
                    "Secret exists but holds no usable JWKS"
                );
                e
            })?;

            Ok(LoadedState {
                jwks,
                bootstrapped: false,
            })
        }
        None => {
            info!(
                target: "rotator.repositories.jwks_secret",
                "Secret not found, creating it with an empty JWKS"
            );

            store.create(namespace, name, initial_record()?).await?;

            Ok(LoadedState {
                jwks: Jwks::default(),
                bootstrapped: true,
            })
        }
    }
}

/// Persist the rotated JWKS and the new private key manifest in one patch.
#[instrument(skip_all, fields(namespace = %namespace, secret = %name, kid = %manifest.key_id))]
pub async fn write_rotation(
    store: &dyn SecretStore,
    namespace: &str,
    name: &str,
    manifest: &PrivateKeyManifest,
    jwks: &Jwks,
) -> Result<(), RotatorError> {
    let manifest_json = serde_json::to_string(manifest)
        .map_err(|e| RotatorError::Serialization(format!("Failed to encode manifest: {}", e)))?;
    let jwks_json = serde_json::to_string(jwks)
        .map_err(|e| RotatorError::Serialization(format!("Failed to encode JWKS: {}", e)))?;

    let fields = SecretData::new()
        .with(MANIFEST_FIELD, manifest_json)
        .with(JWKS_FIELD, jwks_json);

    store
        .patch(namespace, name, fields)
        .await
        .map_err(RotatorError::WriteFailed)
}
