//! One rotation cycle: load the current JWKS, generate a key, merge it in,
//! and write the result back.
//!
//! A cycle either completes or leaves the stored record untouched. The single
//! patch at the end is the only write apart from the one-time bootstrap
//! create, so the JWKS and the private key manifest never diverge.

use crate::clock::Clock;
use crate::config::Config;
use crate::crypto;
use crate::errors::RotatorError;
use crate::models::{KeyAlgorithm, PrivateKeyManifest};
use crate::repositories::jwks_secret;
use crate::services::key_set_service;
use crate::store::{SecretStore, StoreError};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// Stages of a rotation cycle, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationStage {
    Loading,
    Generating,
    Merging,
    Writing,
    Done,
    Failed,
}

impl RotationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RotationStage::Loading => "loading",
            RotationStage::Generating => "generating",
            RotationStage::Merging => "merging",
            RotationStage::Writing => "writing",
            RotationStage::Done => "done",
            RotationStage::Failed => "failed",
        }
    }
}

impl fmt::Display for RotationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of a completed rotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationReport {
    /// Identifier of the key generated by this cycle
    pub key_id: String,
    pub algorithm: KeyAlgorithm,
    /// True when the secret did not exist and was created by this cycle
    pub bootstrapped: bool,
    /// Key ids published after the rotation, most recent first
    pub retained_kids: Vec<String>,
    /// Key ids dropped from the published set
    pub evicted_kids: Vec<String>,
}

/// How a cycle ended when it did not fail before the write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Rotated(RotationReport),
    /// The final patch was rejected. Logged, not propagated: the stored record
    /// is unchanged and the next scheduled run tries again.
    WriteFailed(StoreError),
}

/// Rotation engine bound to one secret
pub struct Rotator {
    config: Config,
    store: Arc<dyn SecretStore>,
    clock: Arc<dyn Clock>,
}

impl Rotator {
    pub fn new(config: Config, store: Arc<dyn SecretStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            store,
            clock,
        }
    }

    /// Run one rotation cycle and propagate every failure.
    #[instrument(
        skip_all,
        fields(
            namespace = %self.config.namespace,
            secret = %self.config.secret_name,
            algorithm = %self.config.key_algorithm,
        )
    )]
    pub async fn rotate(&self) -> Result<RotationReport, RotatorError> {
        let namespace = self.config.namespace.as_str();
        let name = self.config.secret_name.as_str();
        let algorithm = self.config.key_algorithm;

        let loaded = jwks_secret::load_jwks(self.store.as_ref(), namespace, name).await?;
        info!(
            target: "rotator.services.rotation",
            stage = %RotationStage::Loading,
            keys = loaded.jwks.keys.len(),
            bootstrapped = loaded.bootstrapped,
            "Loaded current JWKS"
        );
        debug!(
            target: "rotator.services.rotation",
            existing_kids = ?loaded.jwks.kids(),
            "Current key ids"
        );

        let key_id = crypto::generate_key_id(self.clock.as_ref())?;
        info!(
            target: "rotator.services.rotation",
            stage = %RotationStage::Generating,
            kid = %key_id,
            "Generated key id"
        );

        let key_pair = crypto::generate_key_pair(algorithm)?;
        info!(
            target: "rotator.services.rotation",
            stage = %RotationStage::Generating,
            kid = %key_id,
            "Generated key pair"
        );

        let entry = crypto::public_key_entry(&key_id, algorithm, &key_pair.public_key);
        info!(
            target: "rotator.services.rotation",
            stage = %RotationStage::Generating,
            kid = %entry.kid,
            alg = entry.alg.as_str(),
            "Exported public JWK"
        );

        let merged = key_set_service::merge(loaded.jwks, entry, self.config.max_keys);
        let retained_kids = merged.jwks.kids();
        let evicted_kids: Vec<String> = merged.evicted.into_iter().map(|k| k.kid).collect();
        info!(
            target: "rotator.services.rotation",
            stage = %RotationStage::Merging,
            keys = retained_kids.len(),
            evicted = evicted_kids.len(),
            "Merged new key into JWKS"
        );
        debug!(
            target: "rotator.services.rotation",
            retained = ?retained_kids,
            evicted = ?evicted_kids,
            "Merged key ids"
        );

        let manifest = PrivateKeyManifest {
            algorithm,
            key_id: key_id.clone(),
            content: key_pair.private_key_pem,
        };

        jwks_secret::write_rotation(self.store.as_ref(), namespace, name, &manifest, &merged.jwks)
            .await?;

        info!(
            target: "rotator.services.rotation",
            stage = %RotationStage::Done,
            kid = %key_id,
            keys = retained_kids.len(),
            evicted = evicted_kids.len(),
            "Rotated signing key"
        );

        Ok(RotationReport {
            key_id,
            algorithm,
            bootstrapped: loaded.bootstrapped,
            retained_kids,
            evicted_kids,
        })
    }

    /// Run one cycle with the process-level failure policy applied.
    ///
    /// A rejected final write is logged and reported as
    /// [`CycleOutcome::WriteFailed`]. Every other failure is logged with the
    /// stage it ended and returned.
    pub async fn run_cycle(&self) -> Result<CycleOutcome, RotatorError> {
        match self.rotate().await {
            Ok(report) => Ok(CycleOutcome::Rotated(report)),
            Err(RotatorError::WriteFailed(err)) => {
                log_write_failure(&err);
                Ok(CycleOutcome::WriteFailed(err))
            }
            Err(err) => {
                error!(
                    target: "rotator.services.rotation",
                    stage = %err.stage(),
                    error = %err,
                    "Rotation failed"
                );
                Err(err)
            }
        }
    }
}

fn log_write_failure(err: &StoreError) {
    match err.classify() {
        Some(failure) => {
            error!(
                target: "rotator.services.rotation",
                stage = %RotationStage::Failed,
                status = failure.status,
                api_message = failure.message,
                body = failure.body,
                "Error while patching secret"
            );
        }
        None => {
            error!(
                target: "rotator.services.rotation",
                stage = %RotationStage::Failed,
                error = %err,
                "Unknown error while patching secret"
            );
        }
    }
}
