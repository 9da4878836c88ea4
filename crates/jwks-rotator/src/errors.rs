use crate::services::rotation_service::RotationStage;
use crate::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RotatorError {
    /// Store failure while loading or bootstrapping the secret
    #[error("Secret store error: {0}")]
    Store(#[from] StoreError),

    /// Secret exists but the JWKS field is missing or unparsable
    #[error("Malformed secret state: {0}")]
    MalformedState(String),

    /// Entropy source or key generation primitive failed
    #[error("Cryptographic primitive unavailable: {0}")]
    CryptoUnavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Store failure while patching the rotated state
    #[error("Failed to write rotated keys: {0}")]
    WriteFailed(StoreError),
}

impl RotatorError {
    /// Stage of the rotation cycle this failure terminated
    pub fn stage(&self) -> RotationStage {
        match self {
            RotatorError::Store(_) | RotatorError::MalformedState(_) => RotationStage::Loading,
            RotatorError::CryptoUnavailable(_) => RotationStage::Generating,
            RotatorError::Serialization(_) | RotatorError::WriteFailed(_) => {
                RotationStage::Writing
            }
        }
    }
}
