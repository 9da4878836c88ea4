//! JWKS Key Rotator Library
//!
//! Rotates the signing keys published in a JSON Web Key Set that lives in a
//! Kubernetes Secret. One invocation runs one rotation cycle:
//! load the current set, generate a key pair, merge its public half into the
//! set under the retention bound, and write the set plus the new private key
//! back in a single patch.
//!
//! # Modules
//!
//! - `clock` - Wall-clock capability used for key identifiers
//! - `config` - Rotation configuration
//! - `crypto` - Key pair generation, key identifiers, JWK export
//! - `errors` - Error types
//! - `models` - JWKS and private key manifest data model
//! - `repositories` - Loading and writing the JWKS secret
//! - `services` - Set merging and the rotation orchestrator
//! - `store` - Secret store capability, Kubernetes adapter, in-memory mock

pub mod clock;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod models;
pub mod repositories;
pub mod services;
pub mod store;
