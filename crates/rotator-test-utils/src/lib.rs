//! # Rotator Test Utilities
//!
//! Shared test utilities for the JWKS rotator.
//!
//! This crate provides:
//! - Deterministic fixtures (fixed clock, configs, seeded stores)
//! - A mock Kubernetes API server (`KubeApiMock`) for end-to-end cycles
//! - Custom assertions (`JwksAssertions` trait)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rotator_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let store = Arc::new(seeded_store(&jwks_with(&["k2", "k1"])));
//!     let rotator = Rotator::new(
//!         test_config(KeyAlgorithm::Ed25519, 2),
//!         store.clone(),
//!         Arc::new(FixedClock::default()),
//!     );
//!     rotator.rotate().await.unwrap();
//!
//!     stored_jwks(&store)
//!         .assert_key_count(2)
//!         .assert_public_only();
//! }
//! ```

pub mod assertions;
pub mod fixtures;
pub mod kube_mock;

// Re-export commonly used items
pub use assertions::*;
pub use fixtures::*;
pub use kube_mock::*;
