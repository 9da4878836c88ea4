//! Common utilities shared by the JWKS rotator crates.

#![warn(clippy::pedantic)]

/// Module for observability configuration (log level and format)
pub mod config;

/// Module for tracing subscriber initialization
pub mod observability;

/// Module for secret types that prevent accidental logging
pub mod secret;
