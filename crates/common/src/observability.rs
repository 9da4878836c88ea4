//! Tracing subscriber setup.
//!
//! `RUST_LOG` wins when present; otherwise the filter is built from the
//! binary's default directives plus [`ObservabilityConfig::log_level`].

use crate::config::{LogFormat, ObservabilityConfig};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the filter used by [`init_tracing`].
///
/// `default_directives` names the binary's own crates (e.g.
/// `"jwks_rotator={level},common={level}"`); `{level}` is replaced with the
/// configured log level.
#[must_use]
pub fn build_filter(config: &ObservabilityConfig, default_directives: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(default_directives.replace("{level}", &config.log_level))
    })
}

/// Install the global tracing subscriber.
///
/// Returns `false` if a subscriber was already installed (e.g. by a test
/// harness); the existing one is kept.
pub fn init_tracing(config: &ObservabilityConfig, default_directives: &str) -> bool {
    let filter = build_filter(config, default_directives);

    let installed = match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .is_ok(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .is_ok(),
    };

    if installed {
        debug!(
            target: "common.observability",
            log_level = %config.log_level,
            log_format = ?config.log_format,
            "Tracing initialized"
        );
    }
    installed
}
