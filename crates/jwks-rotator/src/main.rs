use common::config::ObservabilityConfig;
use common::observability;
use jwks_rotator::clock::SystemClock;
use jwks_rotator::config::Config;
use jwks_rotator::services::rotation_service::{CycleOutcome, Rotator};
use jwks_rotator::store::kube::KubeSecretStore;
use std::sync::Arc;
use tracing::{error, info, warn};

const DEFAULT_LOG_DIRECTIVES: &str = "jwks_rotator={level},rotator={level},common={level}";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let observability_config = ObservabilityConfig::from_env()?;
    observability::init_tracing(&observability_config, DEFAULT_LOG_DIRECTIVES);

    info!("Starting JWKS rotator");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        namespace = %config.namespace,
        secret = %config.secret_name,
        max_keys = config.max_keys.get(),
        algorithm = %config.key_algorithm,
        "Configuration loaded successfully"
    );

    let store = KubeSecretStore::in_cluster().map_err(|e| {
        error!("Failed to create secret store client: {}", e);
        e
    })?;

    let rotator = Rotator::new(config, Arc::new(store), Arc::new(SystemClock));

    match rotator.run_cycle().await? {
        CycleOutcome::Rotated(report) => {
            info!(
                kid = %report.key_id,
                algorithm = %report.algorithm,
                bootstrapped = report.bootstrapped,
                retained = ?report.retained_kids,
                evicted = ?report.evicted_kids,
                "Rotation complete"
            );
        }
        CycleOutcome::WriteFailed(_) => {
            // Already logged with full detail; the next scheduled run retries
            warn!("Rotation not persisted, stored keys unchanged");
        }
    }

    Ok(())
}
