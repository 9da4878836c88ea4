//! Process-level failure policy of a rotation cycle
//!
//! Load and generation failures surface as errors; a rejected final write is
//! reported as an outcome and leaves the stored record untouched.

use jwks_rotator::errors::RotatorError;
use jwks_rotator::models::{KeyAlgorithm, JWKS_FIELD};
use jwks_rotator::services::rotation_service::{CycleOutcome, RotationStage, Rotator};
use jwks_rotator::store::mock::InMemorySecretStore;
use jwks_rotator::store::{SecretData, StoreError};
use rotator_test_utils::*;
use std::sync::Arc;

fn rotator_for(store: &Arc<InMemorySecretStore>) -> Rotator {
    Rotator::new(
        test_config(KeyAlgorithm::Ed25519, 2),
        store.clone(),
        Arc::new(FixedClock::default()),
    )
}

#[tokio::test]
async fn test_patch_rejection_is_not_an_error() -> Result<(), anyhow::Error> {
    let store = Arc::new(seeded_store(&jwks_with(&["k1"])));
    let failure = StoreError::Api {
        status: 422,
        message: "Secret \"jwt-keys\" is invalid".to_string(),
        body: r#"{"kind":"Status","code":422}"#.to_string(),
    };
    store.fail_patch_with(failure.clone());

    let outcome = rotator_for(&store).run_cycle().await?;

    assert_eq!(outcome, CycleOutcome::WriteFailed(failure));
    stored_jwks(&store).assert_kids(&["k1"]);

    Ok(())
}

#[tokio::test]
async fn test_connection_loss_on_patch_is_not_an_error() -> Result<(), anyhow::Error> {
    let store = Arc::new(seeded_store(&jwks_with(&["k1"])));
    store.fail_patch_with(StoreError::Connection("broken pipe".to_string()));

    let outcome = rotator_for(&store).run_cycle().await?;

    assert!(matches!(
        outcome,
        CycleOutcome::WriteFailed(StoreError::Connection(_))
    ));

    Ok(())
}

#[tokio::test]
async fn test_next_cycle_succeeds_after_write_failure() -> Result<(), anyhow::Error> {
    let store = Arc::new(seeded_store(&jwks_with(&["k1"])));
    let rotator = rotator_for(&store);

    store.fail_patch_with(StoreError::Connection("timeout".to_string()));
    rotator.run_cycle().await?;
    store.clear_failures();

    let outcome = rotator.run_cycle().await?;

    let report = match outcome {
        CycleOutcome::Rotated(report) => report,
        other => anyhow::bail!("expected rotation, got {:?}", other),
    };
    stored_jwks(&store).assert_kids(&[report.key_id.as_str(), "k1"]);

    Ok(())
}

#[tokio::test]
async fn test_load_failure_is_an_error() {
    let store = Arc::new(InMemorySecretStore::new());
    store.fail_get_with(StoreError::Api {
        status: 401,
        message: "Unauthorized".to_string(),
        body: String::new(),
    });

    let result = rotator_for(&store).run_cycle().await;

    match result {
        Err(err @ RotatorError::Store(StoreError::Api { status: 401, .. })) => {
            assert_eq!(err.stage(), RotationStage::Loading);
        }
        other => unreachable!("expected load failure, got {:?}", other),
    }
    assert_eq!(store.create_calls(), 0);
    assert_eq!(store.patch_calls(), 0);
}

#[tokio::test]
async fn test_bootstrap_conflict_is_an_error() {
    let store = Arc::new(InMemorySecretStore::new());
    store.fail_create_with(StoreError::Api {
        status: 409,
        message: "secrets \"jwt-keys\" already exists".to_string(),
        body: String::new(),
    });

    let result = rotator_for(&store).run_cycle().await;

    assert!(matches!(
        result,
        Err(RotatorError::Store(StoreError::Api { status: 409, .. }))
    ));
    assert_eq!(store.patch_calls(), 0);
}

#[tokio::test]
async fn test_malformed_secret_is_left_alone() {
    let store = Arc::new(InMemorySecretStore::with_secret(
        TEST_NAMESPACE,
        TEST_SECRET,
        SecretData::new().with(JWKS_FIELD, r#"{"keys": "nope"}"#),
    ));

    let result = rotator_for(&store).run_cycle().await;

    assert!(matches!(result, Err(RotatorError::MalformedState(_))));
    assert_eq!(store.patch_calls(), 0);
    assert_eq!(
        store
            .snapshot(TEST_NAMESPACE, TEST_SECRET)
            .and_then(|d| d.get(JWKS_FIELD).map(str::to_string)),
        Some(r#"{"keys": "nope"}"#.to_string())
    );
}
