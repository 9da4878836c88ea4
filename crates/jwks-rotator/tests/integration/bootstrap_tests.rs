//! First-run behavior when the secret does not exist yet

use jwks_rotator::models::{KeyAlgorithm, JWKS_FIELD, MANIFEST_FIELD};
use jwks_rotator::repositories::jwks_secret;
use jwks_rotator::services::rotation_service::Rotator;
use jwks_rotator::store::mock::InMemorySecretStore;
use rotator_test_utils::*;
use std::sync::Arc;

#[tokio::test]
async fn test_first_cycle_creates_then_patches() -> Result<(), anyhow::Error> {
    let store = Arc::new(InMemorySecretStore::new());
    let rotator = Rotator::new(
        test_config(KeyAlgorithm::Ed25519, 2),
        store.clone(),
        Arc::new(FixedClock::default()),
    );

    let report = rotator.rotate().await?;

    assert!(report.bootstrapped);
    assert_eq!(store.get_calls(), 1);
    assert_eq!(store.create_calls(), 1);
    assert_eq!(store.patch_calls(), 1);
    stored_jwks(&store)
        .assert_key_count(1)
        .assert_newest_kid(&report.key_id);

    Ok(())
}

#[tokio::test]
async fn test_bootstrap_record_is_empty_set_and_manifest() -> Result<(), anyhow::Error> {
    let store = InMemorySecretStore::new();

    let loaded = jwks_secret::load_jwks(&store, TEST_NAMESPACE, TEST_SECRET).await?;

    assert!(loaded.bootstrapped);
    loaded.jwks.assert_key_count(0);
    let created = store
        .snapshot(TEST_NAMESPACE, TEST_SECRET)
        .ok_or_else(|| anyhow::anyhow!("secret was not created"))?;
    assert_eq!(created.get(JWKS_FIELD), Some(r#"{"keys":[]}"#));
    assert_eq!(created.get(MANIFEST_FIELD), Some("{}"));

    Ok(())
}

#[tokio::test]
async fn test_second_cycle_does_not_create_again() -> Result<(), anyhow::Error> {
    let store = Arc::new(InMemorySecretStore::new());
    let rotator = Rotator::new(
        test_config(KeyAlgorithm::Ed25519, 2),
        store.clone(),
        Arc::new(SteppingClock::default()),
    );

    rotator.rotate().await?;
    let second = rotator.rotate().await?;

    assert!(!second.bootstrapped);
    assert_eq!(store.create_calls(), 1);
    assert_eq!(store.patch_calls(), 2);

    Ok(())
}

#[tokio::test]
async fn test_secret_in_other_namespace_is_not_used() -> Result<(), anyhow::Error> {
    let store = Arc::new(InMemorySecretStore::with_secret(
        "other",
        TEST_SECRET,
        secret_data_for(&jwks_with(&["foreign"])),
    ));
    let rotator = Rotator::new(
        test_config(KeyAlgorithm::Ed25519, 2),
        store.clone(),
        Arc::new(FixedClock::default()),
    );

    let report = rotator.rotate().await?;

    assert!(report.bootstrapped);
    stored_jwks(&store).assert_kids(&[report.key_id.as_str()]);
    let untouched = store
        .snapshot("other", TEST_SECRET)
        .ok_or_else(|| anyhow::anyhow!("foreign secret vanished"))?;
    assert_eq!(untouched, secret_data_for(&jwks_with(&["foreign"])));

    Ok(())
}
