//! Rotation cycles against an in-memory store
//!
//! Validates bound, recency and eviction order across consecutive cycles,
//! and the public/private split of what gets written.

use jwks_rotator::models::{JwkParams, JwsAlgorithm, KeyAlgorithm, OkpCurve, JWKS_FIELD};
use jwks_rotator::services::rotation_service::Rotator;
use jwks_rotator::store::mock::InMemorySecretStore;
use jwks_rotator::store::SecretData;
use rotator_test_utils::*;
use serde_json::{json, Value};
use std::sync::Arc;

fn rotator_for(
    store: &Arc<InMemorySecretStore>,
    algorithm: KeyAlgorithm,
    max_keys: usize,
) -> Rotator {
    Rotator::new(
        test_config(algorithm, max_keys),
        store.clone(),
        Arc::new(SteppingClock::default()),
    )
}

#[tokio::test]
async fn test_consecutive_cycles_slide_the_window() -> Result<(), anyhow::Error> {
    let store = Arc::new(seeded_store(&jwks_with(&[])));
    let rotator = rotator_for(&store, KeyAlgorithm::Ed25519, 2);

    let k1 = rotator.rotate().await?.key_id;
    stored_jwks(&store).assert_kids(&[k1.as_str()]);

    let k2 = rotator.rotate().await?.key_id;
    stored_jwks(&store).assert_kids(&[k2.as_str(), k1.as_str()]);

    let report = rotator.rotate().await?;
    let k3 = report.key_id.clone();
    stored_jwks(&store)
        .assert_kids(&[k3.as_str(), k2.as_str()])
        .assert_public_only()
        .assert_unique_kids();
    assert_eq!(report.evicted_kids, vec![k1]);

    Ok(())
}

#[tokio::test]
async fn test_bound_holds_for_every_cycle() -> Result<(), anyhow::Error> {
    for max_keys in 1..=4 {
        let store = Arc::new(seeded_store(&jwks_with(&[])));
        let rotator = rotator_for(&store, KeyAlgorithm::Ed25519, max_keys);

        for cycle in 1..=6usize {
            let report = rotator.rotate().await?;
            stored_jwks(&store)
                .assert_key_count(cycle.min(max_keys))
                .assert_newest_kid(&report.key_id);
        }
    }

    Ok(())
}

#[tokio::test]
async fn test_existing_keys_are_kept_behind_new_key() -> Result<(), anyhow::Error> {
    let store = Arc::new(seeded_store(&jwks_with(&["older", "oldest"])));
    let rotator = rotator_for(&store, KeyAlgorithm::Ed25519, 3);

    let report = rotator.rotate().await?;

    stored_jwks(&store).assert_kids(&[report.key_id.as_str(), "older", "oldest"]);
    assert!(!report.bootstrapped);
    assert!(report.evicted_kids.is_empty());
    assert_eq!(store.create_calls(), 0);

    Ok(())
}

#[tokio::test]
async fn test_manifest_tracks_newest_key() -> Result<(), anyhow::Error> {
    let store = Arc::new(seeded_store(&jwks_with(&["older"])));
    let rotator = rotator_for(&store, KeyAlgorithm::Ed25519, 2);

    let report = rotator.rotate().await?;

    let manifest = stored_manifest(&store);
    assert_eq!(manifest["keyId"], report.key_id.as_str());
    assert_eq!(manifest["algorithm"], "ed25519");
    assert!(manifest["content"]
        .as_str()
        .unwrap_or_default()
        .contains("BEGIN PRIVATE KEY"));

    Ok(())
}

#[tokio::test]
async fn test_ed448_cycle_publishes_okp_key() -> Result<(), anyhow::Error> {
    let store = Arc::new(seeded_store(&jwks_with(&[])));
    let rotator = rotator_for(&store, KeyAlgorithm::Ed448, 2);

    rotator.rotate().await?;

    let jwks = stored_jwks(&store);
    jwks.assert_all_alg(JwsAlgorithm::EdDSA).assert_public_only();
    match &jwks.keys.first().ok_or_else(|| anyhow::anyhow!("no key"))?.params {
        JwkParams::Okp { crv, x } => {
            assert_eq!(*crv, OkpCurve::Ed448);
            // 57-byte point, unpadded base64url
            assert_eq!(x.len(), 76);
        }
        other => anyhow::bail!("expected OKP parameters, got {:?}", other),
    }

    Ok(())
}

#[tokio::test]
async fn test_rsa_4096_cycle_publishes_rs512() -> Result<(), anyhow::Error> {
    let store = Arc::new(seeded_store(&jwks_with(&[])));
    let rotator = rotator_for(&store, KeyAlgorithm::Rsa4096, 2);

    rotator.rotate().await?;

    let jwks = stored_jwks(&store);
    jwks.assert_all_alg(JwsAlgorithm::RS512).assert_public_only();
    match &jwks.keys.first().ok_or_else(|| anyhow::anyhow!("no key"))?.params {
        JwkParams::Rsa { n, e } => {
            // 512-byte modulus, unpadded base64url
            assert_eq!(n.len(), 683);
            assert_eq!(e, "AQAB");
        }
        other => anyhow::bail!("expected RSA parameters, got {:?}", other),
    }

    Ok(())
}

/// Store holding a JWKS written by some other tool, verbatim
fn store_with_raw_keys(keys: Value) -> InMemorySecretStore {
    InMemorySecretStore::with_secret(
        TEST_NAMESPACE,
        TEST_SECRET,
        SecretData::new().with(JWKS_FIELD, json!({ "keys": keys }).to_string()),
    )
}

/// Stored `keys` array as raw JSON
fn stored_raw_keys(store: &InMemorySecretStore) -> Result<Value, anyhow::Error> {
    let data = store
        .snapshot(TEST_NAMESPACE, TEST_SECRET)
        .ok_or_else(|| anyhow::anyhow!("secret missing"))?;
    let jwks: Value = serde_json::from_str(
        data.get(JWKS_FIELD)
            .ok_or_else(|| anyhow::anyhow!("jwks field missing"))?,
    )?;
    Ok(jwks["keys"].clone())
}

#[tokio::test]
async fn test_retained_keys_keep_every_member() -> Result<(), anyhow::Error> {
    let seeded = json!({
        "kty": "OKP",
        "crv": "Ed448",
        "x": "abc",
        "kid": "old",
        "alg": "EdDSA",
        "key_ops": ["verify"],
        "x5t": "thumb",
    });
    let store = Arc::new(store_with_raw_keys(json!([seeded.clone()])));
    let rotator = rotator_for(&store, KeyAlgorithm::Ed448, 3);

    let report = rotator.rotate().await?;

    let keys = stored_raw_keys(&store)?;
    assert_eq!(keys.as_array().map(Vec::len), Some(2));
    assert_eq!(keys[0]["kid"], report.key_id.as_str());
    assert_eq!(keys[1], seeded);

    // A second cycle round-trips the same entry again
    rotator.rotate().await?;
    let keys = stored_raw_keys(&store)?;
    assert_eq!(keys[2]["x5t"], "thumb");
    assert_eq!(keys[2]["key_ops"], json!(["verify"]));

    Ok(())
}

#[tokio::test]
async fn test_key_with_other_alg_does_not_block_rotation() -> Result<(), anyhow::Error> {
    let seeded = json!({
        "kty": "RSA",
        "n": "sXch",
        "e": "AQAB",
        "kid": "legacy",
        "alg": "RS384",
        "use": "sig",
    });
    let store = Arc::new(store_with_raw_keys(json!([seeded.clone()])));
    let rotator = rotator_for(&store, KeyAlgorithm::Ed25519, 2);

    let report = rotator.rotate().await?;

    let keys = stored_raw_keys(&store)?;
    assert_eq!(keys[0]["kid"], report.key_id.as_str());
    assert_eq!(keys[1], seeded);

    // Evicted like any other key once the window moves past it
    let next = rotator.rotate().await?;
    assert_eq!(next.evicted_kids, vec!["legacy".to_string()]);

    Ok(())
}
