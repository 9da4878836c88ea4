//! Full rotation cycles over HTTP against a mock Kubernetes API server

use jwks_rotator::models::{Jwks, KeyAlgorithm, JWKS_FIELD, MANIFEST_FIELD};
use jwks_rotator::services::rotation_service::{CycleOutcome, Rotator};
use jwks_rotator::store::StoreError;
use rotator_test_utils::*;
use std::sync::Arc;

fn rotator_for(api: &KubeApiMock, max_keys: usize) -> Rotator {
    Rotator::new(
        test_config(KeyAlgorithm::Ed25519, max_keys),
        Arc::new(api.store()),
        Arc::new(SteppingClock::default()),
    )
}

fn published(api: &KubeApiMock) -> Result<Jwks, anyhow::Error> {
    let data = api
        .secret_data()
        .ok_or_else(|| anyhow::anyhow!("secret missing"))?;
    let raw = data
        .get(JWKS_FIELD)
        .ok_or_else(|| anyhow::anyhow!("jwks field missing"))?;
    Ok(serde_json::from_str(raw)?)
}

#[tokio::test]
async fn test_first_run_bootstraps_over_http() -> Result<(), anyhow::Error> {
    let api = KubeApiMock::start().await;

    let report = rotator_for(&api, 2).rotate().await?;

    assert!(report.bootstrapped);
    assert_eq!(api.requests(), vec!["GET", "POST", "PATCH"]);
    published(&api)?
        .assert_kids(&[report.key_id.as_str()])
        .assert_public_only();

    let data = api
        .secret_data()
        .ok_or_else(|| anyhow::anyhow!("secret missing"))?;
    let manifest: serde_json::Value = serde_json::from_str(
        data.get(MANIFEST_FIELD)
            .ok_or_else(|| anyhow::anyhow!("manifest missing"))?,
    )?;
    assert_eq!(manifest["keyId"], report.key_id.as_str());

    Ok(())
}

#[tokio::test]
async fn test_three_runs_over_http_keep_two_keys() -> Result<(), anyhow::Error> {
    let api = KubeApiMock::start().await;
    let rotator = rotator_for(&api, 2);

    let k1 = rotator.rotate().await?.key_id;
    let k2 = rotator.rotate().await?.key_id;
    let k3 = rotator.rotate().await?.key_id;

    published(&api)?.assert_kids(&[k3.as_str(), k2.as_str()]);
    assert_ne!(k1, k3);
    assert_eq!(
        api.requests(),
        vec!["GET", "POST", "PATCH", "GET", "PATCH", "GET", "PATCH"]
    );

    Ok(())
}

#[tokio::test]
async fn test_unrelated_fields_survive_patch() -> Result<(), anyhow::Error> {
    let seed = secret_data_for(&jwks_with(&["k1"])).with("ca.crt", "keep-me");
    let api = KubeApiMock::with_secret(&seed).await;

    rotator_for(&api, 3).rotate().await?;

    let data = api
        .secret_data()
        .ok_or_else(|| anyhow::anyhow!("secret missing"))?;
    assert_eq!(data.get("ca.crt"), Some("keep-me"));
    assert_eq!(published(&api)?.keys.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_rejected_patch_over_http_is_reported() -> Result<(), anyhow::Error> {
    let api = KubeApiMock::with_secret(&secret_data_for(&jwks_with(&["k1"]))).await;
    api.fail_patches(403, "Forbidden", "cannot patch resource \"secrets\"")
        .await;

    let outcome = rotator_for(&api, 2).run_cycle().await?;

    match outcome {
        CycleOutcome::WriteFailed(StoreError::Api {
            status,
            message,
            body,
        }) => {
            assert_eq!(status, 403);
            assert_eq!(message, "cannot patch resource \"secrets\"");
            assert!(body.contains("Forbidden"));
        }
        other => anyhow::bail!("expected write failure, got {:?}", other),
    }
    published(&api)?.assert_kids(&["k1"]);

    Ok(())
}

#[tokio::test]
async fn test_forbidden_read_over_http_fails_cycle() -> Result<(), anyhow::Error> {
    let api = KubeApiMock::start().await;
    api.fail_gets(403, "Forbidden", "cannot get resource \"secrets\"")
        .await;

    let result = rotator_for(&api, 2).run_cycle().await;

    assert!(result.is_err());
    assert!(api.secret_data().is_none());

    Ok(())
}
