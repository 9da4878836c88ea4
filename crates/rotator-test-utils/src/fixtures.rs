//! Deterministic fixtures for rotation tests

use chrono::{DateTime, Duration, TimeZone, Utc};
use jwks_rotator::clock::Clock;
use jwks_rotator::config::Config;
use jwks_rotator::models::{
    JwkParams, Jwks, JwsAlgorithm, KeyAlgorithm, OkpCurve, PublicKeyEntry, JWKS_FIELD,
    MANIFEST_FIELD,
};
use jwks_rotator::store::mock::InMemorySecretStore;
use jwks_rotator::store::SecretData;
use std::num::NonZeroUsize;
use std::sync::Mutex;

pub const TEST_NAMESPACE: &str = "auth";
pub const TEST_SECRET: &str = "jwt-keys";

/// 2026-03-01T12:00:00Z
pub fn test_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

/// Clock returning a fixed instant
pub struct FixedClock(pub DateTime<Utc>);

impl Default for FixedClock {
    fn default() -> Self {
        Self(test_epoch())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Clock that advances by `step` every time it is read
pub struct SteppingClock {
    now: Mutex<DateTime<Utc>>,
    step: Duration,
}

impl SteppingClock {
    pub fn new(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            now: Mutex::new(start),
            step,
        }
    }
}

impl Default for SteppingClock {
    fn default() -> Self {
        Self::new(test_epoch(), Duration::seconds(1))
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let mut now = self.now.lock().unwrap();
        let current = *now;
        *now = current + self.step;
        current
    }
}

/// Config for the test namespace and secret
pub fn test_config(algorithm: KeyAlgorithm, max_keys: usize) -> Config {
    Config {
        namespace: TEST_NAMESPACE.to_string(),
        secret_name: TEST_SECRET.to_string(),
        max_keys: NonZeroUsize::new(max_keys).expect("max_keys must be positive"),
        key_algorithm: algorithm,
    }
}

/// Placeholder Ed25519 entry; the key material is not a real point
pub fn test_entry(kid: &str) -> PublicKeyEntry {
    PublicKeyEntry {
        kid: kid.to_string(),
        alg: JwsAlgorithm::EdDSA,
        use_: Some("sig".to_string()),
        params: JwkParams::Okp {
            crv: OkpCurve::Ed25519,
            x: "11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo".to_string(),
        },
        extra: serde_json::Map::new(),
    }
}

/// JWKS holding placeholder entries in the given order
pub fn jwks_with(kids: &[&str]) -> Jwks {
    Jwks {
        keys: kids.iter().map(|kid| test_entry(kid)).collect(),
    }
}

/// Secret record as the rotator would have written it
pub fn secret_data_for(jwks: &Jwks) -> SecretData {
    SecretData::new()
        .with(JWKS_FIELD, serde_json::to_string(jwks).unwrap())
        .with(MANIFEST_FIELD, "{}")
}

/// In-memory store already holding `jwks` under the test secret
pub fn seeded_store(jwks: &Jwks) -> InMemorySecretStore {
    InMemorySecretStore::with_secret(TEST_NAMESPACE, TEST_SECRET, secret_data_for(jwks))
}

/// JWKS currently held by the test secret
pub fn stored_jwks(store: &InMemorySecretStore) -> Jwks {
    let data = store
        .snapshot(TEST_NAMESPACE, TEST_SECRET)
        .expect("test secret should exist");
    serde_json::from_str(data.get(JWKS_FIELD).expect("jwks field")).expect("valid JWKS")
}

/// Private key manifest currently held by the test secret, as raw JSON
pub fn stored_manifest(store: &InMemorySecretStore) -> serde_json::Value {
    let data = store
        .snapshot(TEST_NAMESPACE, TEST_SECRET)
        .expect("test secret should exist");
    serde_json::from_str(data.get(MANIFEST_FIELD).expect("manifest field"))
        .expect("valid manifest")
}
