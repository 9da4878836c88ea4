//! Custom test assertions for expressive tests
//!
//! Provides trait-based assertions over a published JWKS.

use jwks_rotator::models::{JwkParams, Jwks, JwsAlgorithm, PRIVATE_JWK_MEMBERS};

/// Custom assertions for a JWKS
///
/// # Example
/// ```rust,ignore
/// jwks.assert_key_count(2)
///     .assert_newest_kid(&report.key_id)
///     .assert_public_only();
/// ```
pub trait JwksAssertions {
    /// Assert the number of published keys
    fn assert_key_count(&self, expected: usize) -> &Self;

    /// Assert the exact kid order, most recent first
    fn assert_kids(&self, expected: &[&str]) -> &Self;

    /// Assert the head of the set
    fn assert_newest_kid(&self, kid: &str) -> &Self;

    /// Assert that no entry carries private key members
    fn assert_public_only(&self) -> &Self;

    /// Assert every entry advertises `alg`
    fn assert_all_alg(&self, alg: JwsAlgorithm) -> &Self;

    /// Assert kids are pairwise distinct
    fn assert_unique_kids(&self) -> &Self;
}

impl JwksAssertions for Jwks {
    fn assert_key_count(&self, expected: usize) -> &Self {
        assert_eq!(
            self.keys.len(),
            expected,
            "Expected {} keys, got {:?}",
            expected,
            self.kids()
        );
        self
    }

    fn assert_kids(&self, expected: &[&str]) -> &Self {
        let actual: Vec<&str> = self.keys.iter().map(|k| k.kid.as_str()).collect();
        assert_eq!(actual, expected, "Unexpected key order");
        self
    }

    fn assert_newest_kid(&self, kid: &str) -> &Self {
        let head = self.keys.first().map(|k| k.kid.as_str());
        assert_eq!(head, Some(kid), "Expected newest key {}", kid);
        self
    }

    fn assert_public_only(&self) -> &Self {
        let json = serde_json::to_value(self).expect("JWKS should serialize");
        let keys = json["keys"].as_array().expect("keys array");
        for key in keys {
            let obj = key.as_object().expect("JWK object");
            for member in PRIVATE_JWK_MEMBERS {
                assert!(
                    !obj.contains_key(member),
                    "JWK {} exposes private member {:?}",
                    obj.get("kid").and_then(|v| v.as_str()).unwrap_or("?"),
                    member
                );
            }
        }
        for entry in &self.keys {
            match &entry.params {
                JwkParams::Rsa { n, e } => {
                    assert!(!n.is_empty() && !e.is_empty(), "Empty RSA parameters");
                }
                JwkParams::Okp { x, .. } => {
                    assert!(!x.is_empty(), "Empty OKP public point");
                }
            }
        }
        self
    }

    fn assert_all_alg(&self, alg: JwsAlgorithm) -> &Self {
        for entry in &self.keys {
            assert_eq!(
                entry.alg, alg,
                "Key {} has alg {}, expected {}",
                entry.kid,
                entry.alg.as_str(),
                alg.as_str()
            );
        }
        self
    }

    fn assert_unique_kids(&self) -> &Self {
        let mut kids = self.kids();
        kids.sort();
        kids.dedup();
        assert_eq!(kids.len(), self.keys.len(), "Duplicate kids in {:?}", self.kids());
        self
    }
}
