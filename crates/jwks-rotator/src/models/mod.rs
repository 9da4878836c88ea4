use common::secret::{serialize_exposed, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Secret field holding the public JWKS document
pub const JWKS_FIELD: &str = "jwks.json";

/// Secret field holding the most recent private key manifest
pub const MANIFEST_FIELD: &str = "private-key-manifest.json";

/// Signing key algorithm selected by configuration
///
/// Closed set: adding a variant forces [`KeyAlgorithm::family`] and
/// [`KeyAlgorithm::jwk_alg`] (and the generator dispatch in `crypto`) to be
/// updated together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyAlgorithm {
    #[serde(rename = "rsa-2048")]
    Rsa2048,
    #[serde(rename = "rsa-4096")]
    Rsa4096,
    #[serde(rename = "ed25519")]
    Ed25519,
    #[serde(rename = "ed448")]
    Ed448,
}

/// Key type and fixed parameters of a [`KeyAlgorithm`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFamily {
    Rsa { modulus_bits: usize },
    Okp { curve: OkpCurve },
}

impl KeyAlgorithm {
    pub const ALL: [KeyAlgorithm; 4] = [
        KeyAlgorithm::Rsa2048,
        KeyAlgorithm::Rsa4096,
        KeyAlgorithm::Ed25519,
        KeyAlgorithm::Ed448,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyAlgorithm::Rsa2048 => "rsa-2048",
            KeyAlgorithm::Rsa4096 => "rsa-4096",
            KeyAlgorithm::Ed25519 => "ed25519",
            KeyAlgorithm::Ed448 => "ed448",
        }
    }

    pub fn family(&self) -> KeyFamily {
        match self {
            KeyAlgorithm::Rsa2048 => KeyFamily::Rsa { modulus_bits: 2048 },
            KeyAlgorithm::Rsa4096 => KeyFamily::Rsa { modulus_bits: 4096 },
            KeyAlgorithm::Ed25519 => KeyFamily::Okp {
                curve: OkpCurve::Ed25519,
            },
            KeyAlgorithm::Ed448 => KeyFamily::Okp {
                curve: OkpCurve::Ed448,
            },
        }
    }

    /// JWK `alg` label for keys of this algorithm
    pub fn jwk_alg(&self) -> JwsAlgorithm {
        match self {
            KeyAlgorithm::Rsa2048 => JwsAlgorithm::RS256,
            KeyAlgorithm::Rsa4096 => JwsAlgorithm::RS512,
            KeyAlgorithm::Ed25519 | KeyAlgorithm::Ed448 => JwsAlgorithm::EdDSA,
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeyAlgorithm::ALL
            .into_iter()
            .find(|alg| alg.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "unknown key algorithm '{}', expected one of rsa-2048, rsa-4096, ed25519, ed448",
                    s
                )
            })
    }
}

/// JWS algorithm label carried in the JWK `alg` member
///
/// Keys generated here always carry one of the named labels. `Other` holds
/// any label found on a key loaded from the secret, which is kept unchanged
/// until it is evicted.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JwsAlgorithm {
    RS256,
    RS512,
    EdDSA,
    Other(String),
}

impl JwsAlgorithm {
    pub fn as_str(&self) -> &str {
        match self {
            JwsAlgorithm::RS256 => "RS256",
            JwsAlgorithm::RS512 => "RS512",
            JwsAlgorithm::EdDSA => "EdDSA",
            JwsAlgorithm::Other(label) => label,
        }
    }
}

impl From<String> for JwsAlgorithm {
    fn from(label: String) -> Self {
        match label.as_str() {
            "RS256" => JwsAlgorithm::RS256,
            "RS512" => JwsAlgorithm::RS512,
            "EdDSA" => JwsAlgorithm::EdDSA,
            _ => JwsAlgorithm::Other(label),
        }
    }
}

impl From<JwsAlgorithm> for String {
    fn from(alg: JwsAlgorithm) -> Self {
        match alg {
            JwsAlgorithm::Other(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

/// Edwards curve of an OKP key (RFC 8037)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OkpCurve {
    Ed25519,
    Ed448,
}

impl OkpCurve {
    /// Raw public key length in bytes
    pub fn public_key_len(&self) -> usize {
        match self {
            OkpCurve::Ed25519 => 32,
            OkpCurve::Ed448 => 57,
        }
    }
}

/// Public JWK parameters, tagged by `kty`
///
/// Only public members exist here; there is no variant that can carry
/// `d`, `p`, `q`, `dp`, `dq` or `qi`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kty")]
pub enum JwkParams {
    /// RSA public key: modulus and exponent, base64url without padding
    #[serde(rename = "RSA")]
    Rsa { n: String, e: String },
    /// Octet key pair: curve and public point, base64url without padding
    #[serde(rename = "OKP")]
    Okp { crv: OkpCurve, x: String },
}

/// Private JWK members (RFC 7518 section 6); never accepted in a JWKS
pub const PRIVATE_JWK_MEMBERS: [&str; 8] = ["d", "p", "q", "dp", "dq", "qi", "oth", "k"];

/// Public key entry in the JWKS (RFC 7517)
///
/// Members without a typed field (`key_ops`, `x5c`, `x5t`, ...) are kept in
/// `extra` so a loaded entry is written back with every member it had.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct PublicKeyEntry {
    pub kid: String,
    pub alg: JwsAlgorithm,
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_: Option<String>,
    #[serde(flatten)]
    pub params: JwkParams,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn take_string(members: &mut Map<String, Value>, name: &str) -> Result<Option<String>, String> {
    match members.remove(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value)),
        Some(other) => Err(format!("member {} must be a string, got {}", name, other)),
    }
}

fn require_string(members: &mut Map<String, Value>, name: &str) -> Result<String, String> {
    take_string(members, name)?.ok_or_else(|| format!("missing member {}", name))
}

impl TryFrom<Map<String, Value>> for PublicKeyEntry {
    type Error = String;

    fn try_from(mut members: Map<String, Value>) -> Result<Self, Self::Error> {
        if let Some(private) = PRIVATE_JWK_MEMBERS
            .iter()
            .find(|name| members.contains_key(**name))
        {
            return Err(format!("entry carries private member {}", private));
        }

        let kid = require_string(&mut members, "kid")?;
        let alg = JwsAlgorithm::from(require_string(&mut members, "alg")?);
        let use_ = take_string(&mut members, "use")?;

        let kty = require_string(&mut members, "kty")?;
        let param_names: [&str; 2] = match kty.as_str() {
            "RSA" => ["n", "e"],
            "OKP" => ["crv", "x"],
            other => return Err(format!("unsupported key type {} for kid {}", other, kid)),
        };
        let mut params = Map::new();
        params.insert("kty".to_string(), Value::String(kty));
        for name in param_names {
            if let Some(value) = members.remove(name) {
                params.insert(name.to_string(), value);
            }
        }
        let params: JwkParams = serde_json::from_value(Value::Object(params))
            .map_err(|e| format!("invalid key parameters for kid {}: {}", kid, e))?;

        Ok(Self {
            kid,
            alg,
            use_,
            params,
            extra: members,
        })
    }
}

/// JWKS document stored in the secret
///
/// Ordered most-recent-first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwks {
    pub keys: Vec<PublicKeyEntry>,
}

impl Jwks {
    pub fn kids(&self) -> Vec<String> {
        self.keys.iter().map(|k| k.kid.clone()).collect()
    }
}

/// Private half of the most recently generated key, persisted next to the JWKS
///
/// `key_id` always equals the `kid` at the head of the JWKS written in the
/// same patch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateKeyManifest {
    pub algorithm: KeyAlgorithm,
    pub key_id: String,
    /// PKCS#8 PEM
    #[serde(serialize_with = "serialize_exposed")]
    pub content: SecretString,
}
