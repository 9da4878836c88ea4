use crate::clock::Clock;
use crate::errors::RotatorError;
use crate::models::{JwkParams, KeyAlgorithm, KeyFamily, OkpCurve, PublicKeyEntry};
use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine as _,
};
use chrono::{DateTime, Utc};
use common::secret::SecretString;
use openssl::pkey::PKey;
use ring::{
    rand::{SecureRandom, SystemRandom},
    signature::{Ed25519KeyPair, KeyPair as _},
};
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use tracing::instrument;

/// Number of CSPRNG bytes in a key identifier (hex encoded, 16 chars).
pub const KEY_ID_RANDOM_BYTES: usize = 8;

/// `use` member set on every key this rotator publishes.
pub const KEY_USE_SIGNATURE: &str = "sig";

/// Public half of a generated key pair.
///
/// Holds only public parameters, so anything that accepts a `PublicKey`
/// cannot leak private material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    /// Big-endian modulus and public exponent
    Rsa { modulus: Vec<u8>, exponent: Vec<u8> },
    /// Encoded curve point
    Okp { curve: OkpCurve, point: Vec<u8> },
}

/// Freshly generated key pair.
///
/// Lives for one rotation cycle. `private_key_pem` is redacted in `Debug`
/// and zeroized on drop.
#[derive(Debug)]
pub struct KeyPair {
    pub algorithm: KeyAlgorithm,
    pub public_key: PublicKey,
    /// PKCS#8 PEM
    pub private_key_pem: SecretString,
}

/// Generate cryptographically secure random bytes
pub fn generate_random_bytes(len: usize) -> Result<Vec<u8>, RotatorError> {
    let rng = SystemRandom::new();
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes).map_err(|e| {
        RotatorError::CryptoUnavailable(format!("Random bytes generation failed: {}", e))
    })?;
    Ok(bytes)
}

/// Build a key identifier from its random and time components.
///
/// Format: hex(random) followed by hex(milliseconds since the Unix epoch).
pub fn format_key_id(random: &[u8], now: DateTime<Utc>) -> String {
    let millis = u64::try_from(now.timestamp_millis()).unwrap_or(0);
    format!("{}{:x}", hex::encode(random), millis)
}

/// Generate a globally unique, unpredictable key identifier.
///
/// The random prefix makes identifiers unguessable; the time suffix keeps
/// them unique across random collisions and roughly sortable for debugging.
#[instrument(skip_all)]
pub fn generate_key_id(clock: &dyn Clock) -> Result<String, RotatorError> {
    let random = generate_random_bytes(KEY_ID_RANDOM_BYTES)?;
    Ok(format_key_id(&random, clock.now()))
}

/// Generate a key pair for `algorithm`.
///
/// Fails with `CryptoUnavailable` when the underlying primitive cannot
/// produce a key. There is no retry: a broken primitive will not recover
/// within the cycle.
#[instrument(skip_all, fields(algorithm = %algorithm))]
pub fn generate_key_pair(algorithm: KeyAlgorithm) -> Result<KeyPair, RotatorError> {
    match algorithm.family() {
        KeyFamily::Rsa { modulus_bits } => generate_rsa(algorithm, modulus_bits),
        KeyFamily::Okp {
            curve: OkpCurve::Ed25519,
        } => generate_ed25519(algorithm),
        KeyFamily::Okp {
            curve: OkpCurve::Ed448,
        } => generate_ed448(algorithm),
    }
}

fn generate_rsa(algorithm: KeyAlgorithm, modulus_bits: usize) -> Result<KeyPair, RotatorError> {
    let mut rng = rand::rngs::OsRng;

    let private_key = RsaPrivateKey::new(&mut rng, modulus_bits).map_err(|e| {
        RotatorError::CryptoUnavailable(format!("RSA-{} keypair generation failed: {}", modulus_bits, e))
    })?;
    let public_key = private_key.to_public_key();

    let private_key_pem = private_key.to_pkcs8_pem(LineEnding::LF).map_err(|e| {
        RotatorError::CryptoUnavailable(format!("PKCS#8 encoding failed: {}", e))
    })?;

    Ok(KeyPair {
        algorithm,
        public_key: PublicKey::Rsa {
            modulus: public_key.n().to_bytes_be(),
            exponent: public_key.e().to_bytes_be(),
        },
        private_key_pem: SecretString::from(private_key_pem.as_str().to_string()),
    })
}

fn generate_ed25519(algorithm: KeyAlgorithm) -> Result<KeyPair, RotatorError> {
    let rng = SystemRandom::new();

    // Generate Ed25519 keypair in PKCS8 format
    let pkcs8_bytes = Ed25519KeyPair::generate_pkcs8(&rng).map_err(|e| {
        RotatorError::CryptoUnavailable(format!("Ed25519 keypair generation failed: {}", e))
    })?;

    let key_pair = Ed25519KeyPair::from_pkcs8(pkcs8_bytes.as_ref()).map_err(|e| {
        RotatorError::CryptoUnavailable(format!("Ed25519 keypair parsing failed: {}", e))
    })?;

    let point = key_pair.public_key().as_ref().to_vec();

    Ok(KeyPair {
        algorithm,
        public_key: PublicKey::Okp {
            curve: OkpCurve::Ed25519,
            point,
        },
        private_key_pem: SecretString::from(pem_encode("PRIVATE KEY", pkcs8_bytes.as_ref())),
    })
}

fn generate_ed448(algorithm: KeyAlgorithm) -> Result<KeyPair, RotatorError> {
    let unavailable =
        |e: openssl::error::ErrorStack| RotatorError::CryptoUnavailable(format!("Ed448: {}", e));

    let pkey = PKey::generate_ed448().map_err(unavailable)?;
    let point = pkey.raw_public_key().map_err(unavailable)?;
    let private_key_pem = pkey.private_key_to_pem_pkcs8().map_err(unavailable)?;

    let private_key_pem = String::from_utf8(private_key_pem).map_err(|e| {
        RotatorError::CryptoUnavailable(format!("Ed448 private PEM is not UTF-8: {}", e))
    })?;

    Ok(KeyPair {
        algorithm,
        public_key: PublicKey::Okp {
            curve: OkpCurve::Ed448,
            point,
        },
        private_key_pem: SecretString::from(private_key_pem),
    })
}

/// Wrap DER bytes in a PEM block with 64-column base64 lines.
fn pem_encode(label: &str, der: &[u8]) -> String {
    let encoded = STANDARD.encode(der);
    let body = encoded
        .as_bytes()
        .chunks(64)
        .map(String::from_utf8_lossy)
        .collect::<Vec<_>>()
        .join("\n");
    format!("-----BEGIN {label}-----\n{body}\n-----END {label}-----\n")
}

/// Convert a public key into public JWK parameters (RFC 7518 / RFC 8037).
pub fn export_public_jwk(public_key: &PublicKey) -> JwkParams {
    match public_key {
        PublicKey::Rsa { modulus, exponent } => JwkParams::Rsa {
            n: URL_SAFE_NO_PAD.encode(modulus),
            e: URL_SAFE_NO_PAD.encode(exponent),
        },
        PublicKey::Okp { curve, point } => JwkParams::Okp {
            crv: *curve,
            x: URL_SAFE_NO_PAD.encode(point),
        },
    }
}

/// Build the JWKS entry for a new key: public parameters plus `kid` and `alg`.
pub fn public_key_entry(
    kid: &str,
    algorithm: KeyAlgorithm,
    public_key: &PublicKey,
) -> PublicKeyEntry {
    PublicKeyEntry {
        kid: kid.to_string(),
        alg: algorithm.jwk_alg(),
        use_: Some(KEY_USE_SIGNATURE.to_string()),
        params: export_public_jwk(public_key),
        extra: serde_json::Map::new(),
    }
}
