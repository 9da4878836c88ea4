use crate::models::{Jwks, PublicKeyEntry};
use std::num::NonZeroUsize;

/// Result of merging a new key into a JWKS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeResult {
    /// Updated set, most recent first, at most `max_keys` long
    pub jwks: Jwks,
    /// Entries dropped from the tail, most recent first
    pub evicted: Vec<PublicKeyEntry>,
}

/// Insert `new_key` at the head of `existing` and keep the `max_keys` most
/// recent entries.
///
/// Pure and deterministic. Does not deduplicate `kid`s; unique identifiers
/// are the generator's responsibility.
pub fn merge(existing: Jwks, new_key: PublicKeyEntry, max_keys: NonZeroUsize) -> MergeResult {
    let mut keys = Vec::with_capacity(existing.keys.len() + 1);
    keys.push(new_key);
    keys.extend(existing.keys);

    let evicted = if keys.len() > max_keys.get() {
        keys.split_off(max_keys.get())
    } else {
        Vec::new()
    };

    MergeResult {
        jwks: Jwks { keys },
        evicted,
    }
}
