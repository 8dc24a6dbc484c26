//! Canonical encodings shared by hashing, the wire, and the store.
//!
//! Canonical JSON is UTF-8, keys sorted, compact separators, rationals as
//! their canonical strings. Sorting falls out of routing every value through
//! `serde_json::Value`, whose object representation is a `BTreeMap` (the
//! `preserve_order` feature must stay off).

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::LedgerError;

/// Hex-encoded SHA-256 digest of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Raw SHA-256 digest of `data`.
pub fn sha256_bytes(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Serialize `value` to canonical JSON.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, LedgerError> {
    let v = serde_json::to_value(value).map_err(|e| LedgerError::Serialization(e.to_string()))?;
    Ok(v.to_string())
}
