//! Cache key derivation.
//!
//! A key identifies one `(url, request body)` pair and names its entry
//! folder on disk. The digest algorithm and truncation length are part of
//! the on-disk format: changing either orphans every existing entry.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Hex length of a cache key (truncated SHA-256).
pub const KEY_LEN: usize = 16;

/// Derive the cache key for a request.
///
/// SHA-256 over the UTF-8 bytes of `url` followed by the compact JSON
/// serialization of the normalized body, truncated to the first 16 lowercase
/// hex characters. Deterministic across process runs and machines.
pub fn derive_key(url: &str, body: &Value) -> String {
    let normalized = normalize_body(body);
    let canonical =
        serde_json::to_string(&normalized).expect("JSON value serialization cannot fail");
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hasher.update(canonical.as_bytes());
    let mut hex = hex::encode(hasher.finalize());
    hex.truncate(KEY_LEN);
    hex
}

/// Normalization hook applied to the body before hashing.
///
/// Currently the identity transform: object fields are copied in iteration
/// order. The hook exists so volatile fields (request IDs, client
/// timestamps) can later be stripped to raise hit rates without touching
/// the storage format.
pub fn normalize_body(body: &Value) -> Value {
    match body {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
        other => other.clone(),
    }
}
