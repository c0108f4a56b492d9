//! Content hashing for cache keys.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::sql::Statement;

/// SHA-256 of a value's JSON serialization, as 64 lowercase hex chars.
pub fn compute_hash<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(value)?;
    Ok(digest(json.as_bytes()))
}

/// Cache key for a statement: text and bound parameters together.
pub fn statement_key(statement: &Statement) -> String {
    compute_hash(statement).unwrap_or_else(|_| digest(format!("{:?}", statement).as_bytes()))
}

fn digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
