use crate::stable_json::stable_json_bytes;
use serde_json::Value;
use sha2::{Digest, Sha256};

pub fn stable_hash_hex(value: &Value) -> serde_json::Result<String> {
    let bytes = stable_json_bytes(value)?;
    let digest = Sha256::digest(bytes);
    Ok(format!("{digest:x}"))
}

/// Content fingerprint of a fetched record set, `_id` included: a catalog that only
/// re-keys its records gets a new fingerprint.
pub fn fingerprint_records(records: &[Value]) -> serde_json::Result<String> {
    stable_hash_hex(&Value::Array(records.to_vec()))
}

#[cfg(test)]
#[path = "stable_hash_test.rs"]
mod tests;
