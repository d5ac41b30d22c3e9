use sha2::{Digest, Sha256};

pub fn sha256_hex(s: &str) -> String {
    let mut h = Sha256::new();
    h.update(s.as_bytes());
    hex::encode(h.finalize())
}

/// Digest of a raw ingestion payload.
///
/// serde_json serializes object keys in sorted order, so two uploads that
/// differ only in key order or whitespace share a digest.
pub fn payload_digest(raw: &serde_json::Value) -> String {
    let canonical = serde_json::to_string(raw).unwrap_or_default();
    sha256_hex(&canonical)
}
