//! Error taxonomy for ingestion, storage and configuration.

use thiserror::Error;

/// A raw payload matched none of the known evaluation-result shapes.
///
/// This is the only failure mode of the normalizer. Nothing has been
/// persisted when it is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized evaluation schema (top-level keys: [{}])", .top_level_keys.join(", "))]
pub struct UnrecognizedSchema {
    pub top_level_keys: Vec<String>,
}

impl UnrecognizedSchema {
    pub fn from_value(raw: &serde_json::Value) -> Self {
        let top_level_keys = match raw.as_object() {
            Some(obj) => obj.keys().cloned().collect(),
            None => vec![format!("<{}>", json_kind(raw))],
        };
        Self { top_level_keys }
    }
}

/// Errors surfaced synchronously to whoever invoked ingestion.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    UnrecognizedSchema(#[from] UnrecognizedSchema),

    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("failed to persist record: {0:#}")]
    Storage(anyhow::Error),
}

impl IngestError {
    pub fn is_unrecognized(&self) -> bool {
        matches!(self, IngestError::UnrecognizedSchema(_))
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// Only reachable with `IdStrategy::WallClock`: two writes landed on the same millisecond.
    #[error("record id {0} already exists")]
    DuplicateId(i64),

    #[error("store lock poisoned")]
    LockPoisoned,
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct ConfigError(pub String);

fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
