//! Raw evaluation payload → canonical [`EvalRun`].
//!
//! Each known payload shape is detected from marker keys and handed to one
//! extractor that never fails part-way: every optional field is defaulted.
//! Normalization is pure; ingestion time arrives in [`IngestContext`] and the
//! id is assigned later by the store.

mod batch;
pub(crate) mod fields;
mod flat;
mod metrics;
mod nested;
pub mod verdicts;

use crate::errors::UnrecognizedSchema;
use crate::fingerprint::payload_digest;
use crate::model::{EvalRun, SchemaKind, SourceInfo};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const FLAT_STAGE_KEYS: &[&str] = &[
    "deepeval_input",
    "deepeval_result",
    "ollama_request",
    "ollama_response",
    "gemini_request",
    "gemini_response",
];

const NESTED_STAGE_KEYS: &[&str] = &["student_sut", "teacher_judge", "deepeval_analytics"];

/// Facts about the ingestion call that the payload itself may not carry.
#[derive(Debug, Clone)]
pub struct IngestContext {
    pub received_at: DateTime<Utc>,
    /// File name of the upload, if any. Batch payloads encode their run date here.
    pub source_name: Option<String>,
}

impl IngestContext {
    pub fn now(source_name: Option<&str>) -> Self {
        Self::at(Utc::now(), source_name)
    }

    pub fn at(received_at: DateTime<Utc>, source_name: Option<&str>) -> Self {
        Self {
            received_at,
            source_name: source_name.map(str::to_string),
        }
    }
}

/// Fallback model names used when a payload does not say which models ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeDefaults {
    pub nested_agent: String,
    pub nested_judge: String,
    pub flat_agent: String,
    pub flat_judge: String,
    pub batch_agent: String,
    pub batch_judge: String,
}

impl Default for NormalizeDefaults {
    fn default() -> Self {
        Self {
            nested_agent: "llama3.2:1b".into(),
            nested_judge: "gemini".into(),
            flat_agent: "llama3.2:1b".into(),
            flat_judge: "gemini".into(),
            batch_agent: "qwen3:4b (Thinking)".into(),
            batch_judge: "Gemini 2.5 Flash".into(),
        }
    }
}

impl SchemaKind {
    /// Detection order matters: a nested build result may also carry flat
    /// keys at the top level, and a batch file is identified before the
    /// looser flat test-case shape.
    pub fn detect(raw: &Value) -> Option<SchemaKind> {
        let obj = raw.as_object()?;

        if let Some(pipeline) = obj.get("pipeline").and_then(Value::as_object) {
            if NESTED_STAGE_KEYS.iter().any(|k| pipeline.contains_key(*k)) {
                return Some(SchemaKind::NestedPipeline);
            }
        }

        if obj.get("testCases").is_some_and(Value::is_array) {
            return Some(SchemaKind::TestCaseBatch);
        }

        let has_stage_key = FLAT_STAGE_KEYS.iter().any(|k| obj.contains_key(*k));
        let has_test_case_output = ["actual_output", "actualOutput"]
            .iter()
            .any(|k| obj.contains_key(*k));
        if has_stage_key || has_test_case_output {
            return Some(SchemaKind::FlatStages);
        }

        None
    }
}

pub fn normalize(
    raw: &Value,
    ctx: &IngestContext,
    defaults: &NormalizeDefaults,
) -> Result<EvalRun, UnrecognizedSchema> {
    let kind = SchemaKind::detect(raw).ok_or_else(|| UnrecognizedSchema::from_value(raw))?;
    let run = match kind {
        SchemaKind::NestedPipeline => nested::extract(raw, ctx, defaults),
        SchemaKind::FlatStages => flat::extract(raw, ctx, defaults),
        SchemaKind::TestCaseBatch => batch::extract(raw, ctx, defaults),
    };
    Ok(run)
}

fn source_info(kind: SchemaKind, raw: &Value, ctx: &IngestContext, batch_size: u32) -> SourceInfo {
    SourceInfo {
        schema: kind,
        file_name: ctx.source_name.clone(),
        payload_sha256: payload_digest(raw),
        batch_size,
    }
}
