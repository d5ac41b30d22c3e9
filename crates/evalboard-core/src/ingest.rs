use crate::errors::IngestError;
use crate::model::SchemaKind;
use crate::normalize::{normalize, IngestContext, NormalizeDefaults};
use crate::storage::RecordStore;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// What the caller gets back for an accepted payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReceipt {
    pub id: i64,
    pub schema: SchemaKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_status: Option<String>,
}

/// Normalize-then-persist. A payload is either stored whole or not at all.
#[derive(Clone)]
pub struct Ingestor {
    store: Arc<dyn RecordStore>,
    defaults: NormalizeDefaults,
}

impl Ingestor {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self::with_defaults(store, NormalizeDefaults::default())
    }

    pub fn with_defaults(store: Arc<dyn RecordStore>, defaults: NormalizeDefaults) -> Self {
        Self { store, defaults }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn ingest(&self, raw: &Value, source_name: Option<&str>) -> Result<IngestReceipt, IngestError> {
        self.ingest_with(raw, IngestContext::now(source_name))
    }

    pub fn ingest_with(&self, raw: &Value, ctx: IngestContext) -> Result<IngestReceipt, IngestError> {
        let run = match normalize(raw, &ctx, &self.defaults) {
            Ok(run) => run,
            Err(e) => {
                tracing::warn!(
                    event = "evalboard.ingest.rejected",
                    source = ctx.source_name.as_deref().unwrap_or("-"),
                    keys = ?e.top_level_keys,
                    "unrecognized evaluation schema"
                );
                return Err(e.into());
            }
        };

        let id = self.store.put(&run).map_err(IngestError::Storage)?;
        tracing::info!(
            event = "evalboard.ingest.accepted",
            id,
            schema = %run.source.schema,
            source = ctx.source_name.as_deref().unwrap_or("-"),
            score = run.score,
            agent = %run.agent,
        );

        Ok(IngestReceipt {
            id,
            schema: run.source.schema,
            file_name: run.source.file_name,
            build_id: run.build_id,
            overall_status: run.overall_status,
        })
    }

    /// Like [`Ingestor::ingest`], for payloads that have not been parsed yet.
    pub fn ingest_str(&self, body: &str, source_name: Option<&str>) -> Result<IngestReceipt, IngestError> {
        let raw: Value = serde_json::from_str(body)?;
        self.ingest(&raw, source_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;
    use serde_json::json;

    fn ingestor() -> Ingestor {
        Ingestor::new(Arc::new(SqliteStore::memory().unwrap()))
    }

    #[test]
    fn accepted_payload_returns_receipt() {
        let ing = ingestor();
        let receipt = ing
            .ingest(
                &json!({"build_id": "b1", "overall_status": "PASSED",
                        "pipeline": {"student_sut": {"model": "llama3.2:1b"}}}),
                Some("build.json"),
            )
            .unwrap();
        assert_eq!(receipt.schema, SchemaKind::NestedPipeline);
        assert_eq!(receipt.build_id.as_deref(), Some("b1"));
        assert_eq!(receipt.file_name.as_deref(), Some("build.json"));
        assert_eq!(ing.store().count().unwrap(), 1);
    }

    #[test]
    fn rejected_payload_persists_nothing() {
        let ing = ingestor();
        let err = ing.ingest(&json!({"hello": "world"}), None).unwrap_err();
        assert!(err.is_unrecognized());
        assert_eq!(ing.store().count().unwrap(), 0);
    }

    #[test]
    fn invalid_json_text() {
        let err = ingestor().ingest_str("{not json", None).unwrap_err();
        assert!(matches!(err, IngestError::InvalidJson(_)));
    }
}
