use evalboard_core::errors::{IngestError, StoreError};
use evalboard_core::model::SchemaKind;
use evalboard_core::normalize::IngestContext;
use evalboard_core::storage::{IdStrategy, JsonDirStore, RecordStore, SqliteStore};
use evalboard_core::Ingestor;
use serde_json::json;
use std::sync::Arc;

fn nested_payload() -> serde_json::Value {
    json!({
        "build_id": "build-7",
        "overall_status": "FAILED",
        "pipeline": {
            "student_sut": {
                "model": "llama3.2:1b",
                "prompt": "Explain: connection refused",
                "response": "The server is not listening.",
                "duration_seconds": 1.4,
                "metrics": {
                    "duration_ms": 1400,
                    "cpu": {"avg_usage_percent": 35.5, "peak_usage_percent": 80},
                    "ram": {"avg_used_gb": 5.1, "peak_used_gb": 5.6, "total_gb": 32},
                    "snapshots": [
                        {"timestamp": 1000, "cpu": {"usage": 10}, "ram": {"used": 2147483648u64, "percentage": 12.5}},
                        {"timestamp": 1500, "cpu": {"usage": 20}, "ram": {"used": 3221225472u64, "percentage": 18.75}}
                    ]
                }
            },
            "teacher_judge": {"model": "gemini-2.5-flash"},
            "deepeval_analytics": [{
                "metric_name": "AnswerRelevancyMetric",
                "score": 0.5,
                "threshold": 0.6,
                "passed": false,
                "reason": "Too short.",
                "pipeline_flow": {
                    "judge_statements": ["The server is not listening."],
                    "judge_verdicts": [{"verdict": "yes"}, {"verdict": "no"}, {"verdict": "yes"}]
                }
            }]
        }
    })
}

#[test]
fn test_nested_ingest_round_trip() -> anyhow::Result<()> {
    let store: Arc<dyn RecordStore> = Arc::new(SqliteStore::memory()?);
    let ingestor = Ingestor::new(store.clone());

    let receipt = ingestor.ingest(&nested_payload(), Some("build-7.json"))?;
    assert_eq!(receipt.schema, SchemaKind::NestedPipeline);
    assert_eq!(receipt.build_id.as_deref(), Some("build-7"));
    assert_eq!(receipt.overall_status.as_deref(), Some("FAILED"));

    let rec = store.get(receipt.id)?.expect("record was stored");
    assert_eq!(rec.run.agent, "llama3.2:1b");
    assert_eq!(rec.run.judge, "gemini-2.5-flash");
    assert_eq!(rec.run.score, 0.5);
    assert!(!rec.run.passed);
    assert_eq!(rec.run.sut_output, "The server is not listening.");

    let pipeline = rec.run.pipeline.expect("pipeline breakdown");
    let b = pipeline.evaluation.verdict_breakdown;
    assert_eq!((b.yes, b.no, b.idk, b.total), (2, 1, 0, 3));

    let metrics = rec.run.metrics.expect("metrics");
    assert_eq!(metrics.snapshots.len(), 2);
    assert_eq!(metrics.ram.and_then(|r| r.total), Some(32.0));
    Ok(())
}

#[test]
fn test_nested_without_analytics_is_accepted() -> anyhow::Result<()> {
    let store: Arc<dyn RecordStore> = Arc::new(SqliteStore::memory()?);
    let ingestor = Ingestor::new(store.clone());

    let receipt = ingestor.ingest(
        &json!({"pipeline": {"student_sut": {"model": "llama3.2:1b"}}}),
        None,
    )?;
    let rec = store.get(receipt.id)?.expect("record was stored");
    assert_eq!(rec.run.score, 0.0);
    assert_eq!(rec.run.reported_score, None);
    assert!(!rec.run.passed);
    Ok(())
}

#[test]
fn test_unrecognized_payload_persists_nothing() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store: Arc<dyn RecordStore> = Arc::new(JsonDirStore::open(dir.path())?);
    let ingestor = Ingestor::new(store.clone());

    let err = ingestor
        .ingest(&json!({"hello": "world"}), Some("odd.json"))
        .unwrap_err();
    match err {
        IngestError::UnrecognizedSchema(e) => assert_eq!(e.top_level_keys, vec!["hello"]),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(store.count()?, 0);
    assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);
    Ok(())
}

#[test]
fn test_all_shapes_share_one_store() -> anyhow::Result<()> {
    let store: Arc<dyn RecordStore> = Arc::new(SqliteStore::memory()?);
    let ingestor = Ingestor::new(store.clone());

    ingestor.ingest(&nested_payload(), None)?;
    ingestor.ingest(
        &json!({"ollama_response": {"response": "ok"}, "deepeval_result": {"score": 0.9}}),
        None,
    )?;
    ingestor.ingest(
        &json!({"testCases": [{"actualOutput": "x", "metricsData": [{"score": 0.7, "success": true}]}]}),
        Some("20260207_145459.json"),
    )?;

    let kinds: Vec<SchemaKind> = store
        .list_all()?
        .into_iter()
        .map(|r| r.run.source.schema)
        .collect();
    assert_eq!(
        kinds,
        vec![
            SchemaKind::NestedPipeline,
            SchemaKind::FlatStages,
            SchemaKind::TestCaseBatch
        ]
    );
    Ok(())
}

#[test]
fn test_wall_clock_duplicate_surfaces() -> anyhow::Result<()> {
    let store = SqliteStore::memory()?
        .with_id_strategy(IdStrategy::WallClock)
        .with_clock(Arc::new(|| 1_770_000_000_000));
    let ingestor = Ingestor::new(Arc::new(store));

    let ctx = || IngestContext::now(None);
    ingestor.ingest_with(&nested_payload(), ctx())?;
    let err = ingestor.ingest_with(&nested_payload(), ctx()).unwrap_err();
    let IngestError::Storage(inner) = err else {
        panic!("expected storage error");
    };
    assert!(matches!(
        inner.downcast_ref::<StoreError>(),
        Some(StoreError::DuplicateId(1_770_000_000_000))
    ));
    assert_eq!(ingestor.store().count()?, 1);
    Ok(())
}
