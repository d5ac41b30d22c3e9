use crate::model::{EvalRecord, StageExchange};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Which slice of a stored run to write out as a standalone document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportKind {
    /// What the system under test received and produced.
    Sut,
    /// The judge model's exchange.
    Judge,
    /// Score, status and the whole pipeline breakdown.
    Full,
}

impl ExportKind {
    fn file_prefix(&self) -> &'static str {
        match self {
            ExportKind::Sut => "sut",
            ExportKind::Judge => "judge",
            ExportKind::Full => "pipeline",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageExport {
    pub file_name: String,
    pub document: Value,
}

pub fn export_stage(record: &EvalRecord, kind: ExportKind, threshold: f64) -> StageExport {
    let run = &record.run;
    let pipeline = run.pipeline.as_ref();
    let run_metrics = serde_json::to_value(&run.metrics).unwrap_or(Value::Null);

    let document = match kind {
        ExportKind::Sut => {
            let stage = pipeline.map(|p| &p.sut);
            let metrics = stage
                .map(|s| s.metrics.clone())
                .filter(|m| !m.is_null())
                .unwrap_or(run_metrics);
            exchange_doc(&run.full_date, &run.agent, stage, metrics)
        }
        ExportKind::Judge => {
            let stage = pipeline.map(|p| &p.judge);
            let metrics = stage.map(|s| s.metrics.clone()).unwrap_or(Value::Null);
            exchange_doc(&run.full_date, &run.judge, stage, metrics)
        }
        ExportKind::Full => json!({
            "timestamp": run.full_date,
            "score": run.score,
            "status": if run.score >= threshold { "PASS" } else { "FAIL" },
            "pipeline": pipeline,
            "metrics": run_metrics,
            "verdict": run.reason,
        }),
    };

    StageExport {
        file_name: format!("{}_{}.json", kind.file_prefix(), file_stamp(&run.full_date)),
        document,
    }
}

fn exchange_doc(timestamp: &str, model: &str, stage: Option<&StageExchange>, metrics: Value) -> Value {
    json!({
        "timestamp": timestamp,
        "model": model,
        "request": stage.map(|s| s.request.clone()).unwrap_or(Value::Null),
        "response": stage.map(|s| s.response.clone()).unwrap_or(Value::Null),
        "metrics": metrics,
    })
}

/// `2026-02-07 14:54:59` → `2026-02-07_14-54-59`.
pub fn file_stamp(full_date: &str) -> String {
    full_date
        .chars()
        .map(|c| match c {
            '/' | ',' | ':' => '-',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect()
}
