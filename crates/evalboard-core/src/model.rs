use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Score cutoff at or above which a run counts as passing.
pub const DEFAULT_PASS_THRESHOLD: f64 = 0.6;

pub const DEFAULT_METRIC_NAME: &str = "AnswerRelevancyMetric";

/// A persisted evaluation run: the store-assigned id plus the normalized body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalRecord {
    pub id: i64,
    #[serde(flatten)]
    pub run: EvalRun,
}

impl EvalRecord {
    pub fn new(id: i64, run: EvalRun) -> Self {
        Self { id, run }
    }
}

/// One normalized evaluation run, before the store has assigned an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvalRun {
    pub date: String,
    pub full_date: String,
    pub recorded_at: DateTime<Utc>,

    pub agent: String,
    pub judge: String,

    /// 0.0 means both "scored zero" and "no score reported"; see `reported_score`.
    pub score: f64,
    #[serde(default)]
    pub reported_score: Option<f64>,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default)]
    pub passed: bool,

    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub sut_output: String,
    #[serde(default = "default_metric_name")]
    pub metric_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_status: Option<String>,

    #[serde(default)]
    pub metrics: Option<RunMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_metrics: Option<RunMetrics>,
    #[serde(default)]
    pub pipeline: Option<PipelineBreakdown>,

    pub source: SourceInfo,
}

fn default_threshold() -> f64 {
    DEFAULT_PASS_THRESHOLD
}

fn default_metric_name() -> String {
    DEFAULT_METRIC_NAME.to_string()
}

impl EvalRun {
    pub fn has_metrics(&self) -> bool {
        self.metrics.is_some()
    }

    pub fn has_output(&self) -> bool {
        !self.sut_output.is_empty()
    }

    pub fn has_reason(&self) -> bool {
        !self.reason.is_empty()
    }
}

/// Hardware utilisation captured while the system under test was running.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    #[serde(default)]
    pub duration_ms: f64,
    #[serde(default)]
    pub cpu: Option<CpuStats>,
    #[serde(default)]
    pub ram: Option<RamStats>,
    /// Ascending by `timestamp`.
    #[serde(default)]
    pub snapshots: Vec<Snapshot>,
}

/// Percent of total CPU.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuStats {
    pub avg: f64,
    pub peak: f64,
}

/// Gigabytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RamStats {
    pub avg: f64,
    pub peak: f64,
    #[serde(default)]
    pub total: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Milliseconds since the epoch.
    pub timestamp: f64,
    /// CPU usage percent.
    pub cpu: f64,
    /// RAM in use, in bytes as sampled.
    pub ram: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ram_percent: Option<f64>,
}

/// Stage-by-stage breakdown of one pipeline execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineBreakdown {
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub sut: StageExchange,
    #[serde(default)]
    pub judge: StageExchange,
    #[serde(default)]
    pub evaluation: EvaluationStage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<EnvironmentInfo>,
}

/// What was sent to and received from one model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageExchange {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub request: serde_json::Value,
    #[serde(default)]
    pub response: serde_json::Value,
    #[serde(default)]
    pub duration_seconds: f64,
    #[serde(default)]
    pub metrics: serde_json::Value,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub thought_process: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationStage {
    pub metric_name: String,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub passed: Option<bool>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub statements: Vec<String>,
    #[serde(default)]
    pub verdicts: Vec<Verdict>,
    #[serde(default)]
    pub verdict_breakdown: VerdictBreakdown,
}

impl Default for EvaluationStage {
    fn default() -> Self {
        Self {
            metric_name: DEFAULT_METRIC_NAME.to_string(),
            score: None,
            threshold: None,
            passed: None,
            success: None,
            reason: String::new(),
            error: None,
            statements: Vec::new(),
            verdicts: Vec::new(),
            verdict_breakdown: VerdictBreakdown::default(),
        }
    }
}

/// One judge sub-judgment. `verdict` is kept verbatim, including values outside yes/no/idk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub verdict: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
}

/// `total` counts every verdict; `yes + no + idk < total` when some verdicts fall outside the set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictBreakdown {
    pub yes: u32,
    pub no: u32,
    pub idk: u32,
    pub total: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentInfo {
    #[serde(default)]
    pub os: Option<String>,
    #[serde(default)]
    pub sut_hardware: serde_json::Value,
}

/// Where a record came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    pub schema: SchemaKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    pub payload_sha256: String,
    /// Number of test cases in a batch payload; 1 for the other shapes.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
}

fn default_batch_size() -> u32 {
    1
}

/// The raw payload shapes emitted by successive versions of the evaluation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaKind {
    /// Build result with `pipeline.student_sut` / `teacher_judge` / `deepeval_analytics`.
    NestedPipeline,
    /// Top-level stage keys (`ollama_request`, `gemini_response`, `deepeval_result`, ...).
    FlatStages,
    /// DeepEval test-run file (`testCases[].metricsData[]`), date encoded in the file name.
    TestCaseBatch,
}

impl SchemaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaKind::NestedPipeline => "nested_pipeline",
            SchemaKind::FlatStages => "flat_stages",
            SchemaKind::TestCaseBatch => "test_case_batch",
        }
    }
}

impl std::fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
