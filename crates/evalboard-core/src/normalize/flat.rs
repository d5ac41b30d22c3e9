use super::fields::{self, at, boolean, num, opt_text, text};
use super::{metrics, source_info, verdicts, IngestContext, NormalizeDefaults};
use crate::model::{
    EvalRun, EvaluationStage, PipelineBreakdown, SchemaKind, StageExchange, DEFAULT_METRIC_NAME,
    DEFAULT_PASS_THRESHOLD,
};
use serde_json::Value;

/// Flat stage record: `ollama_*` (SUT), `gemini_*` (judge) and
/// `deepeval_*` (evaluation) keys side by side, or a bare test case with
/// `input` / `actual_output` and top-level score fields.
pub(super) fn extract(raw: &Value, ctx: &IngestContext, defaults: &NormalizeDefaults) -> EvalRun {
    let root = Some(raw);
    let result = fields::first(at(root, &["deepeval_result"]));
    let sut_request = at(root, &["ollama_request"]);
    let sut_response = at(root, &["ollama_response"]);
    let judge_request = at(root, &["gemini_request"]);
    let judge_response = at(root, &["gemini_response"]);

    // Evaluation fields live under deepeval_result when present, else at the top level.
    let eval = |key: &str| at(result, &[key]).or_else(|| at(root, &[key]));

    let reported_score = fields::score(eval("score"));
    let reported_threshold = num(eval("threshold")).filter(|t| *t > 0.0);
    let reported_passed = boolean(eval("passed")).or_else(|| boolean(eval("success")));
    let reason = text(eval("reason"));
    let metric_name = opt_text(eval("metric_name"))
        .or_else(|| opt_text(at(result, &["name"])))
        .unwrap_or_else(|| DEFAULT_METRIC_NAME.into());
    let error = opt_text(eval("error"));

    let verdict_list = verdicts::parse_verdicts(eval("verdicts"));
    let verdict_breakdown = verdicts::breakdown(&verdict_list);

    let agent = opt_text(at(root, &["agent"]))
        .or_else(|| opt_text(at(sut_request, &["model"])))
        .or_else(|| opt_text(at(root, &["model"])))
        .unwrap_or_else(|| defaults.flat_agent.clone());
    let judge = opt_text(at(root, &["judge"]))
        .or_else(|| opt_text(at(judge_request, &["model"])))
        .or_else(|| opt_text(eval("evaluation_model")))
        .or_else(|| opt_text(eval("evaluationModel")))
        .unwrap_or_else(|| defaults.flat_judge.clone());

    let sut_output = opt_text(at(root, &["actual_output"]))
        .or_else(|| opt_text(at(root, &["actualOutput"])))
        .or_else(|| opt_text(at(root, &["sutOutput"])))
        .unwrap_or_else(|| response_text(sut_response));

    let input = opt_text(at(root, &["deepeval_input"]))
        .or_else(|| opt_text(at(root, &["input"])))
        .or_else(|| opt_text(at(sut_request, &["prompt"])))
        .unwrap_or_default();

    let metrics = metrics::run_metrics(at(root, &["ollama_metrics"]))
        .or_else(|| metrics::run_metrics(at(root, &["metrics"])));
    let (date, full_date) = fields::display_dates(ctx.received_at);

    let pipeline = PipelineBreakdown {
        input,
        sut: StageExchange {
            model: opt_text(at(sut_request, &["model"])),
            request: fields::raw(sut_request),
            response: fields::raw(sut_response),
            duration_seconds: num(at(sut_response, &["total_duration"]))
                .map(|ns| ns / 1e9)
                .unwrap_or(0.0),
            metrics: fields::raw(at(root, &["ollama_metrics"])),
            thought_process: String::new(),
        },
        judge: StageExchange {
            model: opt_text(at(judge_request, &["model"])),
            request: fields::raw(judge_request),
            response: fields::raw(judge_response),
            duration_seconds: 0.0,
            metrics: fields::raw(at(root, &["gemini_metrics"])),
            thought_process: String::new(),
        },
        evaluation: EvaluationStage {
            metric_name: metric_name.clone(),
            score: reported_score,
            threshold: reported_threshold,
            passed: reported_passed,
            success: boolean(eval("success")),
            reason: reason.clone(),
            error: error.clone(),
            statements: fields::string_list(eval("statements")),
            verdicts: verdict_list,
            verdict_breakdown,
        },
        environment: None,
    };

    EvalRun {
        date,
        full_date,
        recorded_at: ctx.received_at,
        agent,
        judge,
        score: reported_score.unwrap_or(0.0),
        reported_score,
        threshold: reported_threshold.unwrap_or(DEFAULT_PASS_THRESHOLD),
        passed: reported_passed.unwrap_or(false),
        reason,
        sut_output,
        metric_name,
        error,
        build_id: None,
        overall_status: None,
        metrics,
        judge_metrics: metrics::run_metrics(at(root, &["gemini_metrics"])),
        pipeline: Some(pipeline),
        source: source_info(SchemaKind::FlatStages, raw, ctx, 1),
    }
}

/// Ollama responses are either plain text or `{response}` / `{message: {content}}` objects.
fn response_text(v: Option<&Value>) -> String {
    match v {
        Some(Value::Object(_)) => opt_text(at(v, &["response"]))
            .or_else(|| opt_text(at(v, &["message", "content"])))
            .unwrap_or_default(),
        other => text(other),
    }
}
