use super::fields::{self, at, boolean, num, opt_text, text};
use super::{metrics, source_info, verdicts, IngestContext, NormalizeDefaults};
use crate::model::{
    EvalRun, EvaluationStage, PipelineBreakdown, SchemaKind, StageExchange, DEFAULT_METRIC_NAME,
    DEFAULT_PASS_THRESHOLD,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// DeepEval test-run file: `testCases[0].metricsData[0]` carries the
/// evaluation, and the run date is encoded in the upload's file name
/// (`20260207_145459.json`). Only the first test case is normalized; the
/// case count is kept in `source.batch_size`.
pub(super) fn extract(raw: &Value, ctx: &IngestContext, defaults: &NormalizeDefaults) -> EvalRun {
    let root = Some(raw);
    let cases = raw
        .get("testCases")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    let case = cases.first().filter(|c| c.is_object());
    let metric = fields::first(at(case, &["metricsData"]));

    let reported_score = fields::score(at(metric, &["score"]));
    let reported_threshold = num(at(metric, &["threshold"])).filter(|t| *t > 0.0);
    let reported_passed = boolean(at(metric, &["success"]));
    let reason = text(at(metric, &["reason"]));
    let metric_name = opt_text(at(metric, &["name"])).unwrap_or_else(|| DEFAULT_METRIC_NAME.into());
    let error = opt_text(at(metric, &["error"]));

    let verdict_list = verdicts::parse_verdicts(at(metric, &["verdicts"]));
    let verdict_breakdown = verdicts::breakdown(&verdict_list);

    let sut_output = opt_text(at(case, &["actualOutput"]))
        .or_else(|| opt_text(at(case, &["actual_output"])))
        .unwrap_or_default();

    let recorded_at = ctx
        .source_name
        .as_deref()
        .and_then(date_from_file_name)
        .unwrap_or(ctx.received_at);
    let (date, full_date) = fields::display_dates(recorded_at);

    let pipeline = PipelineBreakdown {
        input: text(at(case, &["input"])),
        sut: StageExchange {
            request: fields::raw(at(case, &["input"])),
            response: Value::String(sut_output.clone()),
            ..StageExchange::default()
        },
        judge: StageExchange {
            model: opt_text(at(metric, &["evaluationModel"])),
            ..StageExchange::default()
        },
        evaluation: EvaluationStage {
            metric_name: metric_name.clone(),
            score: reported_score,
            threshold: reported_threshold,
            passed: reported_passed,
            success: reported_passed,
            reason: reason.clone(),
            error: error.clone(),
            statements: fields::string_list(at(metric, &["statements"])),
            verdicts: verdict_list,
            verdict_breakdown,
        },
        environment: None,
    };

    EvalRun {
        date,
        full_date,
        recorded_at,
        agent: opt_text(at(root, &["agent"])).unwrap_or_else(|| defaults.batch_agent.clone()),
        judge: opt_text(at(metric, &["evaluationModel"]))
            .unwrap_or_else(|| defaults.batch_judge.clone()),
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
        metrics: metrics::run_metrics(at(root, &["metrics"])),
        judge_metrics: None,
        pipeline: Some(pipeline),
        source: source_info(SchemaKind::TestCaseBatch, raw, ctx, cases.len() as u32),
    }
}

fn file_date_pattern() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{8})(?:[_-](\d{6}))?").ok())
        .as_ref()
}

/// `YYYYMMDD[_HHMMSS]` anywhere in the file name, read as UTC.
fn date_from_file_name(name: &str) -> Option<DateTime<Utc>> {
    let caps = file_date_pattern()?.captures(name)?;
    let date = NaiveDate::parse_from_str(caps.get(1)?.as_str(), "%Y%m%d").ok()?;
    let time = caps
        .get(2)
        .and_then(|t| NaiveTime::parse_from_str(t.as_str(), "%H%M%S").ok())
        .or_else(|| NaiveTime::from_hms_opt(0, 0, 0))?;
    Some(date.and_time(time).and_utc())
}
