use super::fields::{self, at, boolean, num, opt_text, text};
use super::{metrics, source_info, verdicts, IngestContext, NormalizeDefaults};
use crate::model::{
    EnvironmentInfo, EvalRun, EvaluationStage, PipelineBreakdown, SchemaKind, StageExchange,
    DEFAULT_METRIC_NAME, DEFAULT_PASS_THRESHOLD,
};
use serde_json::Value;

/// Build result: `pipeline.student_sut`, `pipeline.teacher_judge`,
/// `pipeline.deepeval_analytics[0]`, plus top-level build metadata.
pub(super) fn extract(raw: &Value, ctx: &IngestContext, defaults: &NormalizeDefaults) -> EvalRun {
    let root = Some(raw);
    let sut = at(root, &["pipeline", "student_sut"]);
    let judge = at(root, &["pipeline", "teacher_judge"]);
    let analytics = fields::first(at(root, &["pipeline", "deepeval_analytics"]));
    let flow = at(analytics, &["pipeline_flow"]);

    let reported_score = fields::score(at(analytics, &["score"]));
    let reported_threshold = num(at(analytics, &["threshold"])).filter(|t| *t > 0.0);
    let reported_passed = boolean(at(analytics, &["passed"]));
    let reason = text(at(analytics, &["reason"]));
    let metric_name =
        opt_text(at(analytics, &["metric_name"])).unwrap_or_else(|| DEFAULT_METRIC_NAME.into());
    let error = opt_text(at(analytics, &["error"]));

    let verdict_list = verdicts::parse_verdicts(at(flow, &["judge_verdicts"]));
    let verdict_breakdown = verdicts::breakdown(&verdict_list);

    let sut_output = text(at(sut, &["response"]));
    let (date, full_date) = fields::display_dates(ctx.received_at);

    let pipeline = PipelineBreakdown {
        input: text(at(sut, &["prompt"])),
        sut: stage(sut, true),
        judge: stage(judge, false),
        evaluation: EvaluationStage {
            metric_name: metric_name.clone(),
            score: reported_score,
            threshold: reported_threshold,
            passed: reported_passed,
            success: boolean(at(analytics, &["success"])),
            reason: reason.clone(),
            error: error.clone(),
            statements: fields::string_list(at(flow, &["judge_statements"])),
            verdicts: verdict_list,
            verdict_breakdown,
        },
        environment: fields::object(at(root, &["environment"])).map(|env| EnvironmentInfo {
            os: opt_text(env.get("os")),
            sut_hardware: fields::raw(env.get("sut_hardware")),
        }),
    };

    EvalRun {
        date,
        full_date,
        recorded_at: ctx.received_at,
        agent: opt_text(at(sut, &["model"])).unwrap_or_else(|| defaults.nested_agent.clone()),
        judge: opt_text(at(judge, &["model"])).unwrap_or_else(|| defaults.nested_judge.clone()),
        score: reported_score.unwrap_or(0.0),
        reported_score,
        threshold: reported_threshold.unwrap_or(DEFAULT_PASS_THRESHOLD),
        passed: reported_passed.unwrap_or(false),
        reason,
        sut_output,
        metric_name,
        error,
        build_id: opt_text(at(root, &["build_id"])),
        overall_status: opt_text(at(root, &["overall_status"])),
        metrics: metrics::run_metrics(at(sut, &["metrics"])),
        judge_metrics: metrics::run_metrics(at(judge, &["metrics"])),
        pipeline: Some(pipeline),
        source: source_info(SchemaKind::NestedPipeline, raw, ctx, 1),
    }
}

fn stage(v: Option<&Value>, with_thoughts: bool) -> StageExchange {
    StageExchange {
        model: opt_text(at(v, &["model"])),
        request: fields::raw(at(v, &["prompt"])),
        response: fields::raw(at(v, &["response"])),
        duration_seconds: num(at(v, &["duration_seconds"])).unwrap_or(0.0),
        metrics: fields::raw(at(v, &["metrics"])),
        thought_process: if with_thoughts {
            text(at(v, &["thought_process"]))
        } else {
            String::new()
        },
    }
}
