use evalboard_core::aggregate::{Completeness, Outcome, ReliabilityTier, SnapshotPoint};
use evalboard_core::normalize::{normalize, IngestContext, NormalizeDefaults};
use evalboard_core::{aggregate, AggregateOptions, EvalRecord};
use serde_json::{json, Value};

fn record(id: i64, raw: Value) -> anyhow::Result<EvalRecord> {
    let run = normalize(&raw, &IngestContext::now(None), &NormalizeDefaults::default())?;
    Ok(EvalRecord::new(id, run))
}

fn scored(id: i64, score: f64) -> anyhow::Result<EvalRecord> {
    record(id, json!({"input": "q", "actual_output": "a", "score": score}))
}

fn instrumented(id: i64, score: f64, metrics: Value) -> anyhow::Result<EvalRecord> {
    record(
        id,
        json!({"input": "q", "actual_output": "a", "score": score, "reason": "r", "metrics": metrics}),
    )
}

#[test]
fn test_empty_dataset() {
    let report = aggregate(&[], &AggregateOptions::default());
    assert_eq!(report.pass_rate, 0.0);
    assert_eq!(report.passed_count, 0);
    assert!(report.hardware_stats.is_none());
    assert!(report.hardware_trend.is_empty());
    assert_eq!(report.data_quality.total, 0);
    assert_eq!(report.data_quality.with_metrics, 0);
    assert!(!report.data_quality.complete);
}

#[test]
fn test_outcome_never_contradicts_passed() -> anyhow::Result<()> {
    let records = vec![scored(1, 0.0)?, scored(2, 0.3)?];
    let lenient = AggregateOptions {
        pass_threshold: 0.0,
        ..AggregateOptions::default()
    };
    let report = aggregate(&records, &lenient);
    assert_eq!(report.passed_count, 2);
    for point in &report.score_history {
        assert!(point.passed);
        assert_eq!(point.outcome, Outcome::Passed);
    }
    Ok(())
}

#[test]
fn test_pass_rate_half() -> anyhow::Result<()> {
    let records = vec![scored(1, 0.8)?, scored(2, 0.4)?];
    let report = aggregate(&records, &AggregateOptions::default());
    assert_eq!(report.pass_rate, 50.0);
    assert_eq!(report.passed_count, 1);
    assert!(report.score_history[0].passed);
    assert!(!report.score_history[1].passed);
    assert_eq!(report.score_history[0].label, "Run 1");
    assert_eq!(report.score_history[0].score, 80.0);
    assert_eq!(report.score_history[1].outcome, Outcome::Failed);

    // Same input, same output.
    assert_eq!(report, aggregate(&records, &AggregateOptions::default()));
    Ok(())
}

#[test]
fn test_threshold_is_inclusive_and_configurable() -> anyhow::Result<()> {
    let records = vec![scored(1, 0.6)?, scored(2, 0.7)?, scored(3, 0.0)?];
    let report = aggregate(&records, &AggregateOptions::default());
    assert_eq!(report.passed_count, 2);
    assert_eq!(report.pass_rate, 66.7);
    assert_eq!(report.score_history[2].outcome, Outcome::NoScore);

    let strict = AggregateOptions {
        pass_threshold: 0.65,
        ..AggregateOptions::default()
    };
    assert_eq!(aggregate(&records, &strict).passed_count, 1);
    Ok(())
}

#[test]
fn test_snapshot_series_rebased() -> anyhow::Result<()> {
    let records = vec![instrumented(
        1,
        0.9,
        json!({"duration_ms": 500, "snapshots": [
            {"timestamp": 1000, "cpu": {"usage": 10}, "ram": {"used": 1073741824u64}},
            {"timestamp": 1500, "cpu": {"usage": 20}, "ram": {"used": 2147483648u64, "percentage": 25}}
        ]}),
    )?];
    let report = aggregate(&records, &AggregateOptions::default());
    assert_eq!(
        report.snapshot_series,
        vec![
            SnapshotPoint { time: 0.0, cpu: 10.0, ram_gb: 1.0, ram_percent: None },
            SnapshotPoint { time: 0.5, cpu: 20.0, ram_gb: 2.0, ram_percent: Some(25.0) },
        ]
    );
    Ok(())
}

#[test]
fn test_hardware_stats_and_trend_ordinals() -> anyhow::Result<()> {
    let records = vec![
        scored(10, 0.5)?,
        instrumented(
            11,
            0.7,
            json!({"duration_ms": 2000,
                   "cpu": {"avg_usage_percent": 40, "peak_usage_percent": 70},
                   "ram": {"avg_used_gb": 4.0, "peak_used_gb": 5.0}}),
        )?,
        scored(12, 0.9)?,
        instrumented(
            13,
            0.85,
            json!({"duration_ms": 4000,
                   "cpu": {"avg_usage_percent": 60, "peak_usage_percent": 95},
                   "ram": {"avg_used_gb": 6.0, "peak_used_gb": 7.5, "total_gb": 64}}),
        )?,
    ];
    let report = aggregate(&records, &AggregateOptions::default());

    let hw = report.hardware_stats.expect("two instrumented runs");
    assert_eq!(hw.count, 2);
    assert_eq!(hw.avg_cpu, 50.0);
    assert_eq!(hw.peak_cpu, 95.0);
    assert_eq!(hw.avg_ram_gb, 5.0);
    assert_eq!(hw.peak_ram_gb, 7.5);
    assert_eq!(hw.avg_duration_ms, 3000.0);
    // First instrumented run has no total: default applies.
    assert_eq!(hw.total_ram_gb, 16.0);

    let labels: Vec<&str> = report.hardware_trend.iter().map(|t| t.label.as_str()).collect();
    assert_eq!(labels, vec!["Run 2", "Run 4"]);
    assert_eq!(report.hardware_trend[1].duration_s, 4.0);

    assert_eq!(report.data_quality.with_metrics, 2);
    assert!(!report.data_quality.complete);

    let latest = report.latest.expect("latest run");
    assert_eq!(latest.id, 13);
    assert_eq!(latest.tier, ReliabilityTier::High);
    assert_eq!(latest.completeness, Completeness::Complete);
    Ok(())
}

#[test]
fn test_latest_completeness_tiers() -> anyhow::Result<()> {
    let partial = record(1, json!({"input": "q", "actual_output": "a", "score": 0.65}))?;
    let report = aggregate(&[partial], &AggregateOptions::default());
    let latest = report.latest.expect("latest run");
    assert_eq!(latest.completeness, Completeness::Partial);
    assert_eq!(latest.tier, ReliabilityTier::Medium);

    let minimal = record(2, json!({"deepeval_result": {"score": 0.2}}))?;
    let latest = aggregate(&[minimal], &AggregateOptions::default())
        .latest
        .expect("latest run");
    assert_eq!(latest.completeness, Completeness::Minimal);
    assert_eq!(latest.tier, ReliabilityTier::NeedsOptimization);
    Ok(())
}
