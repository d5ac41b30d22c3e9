//! Dashboard statistics over an ordered record sequence.
//!
//! Everything here is a pure function of its input: no store access, no
//! clock. Callers pass records in the order they want them labelled
//! (`list_all`, ascending by id, for the usual `Run 1..N` history).

use crate::model::{EvalRecord, RunMetrics, DEFAULT_PASS_THRESHOLD};
use serde::{Deserialize, Serialize};

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateOptions {
    /// A run passes when `score >= pass_threshold`.
    pub pass_threshold: f64,
    /// Used when the first instrumented run does not report total RAM.
    pub default_total_ram_gb: f64,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            pass_threshold: DEFAULT_PASS_THRESHOLD,
            default_total_ram_gb: 16.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateReport {
    pub total_runs: usize,
    pub passed_count: usize,
    /// Percent, one decimal.
    pub pass_rate: f64,
    pub score_history: Vec<ScorePoint>,
    pub hardware_stats: Option<HardwareStats>,
    pub snapshot_series: Vec<SnapshotPoint>,
    pub hardware_trend: Vec<TrendPoint>,
    pub data_quality: DataQuality,
    pub latest: Option<LatestRun>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Passed,
    Failed,
    /// Below the threshold with a raw score of exactly zero: either a true
    /// zero or no score was reported.
    NoScore,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScorePoint {
    pub label: String,
    pub id: i64,
    pub date: String,
    /// Percent, one decimal.
    pub score: f64,
    pub raw_score: f64,
    pub reported_score: Option<f64>,
    pub passed: bool,
    pub outcome: Outcome,
    pub agent: String,
    pub judge: String,
    pub has_metrics: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HardwareStats {
    pub avg_cpu: f64,
    pub peak_cpu: f64,
    pub avg_ram_gb: f64,
    pub peak_ram_gb: f64,
    pub total_ram_gb: f64,
    pub avg_duration_ms: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotPoint {
    /// Seconds since the first snapshot, one decimal.
    pub time: f64,
    pub cpu: f64,
    /// Two decimals.
    pub ram_gb: f64,
    pub ram_percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    /// `Run N`, where N is the run's position in the full sequence.
    pub label: String,
    pub id: i64,
    pub cpu: f64,
    pub ram_gb: f64,
    pub duration_s: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DataQuality {
    pub total: usize,
    pub with_score: usize,
    pub with_output: usize,
    pub with_metrics: usize,
    pub with_reason: usize,
    pub complete: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReliabilityTier {
    High,
    Medium,
    NeedsOptimization,
}

impl ReliabilityTier {
    pub fn for_score(score: f64) -> Self {
        if score >= 0.8 {
            ReliabilityTier::High
        } else if score >= 0.6 {
            ReliabilityTier::Medium
        } else {
            ReliabilityTier::NeedsOptimization
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReliabilityTier::High => "High Reliability",
            ReliabilityTier::Medium => "Medium Reliability",
            ReliabilityTier::NeedsOptimization => "Needs Optimization",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Completeness {
    Complete,
    Partial,
    Minimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestRun {
    pub id: i64,
    pub score: f64,
    pub tier: ReliabilityTier,
    pub agent: String,
    pub judge: String,
    pub duration_ms: Option<f64>,
    pub completeness: Completeness,
}

pub fn aggregate(records: &[EvalRecord], opts: &AggregateOptions) -> AggregateReport {
    let passes = |r: &EvalRecord| r.run.score >= opts.pass_threshold;
    let passed_count = records.iter().filter(|r| passes(*r)).count();
    let pass_rate = if records.is_empty() {
        0.0
    } else {
        round_to(passed_count as f64 / records.len() as f64 * 100.0, 1)
    };

    let score_history = records
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let passed = passes(r);
            ScorePoint {
                label: run_label(i),
                id: r.id,
                date: r.run.full_date.clone(),
                score: round_to(r.run.score * 100.0, 1),
                raw_score: r.run.score,
                reported_score: r.run.reported_score,
                passed,
                outcome: if passed {
                    Outcome::Passed
                } else if r.run.score == 0.0 {
                    Outcome::NoScore
                } else {
                    Outcome::Failed
                },
                agent: r.run.agent.clone(),
                judge: r.run.judge.clone(),
                has_metrics: r.run.has_metrics(),
            }
        })
        .collect();

    // (ordinal in the full sequence, record, metrics)
    let instrumented: Vec<(usize, &EvalRecord, &RunMetrics)> = records
        .iter()
        .enumerate()
        .filter_map(|(i, r)| r.run.metrics.as_ref().map(|m| (i, r, m)))
        .collect();

    let hardware_trend = instrumented
        .iter()
        .map(|(i, r, m)| TrendPoint {
            label: run_label(*i),
            id: r.id,
            cpu: round_to(avg_cpu(m), 1),
            ram_gb: round_to(avg_ram(m), 2),
            duration_s: round_to(m.duration_ms / 1000.0, 1),
        })
        .collect();

    let snapshot_series = instrumented
        .last()
        .map(|(_, _, m)| rebase_snapshots(m))
        .unwrap_or_default();

    let data_quality = {
        let total = records.len();
        let with_score = records.iter().filter(|r| r.run.score > 0.0).count();
        let with_output = records.iter().filter(|r| r.run.has_output()).count();
        let with_reason = records.iter().filter(|r| r.run.has_reason()).count();
        let with_metrics = instrumented.len();
        DataQuality {
            total,
            with_score,
            with_output,
            with_metrics,
            with_reason,
            complete: total > 0
                && [with_score, with_output, with_metrics, with_reason]
                    .iter()
                    .all(|n| *n == total),
        }
    };

    AggregateReport {
        total_runs: records.len(),
        passed_count,
        pass_rate,
        score_history,
        hardware_stats: hardware_stats(&instrumented, opts),
        snapshot_series,
        hardware_trend,
        data_quality,
        latest: records.last().map(latest_run),
    }
}

fn hardware_stats(
    instrumented: &[(usize, &EvalRecord, &RunMetrics)],
    opts: &AggregateOptions,
) -> Option<HardwareStats> {
    let (_, _, first) = instrumented.first()?;
    let n = instrumented.len() as f64;
    let metrics = instrumented.iter().map(|(_, _, m)| *m);

    Some(HardwareStats {
        avg_cpu: metrics.clone().map(avg_cpu).sum::<f64>() / n,
        peak_cpu: metrics
            .clone()
            .map(|m| m.cpu.as_ref().map_or(0.0, |c| c.peak))
            .fold(0.0, f64::max),
        avg_ram_gb: metrics.clone().map(avg_ram).sum::<f64>() / n,
        peak_ram_gb: metrics
            .clone()
            .map(|m| m.ram.as_ref().map_or(0.0, |r| r.peak))
            .fold(0.0, f64::max),
        total_ram_gb: first
            .ram
            .as_ref()
            .and_then(|r| r.total)
            .filter(|t| *t > 0.0)
            .unwrap_or(opts.default_total_ram_gb),
        avg_duration_ms: metrics.map(|m| m.duration_ms).sum::<f64>() / n,
        count: instrumented.len(),
    })
}

fn rebase_snapshots(m: &RunMetrics) -> Vec<SnapshotPoint> {
    let Some(start) = m.snapshots.first().map(|s| s.timestamp) else {
        return Vec::new();
    };
    m.snapshots
        .iter()
        .map(|s| SnapshotPoint {
            time: round_to((s.timestamp - start) / 1000.0, 1),
            cpu: s.cpu,
            ram_gb: round_to(ram_gb(s.ram), 2),
            ram_percent: s.ram_percent,
        })
        .collect()
}

fn latest_run(r: &EvalRecord) -> LatestRun {
    let run = &r.run;
    let completeness = match (run.has_metrics(), run.has_output(), run.has_reason()) {
        (true, true, true) => Completeness::Complete,
        (true, _, _) | (_, true, _) => Completeness::Partial,
        _ => Completeness::Minimal,
    };
    LatestRun {
        id: r.id,
        score: round_to(run.score * 100.0, 1),
        tier: ReliabilityTier::for_score(run.score),
        agent: run.agent.clone(),
        judge: run.judge.clone(),
        duration_ms: run.metrics.as_ref().map(|m| m.duration_ms),
        completeness,
    }
}

fn avg_cpu(m: &RunMetrics) -> f64 {
    m.cpu.as_ref().map_or(0.0, |c| c.avg)
}

fn avg_ram(m: &RunMetrics) -> f64 {
    m.ram.as_ref().map_or(0.0, |r| r.avg)
}

/// Snapshot RAM is sampled in bytes; small values are already gigabytes.
fn ram_gb(sampled: f64) -> f64 {
    if sampled.abs() < 1024.0 {
        sampled
    } else {
        sampled / BYTES_PER_GB
    }
}

fn run_label(index: usize) -> String {
    format!("Run {}", index + 1)
}

fn round_to(v: f64, decimals: i32) -> f64 {
    let f = 10f64.powi(decimals);
    (v * f).round() / f
}
