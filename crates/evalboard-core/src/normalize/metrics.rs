use super::fields::{self, num};
use crate::model::{CpuStats, RamStats, RunMetrics, Snapshot};
use serde_json::Value;

/// Hardware metrics block. Any object counts as "metrics present", even an
/// empty one; every missing figure defaults to zero.
pub fn run_metrics(v: Option<&Value>) -> Option<RunMetrics> {
    let m = fields::object(v)?;

    let duration_ms = num(m.get("duration_ms"))
        .or_else(|| num(m.get("duration_seconds")).map(|s| s * 1000.0))
        .unwrap_or(0.0);

    let cpu = fields::object(m.get("cpu")).map(|c| CpuStats {
        avg: num(c.get("avg_usage_percent"))
            .or_else(|| num(c.get("avg")))
            .unwrap_or(0.0),
        peak: num(c.get("peak_usage_percent"))
            .or_else(|| num(c.get("peak")))
            .unwrap_or(0.0),
    });

    let ram = fields::object(m.get("ram")).map(|r| RamStats {
        avg: num(r.get("avg_used_gb"))
            .or_else(|| num(r.get("avg")))
            .unwrap_or(0.0),
        peak: num(r.get("peak_used_gb"))
            .or_else(|| num(r.get("peak")))
            .unwrap_or(0.0),
        total: num(r.get("total_gb")).or_else(|| num(r.get("total"))),
    });

    Some(RunMetrics {
        duration_ms,
        cpu,
        ram,
        snapshots: snapshots(m.get("snapshots")),
    })
}

/// Samples sorted ascending by timestamp (stable, so equal stamps keep input order).
fn snapshots(v: Option<&Value>) -> Vec<Snapshot> {
    let Some(Value::Array(items)) = v else {
        return Vec::new();
    };
    let mut out: Vec<Snapshot> = items
        .iter()
        .filter(|s| s.is_object())
        .map(|s| Snapshot {
            timestamp: fields::epoch_ms(s.get("timestamp")).unwrap_or(0.0),
            cpu: scalar_or_field(s.get("cpu"), &["usage", "usage_percent", "percent"]),
            ram: scalar_or_field(s.get("ram"), &["used", "used_bytes"]),
            ram_percent: s
                .get("ram")
                .and_then(|r| num(r.get("percentage")).or_else(|| num(r.get("percent")))),
        })
        .collect();
    out.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
    out
}

fn scalar_or_field(v: Option<&Value>, keys: &[&str]) -> f64 {
    if let Some(n) = num(v) {
        return n;
    }
    keys.iter()
        .find_map(|k| num(v.and_then(|o| o.get(*k))))
        .unwrap_or(0.0)
}
