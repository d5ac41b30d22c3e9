use super::{check_threshold, exit_codes};
use crate::cli::args::{ReportArgs, ReportFormat};
use anyhow::Result;
use evalboard_core::aggregate::{AggregateReport, Completeness, Outcome};
use evalboard_core::config::EvalboardConfig;
use evalboard_core::storage::RecordStore;
use evalboard_core::{aggregate, AggregateOptions};

pub fn run(args: ReportArgs, cfg: &EvalboardConfig, store: &dyn RecordStore) -> Result<i32> {
    let opts = AggregateOptions {
        pass_threshold: match args.threshold {
            Some(t) => check_threshold(t)?,
            None => cfg.aggregate.pass_threshold,
        },
        ..cfg.aggregate
    };

    let records = store.list_all()?;
    let report = aggregate(&records, &opts);

    let rendered = match args.format {
        ReportFormat::Json => serde_json::to_string_pretty(&report)?,
        ReportFormat::Text => render_text(&report, &opts),
    };

    if let Some(p) = args.out {
        std::fs::write(&p, rendered)?;
        eprintln!("wrote file: {}", p.display());
    } else {
        println!("{}", rendered);
    }
    Ok(exit_codes::OK)
}

fn render_text(r: &AggregateReport, opts: &AggregateOptions) -> String {
    let mut s = String::new();
    s.push_str(&format!(
        "Runs: {}  Passed: {}  Pass rate: {:.1}%  (threshold {})\n",
        r.total_runs, r.passed_count, r.pass_rate, opts.pass_threshold
    ));

    if let Some(latest) = &r.latest {
        let completeness = match latest.completeness {
            Completeness::Complete => "COMPLETE",
            Completeness::Partial => "PARTIAL",
            Completeness::Minimal => "MINIMAL",
        };
        s.push_str(&format!(
            "Latest: #{} {:.1}% {} ({} judged by {}) [{}]\n",
            latest.id,
            latest.score,
            latest.tier.label(),
            latest.agent,
            latest.judge,
            completeness
        ));
    }

    if let Some(hw) = &r.hardware_stats {
        s.push_str(&format!(
            "Hardware ({} runs): CPU avg {:.1}% peak {:.1}%  RAM avg {:.2} GB peak {:.2} / {:.0} GB  avg {:.1}s\n",
            hw.count,
            hw.avg_cpu,
            hw.peak_cpu,
            hw.avg_ram_gb,
            hw.peak_ram_gb,
            hw.total_ram_gb,
            hw.avg_duration_ms / 1000.0
        ));
    }

    let q = &r.data_quality;
    s.push_str(&format!(
        "Data: score {}/{}  output {}/{}  metrics {}/{}  reason {}/{}\n",
        q.with_score, q.total, q.with_output, q.total, q.with_metrics, q.total, q.with_reason, q.total
    ));

    if !r.score_history.is_empty() {
        s.push('\n');
    }
    for p in &r.score_history {
        let outcome = match p.outcome {
            Outcome::Passed => "PASSED",
            Outcome::Failed => "FAILED",
            Outcome::NoScore => "NO SCORE",
        };
        s.push_str(&format!(
            "{:<8} #{:<14} {:>5.1}%  {:<8} {}  {} / {}\n",
            p.label, p.id, p.score, outcome, p.date, p.agent, p.judge
        ));
    }
    s
}
