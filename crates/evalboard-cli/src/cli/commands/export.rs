use super::{check_threshold, exit_codes};
use crate::cli::args::{ExportArgs, StageArg};
use anyhow::{Context, Result};
use evalboard_core::config::EvalboardConfig;
use evalboard_core::export::{export_stage, ExportKind};
use evalboard_core::storage::RecordStore;

pub fn run(args: ExportArgs, cfg: &EvalboardConfig, store: &dyn RecordStore) -> Result<i32> {
    let Some(record) = store.get(args.id)? else {
        eprintln!("no record with id {}", args.id);
        return Ok(exit_codes::FAILED);
    };

    let kind = match args.kind {
        StageArg::Sut => ExportKind::Sut,
        StageArg::Judge => ExportKind::Judge,
        StageArg::Full => ExportKind::Full,
    };
    let threshold = match args.threshold {
        Some(t) => check_threshold(t)?,
        None => cfg.aggregate.pass_threshold,
    };

    let export = export_stage(&record, kind, threshold);
    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("failed to create {}", args.out.display()))?;
    let path = args.out.join(&export.file_name);
    std::fs::write(&path, serde_json::to_string_pretty(&export.document)?)
        .with_context(|| format!("failed to write {}", path.display()))?;

    println!("{}", path.display());
    Ok(exit_codes::OK)
}
