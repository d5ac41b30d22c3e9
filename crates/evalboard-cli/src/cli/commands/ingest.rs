use super::{exit_codes, Store};
use crate::cli::args::IngestArgs;
use anyhow::{Context, Result};
use evalboard_core::config::EvalboardConfig;
use evalboard_core::errors::IngestError;
use evalboard_core::Ingestor;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncReadExt;

pub async fn run(args: IngestArgs, cfg: &EvalboardConfig, store: Store) -> Result<i32> {
    let ingestor = Ingestor::with_defaults(store, cfg.defaults.clone());
    let limit = Duration::from_millis(cfg.io_timeout_ms);
    let mut accepted = 0usize;
    let mut rejected = 0usize;

    for path in &args.files {
        let (body, source_name) = match read_input(path, limit).await {
            Ok(input) => input,
            Err(e) => {
                rejected += 1;
                tracing::warn!(
                    event = "evalboard.cli.read_failed",
                    path = %path.display(),
                    error = %format!("{e:#}")
                );
                eprintln!("rejected {}: {:#}", path.display(), e);
                continue;
            }
        };
        match ingestor.ingest_str(&body, source_name.as_deref()) {
            Ok(receipt) => {
                accepted += 1;
                println!("{}", serde_json::to_string(&receipt)?);
            }
            Err(IngestError::Storage(e)) => {
                return Err(e).with_context(|| format!("failed to store {}", path.display()));
            }
            Err(e) => {
                rejected += 1;
                eprintln!("rejected {}: {}", path.display(), e);
            }
        }
    }

    tracing::info!(event = "evalboard.cli.ingest_done", accepted, rejected);
    if rejected > 0 {
        Ok(exit_codes::FAILED)
    } else {
        Ok(exit_codes::OK)
    }
}

/// File body plus the name handed to the normalizer (batch files carry their date in it).
async fn read_input(path: &Path, limit: Duration) -> Result<(String, Option<String>)> {
    if path.as_os_str() == "-" {
        let mut body = String::new();
        tokio::time::timeout(limit, tokio::io::stdin().read_to_string(&mut body))
            .await
            .context("timed out reading stdin")?
            .context("failed to read stdin")?;
        return Ok((body, None));
    }

    let body = tokio::time::timeout(limit, tokio::fs::read_to_string(path))
        .await
        .with_context(|| format!("timed out reading {}", path.display()))?
        .with_context(|| format!("failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned());
    Ok((body, name))
}
