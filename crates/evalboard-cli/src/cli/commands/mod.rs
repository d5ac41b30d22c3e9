pub mod export;
pub mod ingest;
pub mod init;
pub mod list;
pub mod report;

use crate::cli::args::{Cli, Command, GlobalArgs};
use evalboard_core::config::{self, EvalboardConfig};
use evalboard_core::errors::ConfigError;
use evalboard_core::storage::{open_store, RecordStore};
use std::sync::Arc;

pub mod exit_codes {
    pub const OK: i32 = 0;
    /// At least one input was rejected, or the requested record does not exist.
    pub const FAILED: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
}

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    if let Command::Init(args) = &cli.cmd {
        crate::init_logging(&log_level(&cli.global, None));
        return init::run(args, &cli.global);
    }

    let cfg = match resolve_config(&cli.global) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("config error: {}", e);
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };
    crate::init_logging(&cfg.log_level);
    cfg.warn_unknown_keys();
    tracing::debug!(
        event = "evalboard.cli.start",
        backend = ?cfg.store.backend,
        location = ?cfg.store.path
    );

    let store = open_store(&cfg.store)?;
    match cli.cmd {
        Command::Ingest(args) => ingest::run(args, &cfg, store).await,
        Command::List(args) => list::run(args, store.as_ref()),
        Command::Report(args) => report::run(args, &cfg, store.as_ref()),
        Command::Export(args) => export::run(args, &cfg, store.as_ref()),
        Command::Init(_) => Ok(exit_codes::OK),
    }
}

/// File (explicit or discovered), then `EVALBOARD_*` environment, then flags.
fn resolve_config(global: &GlobalArgs) -> Result<EvalboardConfig, ConfigError> {
    let mut cfg = config::discover(global.config.as_deref(), global.strict_config)?;
    cfg.apply_env()?;

    if let Some(backend) = &global.backend {
        cfg.store.backend = backend
            .parse()
            .map_err(|e: String| ConfigError(format!("--backend: {}", e)))?;
    }
    if let Some(db) = &global.db {
        cfg.store.path = Some(db.clone());
    }
    cfg.log_level = log_level(global, Some(&cfg.log_level));
    cfg.validate()?;
    Ok(cfg)
}

fn log_level(global: &GlobalArgs, configured: Option<&str>) -> String {
    global
        .log_level
        .clone()
        .or_else(|| std::env::var("EVALBOARD_LOG").ok())
        .or_else(|| configured.map(str::to_string))
        .unwrap_or_else(|| "info".to_string())
}

pub(crate) fn check_threshold(t: f64) -> anyhow::Result<f64> {
    if !(t > 0.0 && t <= 1.0) {
        anyhow::bail!("threshold must be within (0, 1], got {}", t);
    }
    Ok(t)
}

pub(crate) type Store = Arc<dyn RecordStore>;
