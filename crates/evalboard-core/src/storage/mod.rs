//! Append-only persistence of canonical records.
//!
//! Two backends share the [`RecordStore`] contract: [`SqliteStore`] (default)
//! and [`JsonDirStore`], which keeps one `run_<id>.json` document per record.
//! Neither exposes update or delete.

pub mod json_dir;
pub mod schema;
pub mod store;

pub use json_dir::JsonDirStore;
pub use store::SqliteStore;

use crate::config::StoreSettings;
use crate::model::{EvalRecord, EvalRun};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub trait RecordStore: Send + Sync {
    /// Persist one run and return the id assigned to it.
    fn put(&self, run: &EvalRun) -> anyhow::Result<i64>;

    /// Every readable record ascending by id, plus the entries that could not be parsed.
    fn scan(&self) -> anyhow::Result<Scan>;

    /// Ascending by id. Malformed entries are logged and skipped.
    fn list_all(&self) -> anyhow::Result<Vec<EvalRecord>> {
        let scan = self.scan()?;
        scan.log_skipped();
        Ok(scan.records)
    }

    /// Descending by id, newest first. Same content as [`RecordStore::list_all`];
    /// the order is what upload listings show.
    fn list_recent(&self) -> anyhow::Result<Vec<EvalRecord>> {
        let mut records = self.list_all()?;
        records.reverse();
        Ok(records)
    }

    fn get(&self, id: i64) -> anyhow::Result<Option<EvalRecord>> {
        Ok(self.scan()?.records.into_iter().find(|r| r.id == id))
    }

    /// Readable records only; agrees with `list_all().len()`.
    fn count(&self) -> anyhow::Result<u64> {
        Ok(self.scan()?.records.len() as u64)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scan {
    pub records: Vec<EvalRecord>,
    pub skipped: Vec<MalformedRecord>,
}

impl Scan {
    pub fn log_skipped(&self) {
        for m in &self.skipped {
            tracing::warn!(
                event = "evalboard.store.malformed_record",
                location = %m.location,
                error = %m.error,
                "skipping unreadable record"
            );
        }
    }
}

/// A stored entry that could not be read back. Reported, never fatal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MalformedRecord {
    pub location: String,
    pub error: String,
}

/// How `put` derives ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdStrategy {
    /// `max(now_ms, last_id + 1)`: wall-clock-like and strictly increasing for a single writer.
    #[default]
    Monotonic,
    /// `now_ms` as-is. Two writes in the same millisecond fail with `StoreError::DuplicateId`.
    WallClock,
}

impl IdStrategy {
    pub fn next_id(&self, now_ms: i64, last_id: Option<i64>) -> i64 {
        match (self, last_id) {
            (IdStrategy::Monotonic, Some(last)) => now_ms.max(last.saturating_add(1)),
            _ => now_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    JsonDir,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sqlite" => Ok(StoreBackend::Sqlite),
            "json_dir" | "json-dir" | "dir" => Ok(StoreBackend::JsonDir),
            other => Err(format!("unknown store backend: {other} (expected sqlite|json_dir)")),
        }
    }
}

/// Milliseconds since the epoch. Injected so tests can pin time.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(|| chrono::Utc::now().timestamp_millis())
}

pub fn open_store(settings: &StoreSettings) -> anyhow::Result<Arc<dyn RecordStore>> {
    let path = settings.path();
    let store: Arc<dyn RecordStore> = match settings.backend {
        StoreBackend::Sqlite => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            Arc::new(SqliteStore::open(&path)?.with_id_strategy(settings.id_strategy))
        }
        StoreBackend::JsonDir => Arc::new(JsonDirStore::open_with(
            &path,
            settings.id_strategy,
            system_clock(),
        )?),
    };
    Ok(store)
}
