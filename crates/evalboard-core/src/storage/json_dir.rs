use super::{system_clock, Clock, IdStrategy, MalformedRecord, RecordStore, Scan};
use crate::errors::StoreError;
use crate::model::{EvalRecord, EvalRun};
use anyhow::Context;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tempfile::NamedTempFile;

const FILE_PREFIX: &str = "run_";
const FILE_SUFFIX: &str = ".json";

/// One pretty-printed `run_<id>.json` document per record, in a flat directory.
/// Documents are written to a temp file and linked into place without
/// clobbering, so a record file is either complete or absent.
pub struct JsonDirStore {
    dir: PathBuf,
    id_strategy: IdStrategy,
    clock: Clock,
    state: Mutex<DirState>,
}

#[derive(Default)]
struct DirState {
    last_id: Option<i64>,
    digests: HashMap<String, i64>,
}

impl JsonDirStore {
    pub fn open(dir: &Path) -> anyhow::Result<Self> {
        Self::open_with(dir, IdStrategy::default(), system_clock())
    }

    pub fn open_with(dir: &Path, id_strategy: IdStrategy, clock: Clock) -> anyhow::Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create store dir {}", dir.display()))?;
        tracing::debug!(event = "evalboard.store.bootstrap", backend = "json_dir", location = %dir.display());

        let store = Self {
            dir: dir.to_path_buf(),
            id_strategy,
            clock,
            state: Mutex::new(DirState::default()),
        };
        let scan = store.scan()?;
        {
            let mut state = store.lock()?;
            for r in &scan.records {
                state.last_id = Some(state.last_id.map_or(r.id, |last| last.max(r.id)));
                state
                    .digests
                    .entry(r.run.source.payload_sha256.clone())
                    .or_insert(r.id);
            }
        }
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: i64) -> PathBuf {
        self.dir.join(format!("{FILE_PREFIX}{id}{FILE_SUFFIX}"))
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, DirState>> {
        self.state.lock().map_err(|_| StoreError::LockPoisoned.into())
    }
}

/// `run_<id>.json` → `id`. Other names are not records.
fn id_from_file_name(name: &str) -> Option<i64> {
    name.strip_prefix(FILE_PREFIX)?
        .strip_suffix(FILE_SUFFIX)?
        .parse()
        .ok()
}

impl RecordStore for JsonDirStore {
    fn put(&self, run: &EvalRun) -> anyhow::Result<i64> {
        let mut state = self.lock()?;
        let mut id = self.id_strategy.next_id((self.clock)(), state.last_id);

        if let Some(existing) = state.digests.get(&run.source.payload_sha256).copied() {
            tracing::warn!(
                event = "evalboard.store.duplicate_payload",
                existing_id = existing,
                sha256 = %run.source.payload_sha256,
                "payload was already ingested; storing again"
            );
        }

        loop {
            let path = self.path_for(id);
            let mut body = serde_json::to_vec_pretty(&EvalRecord::new(id, run.clone()))?;
            body.push(b'\n');

            // Hidden temp name: scans skip it until it is linked into place.
            let mut tmp = NamedTempFile::new_in(&self.dir)
                .with_context(|| format!("failed to create temp file in {}", self.dir.display()))?;
            tmp.write_all(&body)
                .and_then(|_| tmp.as_file().sync_all())
                .with_context(|| format!("failed to write {}", path.display()))?;

            match tmp.persist_noclobber(&path) {
                Ok(_) => break,
                Err(e) if e.error.kind() == ErrorKind::AlreadyExists => match self.id_strategy {
                    IdStrategy::WallClock => return Err(StoreError::DuplicateId(id).into()),
                    // Another writer got there first.
                    IdStrategy::Monotonic => id += 1,
                },
                Err(e) => {
                    return Err(e.error)
                        .with_context(|| format!("failed to persist {}", path.display()))
                }
            }
        }

        state.last_id = Some(state.last_id.map_or(id, |last| last.max(id)));
        state
            .digests
            .entry(run.source.payload_sha256.clone())
            .or_insert(id);
        Ok(id)
    }

    fn scan(&self) -> anyhow::Result<Scan> {
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("failed to read store dir {}", self.dir.display()))?;

        let mut scan = Scan::default();
        let mut seen = HashSet::new();
        let mut paths: Vec<(i64, PathBuf)> = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with('.') || !name.ends_with(FILE_SUFFIX) {
                continue;
            }
            match id_from_file_name(name) {
                Some(id) => paths.push((id, entry.path())),
                None => scan.skipped.push(MalformedRecord {
                    location: entry.path().display().to_string(),
                    error: "file name is not run_<id>.json".into(),
                }),
            }
        }
        paths.sort_by_key(|(id, _)| *id);

        for (file_id, path) in paths {
            let location = path.display().to_string();
            let parsed = fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|s| serde_json::from_str::<EvalRecord>(&s).map_err(|e| e.to_string()));
            let record = match parsed {
                Ok(r) => r,
                Err(error) => {
                    scan.skipped.push(MalformedRecord { location, error });
                    continue;
                }
            };
            if record.id != file_id {
                scan.skipped.push(MalformedRecord {
                    location,
                    error: format!("document id {} does not match file name", record.id),
                });
                continue;
            }
            if !seen.insert(record.id) {
                scan.skipped.push(MalformedRecord {
                    location,
                    error: format!("duplicate id {}", record.id),
                });
                continue;
            }
            scan.records.push(record);
        }
        Ok(scan)
    }

    fn get(&self, id: i64) -> anyhow::Result<Option<EvalRecord>> {
        let path = self.path_for(id);
        let body = match fs::read_to_string(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("failed to read {}", path.display())),
        };
        let record = serde_json::from_str(&body)
            .with_context(|| format!("record {} is malformed", path.display()))?;
        Ok(Some(record))
    }
}
