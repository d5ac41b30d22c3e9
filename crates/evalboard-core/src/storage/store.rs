use super::{system_clock, Clock, IdStrategy, MalformedRecord, RecordStore, Scan};
use crate::errors::StoreError;
use crate::model::{EvalRecord, EvalRun};
use anyhow::Context;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// SQLite-backed record store. The schema is created once, in the constructor.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    id_strategy: IdStrategy,
    clock: Clock,
}

impl SqliteStore {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open sqlite db {}", path.display()))?;
        Self::init(conn, &path.display().to_string())
    }

    pub fn memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory sqlite db")?;
        Self::init(conn, ":memory:")
    }

    fn init(conn: Connection, location: &str) -> anyhow::Result<Self> {
        conn.execute_batch(super::schema::DDL)
            .context("failed to create records schema")?;
        conn.pragma_update(None, "user_version", super::schema::SCHEMA_VERSION)?;
        tracing::debug!(event = "evalboard.store.bootstrap", backend = "sqlite", location = %location);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            id_strategy: IdStrategy::default(),
            clock: system_clock(),
        })
    }

    pub fn with_id_strategy(mut self, id_strategy: IdStrategy) -> Self {
        self.id_strategy = id_strategy;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned.into())
    }
}

impl RecordStore for SqliteStore {
    fn put(&self, run: &EvalRun) -> anyhow::Result<i64> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let last_id: Option<i64> = tx.query_row("SELECT MAX(id) FROM records", [], |r| r.get(0))?;
        let id = self.id_strategy.next_id((self.clock)(), last_id);

        let duplicate_of = first_with_payload(&tx, &run.source.payload_sha256)?;
        if let Some(existing) = duplicate_of {
            tracing::warn!(
                event = "evalboard.store.duplicate_payload",
                existing_id = existing,
                sha256 = %run.source.payload_sha256,
                "payload was already ingested; storing again"
            );
        }

        let record_json = serde_json::to_string(&EvalRecord::new(id, run.clone()))?;
        let inserted = tx.execute(
            "INSERT INTO records(id, recorded_at, payload_sha256, schema_kind, record_json)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id,
                run.recorded_at.to_rfc3339(),
                run.source.payload_sha256,
                run.source.schema.as_str(),
                record_json
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                return Err(StoreError::DuplicateId(id).into());
            }
            Err(e) => return Err(e).context("insert record"),
        }

        tx.commit()?;
        Ok(id)
    }

    fn scan(&self) -> anyhow::Result<Scan> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id, record_json FROM records ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut scan = Scan::default();
        for row in rows {
            let (id, json) = row?;
            match serde_json::from_str::<EvalRecord>(&json) {
                Ok(mut record) => {
                    // The column is authoritative for ordering and lookup.
                    record.id = id;
                    scan.records.push(record);
                }
                Err(e) => scan.skipped.push(MalformedRecord {
                    location: format!("records.id={}", id),
                    error: e.to_string(),
                }),
            }
        }
        Ok(scan)
    }

    fn get(&self, id: i64) -> anyhow::Result<Option<EvalRecord>> {
        let conn = self.lock()?;
        let json: Option<String> = conn
            .query_row(
                "SELECT record_json FROM records WHERE id = ?1",
                params![id],
                |r| r.get(0),
            )
            .optional()?;
        let Some(json) = json else {
            return Ok(None);
        };
        let mut record: EvalRecord = serde_json::from_str(&json)
            .with_context(|| format!("record {} is malformed", id))?;
        record.id = id;
        Ok(Some(record))
    }
}

/// Lowest id already stored for this payload digest.
fn first_with_payload(conn: &Connection, sha256: &str) -> anyhow::Result<Option<i64>> {
    let id = conn
        .query_row(
            "SELECT id FROM records WHERE payload_sha256 = ?1 ORDER BY id LIMIT 1",
            params![sha256],
            |r| r.get(0),
        )
        .optional()?;
    Ok(id)
}
