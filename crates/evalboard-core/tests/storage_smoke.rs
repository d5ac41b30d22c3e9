use evalboard_core::normalize::{normalize, IngestContext, NormalizeDefaults};
use evalboard_core::storage::{JsonDirStore, RecordStore, SqliteStore};
use evalboard_core::EvalRun;
use serde_json::json;
use tempfile::tempdir;

fn run(score: f64) -> anyhow::Result<EvalRun> {
    let raw = json!({"input": "Explain this error", "actual_output": "disk full", "score": score});
    Ok(normalize(
        &raw,
        &IngestContext::now(Some("upload.json")),
        &NormalizeDefaults::default(),
    )?)
}

#[test]
fn test_sqlite_lifecycle() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let db_path = dir.path().join("evalboard.db");

    let store = SqliteStore::open(&db_path)?;
    let a = store.put(&run(0.8)?)?;
    let b = store.put(&run(0.4)?)?;
    assert!(b > a);

    // Re-opening runs the schema bootstrap again without touching data.
    let store = SqliteStore::open(&db_path)?;
    assert_eq!(store.count()?, 2);

    let conn = rusqlite::Connection::open(&db_path)?;
    let kinds: Vec<String> = conn
        .prepare("SELECT schema_kind FROM records ORDER BY id")?
        .query_map([], |r| r.get(0))?
        .collect::<Result<_, _>>()?;
    assert_eq!(kinds, vec!["flat_stages", "flat_stages"]);
    let version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    assert_eq!(version, 1);
    Ok(())
}

#[test]
fn test_sqlite_malformed_row_is_skipped() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let db_path = dir.path().join("evalboard.db");
    let store = SqliteStore::open(&db_path)?;
    let good = store.put(&run(0.9)?)?;

    let conn = rusqlite::Connection::open(&db_path)?;
    conn.execute(
        "INSERT INTO records(id, recorded_at, payload_sha256, schema_kind, record_json)
         VALUES (?1, '2026-01-01T00:00:00Z', 'x', 'flat_stages', '{\"id\": 1, \"score\": ')",
        [good + 10],
    )?;

    let scan = store.scan()?;
    assert_eq!(scan.records.len(), 1);
    assert_eq!(scan.records[0].id, good);
    assert_eq!(scan.skipped.len(), 1);
    assert_eq!(scan.skipped[0].location, format!("records.id={}", good + 10));

    assert_eq!(store.list_all()?.len(), 1);
    Ok(())
}

#[test]
fn test_json_dir_malformed_file_is_skipped() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let store = JsonDirStore::open(dir.path())?;
    store.put(&run(0.7)?)?;
    std::fs::write(dir.path().join("run_1.json"), "not json at all")?;
    std::fs::write(dir.path().join(".hidden.json"), "{}")?;

    let all = store.list_all()?;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].run.score, 0.7);

    // Still usable after encountering the bad file.
    store.put(&run(0.2)?)?;
    assert_eq!(store.list_all()?.len(), 2);
    Ok(())
}

#[test]
fn test_list_twice_is_identical() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let stores: Vec<Box<dyn RecordStore>> = vec![
        Box::new(SqliteStore::open(&dir.path().join("a.db"))?),
        Box::new(JsonDirStore::open(&dir.path().join("runs"))?),
    ];
    for store in stores {
        for s in [0.1, 0.5, 0.9] {
            store.put(&run(s)?)?;
        }
        let first = store.list_all()?;
        let second = store.list_all()?;
        assert_eq!(first, second);
        assert!(first.windows(2).all(|w| w[0].id < w[1].id));

        let recent = store.list_recent()?;
        assert_eq!(recent.first().map(|r| r.id), first.last().map(|r| r.id));
        assert_eq!(recent.len(), first.len());
    }
    Ok(())
}

#[test]
fn test_rapid_puts_get_unique_ids() -> anyhow::Result<()> {
    let store = SqliteStore::memory()?;
    let mut ids = Vec::new();
    for _ in 0..50 {
        ids.push(store.put(&run(0.5)?)?);
    }
    let mut sorted = ids.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), 50);
    assert_eq!(sorted, ids);
    Ok(())
}
