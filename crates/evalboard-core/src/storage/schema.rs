pub const SCHEMA_VERSION: i64 = 1;

pub const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS records (
  id INTEGER PRIMARY KEY,
  recorded_at TEXT NOT NULL,
  payload_sha256 TEXT NOT NULL,
  schema_kind TEXT NOT NULL,
  record_json TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_records_payload_sha256 ON records(payload_sha256);
"#;
