pub const BASE_MIGRATION: &str = r#"
CREATE TABLE IF NOT EXISTS catalog_snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source TEXT NOT NULL,
    fetched_at TEXT NOT NULL,
    raw_hash TEXT NOT NULL,
    snapshot_json TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_snapshots_source_fetched
    ON catalog_snapshots(source, fetched_at DESC);

CREATE TABLE IF NOT EXISTS check_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    index_number TEXT NOT NULL,
    programme_id INTEGER NOT NULL,
    programme_name TEXT NOT NULL,
    eligible INTEGER NOT NULL,
    unmet_count INTEGER NOT NULL,
    checked_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_checks_index_programme
    ON check_history(index_number, programme_id, id DESC);
"#;
