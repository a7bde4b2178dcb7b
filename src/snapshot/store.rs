use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::catalog::CatalogSnapshot;
use crate::eligibility::history::CheckRecord;
use crate::snapshot::migrations::BASE_MIGRATION;

/// Local sqlite store for fetched catalog snapshots and the eligibility
/// check history. Sits outside the pure engine boundary.
pub struct SnapshotStore {
    conn: Connection,
}

impl SnapshotStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    pub fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(BASE_MIGRATION)?;
        Ok(())
    }

    pub fn insert_snapshot(&self, snapshot: &CatalogSnapshot) -> Result<()> {
        self.conn.execute(
            r#"
INSERT INTO catalog_snapshots(source, fetched_at, raw_hash, snapshot_json)
VALUES (?1, ?2, ?3, ?4)
"#,
            params![
                snapshot.source,
                snapshot.fetched_at.to_rfc3339(),
                snapshot.raw_hash,
                serde_json::to_string(snapshot)?
            ],
        )?;
        Ok(())
    }

    pub fn latest_snapshot(&self) -> Result<Option<CatalogSnapshot>> {
        let mut stmt = self.conn.prepare(
            r#"
SELECT snapshot_json
FROM catalog_snapshots
ORDER BY id DESC
LIMIT 1
"#,
        )?;
        let result = stmt.query_row([], |row| row.get::<_, String>(0));
        match result {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn insert_check_record(&self, record: &CheckRecord) -> Result<()> {
        self.conn.execute(
            r#"
INSERT INTO check_history(
    index_number, programme_id, programme_name, eligible, unmet_count, checked_at
) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
"#,
            params![
                record.index_number,
                record.programme_id as i64,
                record.programme_name,
                if record.eligible { 1 } else { 0 },
                record.unmet_count as i64,
                record.checked_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    pub fn load_history(
        &self,
        index_number: &str,
        programme_id: Option<u64>,
        limit: usize,
    ) -> Result<Vec<CheckRecord>> {
        let sql = if programme_id.is_some() {
            r#"
SELECT index_number, programme_id, programme_name, eligible, unmet_count, checked_at
FROM check_history
WHERE index_number = ?1 AND programme_id = ?2
ORDER BY id DESC
LIMIT ?3
"#
        } else {
            r#"
SELECT index_number, programme_id, programme_name, eligible, unmet_count, checked_at
FROM check_history
WHERE index_number = ?1
ORDER BY id DESC
LIMIT ?2
"#
        };

        let mut stmt = self.conn.prepare(sql)?;
        let rows = if let Some(programme_id) = programme_id {
            stmt.query_map(
                params![index_number, programme_id as i64, limit as i64],
                row_to_check_record,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?
        } else {
            stmt.query_map(params![index_number, limit as i64], row_to_check_record)?
                .collect::<std::result::Result<Vec<_>, _>>()?
        };
        Ok(rows)
    }
}

fn row_to_check_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<CheckRecord> {
    let checked_at_raw: String = row.get(5)?;
    let checked_at = DateTime::parse_from_rfc3339(&checked_at_raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());
    Ok(CheckRecord {
        index_number: row.get(0)?,
        programme_id: row.get::<_, i64>(1)? as u64,
        programme_name: row.get(2)?,
        eligible: row.get::<_, i64>(3)? != 0,
        unmet_count: row.get::<_, i64>(4)? as usize,
        checked_at,
    })
}
