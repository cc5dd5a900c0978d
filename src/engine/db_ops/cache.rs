//! File-mtime cache and step-result cache. Rows are insert-only; the newest row per key wins.

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};

use crate::MTimeRecord;

use super::now_db_string;

/// Most recent mtime record for the exact path string.
pub fn latest_mtime_record(conn: &Connection, file_path: &str) -> Result<Option<MTimeRecord>> {
    conn.query_row(
        "SELECT data_entry_id, mtime_ns FROM file_mtime_cache WHERE file_path = ?1 \
         ORDER BY created_at DESC, id DESC LIMIT 1",
        [file_path],
        |r| {
            Ok(MTimeRecord {
                data_entry_id: r.get(0)?,
                mtime_ns: r.get(1)?,
            })
        },
    )
    .optional()
    .context("query file mtime cache")
}

pub fn insert_mtime_record(
    conn: &Connection,
    file_path: &str,
    data_entry_id: i64,
    mtime_ns: i64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO file_mtime_cache (file_path, data_entry_id, mtime_ns, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![file_path, data_entry_id, mtime_ns, now_db_string()],
    )
    .context("insert file mtime cache")?;
    Ok(())
}

/// Output id of the most recent step-cache row for `input_hash`.
pub fn latest_step_cache(conn: &Connection, input_hash: &str) -> Result<Option<i64>> {
    conn.query_row(
        "SELECT output_id FROM step_cache WHERE input_hash = ?1 \
         ORDER BY created_at DESC, id DESC LIMIT 1",
        [input_hash],
        |r| r.get(0),
    )
    .optional()
    .context("query step cache")
}

pub fn insert_step_cache(conn: &Connection, input_hash: &str, output_id: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO step_cache (input_hash, output_id, created_at) VALUES (?1, ?2, ?3)",
        params![input_hash, output_id, now_db_string()],
    )
    .context("insert step cache")?;
    Ok(())
}

pub fn step_cache_count(conn: &Connection) -> Result<usize> {
    let n: i64 = conn
        .query_row("SELECT COUNT(*) FROM step_cache", [], |r| r.get(0))
        .context("count step cache")?;
    Ok(n.max(0) as usize)
}
