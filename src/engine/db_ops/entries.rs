//! Artifact rows and lineage edges.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::PathBuf;

use crate::TrackError;
use crate::engine::tools::path_to_db_string;
use crate::{ArtifactKind, DataEntry, NewEntry};

use super::{db_time_string, now_db_string, parse_db_time};

const SELECT_ENTRY: &str = "SELECT id, kind, storage_path, original_path, description, content_hash, created_at FROM data_entries";

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<DataEntry> {
    let kind: String = row.get(1)?;
    let kind = kind.parse::<ArtifactKind>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            e.into(),
        )
    })?;
    let storage_path: String = row.get(2)?;
    let original_path: Option<String> = row.get(3)?;
    let created_at: String = row.get(6)?;
    Ok(DataEntry {
        id: row.get(0)?,
        kind,
        storage_path: PathBuf::from(storage_path),
        original_path: original_path.map(PathBuf::from),
        description: row.get(4)?,
        content_hash: row.get(5)?,
        created_at: parse_db_time(6, &created_at)?,
    })
}

/// Insert a new artifact row and return it with its assigned id.
pub fn insert_entry(conn: &Connection, new: &NewEntry) -> Result<DataEntry> {
    conn.execute(
        "INSERT INTO data_entries (kind, storage_path, original_path, description, content_hash, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            new.kind.as_str(),
            path_to_db_string(&new.storage_path),
            new.original_path.as_deref().map(path_to_db_string),
            new.description,
            new.content_hash,
            now_db_string(),
        ],
    )
    .context("insert data entry")?;
    let id = conn.last_insert_rowid();
    require_entry(conn, id)
}

pub fn get_entry(conn: &Connection, id: i64) -> Result<Option<DataEntry>> {
    let sql = format!("{SELECT_ENTRY} WHERE id = ?1");
    conn.query_row(&sql, [id], row_to_entry)
        .optional()
        .context("load data entry")
}

/// Like [`get_entry`] but a missing row is [`TrackError::EntryNotFound`].
pub fn require_entry(conn: &Connection, id: i64) -> Result<DataEntry> {
    get_entry(conn, id)?.ok_or_else(|| TrackError::EntryNotFound(id).into())
}

pub fn entry_exists(conn: &Connection, id: i64) -> Result<bool> {
    let n: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM data_entries WHERE id = ?1",
            [id],
            |r| r.get(0),
        )
        .context("check data entry")?;
    Ok(n > 0)
}

pub fn entry_count(conn: &Connection) -> Result<usize> {
    let n: i64 = conn
        .query_row("SELECT COUNT(*) FROM data_entries", [], |r| r.get(0))
        .context("count data entries")?;
    Ok(n.max(0) as usize)
}

/// Most recent entries first.
pub fn list_recent(conn: &Connection, limit: usize) -> Result<Vec<DataEntry>> {
    let sql = format!("{SELECT_ENTRY} ORDER BY created_at DESC, id DESC LIMIT ?1");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([limit as i64], row_to_entry)?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .context("list recent entries")
}

/// Entries created within `[start, end]` (both inclusive), oldest first.
pub fn list_between(
    conn: &Connection,
    start: &DateTime<Utc>,
    end: &DateTime<Utc>,
) -> Result<Vec<DataEntry>> {
    let sql = format!("{SELECT_ENTRY} WHERE created_at BETWEEN ?1 AND ?2 ORDER BY created_at, id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params![db_time_string(start), db_time_string(end)],
        row_to_entry,
    )?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .context("list entries between")
}

/// Prepend `note` to the entry's description.
pub fn prepend_description(conn: &Connection, id: i64, note: &str) -> Result<()> {
    let n = conn
        .execute(
            "UPDATE data_entries SET description = ?1 || description WHERE id = ?2",
            params![note, id],
        )
        .context("update description")?;
    if n == 0 {
        return Err(TrackError::EntryNotFound(id).into());
    }
    Ok(())
}

/// Record `parent_id -> child_id`. Re-inserting an existing edge is a no-op.
pub fn add_parent_edge(conn: &Connection, parent_id: i64, child_id: i64) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO data_relationships (parent_id, child_id) VALUES (?1, ?2)",
        [parent_id, child_id],
    )
    .context("insert lineage edge")?;
    Ok(())
}

/// Direct parents of `child_id`, ordered by id.
pub fn parent_ids(conn: &Connection, child_id: i64) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare(
        "SELECT parent_id FROM data_relationships WHERE child_id = ?1 ORDER BY parent_id",
    )?;
    let rows = stmt.query_map([child_id], |r| r.get(0))?;
    rows.collect::<rusqlite::Result<Vec<i64>>>()
        .context("load parents")
}

/// Direct children of `parent_id`, ordered by id.
pub fn child_ids(conn: &Connection, parent_id: i64) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare(
        "SELECT child_id FROM data_relationships WHERE parent_id = ?1 ORDER BY child_id",
    )?;
    let rows = stmt.query_map([parent_id], |r| r.get(0))?;
    rows.collect::<rusqlite::Result<Vec<i64>>>()
        .context("load children")
}
