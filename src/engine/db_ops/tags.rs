//! Tags: unique names, set semantics per artifact.

use anyhow::{Context, Result};
use rusqlite::{Connection, params};

/// Attach `name` to `data_id`, creating the tag row on first use. Already-held tags are a no-op.
pub fn attach_tag(conn: &Connection, data_id: i64, name: &str) -> Result<()> {
    conn.execute("INSERT OR IGNORE INTO tags (name) VALUES (?1)", [name])
        .context("insert tag")?;
    let tag_id: i64 = conn
        .query_row("SELECT id FROM tags WHERE name = ?1", [name], |r| r.get(0))
        .context("load tag id")?;
    conn.execute(
        "INSERT OR IGNORE INTO data_tags (data_id, tag_id) VALUES (?1, ?2)",
        params![data_id, tag_id],
    )
    .context("attach tag")?;
    Ok(())
}

pub fn attach_tags<S: AsRef<str>>(conn: &Connection, data_id: i64, names: &[S]) -> Result<()> {
    for name in names {
        attach_tag(conn, data_id, name.as_ref())?;
    }
    Ok(())
}

/// Tag names of an artifact, sorted.
pub fn tags_of(conn: &Connection, data_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT t.name FROM tags t JOIN data_tags dt ON dt.tag_id = t.id \
         WHERE dt.data_id = ?1 ORDER BY t.name",
    )?;
    let rows = stmt.query_map([data_id], |r| r.get(0))?;
    rows.collect::<rusqlite::Result<Vec<String>>>()
        .context("load tags")
}

/// Number of distinct tag rows.
pub fn tag_count(conn: &Connection) -> Result<usize> {
    let n: i64 = conn
        .query_row("SELECT COUNT(*) FROM tags", [], |r| r.get(0))
        .context("count tags")?;
    Ok(n.max(0) as usize)
}
