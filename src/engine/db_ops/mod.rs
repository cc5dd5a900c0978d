//! Entity store: schema, open, artifacts, tags, lineage edges, history and cache tables.
//!
//! Everything here is a free function over `&Connection` so callers can pass either a plain
//! connection or an open `Transaction` (which derefs to one).

mod cache;
mod connection;
mod entries;
mod history;
mod tags;

pub use cache::{
    insert_mtime_record, insert_step_cache, latest_mtime_record, latest_step_cache,
    step_cache_count,
};
pub use connection::{open_db, open_db_in_memory};
pub use entries::{
    add_parent_edge, child_ids, entry_count, entry_exists, get_entry, insert_entry, list_between,
    list_recent, parent_ids, prepend_description, require_entry,
};
pub use history::{log_operation, operations_for};
pub use tags::{attach_tag, attach_tags, tag_count, tags_of};

use chrono::{DateTime, SecondsFormat, Utc};

/// WAL tuning pragmas (synchronous, autocheckpoint, size limit). Use after PRAGMA journal_mode = WAL.
pub(crate) const WAL_PRAGMAS: &str = r#"
        PRAGMA synchronous = NORMAL;
        PRAGMA wal_autocheckpoint = 10000;
        PRAGMA journal_size_limit = 67108864;
        PRAGMA busy_timeout = 5000;
        "#;

/// Schema for artifacts, tags, edges, history and both caches.
pub(crate) const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS data_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    kind TEXT NOT NULL,
    storage_path TEXT NOT NULL,
    original_path TEXT,
    description TEXT NOT NULL DEFAULT '',
    content_hash TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS data_tags (
    data_id INTEGER NOT NULL REFERENCES data_entries(id),
    tag_id INTEGER NOT NULL REFERENCES tags(id),
    PRIMARY KEY (data_id, tag_id)
);

CREATE TABLE IF NOT EXISTS data_relationships (
    parent_id INTEGER NOT NULL REFERENCES data_entries(id),
    child_id INTEGER NOT NULL REFERENCES data_entries(id),
    PRIMARY KEY (parent_id, child_id)
);
CREATE INDEX IF NOT EXISTS idx_rel_child ON data_relationships(child_id);
CREATE INDEX IF NOT EXISTS idx_rel_parent ON data_relationships(parent_id);

CREATE TABLE IF NOT EXISTS operations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    op_type TEXT NOT NULL,
    parameters TEXT NOT NULL,
    data_entry_id INTEGER NOT NULL REFERENCES data_entries(id),
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS file_mtime_cache (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    file_path TEXT NOT NULL,
    data_entry_id INTEGER NOT NULL REFERENCES data_entries(id),
    mtime_ns INTEGER NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_mtime_path ON file_mtime_cache(file_path);

CREATE TABLE IF NOT EXISTS step_cache (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    input_hash TEXT NOT NULL,
    output_id INTEGER NOT NULL REFERENCES data_entries(id),
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_step_hash ON step_cache(input_hash);
"#;

/// Timestamp as stored: fixed-width RFC 3339 so text order equals time order.
pub(crate) fn db_time_string(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn now_db_string() -> String {
    db_time_string(&Utc::now())
}

/// Parse a stored timestamp inside a row mapper.
pub(crate) fn parse_db_time(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}
