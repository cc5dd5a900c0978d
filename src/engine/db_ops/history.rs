//! Append-only operation log.

use anyhow::{Context, Result};
use rusqlite::{Connection, params};

use crate::{OpType, Operation};

use super::{now_db_string, parse_db_time};

pub fn log_operation(
    conn: &Connection,
    data_entry_id: i64,
    op_type: OpType,
    parameters: &serde_json::Value,
) -> Result<()> {
    conn.execute(
        "INSERT INTO operations (op_type, parameters, data_entry_id, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            op_type.as_str(),
            parameters.to_string(),
            data_entry_id,
            now_db_string()
        ],
    )
    .context("insert operation")?;
    Ok(())
}

/// Operations recorded for one artifact, oldest first.
pub fn operations_for(conn: &Connection, data_entry_id: i64) -> Result<Vec<Operation>> {
    let mut stmt = conn.prepare(
        "SELECT id, op_type, parameters, data_entry_id, created_at FROM operations \
         WHERE data_entry_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map([data_entry_id], |row| {
        let created_at: String = row.get(4)?;
        Ok(Operation {
            id: row.get(0)?,
            op_type: row.get(1)?,
            parameters: row.get(2)?,
            data_entry_id: row.get(3)?,
            created_at: parse_db_time(4, &created_at)?,
        })
    })?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .context("load operations")
}
