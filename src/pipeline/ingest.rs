//! Initial load: match source files, reuse unchanged ones via the mtime cache, copy the rest.

use anyhow::{Context, Result};
use kdam::Animation;
use log::{debug, info, warn};
use rusqlite::Connection;
use serde_json::json;
use std::path::Path;

use super::config::InitialLoadConfig;
use super::walk::collect_matches;
use crate::engine::db_ops;
use crate::engine::hashing::hash_file_hex;
use crate::engine::progress::{
    ProgressBarConfig, create_progress_bar, finish_progress_bar, update_progress_bar,
};
use crate::engine::storage::ArtifactStorage;
use crate::engine::tools::{absolute_path, file_mtime_ns, mtime_changed, path_to_db_string};
use crate::{ArtifactKind, DataEntry, NewEntry, OpType, Opts, TrackError};

/// Ids produced by one initial load, in matched-path order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub ids: Vec<i64>,
    /// Files copied into storage this run.
    pub imported: usize,
    /// Files whose previous artifact was reused.
    pub reused: usize,
}

/// Resolve `config` to files and return one artifact id per file.
///
/// A file whose latest mtime-cache row still matches (within `opts.mtime_window_ns`) keeps its
/// artifact; otherwise it is copied into `raw/` as a new artifact. Every file is tagged with its
/// matched path, its include tags and the load-wide tags. Each file commits on its own.
pub fn load_initial_files(
    conn: &mut Connection,
    storage: &ArtifactStorage,
    config: &InitialLoadConfig,
    opts: &Opts,
) -> Result<IngestReport> {
    if config.kind != ArtifactKind::Raw {
        return Err(TrackError::InvalidConfig(format!(
            "initial_load kind must be raw, got {}",
            config.kind
        ))
        .into());
    }
    let matches = collect_matches(config)?;
    debug!("Initial load matched {} file(s)", matches.len());

    let mut pb = opts.verbose.then(|| {
        create_progress_bar(ProgressBarConfig::new(
            matches.len(),
            "Ingesting",
            Animation::Classic,
        ))
    });

    let mut report = IngestReport::default();
    for (path_str, include_tags) in &matches {
        let src = Path::new(path_str);
        let mtime_ns = file_mtime_ns(src)?;

        let tx = conn.transaction().context("begin transaction")?;
        let id = match reusable_entry(&tx, path_str, mtime_ns, opts.mtime_window_ns)? {
            Some(id) => {
                debug!("Unchanged: {} (entry {})", path_str, id);
                report.reused += 1;
                id
            }
            None => {
                let id = import_file(&tx, storage, src, path_str, mtime_ns)?;
                report.imported += 1;
                id
            }
        };
        db_ops::attach_tag(&tx, id, path_str)?;
        db_ops::attach_tags(&tx, id, include_tags.as_slice())?;
        db_ops::attach_tags(&tx, id, config.tags.as_slice())?;
        tx.commit().context("commit transaction")?;

        report.ids.push(id);
        update_progress_bar(pb.as_mut(), 1);
    }
    finish_progress_bar(pb.as_mut());

    info!(
        "Initial load: {} file(s), {} new, {} unchanged",
        report.ids.len(),
        report.imported,
        report.reused
    );
    Ok(report)
}

/// Artifact id from the latest mtime-cache row when the mtime still matches and the row's
/// artifact and its stored file still exist.
fn reusable_entry(
    conn: &Connection,
    path_str: &str,
    mtime_ns: i64,
    window_ns: i64,
) -> Result<Option<i64>> {
    let Some(record) = db_ops::latest_mtime_record(conn, path_str)? else {
        return Ok(None);
    };
    if mtime_changed(mtime_ns, record.mtime_ns, window_ns) {
        debug!("Modified: {}", path_str);
        return Ok(None);
    }
    match db_ops::get_entry(conn, record.data_entry_id)? {
        Some(entry) if entry.storage_path.is_file() => Ok(Some(entry.id)),
        Some(entry) => {
            warn!(
                "Entry {} for {} is missing its file {}; re-importing",
                entry.id,
                path_str,
                entry.storage_path.display()
            );
            Ok(None)
        }
        None => Ok(None),
    }
}

fn import_file(
    conn: &Connection,
    storage: &ArtifactStorage,
    src: &Path,
    path_str: &str,
    mtime_ns: i64,
) -> Result<i64> {
    let entry = import_raw(conn, storage, src, &format!("Loaded from {path_str}"))?;
    if let Err(e) = db_ops::insert_mtime_record(conn, path_str, entry.id, mtime_ns) {
        let _ = std::fs::remove_file(&entry.storage_path);
        return Err(e);
    }
    Ok(entry.id)
}

/// Copy `src` into `raw/` and record it as a raw artifact with an ingest history row.
/// The stored copy is removed again if recording fails.
pub fn import_raw(
    conn: &Connection,
    storage: &ArtifactStorage,
    src: &Path,
    description: &str,
) -> Result<DataEntry> {
    let stored = storage.store_raw(src)?;
    let recorded = (|| -> Result<DataEntry> {
        let content_hash = hash_file_hex(&stored)?;
        let original = absolute_path(src);
        let entry = db_ops::insert_entry(
            conn,
            &NewEntry {
                kind: ArtifactKind::Raw,
                storage_path: stored.clone(),
                original_path: Some(original.clone()),
                description: description.to_string(),
                content_hash: Some(content_hash.clone()),
            },
        )?;
        db_ops::log_operation(
            conn,
            entry.id,
            OpType::Ingest,
            &json!({
                "source": path_to_db_string(&original),
                "content_hash": content_hash,
            }),
        )?;
        Ok(entry)
    })();
    if recorded.is_err() {
        let _ = std::fs::remove_file(&stored);
    }
    recorded
}
