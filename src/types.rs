//! Public types shared by the store, processors, pipeline and lineage modules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Processor parameters. A `BTreeMap` so serialization is key-sorted (canonical JSON).
pub type Params = BTreeMap<String, serde_json::Value>;

/// Kind of a tracked artifact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Raw,
    Processed,
    Plot,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Raw => "raw",
            ArtifactKind::Processed => "processed",
            ArtifactKind::Plot => "plot",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(ArtifactKind::Raw),
            "processed" => Ok(ArtifactKind::Processed),
            "plot" | "export" => Ok(ArtifactKind::Plot),
            other => Err(format!("unknown artifact kind: {other}")),
        }
    }
}

/// One tracked artifact (a row of `data_entries`).
#[derive(Clone, Debug, PartialEq)]
pub struct DataEntry {
    pub id: i64,
    pub kind: ArtifactKind,
    /// Managed copy inside the workspace.
    pub storage_path: PathBuf,
    /// Source path before ingestion. Raw artifacts only.
    pub original_path: Option<PathBuf>,
    pub description: String,
    /// Blake3 hex digest of the stored file, when computed at ingestion.
    pub content_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to insert a new artifact; the store assigns id and timestamp.
#[derive(Clone, Debug)]
pub struct NewEntry {
    pub kind: ArtifactKind,
    pub storage_path: PathBuf,
    pub original_path: Option<PathBuf>,
    pub description: String,
    pub content_hash: Option<String>,
}

/// What a processor sees of one input artifact.
#[derive(Clone, Debug, PartialEq)]
pub struct InputDescriptor {
    pub id: i64,
    pub path: PathBuf,
    pub original_path: Option<PathBuf>,
    pub tags: Vec<String>,
}

/// Kind of an audit-log operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpType {
    Ingest,
    Process,
}

impl OpType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpType::Ingest => "ingest",
            OpType::Process => "process",
        }
    }
}

/// Append-only history row.
#[derive(Clone, Debug)]
pub struct Operation {
    pub id: i64,
    pub op_type: String,
    pub parameters: String,
    pub data_entry_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Authoritative file-mtime cache row for one source path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MTimeRecord {
    pub data_entry_id: i64,
    pub mtime_ns: i64,
}

/// One entry of the export manifest (`exports/.manifest.json`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub artifact_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Workspace-level options (CLI, settings file, or set directly by a library caller).
#[derive(Clone, Debug)]
pub struct Opts {
    /// Entity store path. When None, uses `<workspace>/<package db filename>` (e.g. `exptrack.db`).
    pub db_path: Option<PathBuf>,
    /// Debug logging and progress bars.
    pub verbose: bool,
    /// Ingestion mtime tolerance in nanoseconds; 0 means the mtime must match exactly.
    pub mtime_window_ns: i64,
    /// Default lineage traversal depth.
    pub trace_depth: usize,
}

impl Default for Opts {
    fn default() -> Self {
        Opts {
            db_path: None,
            verbose: false,
            mtime_window_ns: 0,
            trace_depth: crate::utils::config::DEFAULT_TRACE_DEPTH,
        }
    }
}
