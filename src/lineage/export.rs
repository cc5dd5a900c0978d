//! Copy the raw files behind a lineage tree to a destination, preserving their layout.

use anyhow::{Context, Result};
use log::{debug, warn};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use super::tree::LineageNode;
use crate::engine::tools::{absolute_path, copy_with_parents, path_relative_to};

/// Why a raw file was not copied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// Artifact has no recorded source path.
    NoOriginalPath,
    /// Source is not under the shared prefix.
    OutsidePrefix,
    /// Source file no longer exists.
    SourceMissing,
}

#[derive(Clone, Debug, Default)]
pub struct ExportReport {
    /// Destination paths relative to the export directory.
    pub exported: Vec<PathBuf>,
    pub skipped: Vec<(PathBuf, SkipReason)>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Longest directory prefix shared by the source paths of the tree's raw artifacts.
///
/// When the shared prefix is itself one of the files (a single leaf), its parent directory is
/// used. `None` when there are no raw leaves or the paths share no component.
pub fn common_raw_prefix(root: &LineageNode) -> Option<PathBuf> {
    let paths: Vec<PathBuf> = root
        .raw_nodes()
        .filter_map(|n| n.entry.original_path.as_deref())
        .map(absolute_path)
        .collect();
    let (first, rest) = paths.split_first()?;

    let mut prefix: Vec<Component<'_>> = first.components().collect();
    for path in rest {
        let shared = prefix
            .iter()
            .zip(path.components())
            .take_while(|(a, b)| **a == *b)
            .count();
        prefix.truncate(shared);
    }
    if prefix.is_empty() {
        return None;
    }
    let prefix: PathBuf = prefix.iter().collect();
    if paths.iter().any(|p| *p == prefix) {
        return prefix.parent().map(Path::to_path_buf);
    }
    Some(prefix)
}

/// Copy every raw source file of the tree to `dest`, relative to `prefix`.
///
/// Each file is attempted independently; missing sources and files outside `prefix` are
/// skipped, copy errors are collected. A file reached through several branches is copied once.
pub fn export_raw_files(root: &LineageNode, dest: &Path, prefix: &Path) -> Result<ExportReport> {
    std::fs::create_dir_all(dest)
        .with_context(|| format!("create export directory {}", dest.display()))?;

    let mut report = ExportReport::default();
    let mut seen = HashSet::new();
    for node in root.raw_nodes() {
        let Some(original) = node.entry.original_path.as_deref() else {
            report
                .skipped
                .push((node.entry.storage_path.clone(), SkipReason::NoOriginalPath));
            continue;
        };
        let source = absolute_path(original);
        if !seen.insert(source.clone()) {
            continue;
        }
        let rel = match path_relative_to(&source, prefix) {
            Some(rel) if !rel.as_os_str().is_empty() => rel,
            _ => {
                warn!("{} is outside {}; skipped", source.display(), prefix.display());
                report.skipped.push((source, SkipReason::OutsidePrefix));
                continue;
            }
        };
        if !source.is_file() {
            warn!("Source file no longer exists: {}", source.display());
            report.skipped.push((source, SkipReason::SourceMissing));
            continue;
        }
        match copy_with_parents(&source, &dest.join(&rel)) {
            Ok(_) => {
                debug!("Exported {}", rel.display());
                report.exported.push(rel);
            }
            Err(e) => {
                warn!("Failed to export {}: {:#}", source.display(), e);
                report.failed.push((source, format!("{e:#}")));
            }
        }
    }
    Ok(report)
}
