//! Artifact storage: managed copies under `raw/`, `processed/` and named exports under `exports/`.

use anyhow::{Context, Result};
use chrono::Utc;
use log::debug;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use uuid::Uuid;

use super::tools::{absolute_path, copy_with_parents};
use crate::utils::config::PackagePaths;
use crate::{DataEntry, ExportRecord, TrackError};

/// Export name → record, as persisted in the manifest.
pub type ExportManifest = BTreeMap<String, ExportRecord>;

#[derive(Clone, Debug)]
pub struct ArtifactStorage {
    base: PathBuf,
}

impl ArtifactStorage {
    pub const RAW_DIR: &'static str = "raw";
    pub const PROCESSED_DIR: &'static str = "processed";
    pub const EXPORTS_DIR: &'static str = "exports";

    /// Use `base` as the storage root, creating the type-specific directories. The root is
    /// made absolute so stored paths stay valid from any working directory.
    pub fn new(base: &Path) -> Result<Self> {
        std::fs::create_dir_all(base)
            .with_context(|| format!("create storage root {}", base.display()))?;
        let storage = Self {
            base: absolute_path(base),
        };
        for dir in [
            storage.raw_dir(),
            storage.processed_dir(),
            storage.exports_dir(),
        ] {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("create storage directory {}", dir.display()))?;
        }
        Ok(storage)
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.base.join(Self::RAW_DIR)
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.base.join(Self::PROCESSED_DIR)
    }

    pub fn exports_dir(&self) -> PathBuf {
        self.base.join(Self::EXPORTS_DIR)
    }

    fn manifest_path(&self) -> PathBuf {
        self.exports_dir()
            .join(PackagePaths::get().manifest_filename())
    }

    /// Copy `src` into `raw/` under a fresh unique name that keeps the source extension.
    pub fn store_raw(&self, src: &Path) -> Result<PathBuf> {
        let target = self.raw_dir().join(unique_file_name(&extension_of(src)));
        std::fs::copy(src, &target)
            .with_context(|| format!("store raw file {} -> {}", src.display(), target.display()))?;
        debug!("Stored {} as {}", src.display(), target.display());
        Ok(target)
    }

    /// Fresh path in `processed/` for a processor to write to. Nothing is created on disk.
    pub fn allocate_processed(&self, ext: &str) -> PathBuf {
        self.processed_dir().join(unique_file_name(ext))
    }

    /// Copy `entry`'s stored file to `exports/<name>` and record it in the manifest.
    /// `name` must be relative and stay inside `exports/`; sub-directories are created.
    pub fn export(&self, entry: &DataEntry, name: &str) -> Result<PathBuf> {
        let rel = Path::new(name);
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if name.is_empty() || escapes || rel == Path::new(PackagePaths::get().manifest_filename())
        {
            return Err(TrackError::InvalidConfig(format!("invalid export name: {name}")).into());
        }
        let dest = self.exports_dir().join(rel);
        copy_with_parents(&entry.storage_path, &dest)?;

        let mut manifest = self.load_manifest()?;
        manifest.insert(
            name.to_string(),
            ExportRecord {
                artifact_id: entry.id,
                created_at: Utc::now(),
            },
        );
        self.save_manifest(&manifest)?;
        debug!("Exported entry {} to {}", entry.id, dest.display());
        Ok(dest)
    }

    /// Current export manifest (empty when nothing was exported yet).
    pub fn load_manifest(&self) -> Result<ExportManifest> {
        let path = self.manifest_path();
        if !path.exists() {
            return Ok(ExportManifest::new());
        }
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("read export manifest {}", path.display()))?;
        serde_json::from_str(&s).with_context(|| format!("parse export manifest {}", path.display()))
    }

    fn save_manifest(&self, manifest: &ExportManifest) -> Result<()> {
        let path = self.manifest_path();
        let s = serde_json::to_string_pretty(manifest).context("serialize export manifest")?;
        std::fs::write(&path, s)
            .with_context(|| format!("write export manifest {}", path.display()))
    }
}

/// `.ext` of `path`, or empty when it has none.
fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default()
}

fn unique_file_name(ext: &str) -> String {
    format!("{}{}", Uuid::new_v4().simple(), ext)
}
