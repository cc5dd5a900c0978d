//! Application configuration constants.
//! File names, thresholds and defaults in one place.

use std::sync::OnceLock;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived file names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    db_filename: String,
    settings_filename: String,
    manifest_filename: String,
    workspace_env_key: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                db_filename: format!("{pkg}.db"),
                settings_filename: format!("{pkg}.toml"),
                manifest_filename: ".manifest.json".to_string(),
                workspace_env_key: format!("{}_WORKSPACE", pkg.to_uppercase()),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Entity store file inside the workspace.
    pub fn db_filename(&self) -> &str {
        &self.db_filename
    }

    /// Optional settings file inside the workspace.
    pub fn settings_filename(&self) -> &str {
        &self.settings_filename
    }

    /// Export manifest inside `exports/`.
    pub fn manifest_filename(&self) -> &str {
        &self.manifest_filename
    }

    /// Environment variable naming the workspace directory.
    pub fn workspace_env_key(&self) -> &str {
        &self.workspace_env_key
    }
}

// ---- Hashing ----

/// Hashing I/O thresholds and buffer sizes.
pub struct HashingConsts;

impl HashingConsts {
    /// File size above which hashing uses memory-mapped I/O (bytes). 100 MB.
    pub const HASH_MMAP_THRESHOLD: u64 = 100 * 1024 * 1024;
    /// Chunk size for reading files below mmap threshold (bytes). 1 MB.
    pub const HASH_READ_CHUNK_SIZE: usize = 1024 * 1024;
}

// ---- Lineage ----

/// Default maximum depth of a lineage tree.
pub const DEFAULT_TRACE_DEPTH: usize = 5;

/// Directory under the workspace that receives relative lineage export destinations.
pub const TRACE_DIR: &str = "trace";

// ---- Listing ----

/// Default number of entries shown by `list`.
pub const DEFAULT_LIST_LIMIT: usize = 20;
