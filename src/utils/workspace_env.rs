//! Workspace directory lookup: explicit flag → env var → `.env` in the current dir → current dir.

use log::debug;
use std::path::{Path, PathBuf};

use crate::utils::config::PackagePaths;

fn try_env_then_dotenv(dir: &Path) -> Option<String> {
    let key = PackagePaths::get().workspace_env_key();
    if let Ok(s) = std::env::var(key) {
        let s = s.trim().to_string();
        if !s.is_empty() {
            return Some(s);
        }
    }
    let env_path = dir.join(".env");
    if env_path.is_file() {
        let _ = dotenvy::from_path(&env_path);
        if let Ok(s) = std::env::var(key) {
            let s = s.trim().to_string();
            if !s.is_empty() {
                return Some(s);
            }
        }
    }
    None
}

/// Resolve the workspace root. `explicit` (the `-w` flag) wins; `cwd` is the fallback.
pub fn resolve_workspace_dir(explicit: Option<&Path>, cwd: &Path) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    match try_env_then_dotenv(cwd) {
        Some(s) => {
            debug!("Workspace from environment: {}", s);
            PathBuf::from(s)
        }
        None => cwd.to_path_buf(),
    }
}
