//! Load `exptrack.toml` from the workspace (CLI only). The library takes an explicit [`Opts`].

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::engine::tools::mtime_window_ns;
use crate::{Opts, TrackError};
use crate::utils::config::PackagePaths;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ExptrackToml {
    #[serde(default)]
    settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsSection {
    db_path: Option<String>,
    verbose: Option<bool>,
    /// Seconds.
    mtime_window: Option<i64>,
    trace_depth: Option<usize>,
}

/// Load the settings file from `dir` if present. Returns None if missing or unreadable.
pub(crate) fn load_settings_toml(dir: &Path) -> Option<ExptrackToml> {
    let path = dir.join(PackagePaths::get().settings_filename());
    let s = std::fs::read_to_string(&path).ok()?;
    toml::from_str(&s)
        .map_err(|e| log::warn!("{}: {}", path.display(), e))
        .ok()
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($sec:expr, $opts:expr, $sec_field:ident => $opts_field:ident) => {
        if let Some(v) = $sec.$sec_field {
            $opts.$opts_field = v;
        }
    };
}

/// Apply file config to opts (only fields present in the file). Call before applying CLI flags.
pub(crate) fn apply_file_to_opts(file: &ExptrackToml, opts: &mut Opts) -> Result<(), TrackError> {
    let sec = &file.settings;
    if let Some(ref p) = sec.db_path {
        opts.db_path = Some(PathBuf::from(p));
    }
    apply_file_opt!(sec, opts, verbose => verbose);
    apply_file_opt!(sec, opts, trace_depth => trace_depth);
    if let Some(secs) = sec.mtime_window {
        opts.mtime_window_ns = mtime_window_ns(secs)?;
    }
    Ok(())
}
