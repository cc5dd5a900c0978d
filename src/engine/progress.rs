//! Progress bar utilities for ingestion

use kdam::{Animation, Bar, BarExt};

/// Configuration for creating a progress bar
pub struct ProgressBarConfig {
    pub total: usize,
    pub desc: &'static str,
    pub animation: Animation,
}

impl ProgressBarConfig {
    /// Create a new progress bar configuration
    pub fn new(total: usize, desc: &'static str, animation: Animation) -> Self {
        Self {
            total,
            desc,
            animation,
        }
    }
}

/// Create a progress bar with the given configuration
pub fn create_progress_bar(config: ProgressBarConfig) -> Bar {
    kdam::tqdm!(
        total = config.total,
        desc = config.desc,
        animation = config.animation,
        unit = " files"
    )
}

/// Advance the bar if one is shown. Display errors are ignored.
pub fn update_progress_bar(pb: Option<&mut Bar>, n: usize) {
    if let Some(bar) = pb {
        let _ = bar.update(n);
    }
}

/// Finish the bar line so subsequent log output starts on a fresh line.
pub fn finish_progress_bar(pb: Option<&mut Bar>) {
    if let Some(bar) = pb {
        let _ = bar.refresh();
        eprintln!();
    }
}
