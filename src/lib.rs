//! Exptrack: experiment artifact tracker with provenance-aware pipelines and step caching.

pub mod engine;
pub mod error;
pub mod lineage;
pub mod pipeline;
pub mod registry;
pub mod types;
pub mod utils;
pub mod workspace;

/// Re-export types for API
pub use types::*;

pub use error::TrackError;
pub use workspace::Workspace;

use log::debug;
use std::path::Path;

use crate::pipeline::{PipelineRun, load_pipeline_config};
use crate::registry::ProcessorRegistry;

/// Result alias used by public exptrack API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Single entry point: open the workspace at `root`, load the pipeline config at `config_path`
/// and run it with `registry`.
///
/// Build the registry with [`ProcessorRegistry::with_builtins`] and add your own processors with
/// [`ProcessorRegistry::register`] before calling.
///
/// ```ignore
/// let registry = exptrack::registry::ProcessorRegistry::with_builtins()?;
/// let run = exptrack::run_pipeline(Path::new("work"), Path::new("pipeline.yaml"), &registry, Opts::default())?;
/// println!("{:?}", run.context.vars());
/// ```
pub fn run_pipeline(
    root: &Path,
    config_path: &Path,
    registry: &ProcessorRegistry,
    opts: Opts,
) -> Result<PipelineRun> {
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        opts
    );
    let config = load_pipeline_config(config_path)?;
    let mut ws = Workspace::open(root, opts)?;
    ws.run_pipeline(registry, &config)
}
