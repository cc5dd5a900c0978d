//! Pipeline: config, execution context, file matching, initial load and the step runner.

pub mod config;
pub mod context;
pub mod ingest;
pub mod runner;
pub mod walk;

pub use config::{
    FinalOutput, INITIAL_VAR, IncludeSpec, InitialLoadConfig, PipelineConfig, PipelineStep,
    StepInputs, load_pipeline_config,
};
pub use context::ExecutionContext;
pub use ingest::{IngestReport, import_raw, load_initial_files};
pub use runner::{FinalArtifact, PipelineRun, PipelineRunner, StepOutcome};
pub use walk::{MatchSet, collect_matches};
