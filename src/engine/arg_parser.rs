use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Experiment artifact tracker: provenance-aware pipelines with step caching.
#[derive(Clone, Parser)]
#[command(name = "exptrack")]
#[command(about = "Track experiment artifacts, run cached pipelines and trace lineage.")]
pub struct Cli {
    /// Workspace directory. Default: EXPTRACK_WORKSPACE (env or .env), else the current directory.
    #[arg(long, short = 'w', global = true)]
    pub workspace: Option<PathBuf>,

    /// Path to the entity store. Default: `exptrack.db` in the workspace.
    #[arg(long, short, global = true)]
    pub db: Option<PathBuf>,

    /// Verbose output (debug logging and progress bars).
    #[arg(long, short = 'v', global = true, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Subcommand)]
pub enum Commands {
    /// Run a pipeline config (YAML, TOML or JSON).
    Run {
        /// Pipeline config file.
        #[arg(value_name = "CONFIG")]
        config: PathBuf,

        /// Mtime tolerance window in seconds. Files within this window are considered unchanged.
        #[arg(long, short = 'm', value_parser = clap::value_parser!(i64))]
        mtime_window: Option<i64>,

        /// Print the execution context after the run.
        #[arg(long)]
        debug: bool,
    },

    /// Register one file as a raw artifact.
    Add {
        /// Source file to copy into the workspace.
        file: PathBuf,

        /// Artifact description. Default: the source path.
        #[arg(long)]
        description: Option<String>,
    },

    /// Run one processor directly on stored artifacts.
    Process {
        /// Registered processor name.
        name: String,

        /// Input artifact ids.
        #[arg(required = true, num_args = 1..)]
        ids: Vec<i64>,

        /// Parameters as key=value (repeatable). Values are read as int, float, bool, else string.
        #[arg(long = "param", short = 'p', value_name = "KEY=VALUE")]
        params: Vec<String>,
    },

    /// Show the lineage tree of an artifact.
    Trace {
        /// Artifact id.
        #[arg(long)]
        id: i64,

        /// Maximum tree depth. Default: settings file, else 5.
        #[arg(long)]
        depth: Option<usize>,

        /// Copy the raw source files to this directory (relative paths go under `<workspace>/trace/`).
        #[arg(long, value_name = "DIR")]
        export_dir: Option<PathBuf>,
    },

    /// Show one artifact with its tags, parents, children and history.
    Show {
        id: i64,
    },

    /// Attach tags to an artifact.
    Tag {
        id: i64,

        #[arg(required = true, num_args = 1..)]
        tags: Vec<String>,
    },

    /// List the most recent artifacts.
    List {
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },

    /// List artifacts created in a time range (UTC). Date-only bounds cover the whole day.
    ListBetween {
        /// Start, as YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS.
        start: String,

        /// End, as YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS.
        end: String,
    },

    /// List registered processors.
    Processors,
}
