//! Engine: entity store, artifact storage, hashing, processor execution, CLI plumbing.

pub mod arg_parser;
pub mod db_ops;
pub mod handlers;
pub mod hashing;
pub mod processor;
pub mod progress;
pub mod storage;
pub mod tools;

// Re-export commonly used items
pub use arg_parser::{Cli, Commands};
pub use db_ops::{open_db, open_db_in_memory};
pub use handlers::handle_run;
pub use hashing::{canonical_params, hash_file, hash_file_hex, step_cache_key};
pub use processor::DataProcessor;
pub use storage::{ArtifactStorage, ExportManifest};
pub use tools::{file_mtime_ns, mtime_changed, path_relative_to, path_to_db_string};
