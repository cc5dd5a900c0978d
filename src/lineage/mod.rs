//! Lineage: ancestor trees, rendering and raw-file export.

pub mod export;
pub mod tree;

pub use export::{ExportReport, SkipReason, common_raw_prefix, export_raw_files};
pub use tree::{LineageNode, build_tree, render_tree, render_tree_colored};
