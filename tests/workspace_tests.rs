//! Workspace opened through relative paths from different working directories.
//!
//! Kept in its own test binary: it changes the process working directory.

use exptrack::engine::db_ops::{entry_count, require_entry};
use exptrack::pipeline::{FinalOutput, InitialLoadConfig, PipelineConfig, PipelineStep};
use exptrack::registry::ProcessorRegistry;
use exptrack::{Opts, Workspace};
use std::path::Path;

#[test]
fn test_relative_root_reused_from_another_directory() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().canonicalize().unwrap();
    let data = base.join("data");
    std::fs::create_dir_all(&data).unwrap();
    std::fs::create_dir_all(base.join("sub")).unwrap();
    std::fs::write(data.join("a.csv"), "x,y\n1,2\n").unwrap();
    std::fs::write(data.join("b.csv"), "x,y\n3,4\n").unwrap();

    let registry = ProcessorRegistry::with_builtins().unwrap();
    let config = PipelineConfig::new(InitialLoadConfig::glob(&format!(
        "{}/*.csv",
        data.display()
    )))
    .step(PipelineStep::new("csv_concat", "initial", "merged"))
    .step(PipelineStep::new("csv_multiplier", "merged", "doubled").param("multiplier", 2.0))
    .output(FinalOutput::new("doubled"));

    std::env::set_current_dir(&base).unwrap();
    let mut ws = Workspace::open(Path::new("ws"), Opts::default()).unwrap();
    assert_eq!(ws.root(), base.join("ws"));
    let first = ws.run_pipeline(&registry, &config).unwrap();
    for id in &first.ingest.ids {
        assert!(require_entry(ws.conn(), *id).unwrap().storage_path.is_absolute());
    }
    drop(ws);

    std::env::set_current_dir(base.join("sub")).unwrap();
    let mut ws = Workspace::open(Path::new("../ws"), Opts::default()).unwrap();
    assert_eq!(ws.root(), base.join("ws"));
    let entries = entry_count(ws.conn()).unwrap();
    let second = ws.run_pipeline(&registry, &config).unwrap();
    assert_eq!(second.ingest.reused, 2);
    assert_eq!(second.ingest.ids, first.ingest.ids);
    assert!(second.steps.iter().all(|s| s.cached));
    assert_eq!(second.outputs[0].entry.id, first.outputs[0].entry.id);
    assert_eq!(entry_count(ws.conn()).unwrap(), entries);

    let added = ws.add_file(Path::new("../data/a.csv"), None).unwrap();
    assert_eq!(added.original_path, Some(data.join("a.csv")));
    assert!(added.storage_path.starts_with(base.join("ws").join("raw")));

    std::env::set_current_dir(std::env::temp_dir()).unwrap();
}
