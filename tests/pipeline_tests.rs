//! Pipeline runs: ingestion, step cache, incremental re-runs, exports and failure handling.

use exptrack::engine::db_ops::{
    entry_count, parent_ids, require_entry, step_cache_count, tags_of,
};
use exptrack::pipeline::{
    FinalOutput, IncludeSpec, InitialLoadConfig, PipelineConfig, PipelineStep, StepInputs,
    collect_matches, load_pipeline_config,
};
use exptrack::registry::ProcessorRegistry;
use exptrack::{ArtifactKind, Opts, TrackError, Workspace};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
    ws: Workspace,
    registry: ProcessorRegistry,
}

impl Fixture {
    fn new() -> Self {
        Self::with_opts(Opts::default())
    }

    fn with_opts(opts: Opts) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::open(&dir.path().join("ws"), opts).unwrap();
        let registry = ProcessorRegistry::with_builtins().unwrap();
        Self { dir, ws, registry }
    }

    fn data(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.data().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    fn pattern(&self, glob: &str) -> String {
        format!("{}/{}", self.data().display(), glob)
    }
}

fn track_err(err: &anyhow::Error) -> &TrackError {
    err.downcast_ref::<TrackError>().unwrap()
}

fn set_mtime(path: &Path, offset_secs: u64) {
    let f = File::options().write(true).open(path).unwrap();
    f.set_modified(SystemTime::now() + Duration::from_secs(offset_secs))
        .unwrap();
}

/// Concatenate every CSV, then double the merged file.
fn doubling_pipeline(fx: &Fixture) -> PipelineConfig {
    PipelineConfig::new(InitialLoadConfig::glob(&fx.pattern("*.csv")))
        .step(PipelineStep::new("csv_concat", "initial", "merged"))
        .step(PipelineStep::new("csv_multiplier", "merged", "doubled").param("multiplier", 2.0))
        .output(FinalOutput::new("doubled"))
}

#[test]
fn test_doubling_pipeline() {
    let mut fx = Fixture::new();
    fx.write("a.csv", "x,y\n1,2\n");
    fx.write("b.csv", "x,y\n3,4\n");
    let config = doubling_pipeline(&fx);

    let run = fx.ws.run_pipeline(&fx.registry, &config).unwrap();

    assert_eq!(run.ingest.ids.len(), 2);
    assert_eq!(run.ingest.imported, 2);
    assert_eq!(run.steps.len(), 2);
    assert!(run.steps.iter().all(|s| !s.cached));
    assert_eq!(run.outputs.len(), 1);
    let doubled = &run.outputs[0].entry;
    assert_eq!(
        std::fs::read_to_string(&doubled.storage_path).unwrap(),
        "x,y\n2.0,4.0\n6.0,8.0\n"
    );

    let merged = run.context.get("merged").unwrap()[0];
    assert_eq!(run.context.get("initial").unwrap(), run.ingest.ids.as_slice());
    assert_eq!(parent_ids(fx.ws.conn(), doubled.id).unwrap(), vec![merged]);
    assert_eq!(parent_ids(fx.ws.conn(), merged).unwrap(), run.ingest.ids);
    assert!(doubled.description.starts_with(
        "Pipeline Step: csv_multiplier\nInputs: merged\nParams: {\"multiplier\":2.0}\n"
    ));

    for id in &run.ingest.ids {
        let raw = require_entry(fx.ws.conn(), *id).unwrap();
        assert_eq!(raw.kind, ArtifactKind::Raw);
        assert!(raw.content_hash.is_some());
        assert!(raw.storage_path.starts_with(fx.ws.storage().raw_dir()));
    }
}

#[test]
fn test_raw_files_tagged_with_matched_path() {
    let mut fx = Fixture::new();
    let a = fx.write("a.csv", "1\n");
    let config = PipelineConfig::new(
        InitialLoadConfig::new()
            .include(IncludeSpec::new(&fx.pattern("*.csv")).tags(&["batch1"]))
            .tags(&["experiment"]),
    );

    let run = fx.ws.run_pipeline(&fx.registry, &config).unwrap();
    let tags = tags_of(fx.ws.conn(), run.ingest.ids[0]).unwrap();
    assert!(tags.contains(&a.display().to_string()));
    assert!(tags.contains(&"batch1".to_string()));
    assert!(tags.contains(&"experiment".to_string()));
}

#[test]
fn test_rerun_is_fully_cached() {
    let mut fx = Fixture::new();
    fx.write("a.csv", "x,y\n1,2\n");
    fx.write("b.csv", "x,y\n3,4\n");
    let config = doubling_pipeline(&fx);

    let first = fx.ws.run_pipeline(&fx.registry, &config).unwrap();
    let entries = entry_count(fx.ws.conn()).unwrap();
    let cache_rows = step_cache_count(fx.ws.conn()).unwrap();

    let second = fx.ws.run_pipeline(&fx.registry, &config).unwrap();
    assert_eq!(second.ingest.imported, 0);
    assert_eq!(second.ingest.reused, 2);
    assert_eq!(second.ingest.ids, first.ingest.ids);
    assert!(second.steps.iter().all(|s| s.cached));
    assert_eq!(second.context, first.context);
    assert_eq!(entry_count(fx.ws.conn()).unwrap(), entries);
    assert_eq!(step_cache_count(fx.ws.conn()).unwrap(), cache_rows);
}

#[test]
fn test_force_rerun_creates_new_artifact() {
    let mut fx = Fixture::new();
    fx.write("a.csv", "x,y\n1,2\n");
    let mut config = doubling_pipeline(&fx);
    let first = fx.ws.run_pipeline(&fx.registry, &config).unwrap();
    let entries = entry_count(fx.ws.conn()).unwrap();

    config.steps[1].force_rerun = true;
    let second = fx.ws.run_pipeline(&fx.registry, &config).unwrap();

    assert!(second.steps[0].cached);
    assert!(!second.steps[1].cached);
    assert_ne!(second.steps[1].entry_id, first.steps[1].entry_id);
    assert_eq!(entry_count(fx.ws.conn()).unwrap(), entries + 1);

    config.steps[1].force_rerun = false;
    let third = fx.ws.run_pipeline(&fx.registry, &config).unwrap();
    assert!(third.steps[1].cached);
    assert_eq!(third.steps[1].entry_id, second.steps[1].entry_id);
}

#[test]
fn test_uncached_step_always_runs() {
    let mut fx = Fixture::new();
    fx.write("a.csv", "x,y\n1,2\n");
    let mut config = doubling_pipeline(&fx);
    config.steps[1].cache = false;

    let first = fx.ws.run_pipeline(&fx.registry, &config).unwrap();
    let second = fx.ws.run_pipeline(&fx.registry, &config).unwrap();
    assert!(second.steps[0].cached);
    assert!(!second.steps[1].cached);
    assert_ne!(second.steps[1].entry_id, first.steps[1].entry_id);
    assert_eq!(step_cache_count(fx.ws.conn()).unwrap(), 1);
}

#[test]
fn test_param_change_misses_cache() {
    let mut fx = Fixture::new();
    fx.write("a.csv", "x,y\n1,2\n");
    let mut config = doubling_pipeline(&fx);
    let first = fx.ws.run_pipeline(&fx.registry, &config).unwrap();

    config.steps[1] = PipelineStep::new("csv_multiplier", "merged", "doubled").param("multiplier", 3.0);
    let second = fx.ws.run_pipeline(&fx.registry, &config).unwrap();
    assert!(second.steps[0].cached);
    assert!(!second.steps[1].cached);
    assert_ne!(second.steps[1].entry_id, first.steps[1].entry_id);
    assert_eq!(
        std::fs::read_to_string(&second.outputs[0].entry.storage_path).unwrap(),
        "x,y\n3.0,6.0\n"
    );
}

#[test]
fn test_modified_file_reingested_and_downstream_rerun() {
    let mut fx = Fixture::new();
    let a = fx.write("a.csv", "x,y\n1,2\n");
    fx.write("b.csv", "x,y\n3,4\n");
    let config = doubling_pipeline(&fx);
    let first = fx.ws.run_pipeline(&fx.registry, &config).unwrap();

    std::fs::write(&a, "x,y\n10,20\n").unwrap();
    set_mtime(&a, 10);
    let second = fx.ws.run_pipeline(&fx.registry, &config).unwrap();

    assert_eq!(second.ingest.imported, 1);
    assert_eq!(second.ingest.reused, 1);
    assert_ne!(second.ingest.ids[0], first.ingest.ids[0]);
    assert_eq!(second.ingest.ids[1], first.ingest.ids[1]);
    assert!(second.steps.iter().all(|s| !s.cached));
    assert_eq!(
        std::fs::read_to_string(&second.outputs[0].entry.storage_path).unwrap(),
        "x,y\n20.0,40.0\n6.0,8.0\n"
    );
    // The previous artifact of a.csv is kept.
    assert!(require_entry(fx.ws.conn(), first.ingest.ids[0]).is_ok());
}

#[test]
fn test_mtime_window_tolerates_small_changes() {
    let mut fx = Fixture::with_opts(Opts {
        mtime_window_ns: 60 * 1_000_000_000,
        ..Opts::default()
    });
    let a = fx.write("a.csv", "x,y\n1,2\n");
    let config = doubling_pipeline(&fx);
    let first = fx.ws.run_pipeline(&fx.registry, &config).unwrap();

    set_mtime(&a, 5);
    let second = fx.ws.run_pipeline(&fx.registry, &config).unwrap();
    assert_eq!(second.ingest.reused, 1);
    assert_eq!(second.ingest.ids, first.ingest.ids);
}

#[test]
fn test_recursive_glob_regex_and_exclude() {
    let fx = Fixture::new();
    fx.write("run_1.csv", "1\n");
    fx.write("run_2.csv", "2\n");
    fx.write("other.csv", "3\n");
    fx.write("nested/deep/run_3.csv", "4\n");
    fx.write("notes.txt", "n\n");
    fx.write(".hidden.csv", "h\n");

    let flat = collect_matches(&InitialLoadConfig::glob(&fx.pattern("*.csv"))).unwrap();
    assert_eq!(flat.len(), 3);

    let deep = collect_matches(&InitialLoadConfig::glob(&fx.pattern("**/*.csv"))).unwrap();
    assert_eq!(deep.len(), 4);
    assert!(deep.keys().any(|k| k.ends_with("nested/deep/run_3.csv")));

    let regex = collect_matches(
        &InitialLoadConfig::new().include(IncludeSpec::new(&fx.pattern("**/*.csv")).regex(r"run_\d")),
    )
    .unwrap();
    assert_eq!(regex.len(), 3);

    let excluded = collect_matches(
        &InitialLoadConfig::glob(&fx.pattern("**/*.csv")).exclude("run_*"),
    )
    .unwrap();
    assert_eq!(excluded.len(), 1);
    assert!(excluded.keys().all(|k| k.ends_with("other.csv")));

    let keys: Vec<&String> = deep.keys().collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
}

#[test]
fn test_union_of_includes_merges_tags() {
    let fx = Fixture::new();
    fx.write("a.csv", "1\n");
    fx.write("b.txt", "2\n");
    let config = InitialLoadConfig::new()
        .include(IncludeSpec::new(&fx.pattern("*.csv")).tags(&["csv"]))
        .include(IncludeSpec::new(&fx.pattern("*")).tags(&["all"]));

    let set = collect_matches(&config).unwrap();
    assert_eq!(set.len(), 2);
    let a_tags = set.iter().find(|(k, _)| k.ends_with("a.csv")).unwrap().1;
    assert_eq!(a_tags, &vec!["csv".to_string(), "all".to_string()]);
}

#[test]
fn test_no_match_and_invalid_patterns() {
    let mut fx = Fixture::new();
    fx.write("a.csv", "1\n");

    let err = collect_matches(&InitialLoadConfig::glob(&fx.pattern("*.parquet"))).unwrap_err();
    assert!(matches!(err, TrackError::NoMatch(_)));

    let err = collect_matches(&InitialLoadConfig::glob(&fx.pattern("[a.csv"))).unwrap_err();
    assert!(matches!(err, TrackError::InvalidPattern { .. }));

    let bad_regex =
        InitialLoadConfig::new().include(IncludeSpec::new(&fx.pattern("*.csv")).regex("("));
    let err = collect_matches(&bad_regex).unwrap_err();
    assert!(matches!(err, TrackError::InvalidPattern { .. }));

    let config = PipelineConfig::new(InitialLoadConfig::glob(&fx.pattern("*.parquet")));
    let err = fx.ws.run_pipeline(&fx.registry, &config).unwrap_err();
    assert!(matches!(track_err(&err), TrackError::NoMatch(_)));
    assert_eq!(entry_count(fx.ws.conn()).unwrap(), 0);
}

#[test]
fn test_non_raw_initial_load_rejected() {
    let mut fx = Fixture::new();
    fx.write("a.csv", "1\n");
    let mut load = InitialLoadConfig::glob(&fx.pattern("*.csv"));
    load.kind = ArtifactKind::Processed;

    let err = fx
        .ws
        .run_pipeline(&fx.registry, &PipelineConfig::new(load))
        .unwrap_err();
    assert!(matches!(track_err(&err), TrackError::InvalidConfig(_)));
}

#[test]
fn test_failing_step_stops_pipeline() {
    let mut fx = Fixture::new();
    fx.write("a.csv", "x,y\n1,2\n");
    fx.write("b.csv", "x,y\n3,4\n");
    let config = PipelineConfig::new(InitialLoadConfig::glob(&fx.pattern("*.csv")))
        .step(PipelineStep::new("csv_concat", "initial", "merged"))
        .step(PipelineStep::new("nope", "merged", "broken"))
        .step(PipelineStep::new("csv_multiplier", "merged", "doubled"));

    let registry = ProcessorRegistry::with_builtins().unwrap();
    let mut runner = fx.ws.runner(&registry);
    let err = runner.execute(&config).unwrap_err();
    assert_eq!(
        track_err(&err),
        &TrackError::UnknownProcessor("nope".to_string())
    );
    assert!(runner.context().get("merged").is_some());
    assert!(runner.context().get("broken").is_none());
    assert!(runner.context().get("doubled").is_none());
    drop(runner);

    // Completed steps stay committed: two raw files plus the merge.
    assert_eq!(entry_count(fx.ws.conn()).unwrap(), 3);
    assert_eq!(step_cache_count(fx.ws.conn()).unwrap(), 1);
}

#[test]
fn test_arity_error_in_pipeline() {
    let mut fx = Fixture::new();
    fx.write("a.csv", "1\n");
    fx.write("b.csv", "2\n");
    let config = PipelineConfig::new(InitialLoadConfig::glob(&fx.pattern("*.csv")))
        .step(PipelineStep::new("csv_multiplier", "initial", "doubled"));

    let err = fx.ws.run_pipeline(&fx.registry, &config).unwrap_err();
    assert!(matches!(track_err(&err), TrackError::Arity { got: 2, .. }));
}

#[test]
fn test_merge_of_two_step_outputs() {
    let mut fx = Fixture::new();
    fx.write("a.csv", "x,y\n1,2\n");
    fx.write("b.csv", "x,y\n3,4\n");
    let config = doubling_pipeline(&fx)
        .step(PipelineStep::new("csv_concat", &["merged", "doubled"][..], "combined"))
        .output(FinalOutput::new("combined"));

    let run = fx.ws.run_pipeline(&fx.registry, &config).unwrap();
    let merged = run.context.get("merged").unwrap()[0];
    let doubled = run.context.get("doubled").unwrap()[0];
    let combined = run.context.get("combined").unwrap()[0];

    assert_eq!(parent_ids(fx.ws.conn(), combined).unwrap(), vec![merged, doubled]);
    assert!(tags_of(fx.ws.conn(), combined)
        .unwrap()
        .contains(&"concat_of_2".to_string()));
    assert_eq!(run.outputs.len(), 2);
    assert_eq!(
        std::fs::read_to_string(&run.outputs[1].entry.storage_path).unwrap(),
        "x,y\n1,2\n3,4\n2.0,4.0\n6.0,8.0\n"
    );
}

#[test]
fn test_unknown_final_output() {
    let mut fx = Fixture::new();
    fx.write("a.csv", "x,y\n1,2\n");
    let config = doubling_pipeline(&fx).output(FinalOutput::new("missing"));

    let err = fx.ws.run_pipeline(&fx.registry, &config).unwrap_err();
    assert_eq!(
        track_err(&err),
        &TrackError::UnknownOutput("missing".to_string())
    );
}

#[test]
fn test_step_and_final_exports() {
    let mut fx = Fixture::new();
    fx.write("a.csv", "x,y\n1,2\n");
    let config = PipelineConfig::new(InitialLoadConfig::glob(&fx.pattern("*.csv")))
        .step(PipelineStep::new("csv_concat", "initial", "merged").export("merged.csv"))
        .output(FinalOutput::new("merged").export("final/result.csv"));

    let run = fx.ws.run_pipeline(&fx.registry, &config).unwrap();
    let exports = fx.ws.storage().exports_dir();
    assert_eq!(run.steps[0].export_path, Some(exports.join("merged.csv")));
    assert!(exports.join("merged.csv").is_file());
    assert!(exports.join("final/result.csv").is_file());

    let manifest = fx.ws.storage().load_manifest().unwrap();
    let merged = run.context.get("merged").unwrap()[0];
    assert_eq!(manifest["merged.csv"].artifact_id, merged);
    assert_eq!(manifest["final/result.csv"].artifact_id, merged);

    // A cached step still exports.
    std::fs::remove_file(exports.join("merged.csv")).unwrap();
    let again = fx.ws.run_pipeline(&fx.registry, &config).unwrap();
    assert!(again.steps[0].cached);
    assert!(exports.join("merged.csv").is_file());
}

#[test]
fn test_cache_hit_with_missing_file_reruns() {
    let mut fx = Fixture::new();
    fx.write("a.csv", "x,y\n1,2\n");
    let config = doubling_pipeline(&fx);
    let first = fx.ws.run_pipeline(&fx.registry, &config).unwrap();

    std::fs::remove_file(&first.outputs[0].entry.storage_path).unwrap();
    let second = fx.ws.run_pipeline(&fx.registry, &config).unwrap();
    assert!(second.steps[0].cached);
    assert!(!second.steps[1].cached);
    assert!(second.outputs[0].entry.storage_path.is_file());
}

#[test]
fn test_load_config_formats() {
    let dir = tempfile::tempdir().unwrap();
    let yaml = dir.path().join("pipeline.yaml");
    std::fs::write(
        &yaml,
        r#"
initial_load:
  include:
    - path: "./data/**/*.csv"
      regex: "run_\\d+"
      tags: [batch]
  exclude: ["*.tmp"]
  type: raw
steps:
  - processor: csv_concat
    output: merged
  - processor: csv_multiplier
    inputs: merged
    params:
      multiplier: 2.0
    force_rerun: true
    export: doubled.csv
    output: doubled
  - processor: csv_concat
    inputs: [merged, doubled]
    cache: false
    output: combined
final_output: combined
"#,
    )
    .unwrap();
    let config = load_pipeline_config(&yaml).unwrap();
    let include = &config.initial_load.include[0];
    assert_eq!(include.path, "./data/**/*.csv");
    assert_eq!(include.regex.as_deref(), Some("run_\\d+"));
    assert_eq!(include.tags, vec!["batch"]);
    assert_eq!(config.initial_load.exclude, vec!["*.tmp"]);
    assert_eq!(config.initial_load.kind, ArtifactKind::Raw);
    assert_eq!(config.steps[0].inputs, StepInputs::One("initial".to_string()));
    assert!(config.steps[0].cache);
    assert!(!config.steps[0].force_rerun);
    assert!(config.steps[1].force_rerun);
    assert_eq!(config.steps[1].params["multiplier"], serde_json::json!(2.0));
    assert_eq!(config.steps[1].export.as_deref(), Some("doubled.csv"));
    assert_eq!(
        config.steps[2].inputs,
        StepInputs::Many(vec!["merged".to_string(), "doubled".to_string()])
    );
    assert!(!config.steps[2].cache);
    assert_eq!(config.outputs(), vec![FinalOutput::new("combined")]);

    let toml_path = dir.path().join("pipeline.toml");
    std::fs::write(
        &toml_path,
        r#"
[initial_load]
path = "data/*.csv"

[[steps]]
processor = "csv_multiplier"
output = "doubled"
params = { multiplier = 3 }

[[final_outputs]]
name = "doubled"
export = "out.csv"
"#,
    )
    .unwrap();
    let config = load_pipeline_config(&toml_path).unwrap();
    assert_eq!(config.initial_load.include_specs()[0].path, "data/*.csv");
    assert_eq!(config.steps[0].params["multiplier"], serde_json::json!(3));
    assert_eq!(
        config.outputs(),
        vec![FinalOutput::new("doubled").export("out.csv")]
    );

    let json_path = dir.path().join("pipeline.json");
    std::fs::write(
        &json_path,
        r#"{"initial_load": {"path": "*.txt"}, "steps": [{"processor": "text_merge", "output": "m"}]}"#,
    )
    .unwrap();
    let config = load_pipeline_config(&json_path).unwrap();
    assert_eq!(config.steps[0].processor, "text_merge");
    assert!(config.outputs().is_empty());

    let ini = dir.path().join("pipeline.ini");
    std::fs::write(&ini, "").unwrap();
    let err = load_pipeline_config(&ini).unwrap_err();
    assert!(matches!(track_err(&err), TrackError::InvalidConfig(_)));
}

#[test]
fn test_reopened_workspace_reuses_ingest_and_steps() {
    let fx = Fixture::new();
    fx.write("a.csv", "x,y\n1,2\n");
    fx.write("b.csv", "x,y\n3,4\n");
    let config = doubling_pipeline(&fx);
    let Fixture { dir, mut ws, registry } = fx;
    let first = ws.run_pipeline(&registry, &config).unwrap();
    drop(ws);

    let mut ws = Workspace::open(&dir.path().join("ws"), Opts::default()).unwrap();
    let entries = entry_count(ws.conn()).unwrap();
    let second = ws.run_pipeline(&registry, &config).unwrap();
    assert_eq!(second.ingest.imported, 0);
    assert_eq!(second.ingest.ids, first.ingest.ids);
    assert!(second.steps.iter().all(|s| s.cached));
    assert_eq!(second.outputs[0].entry.id, first.outputs[0].entry.id);
    assert_eq!(entry_count(ws.conn()).unwrap(), entries);
}

#[test]
fn test_raw_entry_missing_file_reimported() {
    let mut fx = Fixture::new();
    fx.write("a.csv", "x,y\n1,2\n");
    let config = doubling_pipeline(&fx);
    let first = fx.ws.run_pipeline(&fx.registry, &config).unwrap();

    let raw = require_entry(fx.ws.conn(), first.ingest.ids[0]).unwrap();
    std::fs::remove_file(&raw.storage_path).unwrap();
    let second = fx.ws.run_pipeline(&fx.registry, &config).unwrap();
    assert_eq!(second.ingest.imported, 1);
    assert_ne!(second.ingest.ids[0], first.ingest.ids[0]);
    assert!(second.steps.iter().all(|s| !s.cached));
    assert_eq!(
        std::fs::read_to_string(&second.outputs[0].entry.storage_path).unwrap(),
        "x,y\n2.0,4.0\n"
    );
}

#[cfg(unix)]
#[test]
fn test_symlinked_sources_are_matched() {
    let mut fx = Fixture::new();
    let target = fx.dir.path().join("elsewhere");
    std::fs::create_dir_all(target.join("more")).unwrap();
    std::fs::write(target.join("linked.csv"), "x,y\n5,6\n").unwrap();
    std::fs::write(target.join("more").join("deep.csv"), "x,y\n7,8\n").unwrap();
    fx.write("a.csv", "x,y\n1,2\n");
    std::os::unix::fs::symlink(target.join("linked.csv"), fx.data().join("linked.csv")).unwrap();
    std::os::unix::fs::symlink(target.join("more"), fx.data().join("more")).unwrap();

    let deep = collect_matches(&InitialLoadConfig::glob(&fx.pattern("**/*.csv"))).unwrap();
    assert_eq!(deep.len(), 3);
    assert!(deep.keys().any(|k| k.ends_with("data/linked.csv")));
    assert!(deep.keys().any(|k| k.ends_with("data/more/deep.csv")));

    let run = fx
        .ws
        .run_pipeline(&fx.registry, &PipelineConfig::new(InitialLoadConfig::glob(&fx.pattern("*.csv"))))
        .unwrap();
    assert_eq!(run.ingest.imported, 2);
    let stored = run
        .ingest
        .ids
        .iter()
        .map(|id| std::fs::read_to_string(require_entry(fx.ws.conn(), *id).unwrap().storage_path).unwrap())
        .collect::<Vec<_>>();
    assert!(stored.contains(&"x,y\n5,6\n".to_string()));
}
