//! Command handlers: resolve workspace and options, then dispatch each subcommand.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use log::{debug, info, warn};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::engine::arg_parser::{Cli, Commands};
use crate::engine::db_ops;
use crate::engine::tools::mtime_window_ns;
use crate::lineage::render_tree_colored;
use crate::pipeline::{ExecutionContext, PipelineRun, load_pipeline_config};
use crate::registry::ProcessorRegistry;
use crate::utils::config::{DEFAULT_LIST_LIMIT, PackagePaths};
use crate::utils::settings::{apply_file_to_opts, load_settings_toml};
use crate::utils::{Colors, resolve_workspace_dir, setup_logging};
use crate::workspace::{TraceResult, Workspace};
use crate::{DataEntry, Opts, Params, TrackError};

/// Settings file first, then CLI flags on top.
fn setup_opts(cli: &Cli, root: &Path) -> Result<Opts> {
    let mut opts = Opts::default();
    let file = load_settings_toml(root);
    if let Some(ref f) = file {
        apply_file_to_opts(f, &mut opts)?;
    }
    if let Some(v) = cli.verbose {
        opts.verbose = v;
    }
    if let Some(ref db) = cli.db {
        opts.db_path = Some(db.clone());
    }
    setup_logging(opts.verbose);
    if file.is_some() {
        debug!("Loaded settings from {}", root.display());
    }
    Ok(opts)
}

fn workspace_root(cli: &Cli) -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("read current directory")?;
    Ok(resolve_workspace_dir(cli.workspace.as_deref(), &cwd))
}

pub fn handle_run(cli: &Cli) -> Result<()> {
    let root = workspace_root(cli)?;
    let mut opts = setup_opts(cli, &root)?;
    if let Commands::Run {
        mtime_window: Some(secs),
        ..
    } = &cli.command
    {
        opts.mtime_window_ns = mtime_window_ns(*secs)?;
    }
    debug!(
        "{} CONFIG:{:#?}",
        PackagePaths::get().pkg_name().to_uppercase(),
        opts
    );

    let registry = ProcessorRegistry::with_builtins()?;
    let mut ws = Workspace::open(&root, opts)?;

    match &cli.command {
        Commands::Run { config, debug, .. } => handle_pipeline(&mut ws, &registry, config, *debug),
        Commands::Add { file, description } => handle_add(&mut ws, file, description.as_deref()),
        Commands::Process { name, ids, params } => {
            handle_process(&mut ws, &registry, name, ids, params)
        }
        Commands::Trace {
            id,
            depth,
            export_dir,
        } => handle_trace(&ws, *id, *depth, export_dir.as_deref()),
        Commands::Show { id } => handle_show(&ws, *id),
        Commands::Tag { id, tags } => handle_tag(&ws, *id, tags),
        Commands::List { limit } => handle_list(&ws, limit.unwrap_or(DEFAULT_LIST_LIMIT)),
        Commands::ListBetween { start, end } => handle_list_between(&ws, start, end),
        Commands::Processors => {
            print_processors(&registry);
            Ok(())
        }
    }
}

fn handle_pipeline(
    ws: &mut Workspace,
    registry: &ProcessorRegistry,
    config_path: &Path,
    debug: bool,
) -> Result<()> {
    let config = load_pipeline_config(config_path)?;
    let mut runner = ws.runner(registry);
    let result = runner.execute(&config);
    if debug {
        print_context(runner.context());
    }
    let run = result?;
    print_run(&run);
    Ok(())
}

fn print_context(ctx: &ExecutionContext) {
    match serde_json::to_string_pretty(ctx.vars()) {
        Ok(s) => println!("Execution context:\n{s}"),
        Err(e) => warn!("Could not serialize execution context: {}", e),
    }
}

fn print_run(run: &PipelineRun) {
    for step in &run.steps {
        let status = if step.cached {
            Colors::colorize(Colors::SKIP, "cached")
        } else {
            Colors::colorize(Colors::OK, "new")
        };
        println!(
            "[{}] {} -> {} = entry {} ({})",
            step.index + 1,
            step.processor,
            step.output_var,
            step.entry_id,
            status
        );
        if let Some(ref p) = step.export_path {
            println!("    exported {}", Colors::colorize(Colors::PATH, &p.display().to_string()));
        }
    }
    for out in &run.outputs {
        println!(
            "Final output {}: entry {} at {}",
            out.name,
            out.entry.id,
            Colors::colorize(Colors::PATH, &out.entry.storage_path.display().to_string())
        );
        if let Some(ref p) = out.export_path {
            println!("    exported {}", Colors::colorize(Colors::PATH, &p.display().to_string()));
        }
    }
}

fn handle_add(ws: &mut Workspace, file: &Path, description: Option<&str>) -> Result<()> {
    let entry = ws.add_file(file, description)?;
    info!(
        "{}",
        Colors::colorize(Colors::OK, &format!("Added data entry {}", entry.id))
    );
    print_entry(&entry);
    Ok(())
}

fn handle_process(
    ws: &mut Workspace,
    registry: &ProcessorRegistry,
    name: &str,
    ids: &[i64],
    raw_params: &[String],
) -> Result<()> {
    let params = parse_params(raw_params)?;
    let entry = ws.process(registry, name, ids, &params)?;
    info!("Created entry {}", entry.id);
    print_entry(&entry);
    Ok(())
}

/// Parse `key=value` pairs; values go through [`try_convert`].
pub fn parse_params(raw: &[String]) -> Result<Params> {
    let mut params = Params::new();
    for kv in raw {
        let Some((key, value)) = kv.split_once('=') else {
            bail!("parameter must be KEY=VALUE: {kv}");
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("parameter has an empty key: {kv}");
        }
        params.insert(key.to_string(), try_convert(value.trim()));
    }
    Ok(params)
}

/// Integer, then float, then bool (`true`/`false`, any case), else the string itself.
pub fn try_convert(value: &str) -> Value {
    if let Ok(i) = value.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = value.parse::<f64>()
        && f.is_finite()
    {
        return Value::from(f);
    }
    match value.to_ascii_lowercase().as_str() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(value.to_string()),
    }
}

fn handle_trace(
    ws: &Workspace,
    id: i64,
    depth: Option<usize>,
    export_dir: Option<&Path>,
) -> Result<()> {
    let depth = depth.unwrap_or(ws.opts().trace_depth);
    let Some(TraceResult { tree, export }) = ws.trace(id, depth, export_dir)? else {
        return Ok(());
    };
    print!("{}", render_tree_colored(&tree));
    if let Some(export) = export {
        let report = &export.report;
        info!(
            "Exported raw files from {} to {}",
            export.prefix.display(),
            export.dest.display()
        );
        info!(
            "{} | {} | {}",
            Colors::colorize(Colors::OK, &format!("Exported: {}", report.exported.len())),
            Colors::colorize(Colors::SKIP, &format!("Skipped: {}", report.skipped.len())),
            Colors::colorize(Colors::FAIL, &format!("Failed: {}", report.failed.len()))
        );
        for (path, err) in &report.failed {
            warn!("{}: {}", path.display(), err);
        }
    }
    Ok(())
}

fn handle_show(ws: &Workspace, id: i64) -> Result<()> {
    let conn = ws.conn();
    let entry = db_ops::require_entry(conn, id)?;
    print_entry(&entry);
    if let Some(ref orig) = entry.original_path {
        println!("  original: {}", orig.display());
    }
    if let Some(ref hash) = entry.content_hash {
        println!("  blake3: {hash}");
    }
    println!("  tags: {}", db_ops::tags_of(conn, id)?.join(", "));
    println!("  parents: {:?}", db_ops::parent_ids(conn, id)?);
    println!("  children: {:?}", db_ops::child_ids(conn, id)?);
    for line in entry.description.lines().filter(|l| !l.trim().is_empty()) {
        println!("  | {line}");
    }
    for op in db_ops::operations_for(conn, id)? {
        println!(
            "  {} {} {}",
            op.created_at.format("%Y-%m-%d %H:%M:%S"),
            op.op_type,
            op.parameters
        );
    }
    Ok(())
}

fn handle_tag(ws: &Workspace, id: i64, tags: &[String]) -> Result<()> {
    let conn = ws.conn();
    if !db_ops::entry_exists(conn, id)? {
        return Err(TrackError::EntryNotFound(id).into());
    }
    db_ops::attach_tags(conn, id, tags)?;
    info!("Entry {} tags: {}", id, db_ops::tags_of(conn, id)?.join(", "));
    Ok(())
}

fn handle_list(ws: &Workspace, limit: usize) -> Result<()> {
    for entry in db_ops::list_recent(ws.conn(), limit)? {
        print_entry(&entry);
    }
    Ok(())
}

fn handle_list_between(ws: &Workspace, start: &str, end: &str) -> Result<()> {
    let start = parse_time_bound(start, false)?;
    let end = parse_time_bound(end, true)?;
    if start > end {
        bail!("start {start} is after end {end}");
    }
    let entries = db_ops::list_between(ws.conn(), &start, &end)?;
    if entries.is_empty() {
        info!(
            "{}",
            Colors::colorize(Colors::SKIP, &format!("No entries between {start} and {end}"))
        );
        return Ok(());
    }
    for entry in &entries {
        print_entry(entry);
    }
    Ok(())
}

/// `YYYY-MM-DDTHH:MM:SS` or `YYYY-MM-DD` (UTC). A date-only bound is widened to the start of
/// the day, or to its last instant when `end_of_day` is set.
pub fn parse_time_bound(s: &str, end_of_day: bool) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(t) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(t.and_utc());
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("time must be YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS: {s}"))?;
    let time = if end_of_day {
        NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999)
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)
    };
    let time = time.context("build time of day")?;
    Ok(date.and_time(time).and_utc())
}

fn print_entry(entry: &DataEntry) {
    println!(
        "{} │ {} │ {} │ {}",
        entry.id,
        Colors::colorize(Colors::KIND, &entry.kind.as_str().to_uppercase()),
        Colors::colorize(Colors::PATH, &entry.storage_path.display().to_string()),
        entry.created_at.format("%Y-%m-%d %H:%M:%S")
    );
}

fn print_processors(registry: &ProcessorRegistry) {
    for p in registry.processors() {
        let params = p
            .accepted_params()
            .map(|ps| ps.join(", "))
            .unwrap_or_else(|| "*".to_string());
        println!(
            "{} │ {} │ {} │ v{} │ {} │ params: {}",
            Colors::colorize(Colors::OK, &p.name),
            p.arity,
            p.output_ext,
            p.version,
            &p.impl_hash[..12],
            params
        );
    }
}
