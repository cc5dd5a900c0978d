//! Workspace: root directory holding the entity store and managed artifact storage.

use anyhow::{Context, Result, bail};
use log::{debug, warn};
use rusqlite::Connection;
use std::path::{Path, PathBuf};

use crate::engine::db_ops::open_db;
use crate::engine::processor::DataProcessor;
use crate::engine::storage::ArtifactStorage;
use crate::engine::tools::path_to_db_string;
use crate::lineage::{self, ExportReport, LineageNode};
use crate::pipeline::{PipelineConfig, PipelineRun, PipelineRunner, import_raw};
use crate::registry::ProcessorRegistry;
use crate::utils::config::{PackagePaths, TRACE_DIR};
use crate::{DataEntry, Opts, Params};

pub struct Workspace {
    root: PathBuf,
    opts: Opts,
    storage: ArtifactStorage,
    conn: Connection,
}

/// Lineage tree plus the raw-file export made from it, if one was requested.
#[derive(Debug)]
pub struct TraceResult {
    pub tree: LineageNode,
    pub export: Option<TraceExport>,
}

#[derive(Debug)]
pub struct TraceExport {
    pub dest: PathBuf,
    pub prefix: PathBuf,
    pub report: ExportReport,
}

impl Workspace {
    /// Open (creating if needed) the workspace at `root`. A relative `root` is resolved against
    /// the current directory once, here; a relative `opts.db_path` is taken relative to `root`.
    pub fn open(root: &Path, opts: Opts) -> Result<Self> {
        let storage = ArtifactStorage::new(root)?;
        let root = storage.base().to_path_buf();
        let db_path = match &opts.db_path {
            Some(p) if p.is_absolute() => p.clone(),
            Some(p) => root.join(p),
            None => root.join(PackagePaths::get().db_filename()),
        };
        debug!("Opening store {}", db_path.display());
        let conn = open_db(&db_path)?;
        Ok(Self {
            root,
            opts,
            storage,
            conn,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn opts(&self) -> &Opts {
        &self.opts
    }

    pub fn storage(&self) -> &ArtifactStorage {
        &self.storage
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Runner bound to this workspace's store and storage.
    pub fn runner<'a>(&'a mut self, registry: &'a ProcessorRegistry) -> PipelineRunner<'a> {
        PipelineRunner::new(&mut self.conn, &self.storage, registry, &self.opts)
    }

    pub fn run_pipeline(
        &mut self,
        registry: &ProcessorRegistry,
        config: &PipelineConfig,
    ) -> Result<PipelineRun> {
        self.runner(registry).execute(config)
    }

    /// Register one file as a raw artifact. The description defaults to its source path.
    pub fn add_file(&mut self, src: &Path, description: Option<&str>) -> Result<DataEntry> {
        if !src.is_file() {
            bail!("not a file: {}", src.display());
        }
        let description = match description {
            Some(d) => d.to_string(),
            None => format!("Added from {}", path_to_db_string(src)),
        };
        let tx = self.conn.transaction().context("begin transaction")?;
        let entry = import_raw(&tx, &self.storage, src, &description)?;
        if let Err(e) = tx.commit() {
            let _ = std::fs::remove_file(&entry.storage_path);
            return Err(e).context("commit transaction");
        }
        debug!("Added {} as entry {}", src.display(), entry.id);
        Ok(entry)
    }

    /// Run one processor directly, outside any pipeline (no step cache involved).
    pub fn process(
        &mut self,
        registry: &ProcessorRegistry,
        name: &str,
        input_ids: &[i64],
        params: &Params,
    ) -> Result<DataEntry> {
        DataProcessor::new(&self.storage, registry).run(&mut self.conn, name, input_ids, params)
    }

    /// Where a trace export goes: absolute paths as given, relative ones under `<root>/trace/`.
    pub fn trace_export_dir(&self, dir: &Path) -> PathBuf {
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            self.root.join(TRACE_DIR).join(dir)
        }
    }

    /// Build the lineage tree of `id` and, with `export_dir`, copy its raw sources there.
    /// `None` when `max_depth` is 0.
    pub fn trace(
        &self,
        id: i64,
        max_depth: usize,
        export_dir: Option<&Path>,
    ) -> Result<Option<TraceResult>> {
        let Some(tree) = lineage::build_tree(&self.conn, id, max_depth)? else {
            return Ok(None);
        };
        let export = match export_dir {
            None => None,
            Some(dir) => match lineage::common_raw_prefix(&tree) {
                None => {
                    warn!("Entry {} has no raw sources with a shared prefix; nothing exported", id);
                    None
                }
                Some(prefix) => {
                    let dest = self.trace_export_dir(dir);
                    let report = lineage::export_raw_files(&tree, &dest, &prefix)?;
                    Some(TraceExport {
                        dest,
                        prefix,
                        report,
                    })
                }
            },
        };
        Ok(Some(TraceResult { tree, export }))
    }
}
