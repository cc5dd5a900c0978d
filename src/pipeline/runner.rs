//! Pipeline runner: initial load, then each step in order with the step cache, then final outputs.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use rusqlite::Connection;
use std::path::PathBuf;

use super::config::{FinalOutput, INITIAL_VAR, PipelineConfig, PipelineStep};
use super::context::ExecutionContext;
use super::ingest::{IngestReport, load_initial_files};
use crate::engine::db_ops;
use crate::engine::hashing::{canonical_params, step_cache_key};
use crate::engine::processor::DataProcessor;
use crate::engine::storage::ArtifactStorage;
use crate::registry::ProcessorRegistry;
use crate::{DataEntry, Opts, TrackError};

/// Result of one executed (or reused) step.
#[derive(Clone, Debug)]
pub struct StepOutcome {
    pub index: usize,
    pub processor: String,
    pub output_var: String,
    pub entry_id: i64,
    /// Output was taken from the step cache; nothing ran.
    pub cached: bool,
    pub export_path: Option<PathBuf>,
}

/// A declared final output resolved to its artifact.
#[derive(Clone, Debug)]
pub struct FinalArtifact {
    pub name: String,
    pub entry: DataEntry,
    pub export_path: Option<PathBuf>,
}

/// Everything a completed run produced.
#[derive(Clone, Debug)]
pub struct PipelineRun {
    pub ingest: IngestReport,
    pub steps: Vec<StepOutcome>,
    pub outputs: Vec<FinalArtifact>,
    pub context: ExecutionContext,
}

pub struct PipelineRunner<'a> {
    conn: &'a mut Connection,
    storage: &'a ArtifactStorage,
    registry: &'a ProcessorRegistry,
    opts: &'a Opts,
    context: ExecutionContext,
}

impl<'a> PipelineRunner<'a> {
    pub fn new(
        conn: &'a mut Connection,
        storage: &'a ArtifactStorage,
        registry: &'a ProcessorRegistry,
        opts: &'a Opts,
    ) -> Self {
        Self {
            conn,
            storage,
            registry,
            opts,
            context: ExecutionContext::new(),
        }
    }

    /// Variables bound so far. After a failed [`execute`](Self::execute) this still holds
    /// everything published before the failing step.
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Run the whole pipeline. Stops at the first failing step; completed steps stay committed.
    pub fn execute(&mut self, config: &PipelineConfig) -> Result<PipelineRun> {
        let ingest = load_initial_files(self.conn, self.storage, &config.initial_load, self.opts)?;
        self.context.publish(INITIAL_VAR, ingest.ids.clone());

        let mut steps = Vec::with_capacity(config.steps.len());
        for (index, step) in config.steps.iter().enumerate() {
            match self.run_step(index, step) {
                Ok(outcome) => steps.push(outcome),
                Err(e) => {
                    debug!("Step {} ({}) failed: {:#}", index + 1, step.processor, e);
                    return Err(e);
                }
            }
        }

        let outputs = config
            .outputs()
            .iter()
            .map(|out| self.resolve_output(out))
            .collect::<Result<Vec<_>>>()?;

        info!(
            "Pipeline finished: {} step(s), {} cached",
            steps.len(),
            steps.iter().filter(|s| s.cached).count()
        );
        Ok(PipelineRun {
            ingest,
            steps,
            outputs,
            context: self.context.clone(),
        })
    }

    /// Run one step against the current context and publish its output variable.
    pub fn run_step(&mut self, index: usize, step: &PipelineStep) -> Result<StepOutcome> {
        let registry = self.registry;
        let storage = self.storage;
        let input_ids = self.context.resolve(&step.inputs);
        let processor = registry.get(&step.processor)?;
        let key = step_cache_key(
            &processor.name,
            &processor.impl_hash,
            &input_ids,
            &step.params,
        );

        let reusable = if step.cache && !step.force_rerun {
            self.cached_output(&key)?
        } else {
            None
        };

        let (entry, cached) = match reusable {
            Some(entry) => {
                info!(
                    "Step {} ({}): cached, entry {}",
                    index + 1,
                    step.processor,
                    entry.id
                );
                (entry, true)
            }
            None => {
                let entry = DataProcessor::new(storage, registry).run(
                    self.conn,
                    &step.processor,
                    &input_ids,
                    &step.params,
                )?;
                let tx = self.conn.transaction().context("begin transaction")?;
                if step.cache {
                    db_ops::insert_step_cache(&tx, &key, entry.id)?;
                }
                db_ops::prepend_description(&tx, entry.id, &provenance_note(step))?;
                tx.commit().context("commit transaction")?;
                info!(
                    "Step {} ({}): created entry {}",
                    index + 1,
                    step.processor,
                    entry.id
                );
                (db_ops::require_entry(self.conn, entry.id)?, false)
            }
        };

        let export_path = step
            .export
            .as_deref()
            .map(|name| storage.export(&entry, name))
            .transpose()?;
        self.context.publish(&step.output, vec![entry.id]);

        Ok(StepOutcome {
            index,
            processor: step.processor.clone(),
            output_var: step.output.clone(),
            entry_id: entry.id,
            cached,
            export_path,
        })
    }

    /// Artifact of the newest cache row for `key`, if it and its stored file still exist.
    fn cached_output(&self, key: &str) -> Result<Option<DataEntry>> {
        let Some(output_id) = db_ops::latest_step_cache(self.conn, key)? else {
            debug!("Step cache miss: {}", &key[..key.len().min(16)]);
            return Ok(None);
        };
        match db_ops::get_entry(self.conn, output_id)? {
            Some(entry) if entry.storage_path.is_file() => Ok(Some(entry)),
            Some(entry) => {
                warn!(
                    "Cached entry {} is missing its file {}; re-running",
                    output_id,
                    entry.storage_path.display()
                );
                Ok(None)
            }
            None => {
                warn!("Cached entry {} no longer exists; re-running", output_id);
                Ok(None)
            }
        }
    }

    fn resolve_output(&self, out: &FinalOutput) -> Result<FinalArtifact> {
        let id = self
            .context
            .get(&out.name)
            .and_then(|ids| ids.first().copied())
            .ok_or_else(|| TrackError::UnknownOutput(out.name.clone()))?;
        let entry = db_ops::require_entry(self.conn, id)?;
        let export_path = out
            .export
            .as_deref()
            .map(|name| self.storage.export(&entry, name))
            .transpose()?;
        Ok(FinalArtifact {
            name: out.name.clone(),
            entry,
            export_path,
        })
    }
}

/// Note prepended to a freshly produced artifact's description.
fn provenance_note(step: &PipelineStep) -> String {
    format!(
        "Pipeline Step: {}\nInputs: {}\nParams: {}\n",
        step.processor,
        step.inputs,
        canonical_params(&step.params)
    )
}
