//! Run one registered processor against stored artifacts and record the result.

use anyhow::{Context, Result};
use log::{debug, warn};
use rusqlite::Connection;
use serde_json::json;
use std::path::Path;

use super::db_ops;
use super::hashing::canonical_params;
use super::storage::ArtifactStorage;
use crate::registry::{InputArity, Processor, ProcessorInput, ProcessorRegistry};
use crate::{ArtifactKind, DataEntry, InputDescriptor, NewEntry, OpType, Params, TrackError};

/// Executes processors and materializes their outputs as `processed` artifacts.
pub struct DataProcessor<'a> {
    storage: &'a ArtifactStorage,
    registry: &'a ProcessorRegistry,
}

impl<'a> DataProcessor<'a> {
    pub fn new(storage: &'a ArtifactStorage, registry: &'a ProcessorRegistry) -> Self {
        Self { storage, registry }
    }

    /// Run `processor_name` on `input_ids` with `params`.
    ///
    /// Validation (unknown processor, arity, parameters, missing inputs) happens before any side
    /// effect. Processor errors are returned as-is. The artifact row, its lineage edges, tags and
    /// history row are committed in one transaction; on any failure the output file is removed.
    pub fn run(
        &self,
        conn: &mut Connection,
        processor_name: &str,
        input_ids: &[i64],
        params: &Params,
    ) -> Result<DataEntry> {
        let processor = self.registry.get(processor_name)?;
        check_arity(processor, input_ids)?;
        check_params(processor, params)?;

        let mut descriptors = input_ids
            .iter()
            .map(|id| load_descriptor(conn, *id))
            .collect::<Result<Vec<_>>>()?;
        let input = match processor.arity {
            InputArity::Single => ProcessorInput::Single(descriptors.remove(0)),
            InputArity::Multi => ProcessorInput::Multi(descriptors),
        };

        let output_path = self.storage.allocate_processed(&processor.output_ext);
        debug!(
            "Running {} on {:?} -> {}",
            processor.name,
            input_ids,
            output_path.display()
        );

        let result = self
            .invoke(processor, &input, &output_path, params)
            .and_then(|tags| persist(conn, processor, input_ids, params, &output_path, &tags));
        if result.is_err() {
            remove_partial_output(&output_path);
        }
        result
    }

    /// Call the processor and check its side of the contract. Returns normalized tags.
    fn invoke(
        &self,
        processor: &Processor,
        input: &ProcessorInput,
        output_path: &Path,
        params: &Params,
    ) -> Result<Vec<String>> {
        let tags = processor.call(input, output_path, params)?.into_tags();
        if !output_path.is_file() {
            return Err(TrackError::ContractViolation {
                processor: processor.name.clone(),
                reason: format!("no output written to {}", output_path.display()),
            }
            .into());
        }
        if tags.iter().any(|t| t.trim().is_empty()) {
            return Err(TrackError::ContractViolation {
                processor: processor.name.clone(),
                reason: "returned an empty tag".to_string(),
            }
            .into());
        }
        Ok(tags)
    }
}

fn check_arity(processor: &Processor, input_ids: &[i64]) -> Result<()> {
    if processor.arity.accepts(input_ids.len()) {
        return Ok(());
    }
    Err(TrackError::Arity {
        processor: processor.name.clone(),
        expected: processor.arity.expectation(),
        got: input_ids.len(),
    }
    .into())
}

fn check_params(processor: &Processor, params: &Params) -> Result<()> {
    let unknown = processor.unknown_params(params);
    if unknown.is_empty() {
        return Ok(());
    }
    Err(TrackError::UnknownParameter {
        processor: processor.name.clone(),
        names: unknown.join(", "),
    }
    .into())
}

/// Storage path, original path and current tags of one input artifact.
pub fn load_descriptor(conn: &Connection, id: i64) -> Result<InputDescriptor> {
    let entry = db_ops::require_entry(conn, id)?;
    let tags = db_ops::tags_of(conn, id)?;
    Ok(InputDescriptor {
        id,
        path: entry.storage_path,
        original_path: entry.original_path,
        tags,
    })
}

fn persist(
    conn: &mut Connection,
    processor: &Processor,
    input_ids: &[i64],
    params: &Params,
    output_path: &Path,
    tags: &[String],
) -> Result<DataEntry> {
    let canonical = canonical_params(params);
    let tx = conn.transaction().context("begin transaction")?;
    let entry = db_ops::insert_entry(
        &tx,
        &NewEntry {
            kind: ArtifactKind::Processed,
            storage_path: output_path.to_path_buf(),
            original_path: None,
            description: format!(
                "Processed by {} from {:?} with {}",
                processor.name, input_ids, canonical
            ),
            content_hash: None,
        },
    )?;
    for parent in input_ids {
        db_ops::add_parent_edge(&tx, *parent, entry.id)?;
    }
    db_ops::attach_tags(&tx, entry.id, tags)?;
    db_ops::log_operation(
        &tx,
        entry.id,
        OpType::Process,
        &json!({
            "processor": processor.name,
            "impl_hash": processor.impl_hash,
            "inputs": input_ids,
            "params": params,
        }),
    )?;
    tx.commit().context("commit transaction")?;
    debug!("Created processed entry {}", entry.id);
    Ok(entry)
}

fn remove_partial_output(path: &Path) {
    if path.exists()
        && let Err(e) = std::fs::remove_file(path)
    {
        warn!("Could not remove partial output {}: {}", path.display(), e);
    }
}
