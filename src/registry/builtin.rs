//! Built-in processors. The domain catalog (plots, log parsers, statistics) lives outside the
//! core; these cover the common file-level operations.

use anyhow::{Context, Result, bail};
use std::fs;
use std::io::Write;
use std::path::Path;

use super::{
    InputArity, ProcessorInput, ProcessorOutput, ProcessorRegistry, ProcessorSpec, param_f64,
    param_str, param_usize,
};
use crate::Params;

/// Register every built-in processor.
pub fn register_all(registry: &mut ProcessorRegistry) -> Result<()> {
    registry.register(
        ProcessorSpec::new(csv_multiplier)
            .output_ext("csv")
            .version("2")
            .depends_on("format_cell", "1")
            .params(&["multiplier"]),
    )?;
    registry.register(
        ProcessorSpec::new(csv_concat)
            .arity(InputArity::Multi)
            .output_ext("csv")
            .version("2"),
    )?;
    registry.register(
        ProcessorSpec::new(text_merge)
            .arity(InputArity::Multi)
            .output_ext("txt")
            .version("1")
            .params(&["sep"]),
    )?;
    registry.register(
        ProcessorSpec::new(text_repeat)
            .output_ext("log")
            .version("1")
            .params(&["repeat_num"]),
    )?;
    Ok(())
}

fn format_cell(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.1}")
    } else {
        v.to_string()
    }
}

fn csv_reader(path: &Path) -> Result<csv::Reader<fs::File>> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("read {}", path.display()))
}

fn csv_writer(path: &Path) -> Result<csv::Writer<fs::File>> {
    csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("create {}", path.display()))
}

/// Multiply every numeric CSV cell by `multiplier` (default 1.0). The header row and
/// non-numeric cells are kept as they are.
pub fn csv_multiplier(input: &ProcessorInput, output: &Path, params: &Params) -> Result<ProcessorOutput> {
    let multiplier = param_f64(params, "multiplier", 1.0)?;
    let src = &input.descriptors()[0].path;
    let mut reader = csv_reader(src)?;
    let mut writer = csv_writer(output)?;
    let header = reader
        .headers()
        .with_context(|| format!("parse header of {}", src.display()))?
        .clone();
    if !header.is_empty() {
        writer.write_record(&header)?;
    }
    for record in reader.records() {
        let record = record.with_context(|| format!("parse {}", src.display()))?;
        let cells: Vec<String> = record
            .iter()
            .map(|cell| match cell.trim().parse::<f64>() {
                Ok(v) => format_cell(v * multiplier),
                Err(_) => cell.to_string(),
            })
            .collect();
        writer.write_record(&cells)?;
    }
    writer
        .flush()
        .with_context(|| format!("write {}", output.display()))?;
    Ok(ProcessorOutput::None)
}

/// Concatenate CSV files that share a header row. The header is written once.
pub fn csv_concat(input: &ProcessorInput, output: &Path, _params: &Params) -> Result<ProcessorOutput> {
    let mut writer = csv_writer(output)?;
    let mut header: Option<csv::StringRecord> = None;
    for d in input.descriptors() {
        let mut reader = csv_reader(&d.path)?;
        let first = reader
            .headers()
            .with_context(|| format!("parse header of {}", d.path.display()))?
            .clone();
        if first.is_empty() {
            continue;
        }
        match &header {
            None => {
                writer.write_record(&first)?;
                header = Some(first);
            }
            Some(h) if *h != first => bail!(
                "header mismatch in input {}: expected '{}', found '{}'",
                d.id,
                h.iter().collect::<Vec<_>>().join(","),
                first.iter().collect::<Vec<_>>().join(",")
            ),
            Some(_) => {}
        }
        for record in reader.records() {
            let record = record.with_context(|| format!("parse {}", d.path.display()))?;
            writer.write_record(&record)?;
        }
    }
    writer
        .flush()
        .with_context(|| format!("write {}", output.display()))?;
    Ok(ProcessorOutput::Tags(vec![
        "csv_concat".to_string(),
        format!("concat_of_{}", input.descriptors().len()),
    ]))
}

/// Join text files with `sep` (default newline).
pub fn text_merge(input: &ProcessorInput, output: &Path, params: &Params) -> Result<ProcessorOutput> {
    let sep = param_str(params, "sep", "\n")?;
    let mut f = fs::File::create(output).with_context(|| format!("create {}", output.display()))?;
    for (i, d) in input.descriptors().iter().enumerate() {
        let text =
            fs::read_to_string(&d.path).with_context(|| format!("read {}", d.path.display()))?;
        if i > 0 {
            f.write_all(sep.as_bytes())?;
        }
        f.write_all(text.as_bytes())?;
    }
    Ok(ProcessorOutput::from("text_merge"))
}

/// Repeat a text file `repeat_num` times (default 1), newline separated.
pub fn text_repeat(input: &ProcessorInput, output: &Path, params: &Params) -> Result<ProcessorOutput> {
    let n = param_usize(params, "repeat_num", 1)?;
    let src = &input.descriptors()[0].path;
    let text = fs::read_to_string(src).with_context(|| format!("read {}", src.display()))?;
    let repeated = vec![text.as_str(); n].join("\n");
    fs::write(output, repeated).with_context(|| format!("write {}", output.display()))?;
    Ok(ProcessorOutput::None)
}
