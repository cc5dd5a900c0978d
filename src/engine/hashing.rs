//! Hashing: file content digests, processor implementation hashes, step cache keys.

use anyhow::Result;
use blake3::Hasher;
use memmap2::Mmap;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use crate::Params;
use crate::utils::config::HashingConsts;

/// Hash a file with blake3. Uses memory-mapped I/O for files above threshold, chunked reading otherwise.
pub fn hash_file(path: &Path) -> Result<[u8; 32]> {
    let file = File::open(path)?;
    let size = file.metadata()?.len();
    let mut hasher = Hasher::new();

    if size > HashingConsts::HASH_MMAP_THRESHOLD {
        // SAFETY: the file is opened read-only and the map does not outlive this call.
        let mmap = unsafe { Mmap::map(&file)? };
        hasher.update(&mmap);
    } else {
        use std::io::Read;
        let mut reader =
            std::io::BufReader::with_capacity(HashingConsts::HASH_READ_CHUNK_SIZE, file);
        let mut buffer = vec![0u8; HashingConsts::HASH_READ_CHUNK_SIZE];
        loop {
            let n = reader.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }
    }

    Ok(*hasher.finalize().as_bytes())
}

/// Hex digest of a file's content.
pub fn hash_file_hex(path: &Path) -> Result<String> {
    Ok(blake3::Hash::from(hash_file(path)?).to_hex().to_string())
}

/// Rebuild `value` with object keys sorted at every level.
fn sorted_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, Value> =
                map.iter().map(|(k, v)| (k, sorted_value(v))).collect();
            Value::Object(sorted.into_iter().map(|(k, v)| (k.clone(), v)).collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted_value).collect()),
        other => other.clone(),
    }
}

/// Canonical JSON of step parameters: keys sorted at every level.
pub fn canonical_params(params: &Params) -> String {
    let sorted: serde_json::Map<String, Value> = params
        .iter()
        .map(|(k, v)| (k.clone(), sorted_value(v)))
        .collect();
    Value::Object(sorted).to_string()
}

/// Deterministic key of one unit of step work.
///
/// Input ids are sorted numerically so the key depends on the input set, not on the order
/// the inputs were listed in.
pub fn step_cache_key(processor: &str, impl_hash: &str, input_ids: &[i64], params: &Params) -> String {
    let mut ids = input_ids.to_vec();
    ids.sort_unstable();
    let ids = ids
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",");
    let components = [processor, impl_hash, ids.as_str(), &canonical_params(params)];
    blake3::hash(components.join("|").as_bytes())
        .to_hex()
        .to_string()
}
