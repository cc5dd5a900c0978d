//! Processor registry: name → callable, input arity, output extension, implementation hash.
//!
//! Built once at startup ([`ProcessorRegistry::with_builtins`] plus any [`ProcessorRegistry::register`]
//! calls) and then shared read-only by reference.

pub mod builtin;

use anyhow::{Result, bail};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::{InputDescriptor, Params, TrackError};

/// How many input artifacts a processor consumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputArity {
    /// Exactly one.
    Single,
    /// One or more.
    Multi,
}

impl InputArity {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputArity::Single => "single",
            InputArity::Multi => "multi",
        }
    }

    /// Human wording used in arity errors.
    pub(crate) fn expectation(&self) -> &'static str {
        match self {
            InputArity::Single => "exactly one input",
            InputArity::Multi => "at least one input",
        }
    }

    pub(crate) fn accepts(&self, n: usize) -> bool {
        match self {
            InputArity::Single => n == 1,
            InputArity::Multi => n >= 1,
        }
    }
}

impl fmt::Display for InputArity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs handed to a processor, shaped by its arity.
#[derive(Clone, Debug)]
pub enum ProcessorInput {
    Single(InputDescriptor),
    Multi(Vec<InputDescriptor>),
}

impl ProcessorInput {
    /// All descriptors, in input order.
    pub fn descriptors(&self) -> &[InputDescriptor] {
        match self {
            ProcessorInput::Single(d) => std::slice::from_ref(d),
            ProcessorInput::Multi(ds) => ds,
        }
    }
}

/// Tags a processor may emit for its output artifact.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ProcessorOutput {
    #[default]
    None,
    Tag(String),
    Tags(Vec<String>),
}

impl ProcessorOutput {
    pub fn into_tags(self) -> Vec<String> {
        match self {
            ProcessorOutput::None => Vec::new(),
            ProcessorOutput::Tag(t) => vec![t],
            ProcessorOutput::Tags(ts) => ts,
        }
    }
}

impl From<()> for ProcessorOutput {
    fn from(_: ()) -> Self {
        ProcessorOutput::None
    }
}

impl From<&str> for ProcessorOutput {
    fn from(s: &str) -> Self {
        ProcessorOutput::Tag(s.to_string())
    }
}

impl From<String> for ProcessorOutput {
    fn from(s: String) -> Self {
        ProcessorOutput::Tag(s)
    }
}

impl From<Vec<String>> for ProcessorOutput {
    fn from(v: Vec<String>) -> Self {
        ProcessorOutput::Tags(v)
    }
}

/// Processor callable: `(inputs, output path, params) -> tags`. Must write its output to the given path.
pub type ProcessorFn =
    dyn Fn(&ProcessorInput, &Path, &Params) -> Result<ProcessorOutput> + Send + Sync;

/// Registration request. Build with [`ProcessorSpec::new`] and the chained setters.
pub struct ProcessorSpec {
    name: Option<String>,
    fn_ident: &'static str,
    arity: InputArity,
    output_ext: String,
    version: String,
    dependencies: Vec<(String, String)>,
    params: Option<Vec<String>>,
    func: Arc<ProcessorFn>,
}

impl ProcessorSpec {
    /// Defaults: single arity, `.txt` output, version `"1"`, any params accepted.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&ProcessorInput, &Path, &Params) -> Result<ProcessorOutput> + Send + Sync + 'static,
    {
        Self {
            name: None,
            fn_ident: fn_ident::<F>(),
            arity: InputArity::Single,
            output_ext: ".txt".to_string(),
            version: "1".to_string(),
            dependencies: Vec::new(),
            params: None,
            func: Arc::new(func),
        }
    }

    /// Registered name. When unset, the callable's own identifier is used.
    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn arity(mut self, arity: InputArity) -> Self {
        self.arity = arity;
        self
    }

    pub fn output_ext(mut self, ext: &str) -> Self {
        self.output_ext = normalize_ext(ext);
        self
    }

    /// Implementation version. Bump it whenever the processor's logic changes so cached
    /// results are invalidated.
    pub fn version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    /// Declare a helper whose version also keys the cache.
    pub fn depends_on(mut self, name: &str, version: &str) -> Self {
        self.dependencies.push((name.to_string(), version.to_string()));
        self
    }

    /// Restrict accepted parameter names; unknown names are rejected before the call.
    pub fn params(mut self, names: &[&str]) -> Self {
        self.params = Some(names.iter().map(|s| s.to_string()).collect());
        self
    }
}

/// A registered processor.
#[derive(Clone)]
pub struct Processor {
    pub name: String,
    pub arity: InputArity,
    pub output_ext: String,
    /// Stable hash of name, arity, extension, version and dependency versions.
    pub impl_hash: String,
    pub version: String,
    params: Option<Vec<String>>,
    func: Arc<ProcessorFn>,
}

impl Processor {
    pub fn call(
        &self,
        input: &ProcessorInput,
        output_path: &Path,
        params: &Params,
    ) -> Result<ProcessorOutput> {
        (self.func)(input, output_path, params)
    }

    /// Parameter names not accepted by this processor (empty when it accepts anything).
    pub fn unknown_params(&self, params: &Params) -> Vec<String> {
        match &self.params {
            None => Vec::new(),
            Some(allowed) => params
                .keys()
                .filter(|k| !allowed.contains(k))
                .cloned()
                .collect(),
        }
    }

    pub fn accepted_params(&self) -> Option<&[String]> {
        self.params.as_deref()
    }
}

impl fmt::Debug for Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Processor")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("output_ext", &self.output_ext)
            .field("impl_hash", &self.impl_hash)
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct ProcessorRegistry {
    processors: BTreeMap<String, Processor>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with [`builtin::register_all`].
    pub fn with_builtins() -> Result<Self> {
        let mut registry = Self::new();
        builtin::register_all(&mut registry)?;
        Ok(registry)
    }

    /// Add a processor. Fails with [`TrackError::DuplicateProcessor`] when the name is taken.
    pub fn register(&mut self, spec: ProcessorSpec) -> Result<&Processor> {
        let name = match spec.name {
            Some(n) => n,
            None if is_nameable(spec.fn_ident) => spec.fn_ident.to_string(),
            None => bail!("processor closures must be registered with an explicit name"),
        };
        if self.processors.contains_key(&name) {
            return Err(TrackError::DuplicateProcessor(name).into());
        }
        let impl_hash = implementation_hash(
            &name,
            spec.arity,
            &spec.output_ext,
            &spec.version,
            &spec.dependencies,
        );
        log::debug!("Registered processor {} ({})", name, &impl_hash[..12]);
        let processor = Processor {
            name: name.clone(),
            arity: spec.arity,
            output_ext: spec.output_ext,
            impl_hash,
            version: spec.version,
            params: spec.params,
            func: spec.func,
        };
        Ok(self.processors.entry(name).or_insert(processor))
    }

    /// Look up a processor. Fails with [`TrackError::UnknownProcessor`].
    pub fn get(&self, name: &str) -> Result<&Processor> {
        self.processors
            .get(name)
            .ok_or_else(|| TrackError::UnknownProcessor(name.to_string()).into())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.processors.contains_key(name)
    }

    /// Registered processors, sorted by name.
    pub fn processors(&self) -> impl Iterator<Item = &Processor> {
        self.processors.values()
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

/// Ensure a leading `.` (empty stays empty).
pub fn normalize_ext(ext: &str) -> String {
    let ext = ext.trim();
    if ext.is_empty() || ext.starts_with('.') {
        ext.to_string()
    } else {
        format!(".{ext}")
    }
}

/// Last path segment of the callable's type name: the function name for `fn` items.
fn fn_ident<F>() -> &'static str {
    let full = std::any::type_name::<F>();
    full.rsplit("::").next().unwrap_or(full)
}

fn is_nameable(ident: &str) -> bool {
    !ident.is_empty() && ident.chars().all(|c| c.is_alphanumeric() || c == '_')
}

fn implementation_hash(
    name: &str,
    arity: InputArity,
    ext: &str,
    version: &str,
    dependencies: &[(String, String)],
) -> String {
    let mut deps: Vec<_> = dependencies.iter().collect();
    deps.sort();
    let mut hasher = blake3::Hasher::new();
    for part in [name, arity.as_str(), ext, version] {
        hasher.update(part.as_bytes());
        hasher.update(&[0]);
    }
    for (dep, ver) in deps {
        hasher.update(format!("{dep}={ver}").as_bytes());
        hasher.update(&[0]);
    }
    hasher.finalize().to_hex().to_string()
}

/// Numeric parameter with a default. Strings holding numbers are accepted (CLI `k=v` input).
pub fn param_f64(params: &Params, key: &str, default: f64) -> Result<f64> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| anyhow::anyhow!("parameter '{key}' is not a finite number")),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("parameter '{key}' is not a number: {s}")),
        Some(other) => bail!("parameter '{key}' must be a number, got {other}"),
    }
}

/// Non-negative integer parameter with a default.
pub fn param_usize(params: &Params, key: &str, default: usize) -> Result<usize> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(|v| v as usize)
            .ok_or_else(|| anyhow::anyhow!("parameter '{key}' must be a non-negative integer")),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("parameter '{key}' is not an integer: {s}")),
        Some(other) => bail!("parameter '{key}' must be an integer, got {other}"),
    }
}

/// String parameter with a default.
pub fn param_str(params: &Params, key: &str, default: &str) -> Result<String> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(default.to_string()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => bail!("parameter '{key}' must be a string, got {other}"),
    }
}
