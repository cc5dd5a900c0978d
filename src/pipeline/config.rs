//! Pipeline configuration: initial load, ordered steps, final outputs.
//!
//! Read from YAML, TOML or JSON (by file extension) or built in code with the setters below.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

use crate::{ArtifactKind, Params, TrackError};

/// Context variable seeded with the ingested artifact ids.
pub const INITIAL_VAR: &str = "initial";

#[derive(Clone, Debug, Deserialize)]
pub struct PipelineConfig {
    pub initial_load: InitialLoadConfig,
    #[serde(default)]
    pub steps: Vec<PipelineStep>,
    #[serde(default)]
    pub final_outputs: Vec<FinalOutput>,
    /// Single-output shorthand: `final_output: features`.
    #[serde(default)]
    pub final_output: Option<String>,
}

impl PipelineConfig {
    pub fn new(initial_load: InitialLoadConfig) -> Self {
        Self {
            initial_load,
            steps: Vec::new(),
            final_outputs: Vec::new(),
            final_output: None,
        }
    }

    pub fn step(mut self, step: PipelineStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn output(mut self, output: FinalOutput) -> Self {
        self.final_outputs.push(output);
        self
    }

    /// Declared final outputs, the shorthand form first.
    pub fn outputs(&self) -> Vec<FinalOutput> {
        let mut outs: Vec<FinalOutput> = self
            .final_output
            .iter()
            .map(|name| FinalOutput::new(name))
            .collect();
        outs.extend(
            self.final_outputs
                .iter()
                .filter(|o| self.final_output.as_deref() != Some(o.name.as_str()))
                .cloned(),
        );
        outs
    }
}

/// One include pattern with its own tags.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct IncludeSpec {
    /// Glob; `**` matches any number of directories.
    pub path: String,
    /// Regular expression the matched path must also contain a match for.
    #[serde(default)]
    pub regex: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl IncludeSpec {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            regex: None,
            tags: Vec::new(),
        }
    }

    pub fn regex(mut self, regex: &str) -> Self {
        self.regex = Some(regex.to_string());
        self
    }

    pub fn tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct InitialLoadConfig {
    #[serde(default)]
    pub include: Vec<IncludeSpec>,
    /// Single-pattern shorthand (`path: "./data/**/*.csv"`).
    #[serde(default)]
    pub path: Option<String>,
    /// Regex for the shorthand pattern.
    #[serde(default)]
    pub regex: Option<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default = "default_kind", alias = "type")]
    pub kind: ArtifactKind,
    /// Tags given to every ingested file.
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_kind() -> ArtifactKind {
    ArtifactKind::Raw
}

impl InitialLoadConfig {
    pub fn new() -> Self {
        Self {
            include: Vec::new(),
            path: None,
            regex: None,
            exclude: Vec::new(),
            kind: ArtifactKind::Raw,
            tags: Vec::new(),
        }
    }

    /// Load config with a single include glob.
    pub fn glob(pattern: &str) -> Self {
        Self::new().include(IncludeSpec::new(pattern))
    }

    pub fn include(mut self, spec: IncludeSpec) -> Self {
        self.include.push(spec);
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.exclude.push(pattern.to_string());
        self
    }

    pub fn tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    /// All include specs, the shorthand `path` first.
    pub fn include_specs(&self) -> Vec<IncludeSpec> {
        let mut specs: Vec<IncludeSpec> = self
            .path
            .iter()
            .map(|p| IncludeSpec {
                path: p.clone(),
                regex: self.regex.clone(),
                tags: Vec::new(),
            })
            .collect();
        specs.extend(self.include.iter().cloned());
        specs
    }
}

impl Default for InitialLoadConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// A step's `inputs`: one variable name or a list of them.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum StepInputs {
    One(String),
    Many(Vec<String>),
}

impl StepInputs {
    pub fn names(&self) -> Vec<&str> {
        match self {
            StepInputs::One(s) => vec![s.as_str()],
            StepInputs::Many(v) => v.iter().map(String::as_str).collect(),
        }
    }
}

impl Default for StepInputs {
    fn default() -> Self {
        StepInputs::One(INITIAL_VAR.to_string())
    }
}

impl fmt::Display for StepInputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepInputs::One(s) => f.write_str(s),
            StepInputs::Many(v) => write!(f, "[{}]", v.join(", ")),
        }
    }
}

impl From<&str> for StepInputs {
    fn from(s: &str) -> Self {
        StepInputs::One(s.to_string())
    }
}

impl From<&[&str]> for StepInputs {
    fn from(v: &[&str]) -> Self {
        StepInputs::Many(v.iter().map(|s| s.to_string()).collect())
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct PipelineStep {
    pub processor: String,
    #[serde(default)]
    pub inputs: StepInputs,
    #[serde(default)]
    pub params: Params,
    /// Context variable receiving this step's artifact id.
    pub output: String,
    #[serde(default = "default_true")]
    pub cache: bool,
    #[serde(default, alias = "forceRerun")]
    pub force_rerun: bool,
    /// File name under `exports/` to copy the result to.
    #[serde(default)]
    pub export: Option<String>,
}

fn default_true() -> bool {
    true
}

impl PipelineStep {
    pub fn new(processor: &str, inputs: impl Into<StepInputs>, output: &str) -> Self {
        Self {
            processor: processor.to_string(),
            inputs: inputs.into(),
            params: Params::new(),
            output: output.to_string(),
            cache: true,
            force_rerun: false,
            export: None,
        }
    }

    pub fn param(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    pub fn cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    pub fn force_rerun(mut self, force: bool) -> Self {
        self.force_rerun = force;
        self
    }

    pub fn export(mut self, name: &str) -> Self {
        self.export = Some(name.to_string());
        self
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct FinalOutput {
    pub name: String,
    #[serde(default)]
    pub export: Option<String>,
}

impl FinalOutput {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            export: None,
        }
    }

    pub fn export(mut self, name: &str) -> Self {
        self.export = Some(name.to_string());
        self
    }
}

/// Read a pipeline config; the format follows the extension (`.yaml`/`.yml`, `.toml`, `.json`).
pub fn load_pipeline_config(path: &Path) -> Result<PipelineConfig> {
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("read pipeline config {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("yaml")
        .to_ascii_lowercase();
    let config: PipelineConfig = match ext.as_str() {
        "toml" => toml::from_str(&s).with_context(|| format!("parse {}", path.display()))?,
        "json" => serde_json::from_str(&s).with_context(|| format!("parse {}", path.display()))?,
        "yaml" | "yml" => {
            serde_yaml::from_str(&s).with_context(|| format!("parse {}", path.display()))?
        }
        other => {
            return Err(
                TrackError::InvalidConfig(format!("unsupported config format: .{other}")).into(),
            );
        }
    };
    Ok(config)
}
