//! Domain error taxonomy.
//!
//! Library functions return [`anyhow::Result`]; the variants below are the errors callers are
//! expected to match on (`err.downcast_ref::<TrackError>()`). Processor errors are never wrapped.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackError {
    /// No processor registered under this name.
    #[error("unknown processor: {0}")]
    UnknownProcessor(String),

    /// A processor with this name is already registered.
    #[error("processor already registered: {0}")]
    DuplicateProcessor(String),

    /// Input count does not match the processor's declared arity.
    #[error("processor '{processor}' expects {expected}, got {got} input(s)")]
    Arity {
        processor: String,
        expected: &'static str,
        got: usize,
    },

    /// Parameters the processor does not declare.
    #[error("processor '{processor}' does not accept parameter(s): {names}")]
    UnknownParameter { processor: String, names: String },

    /// Processor broke its contract (no output file written, blank tag returned).
    #[error("processor '{processor}' violated its contract: {reason}")]
    ContractViolation { processor: String, reason: String },

    /// Ingestion matched no files.
    #[error("no files matched: {0}")]
    NoMatch(String),

    /// Malformed glob or regular expression.
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Artifact id not present in the store.
    #[error("data entry {0} does not exist")]
    EntryNotFound(i64),

    /// Final output names a context variable that holds no artifact.
    #[error("final output '{0}' was not produced by any step")]
    UnknownOutput(String),

    /// Pipeline configuration is structurally valid but semantically rejected.
    #[error("invalid pipeline config: {0}")]
    InvalidConfig(String),
}

impl TrackError {
    pub fn invalid_pattern(pattern: &str, reason: impl ToString) -> Self {
        TrackError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<globset::Error> for TrackError {
    fn from(err: globset::Error) -> Self {
        let pattern = err.glob().unwrap_or_default().to_string();
        TrackError::InvalidPattern {
            pattern,
            reason: err.kind().to_string(),
        }
    }
}
