// Error types for catalog loading, configuration and the engine control surface

use std::fmt;
use thiserror::Error;

/// Result type for engine control operations
pub type EngineResult<T> = Result<T, EngineError>;

/// A single problem found while validating one catalog entry
#[derive(Debug, Clone, PartialEq)]
pub struct FieldIssue {
    pub body: String,
    pub field: &'static str,
    pub problem: String,
}

impl FieldIssue {
    pub fn new(body: &str, field: &'static str, problem: impl Into<String>) -> Self {
        Self {
            body: body.to_string(),
            field,
            problem: problem.into(),
        }
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}: {}", self.body, self.field, self.problem)
    }
}

fn join_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors raised while loading celestial body definitions
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("catalog rejected, {} invalid field(s): {}", .0.len(), join_issues(.0))]
    InvalidBodies(Vec<FieldIssue>),
}

/// Errors raised while reading engine configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Recoverable errors from the runtime control surface
#[derive(Error, Debug, PartialEq)]
pub enum EngineError {
    #[error("Body not found: {0}")]
    BodyNotFound(String),
}
