//! Structured error types shared across BFS crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`SweepError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (variable, value, paths, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the operator resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for sweep orchestration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum SweepError {
    /// Malformed sampler or configuration inputs, raised before any engine call.
    #[error("invalid argument: {0}")]
    InvalidArgument(ErrorInfo),
    /// Engine failures that abort the whole run.
    #[error("engine error: {0}")]
    Engine(ErrorInfo),
    /// Solver failures scoped to a single sample.
    #[error("solver error: {0}")]
    Solver(ErrorInfo),
    /// Filesystem failures around the result tree.
    #[error("io error: {0}")]
    Io(ErrorInfo),
    /// Sweep file parsing errors.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// Serialization and hashing errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl SweepError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            SweepError::InvalidArgument(info)
            | SweepError::Engine(info)
            | SweepError::Solver(info)
            | SweepError::Io(info)
            | SweepError::Config(info)
            | SweepError::Serde(info) => info,
        }
    }

    /// Whether the orchestrator may continue with the next sample.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SweepError::Solver(_))
    }

    /// Returns the same error with an extra context entry attached.
    pub fn with_context(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        match self {
            SweepError::InvalidArgument(info) => {
                SweepError::InvalidArgument(info.with_context(key, value))
            }
            SweepError::Engine(info) => SweepError::Engine(info.with_context(key, value)),
            SweepError::Solver(info) => SweepError::Solver(info.with_context(key, value)),
            SweepError::Io(info) => SweepError::Io(info.with_context(key, value)),
            SweepError::Config(info) => SweepError::Config(info.with_context(key, value)),
            SweepError::Serde(info) => SweepError::Serde(info.with_context(key, value)),
        }
    }

    /// Shorthand for an [`SweepError::InvalidArgument`] error.
    pub fn invalid(code: impl Into<String>, message: impl Into<String>) -> Self {
        SweepError::InvalidArgument(ErrorInfo::new(code, message))
    }

    /// Wraps an I/O failure on `path`.
    pub fn io(
        code: impl Into<String>,
        path: impl AsRef<std::path::Path>,
        err: std::io::Error,
    ) -> Self {
        SweepError::Io(
            ErrorInfo::new(code, "filesystem operation failed")
                .with_context("path", path.as_ref().display().to_string())
                .with_hint(err.to_string()),
        )
    }
}
