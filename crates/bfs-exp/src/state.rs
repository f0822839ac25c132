use std::fmt;

use bfs_core::errors::{ErrorInfo, SweepError};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::sampler::format_value;

/// Lifecycle of a single sample.
///
/// ```text
/// Pending ─┬─> Skipped
///          └─> Configuring ─> Solving ─┬─> Exporting ─> Persisted
///                                      └─> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleState {
    Pending,
    Skipped,
    Configuring,
    Solving,
    Exporting,
    Persisted,
    Failed,
}

impl SampleState {
    /// Whether the sample has finished processing.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SampleState::Skipped | SampleState::Persisted | SampleState::Failed
        )
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_advance_to(&self, next: SampleState) -> bool {
        use SampleState::*;
        matches!(
            (self, next),
            (Pending, Skipped)
                | (Pending, Configuring)
                | (Configuring, Solving)
                | (Solving, Exporting)
                | (Solving, Failed)
                | (Exporting, Persisted)
        )
    }

    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SampleState::Pending => "pending",
            SampleState::Skipped => "skipped",
            SampleState::Configuring => "configuring",
            SampleState::Solving => "solving",
            SampleState::Exporting => "exporting",
            SampleState::Persisted => "persisted",
            SampleState::Failed => "failed",
        }
    }
}

impl fmt::Display for SampleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks one sample through its legal transitions.
#[derive(Debug, Clone)]
pub struct SampleRun {
    variable: String,
    index: usize,
    value: f64,
    state: SampleState,
}

impl SampleRun {
    /// Starts tracking `variable = value` in the `Pending` state.
    pub fn new(variable: &str, index: usize, value: f64) -> Self {
        Self {
            variable: variable.to_string(),
            index,
            value,
            state: SampleState::Pending,
        }
    }

    /// Current state.
    pub fn state(&self) -> SampleState {
        self.state
    }

    /// Moves to `next`, refusing transitions the lifecycle does not allow.
    pub fn advance(&mut self, next: SampleState) -> Result<(), SweepError> {
        if !self.state.can_advance_to(next) {
            return Err(SweepError::InvalidArgument(
                ErrorInfo::new("sample-transition", "illegal sample state transition")
                    .with_context("variable", self.variable.clone())
                    .with_context("value", format_value(self.value))
                    .with_context("from", self.state.as_str())
                    .with_context("to", next.as_str()),
            ));
        }
        debug!(
            variable = %self.variable,
            index = self.index,
            value = self.value,
            from = self.state.as_str(),
            to = next.as_str(),
            "sample transition"
        );
        self.state = next;
        Ok(())
    }
}
