use std::fs;
use std::path::{Path, PathBuf};

use bfs_core::errors::{ErrorInfo, SweepError};
use bfs_core::RunMode;
use serde::{Deserialize, Serialize};

use crate::serde::{from_json_slice, to_canonical_json_bytes};
use crate::state::SampleState;

/// File name of the report inside the result root.
pub const REPORT_FILE: &str = "run_report.json";

/// Terminal outcome of one sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleOutcome {
    pub variable: String,
    pub index: usize,
    pub value: f64,
    pub path: PathBuf,
    pub state: SampleState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

/// Per-state counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub persisted: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Record of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Hash of the sample-determining settings, see [`crate::sweep_hash`].
    pub config_hash: String,
    pub mode: RunMode,
    #[serde(default)]
    pub created_at: Option<String>,
    pub outcomes: Vec<SampleOutcome>,
    pub summary: RunSummary,
}

impl RunReport {
    /// Empty report for a run about to start.
    pub fn new(config_hash: String, mode: RunMode) -> Self {
        Self {
            config_hash,
            mode,
            created_at: None,
            outcomes: Vec::new(),
            summary: RunSummary::default(),
        }
    }

    /// Appends a terminal outcome and updates the summary.
    pub fn record(&mut self, outcome: SampleOutcome) {
        match outcome.state {
            SampleState::Persisted => self.summary.persisted += 1,
            SampleState::Skipped => self.summary.skipped += 1,
            SampleState::Failed => self.summary.failed += 1,
            _ => {}
        }
        self.outcomes.push(outcome);
    }

    /// Outcomes that ended in `Failed`, i.e. candidates for the next resume.
    pub fn failed(&self) -> impl Iterator<Item = &SampleOutcome> + '_ {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.state == SampleState::Failed)
    }

    /// Writes the report as canonical JSON to `path`.
    pub fn write(&self, path: &Path) -> Result<(), SweepError> {
        let bytes = to_canonical_json_bytes(self)?;
        fs::write(path, bytes).map_err(|err| SweepError::io("report-write", path, err))
    }

    /// Loads a report written by [`RunReport::write`], if one exists.
    pub fn load(path: &Path) -> Result<Option<Self>, SweepError> {
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(path).map_err(|err| SweepError::io("report-read", path, err))?;
        from_json_slice(&bytes)
            .map(Some)
            .map_err(|err| err.with_context("path", path.display().to_string()))
    }
}
