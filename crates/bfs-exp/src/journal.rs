use std::fs::{self, OpenOptions};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use bfs_core::errors::{ErrorInfo, SweepError};
use chrono::{SecondsFormat, Utc};
use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};

use crate::report::SampleOutcome;
use crate::sampler::format_value;

/// File name of the journal inside the result root.
pub const JOURNAL_FILE: &str = "journal.csv";

const COLUMNS: [&str; 6] = ["recorded_at", "variable", "index", "value", "state", "path"];

/// One journal row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalRow {
    pub recorded_at: String,
    pub variable: String,
    pub index: usize,
    pub value: String,
    pub state: String,
    pub path: String,
}

/// Append-only CSV trail of terminal sample outcomes.
///
/// Purely informational: skip decisions never read it, the artifact files
/// remain the only completion ledger. The orchestrator logs append failures
/// and keeps going.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Journal {
    path: PathBuf,
}

impl Journal {
    /// Journal stored at `path`; the file is created on first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Journal stored at `<result_root>/journal.csv`.
    pub fn in_root(result_root: &Path) -> Self {
        Self::new(result_root.join(JOURNAL_FILE))
    }

    /// Location of the journal file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one row for `outcome`, writing the header on first use.
    pub fn append(&self, outcome: &SampleOutcome) -> Result<(), SweepError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| SweepError::io("journal-create", parent, err))?;
        }
        let file_exists = self.path.exists();
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(|err| SweepError::io("journal-open", &self.path, err))?;
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_writer(BufWriter::new(file));
        if !file_exists {
            writer
                .write_record(COLUMNS)
                .map_err(|err| wrap_csv("journal-write-header", err))?;
        }
        let record = [
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            outcome.variable.clone(),
            outcome.index.to_string(),
            format_value(outcome.value),
            outcome.state.as_str().to_string(),
            outcome.path.display().to_string(),
        ];
        writer
            .write_record(&record)
            .map_err(|err| wrap_csv("journal-write-row", err))?;
        writer
            .flush()
            .map_err(|err| wrap_csv("journal-flush", err.into()))?;
        Ok(())
    }

    /// Reads every row back; a missing journal reads as empty.
    pub fn rows(&self) -> Result<Vec<JournalRow>, SweepError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .from_path(&self.path)
            .map_err(|err| wrap_csv("journal-read", err))?;
        reader
            .deserialize()
            .map(|row| row.map_err(|err| wrap_csv("journal-record", err)))
            .collect()
    }
}

fn wrap_csv(code: &str, err: csv::Error) -> SweepError {
    SweepError::Io(ErrorInfo::new(code, "CSV journal failure").with_hint(err.to_string()))
}
