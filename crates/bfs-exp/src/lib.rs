//! Resumable parameter-sweep orchestration for field simulation engines.
//!
//! Each variable of the universe is perturbed around its default with a
//! seeded Latin hypercube design; every sample is configured, solved,
//! exported and saved through an [`Engine`] adapter. Exported files double as
//! the completion ledger, so an interrupted sweep restarted in
//! [`RunMode::Resume`](bfs_core::RunMode::Resume) continues where it stopped.

mod config;
mod engine;
mod hash;
mod journal;
mod orchestrator;
mod report;
pub mod sampler;
mod serde;
mod state;
mod store;

pub use config::{default_coils, validate_universe, SweepConfig, SweepFile};
pub use engine::{
    render_macro, CommandKind, Engine, EngineCommand, ExportRequest, ExportSettings, MacroEngine,
    MacroFailure, MacroProject, MacroRunner, ProcessRunner, Project, SimulatedEngine,
    SimulatedProject,
};
pub use hash::{stable_hash_string, sweep_hash};
pub use journal::{Journal, JournalRow, JOURNAL_FILE};
pub use orchestrator::{Orchestrator, PlannedAction, PlannedSample};
pub use report::{RunReport, RunSummary, SampleOutcome, REPORT_FILE};
pub use sampler::{format_value, generate};
pub use serde::{from_json_slice, to_canonical_json_bytes};
pub use state::{SampleRun, SampleState};
pub use store::{path_for, ResultStore};
