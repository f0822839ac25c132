//! Contract between the orchestrator and the external simulation engine.
//!
//! Every engine call blocks until the engine answers. Commands travel as
//! structured [`EngineCommand`] values; each adapter owns the translation into
//! whatever form its engine understands.

use std::path::{Path, PathBuf};

use bfs_core::errors::SweepError;
use bfs_core::{ParameterVector, StepResolution, Subvolume};
use serde::{Deserialize, Serialize};

mod macro_script;
mod simulated;

pub use macro_script::{
    render_macro, ExportSettings, MacroEngine, MacroFailure, MacroProject, MacroRunner,
    ProcessRunner,
};
pub use simulated::{SimulatedEngine, SimulatedProject};

/// Connected engine able to open projects.
///
/// Concrete adapters expose a `connect` constructor; the orchestrator only
/// ever sees an already connected engine.
pub trait Engine {
    /// Handle to the single project kept open for the whole run.
    type Project: Project;

    /// Opens the project at `path`. Failure aborts the run.
    fn open_project(&mut self, path: &Path) -> Result<Self::Project, SweepError>;
}

/// Operations the orchestrator issues against an open project.
pub trait Project {
    /// Stores every named scalar and rebuilds the model. Failures are fatal.
    fn apply_parameters(&mut self, parameters: &ParameterVector) -> Result<(), SweepError>;

    /// Runs the field solver. A [`SweepError::Solver`] is recoverable and
    /// leaves the project usable; any other family is fatal.
    fn run_solver(&mut self) -> Result<(), SweepError>;

    /// Writes the field export described by `request`. Failures are fatal.
    fn export_field(&mut self, request: &ExportRequest) -> Result<(), SweepError>;

    /// Persists the project state. Failures are fatal.
    fn save(&mut self) -> Result<(), SweepError>;
}

/// Field export parameters, constant across a run except for `path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRequest {
    pub path: PathBuf,
    pub subvolume: Subvolume,
    pub step_resolution: StepResolution,
}

/// Structured engine command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum EngineCommand {
    OpenProject { path: PathBuf },
    StoreParameters { parameters: ParameterVector },
    RunSolver,
    ExportField(ExportRequest),
    SaveProject,
}

/// Discriminant of [`EngineCommand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    OpenProject,
    StoreParameters,
    RunSolver,
    ExportField,
    SaveProject,
}

impl EngineCommand {
    /// Returns the command discriminant.
    pub fn kind(&self) -> CommandKind {
        match self {
            EngineCommand::OpenProject { .. } => CommandKind::OpenProject,
            EngineCommand::StoreParameters { .. } => CommandKind::StoreParameters,
            EngineCommand::RunSolver => CommandKind::RunSolver,
            EngineCommand::ExportField(_) => CommandKind::ExportField,
            EngineCommand::SaveProject => CommandKind::SaveProject,
        }
    }
}

impl CommandKind {
    /// Stable name used in logs and error codes.
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::OpenProject => "open_project",
            CommandKind::StoreParameters => "store_parameters",
            CommandKind::RunSolver => "run_solver",
            CommandKind::ExportField => "export_field",
            CommandKind::SaveProject => "save_project",
        }
    }
}
