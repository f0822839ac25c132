use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use bfs_core::errors::{ErrorInfo, SweepError};
use bfs_core::ParameterVector;
use tracing::debug;

use super::{CommandKind, Engine, EngineCommand, ExportRequest, Project};
use crate::sampler::format_value;

#[derive(Debug, Default)]
struct SimState {
    commands: Vec<EngineCommand>,
    issued: HashMap<CommandKind, usize>,
    solver_failures: BTreeSet<(String, String)>,
    fatal_after: HashMap<CommandKind, usize>,
}

impl SimState {
    fn record(&mut self, command: EngineCommand) -> Result<(), SweepError> {
        let kind = command.kind();
        let issued = self.issued.entry(kind).or_insert(0);
        *issued += 1;
        debug!(command = kind.as_str(), count = *issued, "simulated engine command");
        self.commands.push(command);
        match self.fatal_after.get(&kind) {
            Some(limit) if *issued > *limit => Err(SweepError::Engine(
                ErrorInfo::new("simulated-fatal", "injected engine failure")
                    .with_context("command", kind.as_str()),
            )),
            _ => Ok(()),
        }
    }
}

/// In-process engine double.
///
/// Records every command, writes a small fixed-width field file on export and
/// can be told to fail the solver for chosen samples or to fail any command
/// kind fatally after a number of successful calls.
#[derive(Debug, Clone, Default)]
pub struct SimulatedEngine {
    state: Rc<RefCell<SimState>>,
}

impl SimulatedEngine {
    /// Creates a fresh engine with an empty command log.
    pub fn connect() -> Self {
        Self::default()
    }

    /// Makes the solver fail recoverably whenever `variable = value`.
    pub fn fail_solver_for(self, variable: &str, value: f64) -> Self {
        self.state
            .borrow_mut()
            .solver_failures
            .insert((variable.to_string(), format_value(value)));
        self
    }

    /// Makes `kind` fail fatally once it has succeeded `successes` times.
    pub fn fail_after(self, kind: CommandKind, successes: usize) -> Self {
        self.state.borrow_mut().fatal_after.insert(kind, successes);
        self
    }

    /// Every command received so far, in order.
    pub fn commands(&self) -> Vec<EngineCommand> {
        self.state.borrow().commands.clone()
    }

    /// Number of commands of `kind` received so far.
    pub fn count(&self, kind: CommandKind) -> usize {
        self.state.borrow().issued.get(&kind).copied().unwrap_or(0)
    }

    /// Total number of commands received so far.
    pub fn total_calls(&self) -> usize {
        self.state.borrow().commands.len()
    }
}

impl Engine for SimulatedEngine {
    type Project = SimulatedProject;

    fn open_project(&mut self, path: &Path) -> Result<Self::Project, SweepError> {
        self.state
            .borrow_mut()
            .record(EngineCommand::OpenProject {
                path: path.to_path_buf(),
            })?;
        Ok(SimulatedProject {
            state: Rc::clone(&self.state),
            parameters: None,
            solved: false,
        })
    }
}

/// Project handle of a [`SimulatedEngine`].
#[derive(Debug)]
pub struct SimulatedProject {
    state: Rc<RefCell<SimState>>,
    parameters: Option<ParameterVector>,
    solved: bool,
}

impl Project for SimulatedProject {
    fn apply_parameters(&mut self, parameters: &ParameterVector) -> Result<(), SweepError> {
        self.state
            .borrow_mut()
            .record(EngineCommand::StoreParameters {
                parameters: parameters.clone(),
            })?;
        self.parameters = Some(parameters.clone());
        self.solved = false;
        Ok(())
    }

    fn run_solver(&mut self) -> Result<(), SweepError> {
        let mut state = self.state.borrow_mut();
        state.record(EngineCommand::RunSolver)?;
        let Some(parameters) = &self.parameters else {
            return Err(SweepError::Solver(ErrorInfo::new(
                "simulated-solver-unconfigured",
                "solver started before any parameters were stored",
            )));
        };
        let target = parameters.target().to_string();
        let value = format_value(parameters.get(&target).unwrap_or_default());
        if state.solver_failures.contains(&(target.clone(), value.clone())) {
            return Err(SweepError::Solver(
                ErrorInfo::new("simulated-solver", "solver did not converge")
                    .with_context("variable", target)
                    .with_context("value", value),
            ));
        }
        self.solved = true;
        Ok(())
    }

    fn export_field(&mut self, request: &ExportRequest) -> Result<(), SweepError> {
        self.state
            .borrow_mut()
            .record(EngineCommand::ExportField(request.clone()))?;
        let parameters = match (&self.parameters, self.solved) {
            (Some(parameters), true) => parameters,
            _ => {
                return Err(SweepError::Engine(
                    ErrorInfo::new("simulated-export-unsolved", "no solved field to export")
                        .with_context("path", request.path.display().to_string()),
                ))
            }
        };
        let body = render_field(parameters, request);
        fs::write(&request.path, body)
            .map_err(|err| SweepError::io("simulated-export-write", &request.path, err))
    }

    fn save(&mut self) -> Result<(), SweepError> {
        self.state.borrow_mut().record(EngineCommand::SaveProject)
    }
}

/// Synthetic field sampled at the subvolume corners, scaled by the sample.
fn render_field(parameters: &ParameterVector, request: &ExportRequest) -> String {
    let amplitude = parameters.get(parameters.target()).unwrap_or_default();
    let [x0, x1, y0, y1, z0, z1] = request.subvolume.bounds();
    let [sx, sy, sz] = request.step_resolution.steps();
    let mut out = String::new();
    let _ = writeln!(out, "% simulated B-field export");
    for (name, value) in parameters.iter() {
        let _ = writeln!(out, "% {name} = {}", format_value(value));
    }
    let _ = writeln!(out, "% step = {sx} {sy} {sz}");
    let _ = writeln!(
        out,
        "{:>14}{:>14}{:>14}{:>14}{:>14}{:>14}",
        "x", "y", "z", "Bx", "By", "Bz"
    );
    for x in [x0, x1] {
        for y in [y0, y1] {
            for z in [z0, z1] {
                let bz = amplitude * 1e-3;
                let _ = writeln!(
                    out,
                    "{x:>14.3}{y:>14.3}{z:>14.3}{:>14.6}{:>14.6}{bz:>14.6}",
                    0.0, 0.0
                );
            }
        }
    }
    out
}
