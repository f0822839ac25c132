use std::collections::HashMap;
use std::path::{Path, PathBuf};

use bfs_core::errors::{ErrorInfo, SweepError};
use bfs_core::{ParameterVector, RunMode, VariableSpec};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{validate_universe, SweepConfig};
use crate::engine::{Engine, ExportRequest, Project};
use crate::hash::sweep_hash;
use crate::journal::Journal;
use crate::report::{RunReport, SampleOutcome};
use crate::sampler::{self, format_value};
use crate::state::{SampleRun, SampleState};
use crate::store::ResultStore;

/// What a run would do with a sample, decided without touching the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlannedAction {
    Run,
    Skip,
}

/// One entry of [`Orchestrator::plan`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedSample {
    pub variable: String,
    pub index: usize,
    pub value: f64,
    pub path: PathBuf,
    pub action: PlannedAction,
    /// Index of an earlier sample of the same variable sharing this path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collides_with: Option<usize>,
}

/// Drives the engine through every sample of every variable, in order.
#[derive(Debug)]
pub struct Orchestrator {
    config: SweepConfig,
    universe: Vec<VariableSpec>,
    mode: RunMode,
    store: ResultStore,
    journal: Option<Journal>,
    config_hash: String,
}

impl Orchestrator {
    /// Validates the settings and universe; nothing touches the engine or
    /// the filesystem yet.
    pub fn new(
        config: SweepConfig,
        universe: Vec<VariableSpec>,
        mode: RunMode,
    ) -> Result<Self, SweepError> {
        config.validate()?;
        validate_universe(&universe)?;
        let config_hash = sweep_hash(&config, &universe)?;
        let store = ResultStore::new(config.result_root.clone());
        Ok(Self {
            config,
            universe,
            mode,
            store,
            journal: None,
            config_hash,
        })
    }

    /// Records every terminal sample in `journal`.
    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Active run mode.
    pub fn mode(&self) -> RunMode {
        self.mode
    }

    /// Hash of the sample-determining settings.
    pub fn config_hash(&self) -> &str {
        &self.config_hash
    }

    /// Result store the run writes into.
    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Opens the project and processes the whole universe.
    pub fn run<E: Engine>(
        &self,
        engine: &mut E,
        project_path: &Path,
    ) -> Result<RunReport, SweepError> {
        info!(project = %project_path.display(), mode = %self.mode, "opening project");
        let mut project = engine
            .open_project(project_path)
            .map_err(|err| err.with_context("project", project_path.display().to_string()))?;
        self.run_project(&mut project)
    }

    /// Processes every variable against an already open project.
    ///
    /// Returns on the first fatal error; artifacts written before it stay in
    /// place so a later resume picks up from there.
    pub fn run_project<P: Project>(&self, project: &mut P) -> Result<RunReport, SweepError> {
        let mut report = RunReport::new(self.config_hash.clone(), self.mode);
        for spec in &self.universe {
            self.run_variable(project, spec, &mut report)?;
        }
        info!(
            persisted = report.summary.persisted,
            skipped = report.summary.skipped,
            failed = report.summary.failed,
            "sweep finished"
        );
        Ok(report)
    }

    /// Skip analysis for the whole universe, with zero engine calls.
    pub fn plan(&self) -> Result<Vec<PlannedSample>, SweepError> {
        let mut planned = Vec::new();
        for spec in &self.universe {
            let values = self.sample_set(spec)?;
            let mut seen: HashMap<PathBuf, usize> = HashMap::new();
            for (index, value) in values.into_iter().enumerate() {
                let path = self.store.path_for(&spec.name, value);
                let collides_with = seen.get(&path).copied();
                seen.entry(path.clone()).or_insert(index);
                let action = if self.should_skip(&path) {
                    PlannedAction::Skip
                } else {
                    PlannedAction::Run
                };
                planned.push(PlannedSample {
                    variable: spec.name.clone(),
                    index,
                    value,
                    path,
                    action,
                    collides_with,
                });
            }
        }
        Ok(planned)
    }

    fn sample_set(&self, spec: &VariableSpec) -> Result<Vec<f64>, SweepError> {
        sampler::generate(
            spec.default,
            self.config.variation_fraction,
            self.config.sample_count,
            self.config.seed,
        )
        .map_err(|err| err.with_context("variable", spec.name.clone()))
    }

    fn should_skip(&self, path: &Path) -> bool {
        self.mode == RunMode::Resume && self.store.exists(path)
    }

    fn run_variable<P: Project>(
        &self,
        project: &mut P,
        spec: &VariableSpec,
        report: &mut RunReport,
    ) -> Result<(), SweepError> {
        let folder = self.store.ensure_folder(&spec.name)?;
        let values = self.sample_set(spec)?;
        info!(
            variable = %spec.name,
            samples = values.len(),
            folder = %folder.display(),
            "processing variable"
        );
        let mut seen: HashMap<PathBuf, usize> = HashMap::new();
        for (index, value) in values.iter().copied().enumerate() {
            let path = self.store.path_for(&spec.name, value);
            if let Some(earlier) = seen.get(&path) {
                warn!(
                    variable = %spec.name,
                    index,
                    earlier,
                    value = %format_value(value),
                    "sample rounds onto the artifact path of an earlier sample"
                );
            } else {
                seen.insert(path.clone(), index);
            }
            let outcome = self.run_sample(project, spec, index, values.len(), value, path)?;
            if let Some(journal) = &self.journal {
                if let Err(err) = journal.append(&outcome) {
                    warn!(
                        journal = %journal.path().display(),
                        error = %err,
                        "journal append failed, continuing"
                    );
                }
            }
            report.record(outcome);
        }
        Ok(())
    }

    fn run_sample<P: Project>(
        &self,
        project: &mut P,
        spec: &VariableSpec,
        index: usize,
        total: usize,
        value: f64,
        path: PathBuf,
    ) -> Result<SampleOutcome, SweepError> {
        let mut run = SampleRun::new(&spec.name, index, value);
        let rendered = format_value(value);
        let fatal = |err: SweepError| {
            err.with_context("variable", spec.name.clone())
                .with_context("value", rendered.clone())
                .with_context("index", index.to_string())
        };

        if self.should_skip(&path) {
            run.advance(SampleState::Skipped)?;
            info!(
                variable = %spec.name,
                value = %rendered,
                path = %path.display(),
                "artifact exists, skipping"
            );
            return Ok(outcome(spec, index, value, path, run.state(), None));
        }

        info!(
            variable = %spec.name,
            value = %rendered,
            "running sample {}/{}",
            index + 1,
            total
        );
        let parameters = ParameterVector::for_sample(&self.universe, &spec.name, value)?;

        run.advance(SampleState::Configuring)?;
        project.apply_parameters(&parameters).map_err(fatal)?;

        run.advance(SampleState::Solving)?;
        if let Err(err) = project.run_solver() {
            if !err.is_recoverable() {
                return Err(fatal(err));
            }
            warn!(
                variable = %spec.name,
                value = %rendered,
                error = %err,
                "solver failed, sample left without artifact"
            );
            run.advance(SampleState::Failed)?;
            return Ok(outcome(
                spec,
                index,
                value,
                path,
                run.state(),
                Some(err.info().clone()),
            ));
        }

        run.advance(SampleState::Exporting)?;
        let request = ExportRequest {
            path: path.clone(),
            subvolume: self.config.subvolume,
            step_resolution: self.config.step_resolution,
        };
        project.export_field(&request).map_err(fatal)?;
        project.save().map_err(fatal)?;
        run.advance(SampleState::Persisted)?;

        Ok(outcome(spec, index, value, path, run.state(), None))
    }
}

fn outcome(
    spec: &VariableSpec,
    index: usize,
    value: f64,
    path: PathBuf,
    state: SampleState,
    error: Option<ErrorInfo>,
) -> SampleOutcome {
    SampleOutcome {
        variable: spec.name.clone(),
        index,
        value,
        path,
        state,
        error,
    }
}
