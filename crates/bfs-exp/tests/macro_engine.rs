use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use bfs_core::{ErrorInfo, RunMode, SweepError, VariableSpec};
use bfs_exp::{
    CommandKind, Engine, ExportSettings, MacroEngine, MacroFailure, MacroRunner, Orchestrator,
    Project, SampleState, SweepConfig,
};
use tempfile::tempdir;

#[derive(Debug, Clone, Default)]
struct Recorder {
    scripts: Rc<RefCell<Vec<(CommandKind, String)>>>,
    reject: Option<CommandKind>,
    broken: Option<CommandKind>,
}

impl Recorder {
    fn rejecting(kind: CommandKind) -> Self {
        Self {
            reject: Some(kind),
            ..Self::default()
        }
    }

    fn breaking_on(kind: CommandKind) -> Self {
        Self {
            broken: Some(kind),
            ..Self::default()
        }
    }

    fn kinds(&self) -> Vec<CommandKind> {
        self.scripts.borrow().iter().map(|(kind, _)| *kind).collect()
    }
}

impl MacroRunner for Recorder {
    fn execute(&mut self, kind: CommandKind, script: &str) -> Result<(), MacroFailure> {
        self.scripts.borrow_mut().push((kind, script.to_string()));
        if self.reject == Some(kind) {
            return Err(MacroFailure::Rejected(ErrorInfo::new(
                "recorder-reject",
                "rejected by test runner",
            )));
        }
        if self.broken == Some(kind) {
            return Err(MacroFailure::Bridge(ErrorInfo::new(
                "recorder-bridge",
                "bridge went away",
            )));
        }
        Ok(())
    }
}

fn orchestrator(root: &Path) -> Orchestrator {
    let mut config = SweepConfig::with_root(root);
    config.sample_count = 2;
    Orchestrator::new(
        config,
        vec![VariableSpec::new("A", 4.0), VariableSpec::new("B", 1.0)],
        RunMode::Overwrite,
    )
    .expect("orchestrator")
}

#[test]
fn every_command_becomes_one_macro() {
    let root = tempdir().expect("root");
    let recorder = Recorder::default();
    let mut engine = MacroEngine::connect(recorder.clone(), ExportSettings::default());

    let report = orchestrator(root.path())
        .run(&mut engine, Path::new("magnet.cst"))
        .expect("run");
    assert_eq!(report.summary.persisted, 4);

    let kinds = engine.runner().kinds();
    assert_eq!(kinds.len(), 1 + 4 * 4);
    assert_eq!(kinds[0], CommandKind::OpenProject);
    let scripts = recorder.scripts.borrow();
    assert!(scripts
        .iter()
        .all(|(_, script)| script.starts_with("Sub Main\n") && script.ends_with("End Sub\n")));
    assert!(scripts[0].1.contains("OpenFile(\"magnet.cst\")"));
    let first_store = &scripts[1].1;
    assert!(first_store.contains("StoreParameter(\"B\", 0)"));
    assert!(first_store.contains("Rebuild"));
    let export = &scripts[3].1;
    assert!(export.contains("BField_A_"));
    assert!(export.contains(".UseSubvolume True"));
}

#[test]
fn solver_rejection_is_recoverable() {
    let root = tempdir().expect("root");
    let mut engine = MacroEngine::connect(
        Recorder::rejecting(CommandKind::RunSolver),
        ExportSettings::default(),
    );

    let report = orchestrator(root.path())
        .run(&mut engine, Path::new("magnet.cst"))
        .expect("solver failures do not abort");
    assert_eq!(report.summary.failed, 4);
    assert!(report.outcomes.iter().all(|o| o.state == SampleState::Failed));
    let error = report.outcomes[0].error.as_ref().expect("error info");
    assert_eq!(error.code, "recorder-reject");
    assert_eq!(
        error.context.get("command").map(String::as_str),
        Some("run_solver")
    );
    assert!(!engine.runner().kinds().contains(&CommandKind::ExportField));
}

#[test]
fn broken_bridge_during_solve_aborts_the_run() {
    let root = tempdir().expect("root");
    let mut engine = MacroEngine::connect(
        Recorder::breaking_on(CommandKind::RunSolver),
        ExportSettings::default(),
    );
    let err = orchestrator(root.path())
        .run(&mut engine, Path::new("magnet.cst"))
        .unwrap_err();
    assert!(matches!(err, SweepError::Engine(_)));
    assert!(!err.is_recoverable());
    assert_eq!(err.info().code, "recorder-bridge");
    assert_eq!(
        err.info().context.get("command").map(String::as_str),
        Some("run_solver")
    );
    assert_eq!(err.info().context.get("index").map(String::as_str), Some("0"));
    let kinds = engine.runner().kinds();
    assert_eq!(kinds.last(), Some(&CommandKind::RunSolver));
    assert_eq!(
        kinds
            .iter()
            .filter(|kind| **kind == CommandKind::StoreParameters)
            .count(),
        1
    );
}

#[test]
fn export_rejection_is_fatal() {
    let root = tempdir().expect("root");
    let mut engine = MacroEngine::connect(
        Recorder::rejecting(CommandKind::ExportField),
        ExportSettings::default(),
    );
    let err = orchestrator(root.path())
        .run(&mut engine, Path::new("magnet.cst"))
        .unwrap_err();
    assert!(matches!(err, SweepError::Engine(_)));
    assert_eq!(err.info().context.get("index").map(String::as_str), Some("0"));
    assert_eq!(engine.runner().kinds().last(), Some(&CommandKind::ExportField));
}

#[test]
fn custom_export_settings_reach_the_script() {
    let recorder = Recorder::default();
    let settings = ExportSettings {
        result_item: "2D/3D Results\\H-Field".to_string(),
        mode: "Compact".to_string(),
    };
    let mut engine = MacroEngine::connect(recorder.clone(), settings);
    let mut project = engine
        .open_project(Path::new("m.cst"))
        .expect("open");
    project
        .export_field(&bfs_exp::ExportRequest {
            path: "out.txt".into(),
            subvolume: [-1.0, 1.0, -1.0, 1.0, -1.0, 1.0].into(),
            step_resolution: [1.0, 2.0, 3.0].into(),
        })
        .expect("export");
    let scripts = recorder.scripts.borrow();
    let export = &scripts[1].1;
    assert!(export.contains("SelectTreeItem(\"2D/3D Results\\H-Field\")"));
    assert!(export.contains(".Mode \"Compact\""));
    assert!(export.contains(".StepX 1: .StepY 2: .StepZ 3"));
}

#[cfg(unix)]
mod process {
    use bfs_exp::ProcessRunner;

    use super::*;

    // `sh -c` binds the appended command name to `$0`.
    fn bridge(script: &str) -> ProcessRunner {
        ProcessRunner::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    #[test]
    fn process_runner_pipes_the_script() {
        let dir = tempdir().expect("dir");
        let log = dir.path().join("received.txt");
        let mut runner = bridge(&format!("cat >> '{}'", log.display()));
        runner
            .execute(CommandKind::SaveProject, "Sub Main\n  Save\nEnd Sub\n")
            .expect("bridge succeeds");
        let received = std::fs::read_to_string(&log).expect("log");
        assert_eq!(received, "Sub Main\n  Save\nEnd Sub\n");
    }

    #[test]
    fn non_zero_exit_carries_status_and_stderr() {
        let mut runner = bridge("cat > /dev/null; echo \"no license for $0\" >&2; exit 3");
        let failure = runner
            .execute(CommandKind::RunSolver, "Sub Main\nEnd Sub\n")
            .unwrap_err();
        let info = match failure {
            MacroFailure::Rejected(info) => info,
            other => panic!("expected a rejection, got {other:?}"),
        };
        assert_eq!(info.code, "macro-failed");
        assert_eq!(info.context.get("status").map(String::as_str), Some("3"));
        assert_eq!(info.hint.as_deref(), Some("no license for run_solver"));
    }

    #[test]
    fn missing_program_fails_to_spawn() {
        let mut runner = ProcessRunner::new("/nonexistent/engine-bridge", Vec::new());
        let failure = runner
            .execute(CommandKind::RunSolver, "Sub Main\nEnd Sub\n")
            .unwrap_err();
        assert!(matches!(failure, MacroFailure::Bridge(_)));
        assert_eq!(failure.info().code, "macro-spawn");
    }

    #[test]
    fn killed_bridge_is_not_a_rejection() {
        let mut runner = bridge("cat > /dev/null; kill -9 $$");
        let failure = runner
            .execute(CommandKind::RunSolver, "Sub Main\nEnd Sub\n")
            .unwrap_err();
        assert!(matches!(failure, MacroFailure::Bridge(_)));
        assert_eq!(failure.info().code, "macro-killed");
        assert_eq!(
            failure.info().context.get("status").map(String::as_str),
            Some("signal")
        );
    }

    #[test]
    fn solver_rejected_by_the_bridge_stays_recoverable() {
        let root = tempdir().expect("root");
        let mut engine = MacroEngine::connect(
            bridge("cat > /dev/null; test \"$0\" != run_solver"),
            ExportSettings::default(),
        );
        let report = orchestrator(root.path())
            .run(&mut engine, Path::new("magnet.cst"))
            .expect("rejected solves do not abort");
        assert_eq!(report.summary.failed, 4);
        assert_eq!(report.summary.persisted, 0);
    }

    #[test]
    fn killed_bridge_during_solve_is_fatal() {
        let root = tempdir().expect("root");
        let mut engine = MacroEngine::connect(
            bridge("cat > /dev/null; if [ \"$0\" = run_solver ]; then kill -9 $$; fi"),
            ExportSettings::default(),
        );
        let err = orchestrator(root.path())
            .run(&mut engine, Path::new("magnet.cst"))
            .unwrap_err();
        assert!(matches!(err, SweepError::Engine(_)));
        assert_eq!(err.info().code, "macro-killed");
    }
}
