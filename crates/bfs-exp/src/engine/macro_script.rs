use std::fmt::Write as _;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use bfs_core::errors::{ErrorInfo, SweepError};
use bfs_core::ParameterVector;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{CommandKind, Engine, EngineCommand, ExportRequest, Project};

/// Engine-side naming of the exported result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Result tree item selected before export.
    #[serde(default = "ExportSettings::default_result_item")]
    pub result_item: String,
    /// ASCII export layout.
    #[serde(default = "ExportSettings::default_mode")]
    pub mode: String,
}

impl ExportSettings {
    fn default_result_item() -> String {
        "2D/3D Results\\B-Field [Ms]".to_string()
    }

    fn default_mode() -> String {
        "FixedWidth".to_string()
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            result_item: Self::default_result_item(),
            mode: Self::default_mode(),
        }
    }
}

/// Why a macro did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MacroFailure {
    /// The engine ran the macro and reported a failure.
    Rejected(ErrorInfo),
    /// The channel to the engine broke before an answer came back.
    Bridge(ErrorInfo),
}

impl MacroFailure {
    /// Diagnostic payload of either kind.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            MacroFailure::Rejected(info) | MacroFailure::Bridge(info) => info,
        }
    }
}

/// Executes one rendered macro inside the engine.
pub trait MacroRunner {
    /// Runs `script`. Only [`MacroFailure::Rejected`] during a solve is
    /// treated as recoverable.
    fn execute(&mut self, kind: CommandKind, script: &str) -> Result<(), MacroFailure>;
}

/// Runs macros by piping them into an external program, one process per
/// command, invoked as `<program> <args…> <command-name>` with the script on
/// stdin. The program forwards the script to the engine session and exits
/// non-zero when the engine reports a failure. Spawn and pipe errors, and a
/// bridge killed by a signal, are [`MacroFailure::Bridge`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRunner {
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessRunner {
    /// Creates a runner invoking `program` with `args`.
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl MacroRunner for ProcessRunner {
    fn execute(&mut self, kind: CommandKind, script: &str) -> Result<(), MacroFailure> {
        let program = self.program.display().to_string();
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(kind.as_str())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| {
                MacroFailure::Bridge(
                    ErrorInfo::new("macro-spawn", "failed to start engine bridge")
                        .with_context("program", program.clone())
                        .with_hint(err.to_string()),
                )
            })?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(script.as_bytes()).map_err(|err| {
                MacroFailure::Bridge(
                    ErrorInfo::new("macro-stdin", "failed to send macro to engine bridge")
                        .with_context("program", program.clone())
                        .with_hint(err.to_string()),
                )
            })?;
        }
        let output = child.wait_with_output().map_err(|err| {
            MacroFailure::Bridge(
                ErrorInfo::new("macro-wait", "engine bridge did not complete")
                    .with_context("program", program.clone())
                    .with_hint(err.to_string()),
            )
        })?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let with_stderr = |info: ErrorInfo| {
            if stderr.is_empty() {
                info
            } else {
                info.with_hint(stderr.clone())
            }
        };
        match output.status.code() {
            Some(code) => Err(MacroFailure::Rejected(with_stderr(
                ErrorInfo::new("macro-failed", "engine rejected macro")
                    .with_context("program", program)
                    .with_context("status", code.to_string()),
            ))),
            None => Err(MacroFailure::Bridge(with_stderr(
                ErrorInfo::new("macro-killed", "engine bridge terminated by a signal")
                    .with_context("program", program)
                    .with_context("status", "signal"),
            ))),
        }
    }
}

/// Engine adapter speaking the engine's macro language.
#[derive(Debug, Clone)]
pub struct MacroEngine<R> {
    runner: R,
    settings: ExportSettings,
}

impl<R: MacroRunner + Clone> MacroEngine<R> {
    /// Binds the adapter to a connected runner.
    pub fn connect(runner: R, settings: ExportSettings) -> Self {
        Self { runner, settings }
    }

    /// Returns the runner, e.g. to inspect what was sent.
    pub fn runner(&self) -> &R {
        &self.runner
    }
}

impl<R: MacroRunner + Clone> Engine for MacroEngine<R> {
    type Project = MacroProject<R>;

    fn open_project(&mut self, path: &Path) -> Result<Self::Project, SweepError> {
        let mut project = MacroProject {
            runner: self.runner.clone(),
            settings: self.settings.clone(),
        };
        project.submit(&EngineCommand::OpenProject {
            path: path.to_path_buf(),
        })?;
        Ok(project)
    }
}

/// Project opened through a [`MacroEngine`].
#[derive(Debug, Clone)]
pub struct MacroProject<R> {
    runner: R,
    settings: ExportSettings,
}

impl<R: MacroRunner> MacroProject<R> {
    fn submit(&mut self, command: &EngineCommand) -> Result<(), SweepError> {
        let kind = command.kind();
        let script = render_macro(command, &self.settings);
        debug!(command = kind.as_str(), "submitting macro");
        self.runner.execute(kind, &script).map_err(|failure| match failure {
            MacroFailure::Rejected(info) if kind == CommandKind::RunSolver => {
                SweepError::Solver(info.with_context("command", kind.as_str()))
            }
            MacroFailure::Rejected(info) | MacroFailure::Bridge(info) => {
                SweepError::Engine(info.with_context("command", kind.as_str()))
            }
        })
    }
}

impl<R: MacroRunner> Project for MacroProject<R> {
    fn apply_parameters(&mut self, parameters: &ParameterVector) -> Result<(), SweepError> {
        self.submit(&EngineCommand::StoreParameters {
            parameters: parameters.clone(),
        })
    }

    fn run_solver(&mut self) -> Result<(), SweepError> {
        self.submit(&EngineCommand::RunSolver)
    }

    fn export_field(&mut self, request: &ExportRequest) -> Result<(), SweepError> {
        self.submit(&EngineCommand::ExportField(request.clone()))
    }

    fn save(&mut self) -> Result<(), SweepError> {
        self.submit(&EngineCommand::SaveProject)
    }
}

/// Renders `command` as a `Sub Main` macro.
pub fn render_macro(command: &EngineCommand, settings: &ExportSettings) -> String {
    let mut body = String::new();
    match command {
        EngineCommand::OpenProject { path } => {
            let _ = writeln!(body, "  OpenFile({})", quote(&path.display().to_string()));
        }
        EngineCommand::StoreParameters { parameters } => {
            for (name, value) in parameters.iter() {
                let _ = writeln!(body, "  StoreParameter({}, {})", quote(name), number(value));
            }
            body.push_str("  Rebuild\n");
        }
        EngineCommand::RunSolver => body.push_str("  Solver.Start\n"),
        EngineCommand::ExportField(request) => render_export(&mut body, request, settings),
        EngineCommand::SaveProject => body.push_str("  Save\n"),
    }
    format!("Sub Main\n{body}End Sub\n")
}

fn render_export(body: &mut String, request: &ExportRequest, settings: &ExportSettings) {
    let [sx, sy, sz] = request.step_resolution.steps();
    let bounds = request
        .subvolume
        .bounds()
        .iter()
        .map(|bound| number(*bound))
        .collect::<Vec<_>>()
        .join(", ");
    let _ = writeln!(body, "  SelectTreeItem({})", quote(&settings.result_item));
    body.push_str("  With ASCIIExport\n");
    body.push_str("    .Reset\n");
    let _ = writeln!(
        body,
        "    .FileName ({})",
        quote(&request.path.display().to_string())
    );
    let _ = writeln!(body, "    .Mode {}", quote(&settings.mode));
    let _ = writeln!(
        body,
        "    .StepX {}: .StepY {}: .StepZ {}",
        number(sx),
        number(sy),
        number(sz)
    );
    let _ = writeln!(body, "    .SetSubvolume {bounds}");
    body.push_str("    .UseSubvolume True\n");
    body.push_str("    .Execute\n");
    body.push_str("  End With\n");
}

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

fn number(value: f64) -> String {
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bfs_core::{StepResolution, Subvolume, VariableSpec};

    #[test]
    fn store_parameters_lists_every_variable_then_rebuilds() {
        let universe = vec![VariableSpec::new("A", 1.0), VariableSpec::new("B", 2.0)];
        let parameters = ParameterVector::for_sample(&universe, "B", 2.125).expect("vector");
        let script = render_macro(
            &EngineCommand::StoreParameters { parameters },
            &ExportSettings::default(),
        );
        assert_eq!(
            script,
            "Sub Main\n  StoreParameter(\"A\", 0)\n  StoreParameter(\"B\", 2.125)\n  Rebuild\nEnd Sub\n"
        );
    }

    #[test]
    fn export_macro_carries_subvolume_and_steps() {
        let request = ExportRequest {
            path: PathBuf::from("out/BField_A_1.5.txt"),
            subvolume: Subvolume::from([-1.5, 1.5, -2.0, 2.0, -3.0, 3.0]),
            step_resolution: StepResolution::from([10.0, 10.0, 5.0]),
        };
        let command = EngineCommand::ExportField(request);
        let script = render_macro(&command, &ExportSettings::default());
        assert!(script.contains("SelectTreeItem(\"2D/3D Results\\B-Field [Ms]\")"));
        assert!(script.contains(".FileName (\"out/BField_A_1.5.txt\")"));
        assert!(script.contains(".StepX 10: .StepY 10: .StepZ 5"));
        assert!(script.contains(".SetSubvolume -1.5, 1.5, -2, 2, -3, 3"));
        assert!(script.ends_with("  End With\nEnd Sub\n"));
    }

    #[test]
    fn quotes_are_doubled_inside_literals() {
        let script = render_macro(
            &EngineCommand::OpenProject {
                path: PathBuf::from("my \"best\" project.cst"),
            },
            &ExportSettings::default(),
        );
        assert_eq!(
            script,
            "Sub Main\n  OpenFile(\"my \"\"best\"\" project.cst\")\nEnd Sub\n"
        );
    }
}
