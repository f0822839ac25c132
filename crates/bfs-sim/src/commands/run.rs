use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use bfs_core::RunMode;
use bfs_exp::{
    Journal, MacroEngine, Orchestrator, ProcessRunner, RunReport, SimulatedEngine, SweepFile,
    REPORT_FILE,
};
use chrono::{SecondsFormat, Utc};
use clap::{Args, ValueEnum};
use tracing::{info, warn};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineKind {
    /// In-process stand-in writing synthetic field files.
    Simulated,
    /// Macro scripts piped into `--engine-cmd`.
    Macro,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// YAML sweep file.
    #[arg(long)]
    pub config: PathBuf,
    /// `overwrite` recomputes everything, `resume` skips existing artifacts.
    #[arg(long)]
    pub mode: RunMode,
    #[arg(long, value_enum, default_value_t = EngineKind::Macro)]
    pub engine: EngineKind,
    /// Bridge program receiving one macro per engine command on stdin.
    #[arg(long = "engine-cmd")]
    pub engine_cmd: Option<PathBuf>,
    /// Extra argument passed to the bridge before the command name.
    #[arg(long = "engine-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub engine_args: Vec<String>,
    /// Append one row per finished sample to `journal.csv` in the result root.
    #[arg(long)]
    pub journal: bool,
}

pub fn run(args: &RunArgs) -> Result<(), Box<dyn Error>> {
    let file = SweepFile::load(&args.config)?;
    let root = file.sweep.result_root.clone();
    let mut orchestrator = Orchestrator::new(file.sweep.clone(), file.variables.clone(), args.mode)?;
    fs::create_dir_all(&root)?;

    let report_path = root.join(REPORT_FILE);
    if args.mode == RunMode::Resume {
        check_previous_report(&report_path, orchestrator.config_hash());
    }
    if args.journal {
        orchestrator = orchestrator.with_journal(Journal::in_root(&root));
    }

    let mut report = match args.engine {
        EngineKind::Simulated => {
            orchestrator.run(&mut SimulatedEngine::connect(), &file.project)?
        }
        EngineKind::Macro => {
            let program = args
                .engine_cmd
                .clone()
                .ok_or("--engine-cmd is required with --engine macro")?;
            let runner = ProcessRunner::new(program, args.engine_args.clone());
            let mut engine = MacroEngine::connect(runner, file.export.clone());
            orchestrator.run(&mut engine, &file.project)?
        }
    };

    report.created_at = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));
    report.write(&report_path)?;
    info!(report = %report_path.display(), "run report written");
    println!(
        "persisted={} skipped={} failed={}",
        report.summary.persisted, report.summary.skipped, report.summary.failed
    );
    for outcome in report.failed() {
        println!(
            "failed {} #{} = {}",
            outcome.variable,
            outcome.index,
            bfs_exp::format_value(outcome.value)
        );
    }
    Ok(())
}

fn check_previous_report(path: &Path, current_hash: &str) {
    match RunReport::load(path) {
        Ok(Some(previous)) if previous.config_hash != current_hash => warn!(
            previous = %previous.config_hash,
            current = %current_hash,
            "sweep settings changed since the last run, existing artifacts may not match the new samples"
        ),
        Ok(_) => {}
        Err(err) => warn!(error = %err, "ignoring unreadable previous run report"),
    }
}
