use std::error::Error;
use std::path::PathBuf;

use bfs_core::RunMode;
use bfs_exp::{
    format_value, to_canonical_json_bytes, Orchestrator, PlannedAction, PlannedSample, SweepFile,
};
use clap::Args;

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// YAML sweep file.
    #[arg(long)]
    pub config: PathBuf,
    #[arg(long)]
    pub mode: RunMode,
    /// Print the plan as JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: &PlanArgs) -> Result<(), Box<dyn Error>> {
    let file = SweepFile::load(&args.config)?;
    let orchestrator = Orchestrator::new(file.sweep, file.variables, args.mode)?;
    let plan = orchestrator.plan()?;

    if args.json {
        let bytes = to_canonical_json_bytes(&plan)?;
        println!("{}", String::from_utf8(bytes)?);
        return Ok(());
    }

    println!("mode {} | config hash {}", orchestrator.mode(), orchestrator.config_hash());
    for group in plan.chunk_by(|a, b| a.variable == b.variable) {
        print_variable(&orchestrator, group);
    }
    let skipped = plan
        .iter()
        .filter(|sample| sample.action == PlannedAction::Skip)
        .count();
    println!("{} to run, {} to skip", plan.len() - skipped, skipped);
    Ok(())
}

fn print_variable(orchestrator: &Orchestrator, group: &[PlannedSample]) {
    let Some(first) = group.first() else {
        return;
    };
    let values: Vec<f64> = group.iter().map(|sample| sample.value).collect();
    let present = orchestrator.store().completed(&first.variable, &values);
    println!(
        "{} ({}/{} artifacts present)",
        first.variable,
        present,
        group.len()
    );
    for sample in group {
        let action = match sample.action {
            PlannedAction::Run => "run ",
            PlannedAction::Skip => "skip",
        };
        let note = sample
            .collides_with
            .map(|earlier| format!("  (same file as #{earlier})"))
            .unwrap_or_default();
        println!(
            "  [{action}] #{:<3} {:>12}  {}{note}",
            sample.index,
            format_value(sample.value),
            sample.path.display()
        );
    }
}
