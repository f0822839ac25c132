use std::error::Error;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use commands::{
    init::{self, InitArgs},
    plan::{self, PlanArgs},
    run::{self, RunArgs},
};
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "bfs-sim", about = "Resumable B-field parameter sweep driver")]
struct Cli {
    /// Log engine commands and state transitions.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sweep every variable of a sweep file through the engine.
    Run(RunArgs),
    /// Show sample values, artifact paths and skip decisions without an engine.
    Plan(PlanArgs),
    /// Write a starter sweep file covering the default coil set.
    Init(InitArgs),
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("info,bfs_exp=debug,bfs_sim=debug")
        } else {
            EnvFilter::new("info")
        }
    });
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn dispatch(command: Command) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Run(args) => run::run(&args),
        Command::Plan(args) => plan::run(&args),
        Command::Init(args) => init::run(&args),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match dispatch(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
