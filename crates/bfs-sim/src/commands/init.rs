use std::error::Error;
use std::fs;
use std::path::PathBuf;

use bfs_exp::SweepFile;
use clap::Args;
use tracing::info;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Destination of the sweep file.
    #[arg(long)]
    pub out: PathBuf,
    /// Replace an existing file.
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: &InitArgs) -> Result<(), Box<dyn Error>> {
    if args.out.exists() && !args.force {
        return Err(format!(
            "{} already exists, pass --force to replace it",
            args.out.display()
        )
        .into());
    }
    if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let template = SweepFile::coil_template();
    fs::write(&args.out, template.to_yaml()?)?;
    info!(
        path = %args.out.display(),
        variables = template.variables.len(),
        "sweep file written"
    );
    Ok(())
}
