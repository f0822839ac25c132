use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::tempdir;

fn bfs_sim(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_bfs-sim"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("spawn bfs-sim")
}

fn write_sweep(dir: &Path, samples: usize) -> String {
    let path = dir.join("sweep.yaml");
    fs::write(
        &path,
        format!(
            "project: magnet.cst\nsweep:\n  result_root: out\n  sample_count: {samples}\nvariables:\n  - {{ name: Coil_11, default: 159.175 }}\n  - {{ name: Corrector_Coil5_5T, default: 0.0 }}\n"
        ),
    )
    .expect("write sweep file");
    path.display().to_string()
}

fn files_in(dir: &Path) -> usize {
    fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

#[test]
fn simulated_run_then_resume() {
    let dir = tempdir().expect("dir");
    let config = write_sweep(dir.path(), 4);

    let first = bfs_sim(&[
        "run", "--config", &config, "--mode", "overwrite", "--engine", "simulated", "--journal",
    ]);
    assert!(first.status.success(), "{}", String::from_utf8_lossy(&first.stderr));
    assert_eq!(
        String::from_utf8_lossy(&first.stdout).trim(),
        "persisted=8 skipped=0 failed=0"
    );
    let out = dir.path().join("out");
    assert_eq!(files_in(&out.join("Coil_11")), 4);
    assert_eq!(files_in(&out.join("Corrector_Coil5_5T")), 4);
    assert!(out.join("run_report.json").is_file());
    let journal = fs::read_to_string(out.join("journal.csv")).expect("journal");
    assert_eq!(journal.lines().count(), 9);

    let resumed = bfs_sim(&[
        "run", "--config", &config, "--mode", "Resume", "--engine", "simulated",
    ]);
    assert!(resumed.status.success());
    assert_eq!(
        String::from_utf8_lossy(&resumed.stdout).trim(),
        "persisted=0 skipped=8 failed=0"
    );
}

#[test]
fn changed_settings_warn_on_resume() {
    let dir = tempdir().expect("dir");
    let config = write_sweep(dir.path(), 2);
    let first = bfs_sim(&["run", "--config", &config, "--mode", "r", "--engine", "simulated"]);
    assert!(first.status.success());

    let config = write_sweep(dir.path(), 3);
    let resumed = bfs_sim(&["run", "--config", &config, "--mode", "r", "--engine", "simulated"]);
    assert!(resumed.status.success());
    assert!(String::from_utf8_lossy(&resumed.stderr).contains("sweep settings changed"));
}

#[test]
fn mode_is_required_and_validated() {
    let dir = tempdir().expect("dir");
    let config = write_sweep(dir.path(), 2);
    assert!(!bfs_sim(&["run", "--config", &config]).status.success());
    assert!(!bfs_sim(&["run", "--config", &config, "--mode", "sideways"])
        .status
        .success());
}

#[test]
fn macro_engine_needs_a_bridge_program() {
    let dir = tempdir().expect("dir");
    let config = write_sweep(dir.path(), 2);
    let output = bfs_sim(&["run", "--config", &config, "--mode", "overwrite"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--engine-cmd"));
    assert!(!dir.path().join("out/Coil_11").exists());
}

#[test]
fn plan_lists_skip_decisions_without_writing() {
    let dir = tempdir().expect("dir");
    let config = write_sweep(dir.path(), 3);
    let output = bfs_sim(&["plan", "--config", &config, "--mode", "resume"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Coil_11 (0/3 artifacts present)"));
    assert!(stdout.contains("6 to run, 0 to skip"));
    assert!(!dir.path().join("out").exists());

    let json = bfs_sim(&["plan", "--config", &config, "--mode", "resume", "--json"]);
    assert!(json.status.success());
    assert!(String::from_utf8_lossy(&json.stdout).contains("\"action\": \"run\""));
}

#[test]
fn init_writes_a_loadable_template_once() {
    let dir = tempdir().expect("dir");
    let out = dir.path().join("conf/sweep.yaml");
    let out_arg = out.display().to_string();
    assert!(bfs_sim(&["init", "--out", &out_arg]).status.success());
    let text = fs::read_to_string(&out).expect("template");
    assert!(text.contains("Corrector_Coil23_1T"));

    assert!(!bfs_sim(&["init", "--out", &out_arg]).status.success());
    assert!(bfs_sim(&["init", "--out", &out_arg, "--force"]).status.success());

    let plan = bfs_sim(&["plan", "--config", &out_arg, "--mode", "overwrite"]);
    assert!(plan.status.success());
    assert!(String::from_utf8_lossy(&plan.stdout).contains("230 to run, 0 to skip"));
}
