use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use bfs_core::errors::{ErrorInfo, SweepError};
use bfs_core::{StepResolution, Subvolume, VariableSpec, DEFAULT_SEED};
use serde::{Deserialize, Serialize};

use crate::engine::ExportSettings;

/// Run-wide sweep settings handed to the orchestrator at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    #[serde(default = "SweepConfig::default_sample_count")]
    pub sample_count: usize,
    #[serde(default = "SweepConfig::default_variation_fraction")]
    pub variation_fraction: f64,
    pub result_root: PathBuf,
    #[serde(default = "SweepConfig::default_subvolume")]
    pub subvolume: Subvolume,
    #[serde(default = "SweepConfig::default_step_resolution")]
    pub step_resolution: StepResolution,
    #[serde(default = "SweepConfig::default_seed")]
    pub seed: u64,
}

impl SweepConfig {
    const fn default_sample_count() -> usize {
        10
    }

    const fn default_variation_fraction() -> f64 {
        0.1
    }

    fn default_subvolume() -> Subvolume {
        Subvolume::from([-528.94, 520.94, -528.94, 520.94, -1673.55, 3493.39])
    }

    fn default_step_resolution() -> StepResolution {
        StepResolution::from([10.0, 10.0, 10.0])
    }

    const fn default_seed() -> u64 {
        DEFAULT_SEED
    }

    /// Default settings writing results under `result_root`.
    pub fn with_root(result_root: impl Into<PathBuf>) -> Self {
        Self {
            sample_count: Self::default_sample_count(),
            variation_fraction: Self::default_variation_fraction(),
            result_root: result_root.into(),
            subvolume: Self::default_subvolume(),
            step_resolution: Self::default_step_resolution(),
            seed: Self::default_seed(),
        }
    }

    /// Rejects settings the sampler or the engine export cannot honour.
    pub fn validate(&self) -> Result<(), SweepError> {
        if self.sample_count == 0 {
            return Err(SweepError::invalid(
                "config-sample-count",
                "sample_count must be positive",
            ));
        }
        if !self.variation_fraction.is_finite() || self.variation_fraction < 0.0 {
            return Err(SweepError::InvalidArgument(
                ErrorInfo::new(
                    "config-variation-fraction",
                    "variation_fraction must be finite and non-negative",
                )
                .with_context("variation_fraction", self.variation_fraction.to_string()),
            ));
        }
        self.subvolume.validate()?;
        self.step_resolution.validate()
    }
}

/// Checks the variable universe: unique, non-empty, path-safe names and
/// finite defaults.
pub fn validate_universe(universe: &[VariableSpec]) -> Result<(), SweepError> {
    if universe.is_empty() {
        return Err(SweepError::invalid(
            "universe-empty",
            "at least one variable is required",
        ));
    }
    let mut seen = BTreeSet::new();
    for spec in universe {
        let name = spec.name.as_str();
        let reject = |code: &str, message: &str| {
            SweepError::InvalidArgument(
                ErrorInfo::new(code, message).with_context("variable", name),
            )
        };
        if name.trim().is_empty() {
            return Err(reject("universe-empty-name", "variable names must be non-empty"));
        }
        if name.contains(|c: char| c == '/' || c == '\\') || name == "." || name == ".." {
            return Err(reject(
                "universe-unsafe-name",
                "variable names are used as folder names and must not contain path separators",
            ));
        }
        if !spec.default.is_finite() {
            return Err(reject("universe-default", "variable default must be finite"));
        }
        if !seen.insert(name) {
            return Err(reject("universe-duplicate", "variable names must be unique"));
        }
    }
    Ok(())
}

/// On-disk sweep description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepFile {
    /// Engine project opened for the whole run.
    pub project: PathBuf,
    pub sweep: SweepConfig,
    /// Variable universe in processing order.
    pub variables: Vec<VariableSpec>,
    #[serde(default)]
    pub export: ExportSettings,
}

impl SweepFile {
    /// Reads and validates a YAML sweep file. Relative `project` and
    /// `result_root` paths are resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self, SweepError> {
        let text =
            fs::read_to_string(path).map_err(|err| SweepError::io("config-read", path, err))?;
        let mut file: SweepFile = serde_yaml::from_str(&text).map_err(|err| {
            SweepError::Config(
                ErrorInfo::new("config-parse", "failed to parse sweep file")
                    .with_context("path", path.display().to_string())
                    .with_hint(err.to_string()),
            )
        })?;
        if let Some(base) = path.parent() {
            file.project = resolve(base, &file.project);
            file.sweep.result_root = resolve(base, &file.sweep.result_root);
        }
        file.validate()?;
        Ok(file)
    }

    /// Validates settings and universe.
    pub fn validate(&self) -> Result<(), SweepError> {
        self.sweep.validate()?;
        validate_universe(&self.variables)
    }

    /// Renders the file as YAML.
    pub fn to_yaml(&self) -> Result<String, SweepError> {
        serde_yaml::to_string(self).map_err(|err| {
            SweepError::Serde(ErrorInfo::new("config-yaml-serialize", err.to_string()))
        })
    }

    /// Starter sweep over the full coil set of the magnet model.
    pub fn coil_template() -> Self {
        Self {
            project: PathBuf::from("DTBfieldOptimzer.cst"),
            sweep: SweepConfig::with_root("results"),
            variables: default_coils(),
            export: ExportSettings::default(),
        }
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Coil currents of the nominal magnet configuration, in declaration order.
pub fn default_coils() -> Vec<VariableSpec> {
    [
        ("Coil_11", 159.175),
        ("Coil10_5T", 9.73),
        ("Coil12_1Tmain", 83.783),
        ("Corrector_Coil1_5T", 83.852),
        ("Corrector_Coil2_5T", 5.0),
        ("Corrector_Coil3_5T", 2.94),
        ("Corrector_Coil4_5T", 0.63),
        ("Corrector_Coil5_5T", 0.0),
        ("Corrector_Coil6_5T", 0.0),
        ("Corrector_Coil7_5T", 0.0),
        ("Corrector_Coil8_5T", 2.2),
        ("Corrector_Coil9_5T", 0.0),
        ("Corrector_Coil13_1T", 1.3),
        ("Corrector_Coil14_1T", 1.91),
        ("Corrector_Coil15_1T", 1.36),
        ("Corrector_Coil16_1T", 0.29),
        ("Corrector_Coil17_1T", 0.37),
        ("Corrector_Coil18_1T", 1.12),
        ("Corrector_Coil19_1T", 0.32),
        ("Corrector_Coil20_1T", 3.8),
        ("Corrector_Coil21_1T", 0.0),
        ("Corrector_Coil22_1T", 6.22),
        ("Corrector_Coil23_1T", 8.0),
    ]
    .into_iter()
    .map(|(name, default)| VariableSpec::new(name, default))
    .collect()
}
