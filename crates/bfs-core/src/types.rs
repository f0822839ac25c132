use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, SweepError};

/// A single design variable of the sweep universe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSpec {
    /// Unique, non-empty engine parameter name.
    pub name: String,
    /// Nominal value around which samples are drawn.
    pub default: f64,
}

impl VariableSpec {
    /// Creates a new variable descriptor.
    pub fn new(name: impl Into<String>, default: f64) -> Self {
        Self {
            name: name.into(),
            default,
        }
    }
}

/// Full parameter assignment submitted to the engine for one sample.
///
/// Exactly one entry carries the sample value; every other tracked variable
/// is pinned to zero. Entries keep the declaration order of the universe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterVector {
    target: String,
    values: IndexMap<String, f64>,
}

impl ParameterVector {
    /// Builds the vector for `target = value` over the whole universe.
    pub fn for_sample(
        universe: &[VariableSpec],
        target: &str,
        value: f64,
    ) -> Result<Self, SweepError> {
        if !universe.iter().any(|spec| spec.name == target) {
            return Err(SweepError::InvalidArgument(
                ErrorInfo::new(
                    "parameter-unknown-target",
                    "target variable is not part of the sweep universe",
                )
                .with_context("variable", target),
            ));
        }
        let values = universe
            .iter()
            .map(|spec| {
                let assigned = if spec.name == target { value } else { 0.0 };
                (spec.name.clone(), assigned)
            })
            .collect();
        Ok(Self {
            target: target.to_string(),
            values,
        })
    }

    /// Name of the variable carrying the sample value.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Value assigned to `name`, if tracked.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Iterates over `(name, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.values.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// Number of tracked variables.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the vector tracks no variables.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Run policy chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Reprocess every sample, replacing existing artifacts.
    Overwrite,
    /// Skip samples whose artifact already exists.
    Resume,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Overwrite => f.write_str("overwrite"),
            RunMode::Resume => f.write_str("resume"),
        }
    }
}

impl FromStr for RunMode {
    type Err = SweepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overwrite" | "o" => Ok(RunMode::Overwrite),
            "resume" | "r" => Ok(RunMode::Resume),
            other => Err(SweepError::InvalidArgument(
                ErrorInfo::new("run-mode-unknown", "unrecognised run mode")
                    .with_context("mode", other)
                    .with_hint("expected `overwrite` or `resume`"),
            )),
        }
    }
}

/// Axis-aligned export subvolume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 6]", into = "[f64; 6]")]
pub struct Subvolume {
    /// Lower x bound.
    pub x_min: f64,
    /// Upper x bound.
    pub x_max: f64,
    /// Lower y bound.
    pub y_min: f64,
    /// Upper y bound.
    pub y_max: f64,
    /// Lower z bound.
    pub z_min: f64,
    /// Upper z bound.
    pub z_max: f64,
}

impl Subvolume {
    /// Bounds in `x_min, x_max, y_min, y_max, z_min, z_max` order.
    pub fn bounds(&self) -> [f64; 6] {
        [
            self.x_min, self.x_max, self.y_min, self.y_max, self.z_min, self.z_max,
        ]
    }

    /// Checks that every bound is finite and each axis is ordered.
    pub fn validate(&self) -> Result<(), SweepError> {
        if self.bounds().iter().any(|bound| !bound.is_finite()) {
            return Err(SweepError::invalid(
                "subvolume-non-finite",
                "subvolume bounds must be finite",
            ));
        }
        for (axis, lo, hi) in [
            ("x", self.x_min, self.x_max),
            ("y", self.y_min, self.y_max),
            ("z", self.z_min, self.z_max),
        ] {
            if lo > hi {
                return Err(SweepError::InvalidArgument(
                    ErrorInfo::new("subvolume-inverted", "subvolume axis has min > max")
                        .with_context("axis", axis)
                        .with_context("min", lo.to_string())
                        .with_context("max", hi.to_string()),
                ));
            }
        }
        Ok(())
    }
}

impl From<[f64; 6]> for Subvolume {
    fn from(b: [f64; 6]) -> Self {
        Self {
            x_min: b[0],
            x_max: b[1],
            y_min: b[2],
            y_max: b[3],
            z_min: b[4],
            z_max: b[5],
        }
    }
}

impl From<Subvolume> for [f64; 6] {
    fn from(volume: Subvolume) -> Self {
        volume.bounds()
    }
}

/// Export sampling step along each axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct StepResolution {
    /// Step along x.
    pub x: f64,
    /// Step along y.
    pub y: f64,
    /// Step along z.
    pub z: f64,
}

impl StepResolution {
    /// Steps in `x, y, z` order.
    pub fn steps(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Every step must be finite and strictly positive.
    pub fn validate(&self) -> Result<(), SweepError> {
        if self
            .steps()
            .iter()
            .any(|step| !step.is_finite() || *step <= 0.0)
        {
            return Err(SweepError::InvalidArgument(
                ErrorInfo::new("step-resolution-invalid", "export steps must be positive")
                    .with_context("steps", format!("{:?}", self.steps())),
            ));
        }
        Ok(())
    }
}

impl From<[f64; 3]> for StepResolution {
    fn from(s: [f64; 3]) -> Self {
        Self {
            x: s[0],
            y: s[1],
            z: s[2],
        }
    }
}

impl From<StepResolution> for [f64; 3] {
    fn from(step: StepResolution) -> Self {
        step.steps()
    }
}
