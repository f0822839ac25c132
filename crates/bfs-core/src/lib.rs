#![deny(missing_docs)]
#![doc = "Core data model, error taxonomy and seeding policy for B-field parameter sweeps."]

pub mod errors;
pub mod rng;
mod types;

pub use errors::{ErrorInfo, SweepError};
pub use rng::{RngHandle, DEFAULT_SEED};
pub use types::{ParameterVector, RunMode, StepResolution, Subvolume, VariableSpec};
