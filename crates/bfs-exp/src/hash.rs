use bfs_core::errors::SweepError;
use bfs_core::VariableSpec;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::config::SweepConfig;
use crate::serde::to_canonical_json_bytes;

/// Computes a stable hexadecimal hash for the provided serializable payload.
pub fn stable_hash_string<T: Serialize>(value: &T) -> Result<String, SweepError> {
    let bytes = to_canonical_json_bytes(value)?;
    let digest = Sha256::digest(bytes);
    Ok(format!("{:x}", digest))
}

/// Hash of everything that determines sample values and artifact paths.
///
/// Two runs with equal hashes regenerate identical sample sets, which is the
/// precondition for a meaningful resume.
pub fn sweep_hash(config: &SweepConfig, universe: &[VariableSpec]) -> Result<String, SweepError> {
    stable_hash_string(&(
        config.sample_count,
        config.variation_fraction,
        config.seed,
        universe,
    ))
}
