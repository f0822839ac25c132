//! Deterministic RNG wrapper used by the sampler.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha12Rng;

/// Seed used for every sample set unless a sweep file overrides it.
pub const DEFAULT_SEED: u64 = 42;

/// Deterministic RNG handle exposed to BFS consumers.
///
/// The handle is a thin wrapper around `ChaCha12Rng` that documents the
/// seeding policy of the sweep: every variable's sample set is drawn from a fresh
/// handle built from the same fixed `seed: u64`. Resume relies on this: a
/// restarted process regenerates byte-identical sample values and therefore
/// identical artifact paths. The seed is a configuration constant and must
/// never be derived from time or process state. `ChaCha12Rng` keeps its
/// output stream stable across releases, unlike `StdRng`.
#[derive(Debug, Clone)]
pub struct RngHandle {
    rng: ChaCha12Rng,
}

impl RngHandle {
    /// Creates a new RNG handle from a master seed.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha12Rng::seed_from_u64(seed),
        }
    }

    /// Returns a mutable reference to the underlying RNG for advanced usage.
    pub fn inner_mut(&mut self) -> &mut ChaCha12Rng {
        &mut self.rng
    }
}

impl RngCore for RngHandle {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.rng.try_fill_bytes(dest)
    }
}
