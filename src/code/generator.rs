//! Code Generator
//!
//! Produces random candidate codes. Uniqueness is the registry's job.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::ALPHABET;

/// Random source for candidate codes
///
/// Non-cryptographic randomness is fine here; the RNG is injectable so
/// tests can use a fixed seed.
pub struct CodeGenerator {
    rng: StdRng,
}

impl CodeGenerator {
    /// Generator seeded from the operating system
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_os_rng())
    }

    /// Deterministic generator for tests and benchmarks
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    /// Wrap an existing RNG
    pub fn from_rng(rng: StdRng) -> Self {
        Self { rng }
    }

    /// Produce `length` symbols, each chosen uniformly from the alphabet
    pub fn generate(&mut self, length: usize) -> String {
        (0..length)
            .map(|_| ALPHABET[self.rng.random_range(0..ALPHABET.len())] as char)
            .collect()
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CodeGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeGenerator").finish_non_exhaustive()
    }
}
