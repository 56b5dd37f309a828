//! Deterministic random number generation.
//!
//! Nothing in the simulation may call a platform RNG. Every proc roll draws
//! from the single [`SimRng`] threaded through [`super::SimContext`], seeded
//! from the configured seed string.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;
use sha2::{Digest, Sha256};

/// Seeded PCG stream for one simulation run.
#[derive(Clone, Debug)]
pub struct SimRng {
    seed: String,
    inner: Pcg64Mcg,
    draws: u64,
}

impl SimRng {
    /// Folds the seed string through SHA-256 so that similar seeds give
    /// unrelated streams.
    pub fn from_seed_str(seed: &str) -> Self {
        let digest = Sha256::digest(seed.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        Self {
            seed: seed.to_owned(),
            inner: Pcg64Mcg::seed_from_u64(u64::from_le_bytes(bytes)),
            draws: 0,
        }
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    /// Number of values drawn so far.
    pub fn draws(&self) -> u64 {
        self.draws
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        self.draws += 1;
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}
