//! Deterministic random number generation.
//!
//! RULE: Nothing in the simulation may call any platform RNG.
//! All randomness flows through StreamRng instances derived
//! from the single master seed stored on the run record.
//!
//! Each family of draws (gender, income noise, status, occupation)
//! gets its own stream, seeded from (master_seed XOR slot_index).
//! Changing how many draws one family makes never shifts another
//! family's sequence.

use rand::distributions::{Distribution, WeightedIndex};
use rand::SeedableRng;
use rand_distr::Normal;
use rand_pcg::Pcg64Mcg;

use crate::error::{SimError, SimResult};

/// A named, deterministic RNG for one family of draws.
pub struct StreamRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl StreamRng {
    /// Create a stream from the master seed and a stable slot index.
    /// The index must never change once assigned.
    pub fn new(master_seed: u64, slot_index: u64) -> Self {
        let derived_seed = master_seed ^ (slot_index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        use rand::RngCore;
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Draw from a prepared normal distribution.
    pub fn normal(&mut self, dist: &Normal<f64>) -> f64 {
        dist.sample(&mut self.inner)
    }

    /// Draw N(mean, std_dev) and clip the result into [lo, hi].
    pub fn clipped_normal(&mut self, mean: f64, std_dev: f64, lo: f64, hi: f64) -> SimResult<f64> {
        let dist = Normal::new(mean, std_dev)
            .map_err(|e| SimError::InvalidConfig(format!("normal({mean}, {std_dev}): {e}")))?;
        Ok(self.normal(&dist).clamp(lo, hi))
    }

    /// Draw an index from a prepared weighted categorical distribution.
    pub fn weighted(&mut self, index: &WeightedIndex<f64>) -> usize {
        index.sample(&mut self.inner)
    }
}

/// All draw streams for a single run, indexed by stable slot.
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    pub fn for_stream(&self, slot: StreamSlot) -> StreamRng {
        StreamRng::new(self.master_seed, slot as u64).with_name(slot.name())
    }
}

/// Stable stream slot assignments.
/// NEVER reorder or remove entries, only append.
/// Reordering changes every stream's seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum StreamSlot {
    Gender = 0,
    Income = 1,
    Status = 2,
    Occupation = 3,
}

impl StreamSlot {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Gender     => "gender",
            Self::Income     => "income",
            Self::Status     => "status",
            Self::Occupation => "occupation",
        }
    }
}
