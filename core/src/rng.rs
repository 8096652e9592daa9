//! Deterministic random number generation.
//!
//! RULE: Nothing in the relocation core may call any platform RNG.
//! All randomness flows through SubsystemRng instances derived
//! from the single master seed stored on the run configuration.
//!
//! Each stream is seeded from (master_seed, slot, year). This means:
//!   - Adding a new slot never changes existing slots' streams.
//!   - Each simulated year is reproducible in isolation.

use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

use crate::types::Year;

/// A named, deterministic RNG for a single phase of a simulated year.
pub struct SubsystemRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl SubsystemRng {
    /// Create a stream from the master seed and a stable index.
    /// The index must never change once assigned.
    pub fn new(master_seed: u64, stream_index: u64) -> Self {
        let derived_seed = master_seed ^ (stream_index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
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

    /// Draw a raw u64 (full range).
    pub fn next_u64(&mut self) -> u64 {
        use rand::RngCore;
        self.inner.next_u64()
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        use rand::RngCore;
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Pick an index in [0, len). `len` must be non-zero.
    pub fn index_below(&mut self, len: usize) -> usize {
        self.next_u64_below(len as u64) as usize
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Uniform in-place permutation.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        use rand::seq::SliceRandom;
        items.shuffle(&mut self.inner);
    }
}

/// Derives every stream for a run, indexed by stable slot and year.
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

    pub fn for_year(&self, slot: StreamSlot, year: Year) -> SubsystemRng {
        let index = (u64::from(year) << 8) | slot as u64;
        SubsystemRng::new(self.master_seed, index).with_name(slot.name())
    }
}

/// Stable stream slot assignments.
/// NEVER reorder or remove entries. Only append.
/// Reordering changes every stream's seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum StreamSlot {
    Scheduler = 0,
    Planning  = 1,
    Events    = 2,
}

impl StreamSlot {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Scheduler => "scheduler",
            Self::Planning  => "planning",
            Self::Events    => "events",
        }
    }
}
