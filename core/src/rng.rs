//! Deterministic random number generation.
//!
//! RULE: Nothing in the simulation may call any platform RNG.
//! All randomness flows through SubsystemRng instances derived
//! from the session's master seed.
//!
//! Streams are derived from (master_seed, slot, tick), never from
//! how many draws happened before. This means:
//!   - Restoring a snapshot and ticking again reproduces the same weather.
//!   - Adding a new slot never changes existing slots' streams.

use crate::types::Tick;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// A deterministic RNG for a single tick phase.
pub struct SubsystemRng {
    inner: Pcg64Mcg,
}

impl SubsystemRng {
    /// Create an RNG from the master seed and a stable stream index.
    pub fn new(master_seed: u64, stream: u64) -> Self {
        let derived_seed = master_seed ^ (stream.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        assert!(n > 0, "n must be > 0");
        self.inner.gen_range(0..n)
    }

    /// Roll a byte uniformly in [lo, hi]. An inverted range yields `lo`.
    pub fn range_u8(&mut self, lo: u8, hi: u8) -> u8 {
        if hi <= lo {
            return lo;
        }
        self.inner.gen_range(lo..=hi)
    }
}

/// All per-phase RNGs for a single session.
#[derive(Debug, Clone, Copy)]
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn seed(&self) -> u64 {
        self.master_seed
    }

    /// The stream for `slot` during `tick`.
    pub fn for_subsystem_at_tick(&self, slot: SubsystemSlot, tick: Tick) -> SubsystemRng {
        self.for_stream(slot, tick, 0)
    }

    /// The stream for one cell of `slot` during `tick`. Used by player
    /// actions, which may happen several times between ticks.
    pub fn for_cell_at_tick(&self, slot: SubsystemSlot, tick: Tick, cell_index: u64) -> SubsystemRng {
        self.for_stream(slot, tick, cell_index.wrapping_add(1))
    }

    fn for_stream(&self, slot: SubsystemSlot, tick: Tick, salt: u64) -> SubsystemRng {
        let stream = (slot as u64)
            .wrapping_mul(0x0000_0100_0000_01b3)
            .wrapping_add(tick.wrapping_mul(0xbf58_476d_1ce4_e5b9))
            .wrapping_add(salt.wrapping_mul(0x94d0_49bb_1331_11eb));
        SubsystemRng::new(self.master_seed, stream)
    }
}

/// Stable slot assignments.
/// NEVER reorder or remove entries; only append.
/// Reordering changes every slot's seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum SubsystemSlot {
    Weather = 0,
    Growth = 1,
    Sowing = 2,
}
