//! The engine's two independent random number generators.
//!
//! Grounded on `examples/original_source/src/core/rng.h`: a `minstd_rand`
//! + `f32` generator for the audio thread and an `mt19937_64` + `f64`
//! generator for the main thread, each seeded independently and
//! deterministically so that "same seed, same draws" holds.
//! [`AudioRng`] must never be touched from the main thread and vice versa —
//! reproducibility depends on each generator only ever advancing from its
//! own thread.

use rand::rngs::{SmallRng, StdRng};
use rand::{Rng as _, SeedableRng};

/// Audio-thread RNG, used only for sample-selection tiebreaks and any
/// audio-rate noise source that wants a reseedable, reproducible stream.
#[derive(Debug, Clone)]
pub struct AudioRng {
    seed: u64,
    rng: SmallRng,
}

impl AudioRng {
    /// Creates a generator seeded deterministically from `seed`.
    pub fn new(seed: u64) -> Self {
        Self { seed, rng: SmallRng::seed_from_u64(seed) }
    }

    /// The seed this generator was last set to.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Reseeds the generator, discarding all prior state.
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
        self.rng = SmallRng::seed_from_u64(seed);
    }

    /// Draws a uniform sample in `[0, 1)`.
    pub fn generate(&mut self) -> f32 {
        self.rng.r#gen::<f32>()
    }

    /// Draws a uniform integer in `[min, max)`.
    pub fn generate_range(&mut self, min: u32, max: u32) -> u32 {
        debug_assert!(min <= max);
        min + (self.generate() * (max - min) as f32) as u32
    }
}

/// Main-thread RNG, used for anything a caller seeds/queries for
/// deterministic composition (e.g. probability-driven controllers built on
/// top of `Performer`).
#[derive(Debug, Clone)]
pub struct MainRng {
    seed: u64,
    rng: StdRng,
}

impl MainRng {
    /// Creates a generator seeded deterministically from `seed`.
    pub fn new(seed: u64) -> Self {
        Self { seed, rng: StdRng::seed_from_u64(seed) }
    }

    /// The seed this generator was last set to.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Reseeds the generator, discarding all prior state.
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Draws a uniform sample in `[0, 1)`.
    pub fn generate(&mut self) -> f64 {
        self.rng.r#gen::<f64>()
    }

    /// Draws a uniform integer in `[min, max)`.
    pub fn generate_range(&mut self, min: u32, max: u32) -> u32 {
        debug_assert!(min <= max);
        min + (self.generate() * f64::from(max - min)) as u32
    }
}
