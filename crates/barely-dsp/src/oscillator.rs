//! Phase-accumulator oscillator.
//!
//! The phase is sampled before the phasor advances, then wrapped back into
//! `[0, 1)`. The shape set is a closed, fixed ordinal list — `None`, `Sine`,
//! `Saw`, `Square`, `Noise` — with no anti-aliasing correction, trading
//! PolyBLEP-corrected waveforms for plain trigonometric/ramp/noise
//! generators.

use libm::sinf;

/// Waveform an [`Oscillator`] produces. Ordinal order matches the engine's
/// public enum contract and must not be reordered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OscillatorShape {
    /// Oscillator disabled; contributes `0.0`.
    #[default]
    None,
    /// `sin(2*pi*phase)`.
    Sine,
    /// Bipolar ramp from `-1` to `1` across one period.
    Saw,
    /// `+1` for the first half period, `-1` for the second.
    Square,
    /// Uniform white noise in `[-1, 1]`, independent of phase.
    Noise,
}

/// Phase-accumulator oscillator with an internal noise source.
///
/// `phase` is a running value in `[0, 1)`; callers drive it with a
/// per-sample `increment` derived externally from pitch/frequency (the
/// processor recomputes `increment` only when a note's pitch or the
/// instrument's reference frequency changes, not every sample).
#[derive(Debug, Clone, Copy)]
pub struct Oscillator {
    phase: f64,
    noise_state: u32,
}

impl Oscillator {
    /// Creates an oscillator with zeroed phase, seeded for noise generation.
    pub fn new(noise_seed: u32) -> Self {
        Self {
            phase: 0.0,
            noise_state: if noise_seed == 0 { 0x9E37_79B9 } else { noise_seed },
        }
    }

    /// Current phase in `[0, 1)`.
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Produces the next sample for `shape` at the current phase, then
    /// advances the phasor by `increment` (wrapping back into `[0, 1)`).
    #[inline]
    pub fn next(&mut self, increment: f64, shape: OscillatorShape) -> f64 {
        let output = match shape {
            OscillatorShape::None => 0.0,
            OscillatorShape::Sine => {
                f64::from(sinf(2.0 * core::f32::consts::PI * self.phase as f32))
            }
            OscillatorShape::Saw => 2.0 * self.phase - 1.0,
            OscillatorShape::Square => {
                if self.phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            OscillatorShape::Noise => self.next_noise(),
        };
        self.phase += increment;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }
        output
    }

    /// Resets the phasor to zero. Does not reseed the noise source.
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    // xorshift32: fast, allocation-free, good enough for a dither-grade
    // white noise source. Not cryptographic, not shared with the engine's
    // `AudioRng`/`MainRng` — this is a private per-oscillator noise tap.
    fn next_noise(&mut self) -> f64 {
        let mut x = self.noise_state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.noise_state = x;
        2.0 * (f64::from(x) / f64::from(u32::MAX)) - 1.0
    }
}
