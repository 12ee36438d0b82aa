//! One-pole low/high-pass filter.
//!
//! A single-state IIR filter selectable between low-pass and high-pass
//! output, driven by a coefficient derived once per control change rather
//! than per sample.

use libm::expf;

/// Which output a [`OnePoleFilter`] produces from its single internal state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FilterType {
    /// Filter disabled; `Next` returns the input unchanged.
    #[default]
    None,
    /// `y <- y + (1 - coefficient) * (x - y)`.
    LowPass,
    /// `x - lowpass(x)`.
    HighPass,
}

/// Lazy single-state one-pole filter.
///
/// `coefficient` is supplied externally (via [`filter_coefficient`]) rather
/// than computed from a stored cutoff, since the processor recomputes it
/// only when the `FilterFrequency` control changes, not every sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct OnePoleFilter {
    output: f32,
}

impl OnePoleFilter {
    /// Creates a filter with zeroed state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filters the next input sample, producing `filter_type`'s output.
    #[inline]
    pub fn next(&mut self, input: f32, coefficient: f32, filter_type: FilterType) -> f32 {
        match filter_type {
            FilterType::None => input,
            FilterType::LowPass => {
                self.output += (1.0 - coefficient) * (input - self.output);
                self.output
            }
            FilterType::HighPass => {
                self.output += (1.0 - coefficient) * (input - self.output);
                input - self.output
            }
        }
    }

    /// Resets the internal state to zero.
    pub fn reset(&mut self) {
        self.output = 0.0;
    }
}

/// Computes the one-pole coefficient for a cutoff frequency at a given
/// sample rate: `exp(-2*pi*fc/fs)`, clamped to `[0, 1]`.
///
/// Returns `1.0` (no filtering effect under [`FilterType::LowPass`], full
/// pass-through) when `sample_rate <= 0`.
#[inline]
pub fn filter_coefficient(sample_rate: i32, cutoff_frequency: f32) -> f32 {
    if sample_rate <= 0 {
        return 1.0;
    }
    let cutoff = cutoff_frequency.max(0.0);
    let raw = expf(-core::f32::consts::TAU * cutoff / sample_rate as f32);
    raw.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impulse_response_matches_geometric_series() {
        let c = filter_coefficient(48_000, 1_000.0);
        let mut lp = OnePoleFilter::new();
        let expected = 1.0 - c;
        for i in 0..5 {
            let input = if i == 0 { 1.0 } else { 0.0 };
            let out = lp.next(input, c, FilterType::LowPass);
            if i == 0 {
                assert!((out - (1.0 - c)).abs() < 1e-6);
            } else {
                assert!((out - expected * c.powi((i - 1) as i32)).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn highpass_is_impulse_minus_lowpass() {
        let c = filter_coefficient(48_000, 1_000.0);
        let mut lp = OnePoleFilter::new();
        let mut hp = OnePoleFilter::new();
        for i in 0..8 {
            let input = if i == 0 { 1.0 } else { 0.0 };
            let lp_out = lp.next(input, c, FilterType::LowPass);
            let hp_out = hp.next(input, c, FilterType::HighPass);
            assert!((hp_out - (input - lp_out)).abs() < 1e-6);
        }
    }

    #[test]
    fn none_passes_through_unfiltered() {
        let mut filter = OnePoleFilter::new();
        assert_eq!(filter.next(0.5, 0.9, FilterType::None), 0.5);
        assert_eq!(filter.next(-0.25, 0.9, FilterType::None), -0.25);
    }

    #[test]
    fn reset_zeroes_state() {
        let c = filter_coefficient(48_000, 500.0);
        let mut lp = OnePoleFilter::new();
        lp.next(1.0, c, FilterType::LowPass);
        lp.reset();
        assert_eq!(lp.next(0.0, c, FilterType::LowPass), 0.0);
    }

    #[test]
    fn coefficient_clamped_to_unit_interval() {
        assert!((0.0..=1.0).contains(&filter_coefficient(48_000, 0.0)));
        assert!((0.0..=1.0).contains(&filter_coefficient(48_000, 1_000_000.0)));
        assert_eq!(filter_coefficient(0, 1_000.0), 1.0);
    }
}
