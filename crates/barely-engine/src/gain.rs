//! Linear-ramp gain smoothing for the per-instrument output stage.
//!
//! Target-gain changes ramp linearly over
//! `unity_ramp_sample_count * |target - current|` samples (so a full
//! 0-to-unity swing takes `unity_ramp_sample_count` samples, a half swing
//! half as long), then the rest of the buffer gets a constant multiply —
//! elided entirely near unity gain, and replaced with a zero-fill near
//! silence, to skip redundant floating-point work in the common cases.

const GAIN_THRESHOLD: f64 = 2e-5;
const UNITY_GAIN: f64 = 1.0;
const UNITY_RAMP_DURATION_SECONDS: f64 = 0.05;

/// Smooths a target gain (linear amplitude) onto a buffer over time,
/// ramping rather than stepping to avoid zipper noise on control changes.
#[derive(Debug, Clone, Copy)]
pub struct GainProcessor {
    unity_ramp_sample_count: f64,
    gain: f64,
    target_gain: f64,
    is_initialized: bool,
}

impl GainProcessor {
    /// Creates a processor at unity gain for the given sample rate.
    pub fn new(sample_rate: i32) -> Self {
        Self {
            unity_ramp_sample_count: f64::from(sample_rate) * UNITY_RAMP_DURATION_SECONDS,
            gain: UNITY_GAIN,
            target_gain: UNITY_GAIN,
            is_initialized: false,
        }
    }

    /// Sets the gain to ramp towards.
    pub fn set_gain(&mut self, gain: f64) {
        self.target_gain = gain;
    }

    /// Applies the current ramp (if any) and then constant gain to
    /// `samples` in place.
    pub fn process(&mut self, samples: &mut [f64]) {
        let sample_count = samples.len();
        let mut i = 0usize;
        if (self.gain - self.target_gain).abs() > 0.0 {
            if self.is_initialized {
                let ramp_sample_count =
                    (self.unity_ramp_sample_count * (self.target_gain - self.gain).abs()) as usize;
                if ramp_sample_count > 0 {
                    self.gain = apply_linear_ramp(
                        self.gain,
                        self.target_gain,
                        ramp_sample_count,
                        samples,
                    );
                    i = ramp_sample_count;
                }
            } else {
                self.gain = self.target_gain;
            }
        }
        self.is_initialized = true;
        if i < sample_count {
            apply_constant_gain(self.gain, &mut samples[i..]);
        }
    }
}

fn apply_constant_gain(gain: f64, samples: &mut [f64]) {
    if (gain - UNITY_GAIN).abs() < GAIN_THRESHOLD {
        return;
    }
    if gain.abs() < GAIN_THRESHOLD {
        samples.fill(0.0);
        return;
    }
    for sample in samples {
        *sample *= gain;
    }
}

fn apply_linear_ramp(
    mut gain: f64,
    target_gain: f64,
    ramp_sample_count: usize,
    samples: &mut [f64],
) -> f64 {
    let ramp_increment = (target_gain - gain) / ramp_sample_count as f64;
    let applied = ramp_sample_count.min(samples.len());
    for sample in &mut samples[..applied] {
        gain += ramp_increment;
        *sample *= gain;
    }
    if ramp_sample_count <= samples.len() { target_gain } else { gain }
}
