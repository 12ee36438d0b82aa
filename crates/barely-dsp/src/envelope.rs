//! Phase-driven ADSR envelope.
//!
//! Each stage advances a monotonic phase in `[0, 1)` by a per-stage
//! increment derived once from `(stage_time_seconds, sample_interval)`,
//! rather than an exponential-curve-with-overshoot envelope design common
//! in MIDI synths. The coefficients live in [`Adsr`] so every voice of one
//! instrument can share a single read-only copy.

/// Envelope lifecycle stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnvelopeState {
    /// Not sounding; `next` always returns `0.0`.
    #[default]
    Idle,
    /// Phase ramps `0 -> 1`; output ramps `0 -> 1` linearly.
    Attack,
    /// Phase ramps `0 -> 1`; output falls linearly from `1` to `sustain`.
    Decay,
    /// Output holds at `sustain` until `stop` is called.
    Sustain,
    /// Phase ramps `0 -> 1`; output falls linearly from the captured
    /// release-start level to `0`.
    Release,
}

/// Per-sample increments for one ADSR configuration, shared read-only by
/// every [`Envelope`] of an instrument.
///
/// An increment greater than `1.0` (a stage shorter than one sample) is
/// treated as `0.0`, which `Envelope::next` reads as "skip this stage
/// instantaneously" — matching the reference engine's `Envelope::SetAttack`
/// et al.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adsr {
    sample_interval: f64,
    attack_increment: f64,
    decay_increment: f64,
    sustain: f64,
    release_increment: f64,
}

impl Adsr {
    /// Creates coefficients for a given sample rate, with attack/decay/
    /// release at zero seconds (instantaneous) and full sustain.
    pub fn new(sample_rate: i32) -> Self {
        Self {
            sample_interval: if sample_rate > 0 {
                1.0 / f64::from(sample_rate)
            } else {
                0.0
            },
            attack_increment: 0.0,
            decay_increment: 0.0,
            sustain: 1.0,
            release_increment: 0.0,
        }
    }

    /// Sets attack time in seconds (`<= 0.0` is instantaneous).
    pub fn set_attack(&mut self, attack: f64) {
        self.attack_increment = Self::stage_increment(attack, self.sample_interval);
    }

    /// Sets decay time in seconds (`<= 0.0` is instantaneous).
    pub fn set_decay(&mut self, decay: f64) {
        self.decay_increment = Self::stage_increment(decay, self.sample_interval);
    }

    /// Sets release time in seconds (`<= 0.0` is instantaneous).
    pub fn set_release(&mut self, release: f64) {
        self.release_increment = Self::stage_increment(release, self.sample_interval);
    }

    /// Sets the sustain level, clamped to `[0, 1]`.
    pub fn set_sustain(&mut self, sustain: f64) {
        self.sustain = sustain.clamp(0.0, 1.0);
    }

    /// Current sustain level.
    pub fn sustain(&self) -> f64 {
        self.sustain
    }

    fn stage_increment(stage_seconds: f64, sample_interval: f64) -> f64 {
        let increment = if stage_seconds > 0.0 {
            sample_interval / stage_seconds
        } else {
            0.0
        };
        if increment > 1.0 { 0.0 } else { increment }
    }
}

/// Phase-driven ADSR envelope generator.
///
/// Produces one output sample per [`Envelope::next`] call in amplitude
/// `[0, 1]`. Does not own its [`Adsr`] coefficients — they are passed in by
/// reference so every voice in an instrument can share one copy.
#[derive(Debug, Clone, Copy, Default)]
pub struct Envelope {
    state: EnvelopeState,
    phase: f64,
    output: f64,
    release_output: f64,
}

impl Envelope {
    /// Creates an idle envelope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the envelope is producing sound (not [`EnvelopeState::Idle`]).
    pub fn is_active(&self) -> bool {
        self.state != EnvelopeState::Idle
    }

    /// Current stage.
    pub fn state(&self) -> EnvelopeState {
        self.state
    }

    /// Advances the envelope by one sample, returning the new output level.
    #[inline]
    pub fn next(&mut self, adsr: &Adsr) -> f64 {
        loop {
            match self.state {
                EnvelopeState::Idle => return 0.0,
                EnvelopeState::Attack => {
                    if adsr.attack_increment > 0.0 {
                        self.output = self.phase;
                        self.phase += adsr.attack_increment;
                        if self.phase >= 1.0 {
                            self.phase = 0.0;
                            self.state = EnvelopeState::Decay;
                        }
                        return self.output;
                    }
                    self.phase = 0.0;
                    self.state = EnvelopeState::Decay;
                }
                EnvelopeState::Decay => {
                    if adsr.decay_increment > 0.0 {
                        self.output = 1.0 - self.phase * (1.0 - adsr.sustain);
                        self.phase += adsr.decay_increment;
                        if self.phase >= 1.0 {
                            self.phase = 0.0;
                            self.state = EnvelopeState::Sustain;
                        }
                        return self.output;
                    }
                    self.phase = 0.0;
                    self.state = EnvelopeState::Sustain;
                }
                EnvelopeState::Sustain => {
                    self.output = adsr.sustain;
                    return self.output;
                }
                EnvelopeState::Release => {
                    if adsr.release_increment > 0.0 {
                        self.output = (1.0 - self.phase) * self.release_output;
                        self.phase += adsr.release_increment;
                        if self.phase >= 1.0 {
                            self.phase = 0.0;
                            self.state = EnvelopeState::Idle;
                        }
                        return self.output;
                    }
                    self.phase = 0.0;
                    self.state = EnvelopeState::Idle;
                }
            }
        }
    }

    /// Resets to [`EnvelopeState::Idle`] immediately, with no release tail.
    pub fn reset(&mut self) {
        self.state = EnvelopeState::Idle;
    }

    /// Starts (or retriggers) the envelope, choosing the first stage with a
    /// nonzero increment (Attack, then Decay, then straight to Sustain).
    pub fn start(&mut self, adsr: &Adsr) {
        self.phase = 0.0;
        if adsr.attack_increment > 0.0 {
            self.output = 0.0;
            self.state = EnvelopeState::Attack;
        } else if adsr.decay_increment > 0.0 {
            self.output = 1.0;
            self.state = EnvelopeState::Decay;
        } else {
            self.output = adsr.sustain;
            self.state = EnvelopeState::Sustain;
        }
    }

    /// Captures the current output and begins the release stage. A no-op
    /// while idle or already releasing.
    pub fn stop(&mut self) {
        if self.state != EnvelopeState::Idle && self.state != EnvelopeState::Release {
            self.phase = 0.0;
            self.release_output = self.output;
            self.state = EnvelopeState::Release;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adsr(sample_rate: i32, attack: f64, decay: f64, sustain: f64, release: f64) -> Adsr {
        let mut a = Adsr::new(sample_rate);
        a.set_attack(attack);
        a.set_decay(decay);
        a.set_sustain(sustain);
        a.set_release(release);
        a
    }

    #[test]
    fn idle_envelope_outputs_zero() {
        let a = adsr(48_000, 0.01, 0.1, 0.5, 0.2);
        let mut env = Envelope::new();
        assert!(!env.is_active());
        assert_eq!(env.next(&a), 0.0);
    }

    #[test]
    fn attack_phase_is_linear_and_monotonic() {
        let a = adsr(4, 1.0, 0.0, 1.0, 0.0); // sample_interval = 0.25s, attack = 1s -> 4 samples
        let mut env = Envelope::new();
        env.start(&a);
        assert_eq!(env.state(), EnvelopeState::Attack);
        let s0 = env.next(&a);
        let s1 = env.next(&a);
        let s2 = env.next(&a);
        assert_eq!(s0, 0.0);
        assert!((s1 - 0.25).abs() < 1e-9);
        assert!((s2 - 0.5).abs() < 1e-9);
        assert!(s1 > s0 && s2 > s1);
    }

    #[test]
    fn zero_attack_skips_straight_to_decay() {
        let a = adsr(48_000, 0.0, 0.1, 0.5, 0.1);
        let mut env = Envelope::new();
        env.start(&a);
        assert_eq!(env.state(), EnvelopeState::Decay);
        assert_eq!(env.next(&a), 1.0);
    }

    #[test]
    fn decay_settles_exactly_at_sustain() {
        let a = adsr(4, 0.0, 1.0, 0.4, 0.0); // 4 samples to decay from 1.0 to 0.4
        let mut env = Envelope::new();
        env.start(&a);
        let levels: Vec<f64> = (0..4).map(|_| env.next(&a)).collect();
        assert!((levels[0] - 1.0).abs() < 1e-9);
        assert_eq!(env.state(), EnvelopeState::Sustain);
        assert!((env.next(&a) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn sustain_holds_until_stop() {
        let a = adsr(48_000, 0.0, 0.0, 0.6, 0.1);
        let mut env = Envelope::new();
        env.start(&a);
        assert_eq!(env.state(), EnvelopeState::Sustain);
        for _ in 0..100 {
            assert!((env.next(&a) - 0.6).abs() < 1e-12);
        }
    }

    #[test]
    fn stop_captures_output_and_ramps_to_zero() {
        let a = adsr(4, 0.0, 0.0, 0.8, 1.0); // 4 samples release
        let mut env = Envelope::new();
        env.start(&a);
        env.next(&a); // consume one sustain sample
        env.stop();
        assert_eq!(env.state(), EnvelopeState::Release);
        let levels: Vec<f64> = (0..4).map(|_| env.next(&a)).collect();
        assert!((levels[0] - 0.8 * 0.75).abs() < 1e-9);
        assert_eq!(env.state(), EnvelopeState::Idle);
        assert!(!env.is_active());
        assert_eq!(env.next(&a), 0.0);
    }

    #[test]
    fn zero_release_goes_idle_instantly() {
        let a = adsr(48_000, 0.0, 0.0, 0.5, 0.0);
        let mut env = Envelope::new();
        env.start(&a);
        env.next(&a);
        env.stop();
        assert_eq!(env.state(), EnvelopeState::Idle);
        assert_eq!(env.next(&a), 0.0);
    }

    #[test]
    fn stop_while_idle_or_releasing_is_a_no_op() {
        let a = adsr(4, 0.0, 0.0, 0.5, 1.0);
        let mut env = Envelope::new();
        env.stop();
        assert_eq!(env.state(), EnvelopeState::Idle);

        env.start(&a);
        env.next(&a);
        env.stop();
        let state_after_first_stop = env.state();
        env.stop();
        assert_eq!(env.state(), state_after_first_stop);
    }

    #[test]
    fn increment_over_one_is_treated_as_instantaneous() {
        // sample_interval = 1/4s; attack of 0.1s -> increment = 2.5 > 1 -> zeroed.
        let a = adsr(4, 0.1, 0.0, 1.0, 0.0);
        let mut env = Envelope::new();
        env.start(&a);
        assert_eq!(env.state(), EnvelopeState::Decay);
    }

    #[test]
    fn reset_forces_idle_with_no_release_tail() {
        let a = adsr(48_000, 0.01, 0.1, 0.5, 0.5);
        let mut env = Envelope::new();
        env.start(&a);
        env.next(&a);
        env.reset();
        assert_eq!(env.state(), EnvelopeState::Idle);
        assert_eq!(env.next(&a), 0.0);
    }
}
