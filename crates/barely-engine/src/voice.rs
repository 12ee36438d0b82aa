//! A single polyphonic synthesis voice.
//!
//! Grounded on `examples/original_source/src/dsp/voice.cpp`'s `Voice::Next`/
//! `Start`/`Stop`: one envelope drives a shared oscillator and sample player,
//! mixed and then pushed through a one-pole filter. Exactly one of each
//! stage, unlike a dual-oscillator, dual-envelope MIDI voice design — the
//! instrument processor is what fans a note out across many of these for
//! polyphony.

use barely_dsp::{Adsr, Envelope, FilterType, OnePoleFilter, Oscillator, OscillatorShape, SamplePlayer};

/// How a voice's sample player contributes to its output. Ordinal order
/// matches the engine's public enum contract and must not be reordered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum SamplePlaybackMode {
    /// No sample contribution; only the oscillator sounds.
    #[default]
    None = 0,
    /// Plays the sample once per note; the voice keeps sounding (envelope
    /// held in its current stage) until the sample finishes, even past a
    /// `stop` call.
    Once = 1,
    /// Plays the sample once, but `stop` releases immediately like a normal
    /// envelope release rather than waiting for the sample to finish.
    Sustain = 2,
    /// Loops the sample for as long as the envelope is active.
    Loop = 3,
}

/// One voice: envelope, oscillator, sample player, and filter combined into
/// a single output stage.
#[derive(Debug, Clone, Copy)]
pub struct Voice {
    envelope: Envelope,
    oscillator: Oscillator,
    sample_player: SamplePlayer,
    filter: OnePoleFilter,
    gain: f64,
}

impl Voice {
    /// Creates a silent, idle voice. `noise_seed` seeds this voice's private
    /// noise oscillator tap so that voices sharing one `OscillatorShape::Noise`
    /// instrument don't all produce identical noise.
    pub fn new(sample_rate: i32, noise_seed: u32) -> Self {
        Self {
            envelope: Envelope::new(),
            oscillator: Oscillator::new(noise_seed),
            sample_player: SamplePlayer::new(sample_rate),
            filter: OnePoleFilter::new(),
            gain: 0.0,
        }
    }

    /// Whether this voice is currently sounding (its envelope is not idle).
    pub fn is_active(&self) -> bool {
        self.envelope.is_active()
    }

    /// Gives mutable access to the voice's sample player, so the instrument
    /// processor can load/clear data and set speed without reaching past it.
    pub fn sample_player_mut(&mut self) -> &mut SamplePlayer {
        &mut self.sample_player
    }

    /// Starts (or retriggers) the voice at `gain` (linear amplitude),
    /// resetting the filter, oscillator phase, and sample cursor.
    pub fn start(&mut self, adsr: &Adsr, gain: f64) {
        self.filter.reset();
        self.oscillator.reset();
        self.sample_player.reset();
        self.gain = gain;
        self.envelope.start(adsr);
    }

    /// Releases the voice. In [`SamplePlaybackMode::Once`], this is deferred:
    /// the envelope keeps sounding until the sample finishes on its own (see
    /// [`Voice::next`]), matching a drum-hit-style one-shot rather than a
    /// held note.
    pub fn stop(&mut self, sample_playback_mode: SamplePlaybackMode) {
        if sample_playback_mode != SamplePlaybackMode::Once || !self.sample_player.is_active() {
            self.envelope.stop();
        }
    }

    /// Forces the voice idle immediately, with no release tail.
    pub fn reset(&mut self) {
        self.envelope.reset();
    }

    /// Produces the next output sample.
    ///
    /// `sample_buffer` is the currently selected sample slice's raw data (or
    /// `&[]` if this voice has none); `oscillator_increment` and
    /// `filter_coefficient` are recomputed by the caller only when the
    /// controls that affect them change, not every sample.
    #[inline]
    #[allow(clippy::too_many_arguments)]
    pub fn next(
        &mut self,
        adsr: &Adsr,
        oscillator_increment: f64,
        oscillator_shape: OscillatorShape,
        sample_playback_mode: SamplePlaybackMode,
        sample_buffer: &[f32],
        filter_coefficient: f32,
        filter_type: FilterType,
    ) -> f64 {
        if sample_playback_mode == SamplePlaybackMode::Once && !self.sample_player.is_active() {
            // The one-shot sample ran out; the voice is done even though
            // nothing ever called `stop` with this mode.
            self.envelope.reset();
        }
        let oscillator_output = self.oscillator.next(oscillator_increment, oscillator_shape);
        let sample_output = if sample_playback_mode == SamplePlaybackMode::None {
            0.0
        } else {
            f64::from(self.sample_player.next(sample_buffer, sample_playback_mode == SamplePlaybackMode::Loop))
        };
        let envelope_output = self.envelope.next(adsr);
        let raw = (self.gain * envelope_output * (oscillator_output + sample_output)) as f32;
        f64::from(self.filter.next(raw, filter_coefficient, filter_type))
    }
}
