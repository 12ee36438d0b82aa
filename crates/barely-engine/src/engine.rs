//! The top-level engine: owns every instrument and performer, the
//! sample-rate/tempo/reference-frequency clock, and the main-thread RNG.
//!
//! A sample rate fixed at construction, a reference frequency and tempo
//! each instrument/performer is notified of on change, and an
//! `update(timestamp)` loop that alternates between advancing performers by
//! the smallest pending musical-time step and, once that step lands on a
//! sample boundary, pushing every instrument's `update_sample` forward.
//! Instruments and performers are `slotmap`-keyed rather than kept behind
//! raw pointers, so a handle stays valid (and generation-checked) across
//! removal of other entries.

use crate::error::EngineError;
use crate::instrument::Instrument;
use crate::instrument_processor::InstrumentProcessor;
use crate::message::message_queue;
use crate::performer::Performer;
use crate::rng::MainRng;
use slotmap::{SlotMap, new_key_type};

new_key_type! {
    /// Handle to an instrument owned by an [`Engine`].
    pub struct InstrumentId;
}

new_key_type! {
    /// Handle to a performer owned by an [`Engine`].
    pub struct PerformerId;
}

/// Default reference frequency: `A4` shifted down nine semitones, i.e. `C4`
/// at `440 * 2^(-9/12)` Hz, matching the reference engine's default.
pub fn default_reference_frequency() -> f32 {
    440.0 * 2f32.powf(-9.0 / 12.0)
}

/// Default voice count a freshly created instrument starts with, matching
/// [`crate::control::ControlType::VoiceCount`]'s own default.
const DEFAULT_VOICE_COUNT: i32 = 8;

/// Owns every instrument and performer in one synthesis graph, plus the
/// shared clock (sample rate, tempo, reference frequency, timestamp) they're
/// all driven from. The main-thread side of the whole crate; every
/// [`InstrumentProcessor`] handed out by [`Engine::create_instrument`] is
/// the only part meant to cross onto the audio thread.
pub struct Engine {
    sample_rate: i32,
    reference_frequency: f32,
    tempo: f64,
    timestamp: f64,
    instruments: SlotMap<InstrumentId, Instrument>,
    performers: SlotMap<PerformerId, Performer>,
    main_rng: MainRng,
}

impl Engine {
    /// Creates an engine at `sample_rate` (which must be positive) with the
    /// default reference frequency, tempo `120.0`, and timestamp `0.0`.
    pub fn new(sample_rate: i32) -> Result<Self, EngineError> {
        if sample_rate <= 0 {
            return Err(EngineError::InvalidSampleRate(sample_rate));
        }
        tracing::debug!(sample_rate, "engine created");
        Ok(Self {
            sample_rate,
            reference_frequency: default_reference_frequency(),
            tempo: 120.0,
            timestamp: 0.0,
            instruments: SlotMap::with_key(),
            performers: SlotMap::with_key(),
            main_rng: MainRng::new(0),
        })
    }

    /// The sample rate this engine was constructed with. Fixed for its
    /// lifetime.
    pub fn sample_rate(&self) -> i32 {
        self.sample_rate
    }

    /// Current reference frequency, in hertz (the frequency a pitch of
    /// `0.0` octaves resolves to).
    pub fn reference_frequency(&self) -> f32 {
        self.reference_frequency
    }

    /// Current tempo, in beats per minute. `0.0` freezes musical time: every
    /// instrument still advances sample-for-sample, but no performer moves.
    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    /// Current timestamp, in seconds, as of the last [`Engine::update`].
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    /// Gives the main-thread RNG, for callers that want deterministic
    /// probability-driven composition seeded alongside this engine.
    pub fn main_rng(&mut self) -> &mut MainRng {
        &mut self.main_rng
    }

    /// Converts a duration in beats to seconds at the current tempo.
    /// `tempo <= 0.0` is treated as frozen time and yields `0.0`.
    pub fn beats_to_seconds(&self, beats: f64) -> f64 {
        if self.tempo > 0.0 { beats * 60.0 / self.tempo } else { 0.0 }
    }

    /// Converts a duration in seconds to beats at the current tempo.
    /// `tempo <= 0.0` is treated as frozen time and yields `0.0`.
    pub fn seconds_to_beats(&self, seconds: f64) -> f64 {
        if self.tempo > 0.0 { self.tempo * seconds / 60.0 } else { 0.0 }
    }

    /// Converts a duration in seconds to the nearest (truncated) sample
    /// index at this engine's sample rate.
    pub fn seconds_to_samples(&self, seconds: f64) -> i64 {
        (seconds * f64::from(self.sample_rate)) as i64
    }

    /// Sets the reference frequency (clamped to `>= 0.0`), propagating the
    /// change to every existing instrument.
    pub fn set_reference_frequency(&mut self, reference_frequency: f32) {
        let reference_frequency = reference_frequency.max(0.0);
        if reference_frequency == self.reference_frequency {
            return;
        }
        self.reference_frequency = reference_frequency;
        for instrument in self.instruments.values_mut() {
            instrument.set_reference_frequency(reference_frequency);
        }
    }

    /// Sets the tempo, in beats per minute (clamped to `>= 0.0`).
    pub fn set_tempo(&mut self, tempo: f64) {
        self.tempo = tempo.max(0.0);
    }

    /// Creates an instrument with the default voice count (`8`), returning
    /// its handle and the paired [`InstrumentProcessor`] to hand to the
    /// audio thread.
    pub fn create_instrument(&mut self) -> (InstrumentId, InstrumentProcessor) {
        self.create_instrument_with_voice_count(DEFAULT_VOICE_COUNT).expect("default voice count is always in range")
    }

    /// Creates an instrument whose voice count starts at `voice_count`
    /// (which must be in `1..=32`), returning its handle and the paired
    /// [`InstrumentProcessor`] to hand to the audio thread.
    pub fn create_instrument_with_voice_count(
        &mut self,
        voice_count: i32,
    ) -> Result<(InstrumentId, InstrumentProcessor), EngineError> {
        if !(1..=32).contains(&voice_count) {
            return Err(EngineError::InvalidVoiceCount(voice_count));
        }
        let (producer, consumer) = message_queue(crate::message::MESSAGE_QUEUE_CAPACITY);
        let update_sample = self.seconds_to_samples(self.timestamp);
        let audio_rng_seed = self.main_rng.generate_range(0, u32::MAX);
        let mut instrument = Instrument::new(self.sample_rate, producer, update_sample);
        instrument.set_control(crate::control::ControlType::VoiceCount, voice_count as f32);
        let id = self.instruments.insert(instrument);
        let processor =
            InstrumentProcessor::new(self.sample_rate, f64::from(self.reference_frequency), consumer, u64::from(audio_rng_seed));
        tracing::debug!(?id, voice_count, "instrument created");
        Ok((id, processor))
    }

    /// Destroys an instrument. A no-op if `instrument_id` is stale.
    pub fn destroy_instrument(&mut self, instrument_id: InstrumentId) {
        if self.instruments.remove(instrument_id).is_some() {
            tracing::debug!(id = ?instrument_id, "instrument destroyed");
        }
    }

    /// Reads an instrument by handle.
    pub fn instrument(&self, instrument_id: InstrumentId) -> Option<&Instrument> {
        self.instruments.get(instrument_id)
    }

    /// Mutably accesses an instrument by handle.
    pub fn instrument_mut(&mut self, instrument_id: InstrumentId) -> Option<&mut Instrument> {
        self.instruments.get_mut(instrument_id)
    }

    /// Creates a new, stopped performer, returning its handle.
    pub fn create_performer(&mut self) -> PerformerId {
        let id = self.performers.insert(Performer::new());
        tracing::debug!(?id, "performer created");
        id
    }

    /// Destroys a performer. A no-op if `performer_id` is stale.
    pub fn destroy_performer(&mut self, performer_id: PerformerId) {
        if self.performers.remove(performer_id).is_some() {
            tracing::debug!(id = ?performer_id, "performer destroyed");
        }
    }

    /// Reads a performer by handle.
    pub fn performer(&self, performer_id: PerformerId) -> Option<&Performer> {
        self.performers.get(performer_id)
    }

    /// Mutably accesses a performer by handle.
    pub fn performer_mut(&mut self, performer_id: PerformerId) -> Option<&mut Performer> {
        self.performers.get_mut(performer_id)
    }

    /// Advances the engine's clock to `timestamp` (in seconds since the
    /// engine was created), driving every performer by musical time and
    /// notifying every instrument of its new `update_sample` at each sample
    /// boundary crossed along the way.
    ///
    /// While `tempo > 0.0`, this repeatedly finds the smallest positive
    /// duration until either `timestamp` or the next performer event, steps
    /// every performer by that duration, advances the shared timestamp by
    /// its equivalent in seconds, and then lets every performer process the
    /// tasks that just became due — so a task's callback always observes an
    /// instrument's `update_sample` already caught up to the position that
    /// triggered it. While `tempo == 0.0`, no performer moves and the clock
    /// jumps straight to `timestamp`.
    pub fn update(&mut self, timestamp: f64) {
        while self.timestamp < timestamp {
            if self.tempo > 0.0 {
                let mut update_duration = self.seconds_to_beats(timestamp - self.timestamp);
                let mut has_tasks_to_process = false;
                for performer in self.performers.values() {
                    if let Some(duration) = performer.get_next_duration() {
                        if duration < update_duration {
                            has_tasks_to_process = true;
                            update_duration = duration;
                        }
                    }
                }
                debug_assert!(update_duration > 0.0 || has_tasks_to_process);

                if update_duration > 0.0 {
                    for performer in self.performers.values_mut() {
                        performer.update(update_duration);
                    }
                    self.timestamp += self.beats_to_seconds(update_duration);
                    let update_sample = self.seconds_to_samples(self.timestamp);
                    for instrument in self.instruments.values_mut() {
                        instrument.set_update_sample(update_sample);
                    }
                }

                if has_tasks_to_process {
                    for performer in self.performers.values_mut() {
                        performer.process_all_tasks_at_position();
                    }
                }
            } else {
                self.timestamp = timestamp;
                let update_sample = self.seconds_to_samples(self.timestamp);
                for instrument in self.instruments.values_mut() {
                    instrument.set_update_sample(update_sample);
                }
            }
        }
    }
}
