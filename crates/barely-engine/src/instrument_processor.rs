//! Audio-thread-only half of an instrument: owns the voice pool and drains
//! the message queue written by [`crate::instrument::Instrument`].
//!
//! `Voice::next` takes filter type, oscillator shape, and sample playback
//! mode as plain runtime parameters and matches on them internally, rather
//! than dispatching per-sample through a specialized callback selected
//! ahead of time — there is no separate callback table to maintain.

use crate::control::{ControlType, NoteControlType};
use crate::gain::GainProcessor;
use crate::message::{Message, MessageConsumer};
use crate::rng::AudioRng;
use crate::sample_data::SampleData;
use crate::voice::{SamplePlaybackMode, Voice};
use barely_dsp::{Adsr, FilterType, OscillatorShape, filter_coefficient};

/// Maximum simultaneous voices an instrument may hold, matching
/// [`ControlType::VoiceCount`]'s upper bound.
pub const MAX_VOICE_COUNT: usize = 32;

/// Default voice count, matching [`ControlType::VoiceCount`]'s default.
const DEFAULT_VOICE_COUNT: usize = 8;

#[derive(Debug, Clone, Copy)]
struct VoiceState {
    voice: Voice,
    pitch: f64,
    pitch_shift: f64,
    root_pitch: f64,
    sample_index: Option<usize>,
    oscillator_increment: f64,
    timestamp: u64,
}

impl VoiceState {
    fn new(sample_rate: i32, noise_seed: u32) -> Self {
        Self {
            voice: Voice::new(sample_rate, noise_seed),
            pitch: 0.0,
            pitch_shift: 0.0,
            root_pitch: 0.0,
            sample_index: None,
            oscillator_increment: 0.0,
            timestamp: 0,
        }
    }
}

/// Owns every piece of per-instrument state the audio thread touches.
/// Never allocates and never blocks once constructed.
pub struct InstrumentProcessor {
    consumer: MessageConsumer,
    voice_states: Vec<VoiceState>,
    voice_count: usize,
    gain_processor: GainProcessor,
    sample_data: SampleData,
    adsr: Adsr,
    oscillator_shape: OscillatorShape,
    sample_playback_mode: SamplePlaybackMode,
    filter_type: FilterType,
    filter_coefficient: f32,
    should_retrigger: bool,
    reference_frequency: f64,
    pitch_shift: f64,
    sample_rate: i32,
    sample_interval: f64,
    audio_rng: AudioRng,
}

impl InstrumentProcessor {
    /// Creates a processor with every voice idle and every control at its
    /// default. `audio_rng_seed` seeds the per-instrument sample-selection
    /// RNG; callers deriving it from the engine's own state get
    /// reproducible sample picks across runs.
    pub fn new(sample_rate: i32, reference_frequency: f64, consumer: MessageConsumer, audio_rng_seed: u64) -> Self {
        Self {
            consumer,
            voice_states: (0..MAX_VOICE_COUNT)
                .map(|i| VoiceState::new(sample_rate, i as u32 + 1))
                .collect(),
            voice_count: DEFAULT_VOICE_COUNT,
            gain_processor: GainProcessor::new(sample_rate),
            sample_data: SampleData::default(),
            adsr: Adsr::new(sample_rate),
            oscillator_shape: OscillatorShape::default(),
            sample_playback_mode: SamplePlaybackMode::default(),
            filter_type: FilterType::default(),
            filter_coefficient: 1.0,
            should_retrigger: false,
            reference_frequency,
            pitch_shift: 0.0,
            sample_rate,
            sample_interval: if sample_rate > 0 { 1.0 / f64::from(sample_rate) } else { 0.0 },
            audio_rng: AudioRng::new(audio_rng_seed),
        }
    }

    /// Drains every queued message whose sample index is before
    /// `process_sample + output.len()`, applying each at the correct
    /// sub-buffer boundary, and mixes voice output into `output` (additive
    /// over active voices, gain-ramped at the end).
    pub fn process(&mut self, output: &mut [f64], process_sample: i64) {
        let end_sample = process_sample + output.len() as i64;
        let mut frame = 0usize;
        while let Some((sample, message)) = self.consumer.get_next(end_sample) {
            let message_frame = (sample - process_sample).max(0) as usize;
            if frame < message_frame {
                self.mix(&mut output[frame..message_frame]);
                frame = message_frame;
            }
            self.apply(message);
        }
        if frame < output.len() {
            self.mix(&mut output[frame..]);
        }
    }

    fn apply(&mut self, message: Message) {
        match message {
            Message::Control { control_type, value } => self.set_control(control_type, value),
            Message::NoteControl { pitch, note_control_type, value } => {
                self.set_note_control(pitch, note_control_type, value);
            }
            Message::NoteOn { pitch, intensity, controls } => {
                self.set_note_on(pitch, f64::from(intensity), f64::from(controls.pitch_shift));
            }
            Message::NoteOff { pitch } => self.set_note_off(pitch),
            Message::ReferenceFrequency { frequency } => {
                self.set_reference_frequency(f64::from(frequency));
            }
            Message::SampleData { data } => self.set_sample_data(data),
        }
    }

    fn mix(&mut self, output: &mut [f64]) {
        let mut has_active_voice = false;
        for i in 0..self.voice_count {
            if !self.voice_states[i].voice.is_active() {
                continue;
            }
            let sample_buffer = match self.voice_states[i].sample_index {
                Some(index) => self.sample_data.get(index).samples(),
                None => &[],
            };
            let state = &mut self.voice_states[i];
            if has_active_voice {
                for sample in output.iter_mut() {
                    *sample += state.voice.next(
                        &self.adsr,
                        state.oscillator_increment,
                        self.oscillator_shape,
                        self.sample_playback_mode,
                        sample_buffer,
                        self.filter_coefficient,
                        self.filter_type,
                    );
                }
            } else {
                for sample in output.iter_mut() {
                    *sample = state.voice.next(
                        &self.adsr,
                        state.oscillator_increment,
                        self.oscillator_shape,
                        self.sample_playback_mode,
                        sample_buffer,
                        self.filter_coefficient,
                        self.filter_type,
                    );
                }
                has_active_voice = true;
            }
        }
        if !has_active_voice {
            output.fill(0.0);
        }
        self.gain_processor.process(output);
    }

    fn set_control(&mut self, control_type: ControlType, value: f32) {
        match control_type {
            ControlType::Gain => self.gain_processor.set_gain(f64::from(value)),
            ControlType::VoiceCount => {
                let voice_count = (value as usize).min(MAX_VOICE_COUNT);
                if voice_count > self.voice_count {
                    for state in &mut self.voice_states[self.voice_count..voice_count] {
                        state.voice.reset();
                    }
                }
                self.voice_count = voice_count;
            }
            ControlType::OscillatorShape => self.oscillator_shape = oscillator_shape_from(value),
            ControlType::SamplePlaybackMode => self.sample_playback_mode = sample_playback_mode_from(value),
            ControlType::Attack => self.adsr.set_attack(f64::from(value)),
            ControlType::Decay => self.adsr.set_decay(f64::from(value)),
            ControlType::Sustain => self.adsr.set_sustain(f64::from(value)),
            ControlType::Release => self.adsr.set_release(f64::from(value)),
            ControlType::PitchShift => {
                self.pitch_shift = f64::from(value);
                self.refresh_active_voice_increments();
            }
            ControlType::Retrigger => self.should_retrigger = value != 0.0,
            ControlType::FilterType => self.filter_type = filter_type_from(value),
            ControlType::FilterFrequency => {
                self.filter_coefficient = filter_coefficient(self.sample_rate, value);
            }
        }
    }

    fn set_note_control(&mut self, pitch: f64, note_control_type: NoteControlType, value: f32) {
        if note_control_type != NoteControlType::PitchShift {
            return;
        }
        for i in 0..self.voice_count {
            if self.voice_states[i].pitch == pitch && self.voice_states[i].voice.is_active() {
                self.voice_states[i].pitch_shift = f64::from(value);
                self.refresh_voice_increment(i);
                break;
            }
        }
    }

    fn set_note_off(&mut self, pitch: f64) {
        for i in 0..self.voice_count {
            if self.voice_states[i].pitch == pitch && self.voice_states[i].voice.is_active() {
                self.voice_states[i].voice.stop(self.sample_playback_mode);
            }
        }
    }

    fn set_note_on(&mut self, pitch: f64, intensity: f64, note_pitch_shift: f64) {
        if self.voice_count == 0 {
            return;
        }
        let index = self.acquire_voice(pitch);
        self.voice_states[index].pitch = pitch;
        self.voice_states[index].pitch_shift = note_pitch_shift;
        self.voice_states[index].timestamp = 0;

        let shifted_pitch = pitch + self.pitch_shift + note_pitch_shift;
        self.voice_states[index].oscillator_increment =
            frequency_from_pitch(shifted_pitch, self.reference_frequency) * self.sample_interval;

        if let Some(sample_index) = self.sample_data.select_index(pitch, &mut self.audio_rng) {
            let root_pitch = self.sample_data.get(sample_index).root_pitch();
            let frequency = self.sample_data.get(sample_index).frequency();
            let length = self.sample_data.get(sample_index).samples().len();
            self.voice_states[index].root_pitch = root_pitch;
            self.voice_states[index].sample_index = Some(sample_index);
            let voice = &mut self.voice_states[index].voice;
            voice.sample_player_mut().set_data(frequency, length);
            voice.sample_player_mut().set_speed(frequency_ratio_from_pitch(shifted_pitch - root_pitch));
        } else {
            self.voice_states[index].sample_index = None;
            self.voice_states[index].voice.sample_player_mut().clear_data();
        }
        self.voice_states[index].voice.start(&self.adsr, intensity);
    }

    fn set_reference_frequency(&mut self, reference_frequency: f64) {
        self.reference_frequency = reference_frequency;
        self.refresh_active_voice_increments();
    }

    fn set_sample_data(&mut self, sample_data: SampleData) {
        self.sample_data = sample_data;
        for i in 0..self.voice_count {
            if !self.voice_states[i].voice.is_active() {
                self.voice_states[i].sample_index = None;
                self.voice_states[i].voice.sample_player_mut().clear_data();
                continue;
            }
            let pitch = self.voice_states[i].pitch;
            if let Some(sample_index) = self.sample_data.select_index(pitch, &mut self.audio_rng) {
                let root_pitch = self.sample_data.get(sample_index).root_pitch();
                let frequency = self.sample_data.get(sample_index).frequency();
                let length = self.sample_data.get(sample_index).samples().len();
                let shifted_pitch = pitch + self.pitch_shift + self.voice_states[i].pitch_shift;
                self.voice_states[i].root_pitch = root_pitch;
                self.voice_states[i].sample_index = Some(sample_index);
                let voice = &mut self.voice_states[i].voice;
                voice.sample_player_mut().set_data(frequency, length);
                voice.sample_player_mut().set_speed(frequency_ratio_from_pitch(shifted_pitch - root_pitch));
            }
        }
    }

    // Scans for a voice to reuse. If `should_retrigger` and an active voice
    // already sounds this pitch, reuses it; otherwise prefers a free voice,
    // falling back to stealing the oldest active one. Ages every active
    // voice's timestamp on every call, which is what makes "oldest" mean
    // anything across repeated acquisitions.
    fn acquire_voice(&mut self, pitch: f64) -> usize {
        let mut voice_index: Option<usize> = None;
        let mut oldest_voice_index = 0usize;
        for i in 0..self.voice_count {
            if self.should_retrigger && self.voice_states[i].pitch == pitch && self.voice_states[i].voice.is_active() {
                voice_index = Some(i);
            }
            if self.voice_states[i].voice.is_active() {
                self.voice_states[i].timestamp += 1;
                if self.voice_states[i].timestamp > self.voice_states[oldest_voice_index].timestamp {
                    oldest_voice_index = i;
                }
            } else if voice_index.is_none() {
                voice_index = Some(i);
            }
        }
        voice_index.unwrap_or(oldest_voice_index)
    }

    fn refresh_active_voice_increments(&mut self) {
        for i in 0..self.voice_count {
            if self.voice_states[i].voice.is_active() {
                self.refresh_voice_increment(i);
            }
        }
    }

    fn refresh_voice_increment(&mut self, index: usize) {
        let state = &self.voice_states[index];
        let shifted_pitch = state.pitch + self.pitch_shift + state.pitch_shift;
        let increment = frequency_from_pitch(shifted_pitch, self.reference_frequency) * self.sample_interval;
        let speed = frequency_ratio_from_pitch(shifted_pitch - state.root_pitch);
        self.voice_states[index].oscillator_increment = increment;
        self.voice_states[index].voice.sample_player_mut().set_speed(speed);
    }
}

fn frequency_ratio_from_pitch(pitch: f64) -> f64 {
    2f64.powf(pitch)
}

fn frequency_from_pitch(pitch: f64, reference_frequency: f64) -> f64 {
    reference_frequency * frequency_ratio_from_pitch(pitch)
}

fn oscillator_shape_from(value: f32) -> OscillatorShape {
    match value as i32 {
        1 => OscillatorShape::Sine,
        2 => OscillatorShape::Saw,
        3 => OscillatorShape::Square,
        4 => OscillatorShape::Noise,
        _ => OscillatorShape::None,
    }
}

fn sample_playback_mode_from(value: f32) -> SamplePlaybackMode {
    match value as i32 {
        1 => SamplePlaybackMode::Once,
        2 => SamplePlaybackMode::Sustain,
        3 => SamplePlaybackMode::Loop,
        _ => SamplePlaybackMode::None,
    }
}

fn filter_type_from(value: f32) -> FilterType {
    match value as i32 {
        1 => FilterType::LowPass,
        2 => FilterType::HighPass,
        _ => FilterType::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{NoteControlSnapshot, message_queue};
    use crate::sample_data::SampleDataSlice;

    fn single_sample_processor() -> (InstrumentProcessor, crate::message::MessageProducer) {
        let (producer, consumer) = message_queue(16);
        let mut processor = InstrumentProcessor::new(4, 1.0, consumer, 1);
        processor.apply(Message::Control { control_type: ControlType::SamplePlaybackMode, value: 2.0 }); // Sustain
        processor.apply(Message::SampleData {
            data: SampleData::new(vec![SampleDataSlice::new(1.0, 4, vec![1.0, 2.0, 3.0, 4.0])]),
        });
        (processor, producer)
    }

    #[test]
    fn single_sample_note_matches_the_worked_example() {
        let (mut processor, mut producer) = single_sample_processor();
        producer.add(20, Message::NoteOn {
            pitch: 1.0,
            intensity: 0.5,
            controls: NoteControlSnapshot { pitch_shift: 0.0, gain: 1.0 },
        });
        let mut output = vec![0.0; 5];
        processor.process(&mut output, 20);
        let expected = [0.5, 1.0, 1.5, 2.0, 0.0];
        for (out, exp) in output.iter().zip(expected.iter()) {
            assert!((out - exp).abs() < 1e-9, "{output:?}");
        }
    }

    #[test]
    fn note_off_silences_a_sustain_voice() {
        let (mut processor, mut producer) = single_sample_processor();
        producer.add(20, Message::NoteOn {
            pitch: 1.0,
            intensity: 0.5,
            controls: NoteControlSnapshot::default(),
        });
        let mut output = vec![0.0; 5];
        processor.process(&mut output, 20);
        producer.add(25, Message::NoteOff { pitch: 1.0 });
        let mut output = vec![0.0; 5];
        processor.process(&mut output, 25);
        assert!(output.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn zero_voice_count_makes_note_on_silent() {
        let (mut processor, mut producer) = single_sample_processor();
        producer.add(0, Message::Control { control_type: ControlType::VoiceCount, value: 0.0 });
        producer.add(0, Message::NoteOn {
            pitch: 1.0,
            intensity: 1.0,
            controls: NoteControlSnapshot::default(),
        });
        let mut output = vec![0.0; 4];
        processor.process(&mut output, 0);
        assert!(output.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn voice_stealing_picks_the_oldest_active_voice_when_full() {
        let (_producer, consumer) = message_queue(64);
        let mut processor = InstrumentProcessor::new(48_000, 1.0, consumer, 1);
        processor.apply(Message::Control { control_type: ControlType::VoiceCount, value: 2.0 });
        processor.apply(Message::Control { control_type: ControlType::OscillatorShape, value: 1.0 }); // Sine
        processor.set_note_on(0.0, 1.0, 0.0);
        processor.set_note_on(1.0, 1.0, 0.0);
        // Both voices are now active; a third NoteOn must steal one rather than no-op.
        processor.set_note_on(2.0, 1.0, 0.0);
        let active_pitches: Vec<f64> =
            processor.voice_states[..2].iter().filter(|s| s.voice.is_active()).map(|s| s.pitch).collect();
        assert!(active_pitches.contains(&2.0));
    }

    #[test]
    fn retrigger_reuses_the_active_voice_of_the_same_pitch() {
        let (_producer, consumer) = message_queue(64);
        let mut processor = InstrumentProcessor::new(48_000, 1.0, consumer, 1);
        processor.apply(Message::Control { control_type: ControlType::Retrigger, value: 1.0 });
        processor.apply(Message::Control { control_type: ControlType::VoiceCount, value: 4.0 });
        processor.set_note_on(5.0, 1.0, 0.0);
        let first_index = processor.acquire_voice(5.0);
        processor.voice_states[first_index].timestamp = 99;
        processor.set_note_on(5.0, 1.0, 0.0);
        assert_eq!(processor.voice_states.iter().filter(|s| s.voice.is_active() && s.pitch == 5.0).count(), 1);
    }
}
