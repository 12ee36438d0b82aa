//! Main-thread half of an instrument: validates controls, tracks which
//! notes are on, and enqueues messages for its [`crate::instrument_processor::InstrumentProcessor`].
//!
//! Controller and processor are two physically separate types connected by
//! [`crate::message`]'s producer/consumer halves, rather than two aspects of
//! one struct relying on thread discipline alone to keep them apart — so
//! the type system (not just convention) keeps audio-thread state away
//! from the main thread.

use crate::control::{ControlArray, ControlType, NoteControlArray, NoteControlType};
use crate::message::{Message, MessageProducer, NoteControlSnapshot};
use barely_dsp::{amplitude_from_decibels, filter_coefficient};
use std::collections::BTreeMap;

/// Fired on the main thread when a note starts sounding.
pub type NoteOnCallback = Box<dyn FnMut(f64, f32)>;
/// Fired on the main thread when a note stops sounding.
pub type NoteOffCallback = Box<dyn FnMut(f64)>;

/// Controller side of an instrument: the object a caller creates, configures,
/// and plays notes on. Never touches audio-thread state directly; every
/// audible mutation is converted to a [`Message`] and handed to the paired
/// [`crate::instrument_processor::InstrumentProcessor`].
pub struct Instrument {
    sample_rate: i32,
    controls: ControlArray,
    note_controls: BTreeMap<u64, NoteControlArray>,
    producer: MessageProducer,
    update_sample: i64,
    note_on_callback: Option<NoteOnCallback>,
    note_off_callback: Option<NoteOffCallback>,
}

impl Instrument {
    /// Creates a controller wired to `producer`, queuing every control's
    /// default value at sample `update_sample` so its paired processor
    /// starts in the same state as a freshly defaulted [`ControlArray`].
    pub fn new(sample_rate: i32, producer: MessageProducer, update_sample: i64) -> Self {
        let mut instrument = Self {
            sample_rate,
            controls: ControlArray::new(),
            note_controls: BTreeMap::new(),
            producer,
            update_sample,
            note_on_callback: None,
            note_off_callback: None,
        };
        for control_type in ControlType::ALL {
            let value = instrument.controls.get(control_type);
            let message = instrument.control_message(control_type, value);
            instrument.producer.add(update_sample, message);
        }
        instrument
    }

    /// Reads a control's current (clamped) value.
    pub fn control(&self, control_type: ControlType) -> f32 {
        self.controls.get(control_type)
    }

    /// Reads a note control's current value, or `None` if `pitch` is off.
    pub fn note_control(&self, pitch: f64, note_control_type: NoteControlType) -> Option<f32> {
        self.note_controls.get(&pitch.to_bits()).map(|controls| controls.get(note_control_type))
    }

    /// Whether `pitch` is currently on.
    pub fn is_note_on(&self, pitch: f64) -> bool {
        self.note_controls.contains_key(&pitch.to_bits())
    }

    /// Clamps and stores `value` for `control_type`; if the clamped value
    /// changed, queues the update for the processor. Returns `false` only
    /// if the queue was full (the local value is still updated).
    pub fn set_control(&mut self, control_type: ControlType, value: f32) -> bool {
        if !self.controls.set(control_type, value) {
            return true;
        }
        let clamped = self.controls.get(control_type);
        if clamped != value {
            tracing::warn!(?control_type, requested = value, clamped, "control value clamped to range");
        }
        let message = self.control_message(control_type, clamped);
        let queued = self.producer.add(self.update_sample, message);
        if !queued {
            tracing::warn!(?control_type, "message queue full, dropping control update");
        }
        queued
    }

    /// Clamps and stores a per-note control; a no-op if `pitch` is off.
    pub fn set_note_control(&mut self, pitch: f64, note_control_type: NoteControlType, value: f32) -> bool {
        let Some(note_controls) = self.note_controls.get_mut(&pitch.to_bits()) else {
            return true;
        };
        if !note_controls.set(note_control_type, value) {
            return true;
        }
        let clamped = note_controls.get(note_control_type);
        if clamped != value {
            tracing::warn!(?note_control_type, pitch, requested = value, clamped, "note control value clamped to range");
        }
        let queued = self.producer.add(self.update_sample, Message::NoteControl { pitch, note_control_type, value: clamped });
        if !queued {
            tracing::warn!(?note_control_type, pitch, "message queue full, dropping note control update");
        }
        queued
    }

    /// Turns a note on. A no-op (returning `true`) if `pitch` is already on
    /// — retriggering an already-ringing pitch is the
    /// [`ControlType::Retrigger`] control's concern, which only applies
    /// once a voice has actually gone through `SetNoteOff`.
    pub fn set_note_on(&mut self, pitch: f64, intensity: f32) -> bool {
        if self.note_controls.contains_key(&pitch.to_bits()) {
            return true;
        }
        self.note_controls.insert(pitch.to_bits(), NoteControlArray::new());
        if let Some(callback) = &mut self.note_on_callback {
            callback(pitch, intensity);
        }
        let controls = self.note_controls[&pitch.to_bits()];
        let snapshot = NoteControlSnapshot {
            pitch_shift: controls.get(NoteControlType::PitchShift),
            gain: controls.get(NoteControlType::Gain),
        };
        let queued = self.producer.add(self.update_sample, Message::NoteOn { pitch, intensity, controls: snapshot });
        if !queued {
            tracing::warn!(pitch, "message queue full, dropping note-on");
        }
        queued
    }

    /// Turns a note off. A no-op (returning `true`) if `pitch` is not on.
    pub fn set_note_off(&mut self, pitch: f64) -> bool {
        if self.note_controls.remove(&pitch.to_bits()).is_none() {
            return true;
        }
        if let Some(callback) = &mut self.note_off_callback {
            callback(pitch);
        }
        let queued = self.producer.add(self.update_sample, Message::NoteOff { pitch });
        if !queued {
            tracing::warn!(pitch, "message queue full, dropping note-off");
        }
        queued
    }

    /// Turns every currently-on note off.
    pub fn set_all_notes_off(&mut self) {
        for pitch_bits in std::mem::take(&mut self.note_controls).into_keys() {
            let pitch = f64::from_bits(pitch_bits);
            if let Some(callback) = &mut self.note_off_callback {
                callback(pitch);
            }
            if !self.producer.add(self.update_sample, Message::NoteOff { pitch }) {
                tracing::warn!(pitch, "message queue full, dropping note-off");
            }
        }
    }

    /// Sets the callback fired synchronously (on this thread) whenever a
    /// note turns on.
    pub fn set_note_on_callback(&mut self, callback: Option<NoteOnCallback>) {
        self.note_on_callback = callback;
    }

    /// Sets the callback fired synchronously (on this thread) whenever a
    /// note turns off.
    pub fn set_note_off_callback(&mut self, callback: Option<NoteOffCallback>) {
        self.note_off_callback = callback;
    }

    /// Queues a reference frequency change for the processor.
    pub fn set_reference_frequency(&mut self, reference_frequency: f32) -> bool {
        let queued =
            self.producer.add(self.update_sample, Message::ReferenceFrequency { frequency: reference_frequency });
        if !queued {
            tracing::warn!("message queue full, dropping reference frequency update");
        }
        queued
    }

    /// Queues replacement sample data for the processor to adopt.
    pub fn set_sample_data(&mut self, sample_data: crate::sample_data::SampleData) -> bool {
        let queued = self.producer.add(self.update_sample, Message::SampleData { data: sample_data });
        if !queued {
            tracing::warn!("message queue full, dropping sample data update");
        }
        queued
    }

    /// Advances this instrument's notion of "now" in samples. Called by the
    /// owning [`crate::engine::Engine`] on every `Update`; touches only
    /// controller-side state.
    pub fn set_update_sample(&mut self, update_sample: i64) {
        debug_assert!(update_sample >= self.update_sample);
        self.update_sample = update_sample;
    }

    fn control_message(&self, control_type: ControlType, value: f32) -> Message {
        let value = match control_type {
            ControlType::Gain => amplitude_from_decibels(value),
            ControlType::FilterFrequency => filter_coefficient(self.sample_rate, value),
            _ => value,
        };
        Message::Control { control_type, value }
    }
}

impl Drop for Instrument {
    fn drop(&mut self) {
        self.set_all_notes_off();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::message_queue;

    fn instrument() -> (Instrument, crate::message::MessageConsumer) {
        let (producer, consumer) = message_queue(64);
        (Instrument::new(48_000, producer, 0), consumer)
    }

    #[test]
    fn construction_queues_every_control_default() {
        let (_instrument, mut consumer) = instrument();
        let mut count = 0;
        while consumer.get_next(1).is_some() {
            count += 1;
        }
        assert_eq!(count, crate::control::CONTROL_TYPE_COUNT);
    }

    #[test]
    fn note_on_then_off_round_trips_is_note_on() {
        let (mut instrument, _consumer) = instrument();
        assert!(!instrument.is_note_on(1.0));
        instrument.set_note_on(1.0, 0.8);
        assert!(instrument.is_note_on(1.0));
        instrument.set_note_off(1.0);
        assert!(!instrument.is_note_on(1.0));
    }

    #[test]
    fn duplicate_note_on_is_a_no_op() {
        let (mut instrument, mut consumer) = instrument();
        while consumer.get_next(1).is_some() {}
        instrument.set_note_on(2.0, 1.0);
        let mut messages_after_first = 0;
        while consumer.get_next(1).is_some() {
            messages_after_first += 1;
        }
        instrument.set_note_on(2.0, 1.0);
        assert!(consumer.get_next(1).is_none());
        assert!(messages_after_first > 0);
    }

    #[test]
    fn set_control_clamps_and_round_trips() {
        let (mut instrument, _consumer) = instrument();
        instrument.set_control(ControlType::Gain, 1000.0);
        assert_eq!(instrument.control(ControlType::Gain), 24.0);
    }

    #[test]
    fn note_off_for_an_unknown_pitch_is_a_no_op() {
        let (mut instrument, mut consumer) = instrument();
        while consumer.get_next(1).is_some() {}
        assert!(instrument.set_note_off(9.0));
        assert!(consumer.get_next(1).is_none());
    }

    #[test]
    fn dropping_the_instrument_turns_every_note_off() {
        let (producer, mut consumer) = message_queue(64);
        let mut instrument = Instrument::new(48_000, producer, 0);
        while consumer.get_next(1).is_some() {}
        instrument.set_note_on(3.0, 1.0);
        while consumer.get_next(1).is_some() {}
        drop(instrument);
        let mut saw_note_off = false;
        while let Some((_, message)) = consumer.get_next(1) {
            if matches!(message, Message::NoteOff { pitch } if pitch == 3.0) {
                saw_note_off = true;
            }
        }
        assert!(saw_note_off);
    }

    #[test]
    fn gain_control_message_carries_amplitude_not_decibels() {
        let (mut instrument, mut consumer) = instrument();
        while consumer.get_next(1).is_some() {}
        instrument.set_control(ControlType::Gain, 0.0);
        let (_, message) = consumer.get_next(1).unwrap();
        match message {
            Message::Control { control_type: ControlType::Gain, value } => {
                assert!((value - 1.0).abs() < 1e-6);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }
}
