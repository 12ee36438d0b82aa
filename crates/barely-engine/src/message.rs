//! The sample-accurate, tagged message bridge between an instrument's
//! controller (main thread) and processor (audio thread).
//!
//! Grounded on `examples/original_source/src/engine/message_queue.h`'s
//! `Add`/`GetNext` ring (capacity 8192, drop-on-full, FIFO within one
//! producer) and `examples/rubyswolf-freqlab`'s use of the `ringbuf` crate
//! for exactly this kind of lock-free SPSC audio bridge — `barely-engine`
//! uses `ringbuf` rather than hand-rolling the atomic ring, since this
//! workspace denies `unsafe_code` and `ringbuf` already provides a sound,
//! allocation-free-at-steady-state SPSC implementation.

use crate::control::{ControlType, NoteControlType};
use crate::sample_data::SampleData;
use ringbuf::traits::{Consumer as _, Observer as _, Producer as _, Split as _};
use ringbuf::{HeapCons, HeapProd, HeapRb};

/// Default message queue capacity, matching the reference engine's
/// `kMaxMessageCount` (large enough that normal interactive use cannot
/// fill it).
pub const MESSAGE_QUEUE_CAPACITY: usize = 8192;

/// A snapshot of a note's controls at the moment it was turned on, carried
/// with the `NoteOn` message so the processor never has to reach back into
/// controller-owned state.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoteControlSnapshot {
    /// Per-note pitch shift, in octaves.
    pub pitch_shift: f32,
    /// Per-note gain multiplier, linear.
    pub gain: f32,
}

/// One tagged mutation flowing from the controller to the processor.
#[derive(Debug, Clone)]
pub enum Message {
    /// Update to an instrument-level control.
    Control { control_type: ControlType, value: f32 },
    /// Update to a per-note control.
    NoteControl { pitch: f64, note_control_type: NoteControlType, value: f32 },
    /// A new note has started sounding.
    NoteOn { pitch: f64, intensity: f32, controls: NoteControlSnapshot },
    /// A note has stopped sounding.
    NoteOff { pitch: f64 },
    /// The engine's reference frequency changed.
    ReferenceFrequency { frequency: f32 },
    /// Replacement sample data, moved into the processor on adoption.
    SampleData { data: SampleData },
}

/// `(update_sample, Message)`, the queue's element type.
pub type MessageSlot = (i64, Message);

/// The producer half of an instrument's message queue, owned by the
/// controller (main thread).
pub struct MessageProducer {
    inner: HeapProd<MessageSlot>,
}

impl MessageProducer {
    /// Enqueues `message` tagged with `update_sample`. Returns `false`
    /// (and drops the message) if the ring is full.
    pub fn add(&mut self, update_sample: i64, message: Message) -> bool {
        self.inner.try_push((update_sample, message)).is_ok()
    }
}

/// The consumer half of an instrument's message queue, owned by the
/// processor (audio thread).
pub struct MessageConsumer {
    inner: HeapCons<MessageSlot>,
}

impl MessageConsumer {
    /// Pops and returns the next message if its sample index is strictly
    /// less than `end_sample`; otherwise leaves the queue untouched and
    /// returns `None`.
    pub fn get_next(&mut self, end_sample: i64) -> Option<MessageSlot> {
        let ready = matches!(self.inner.try_peek(), Some((sample, _)) if *sample < end_sample);
        if ready { self.inner.try_pop() } else { None }
    }

    /// Whether the queue currently has no pending messages.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Creates a fresh message queue split into its producer and consumer
/// halves, to be handed to the controller and processor respectively.
pub fn message_queue(capacity: usize) -> (MessageProducer, MessageConsumer) {
    let ring = HeapRb::<MessageSlot>::new(capacity);
    let (producer, consumer) = ring.split();
    (MessageProducer { inner: producer }, MessageConsumer { inner: consumer })
}
