//! Barely Engine — a real-time music composition and synthesis engine.
//!
//! Every audible mutation flows one way, from the main thread to the audio
//! thread: a caller builds an [`Engine`], creates [`Instrument`]s and
//! [`Performer`]s on it, and hands each instrument's paired
//! [`InstrumentProcessor`] to whatever owns the audio callback. The audio
//! thread only ever calls [`InstrumentProcessor::process`]; it never
//! allocates, blocks, or logs.
//!
//! # Example
//!
//! ```
//! use barely_engine::{ControlType, Engine};
//!
//! let mut engine = Engine::new(48_000).unwrap();
//! let (instrument_id, mut processor) = engine.create_instrument();
//! let instrument = engine.instrument_mut(instrument_id).unwrap();
//! instrument.set_control(ControlType::Gain, -6.0);
//! instrument.set_note_on(0.0, 1.0);
//!
//! let mut output = vec![0.0f64; 256];
//! processor.process(&mut output, 0);
//! ```
//!
//! # Musical time
//!
//! [`Performer`]s schedule tasks against a beat position that
//! [`Engine::update`] advances according to [`Engine::tempo`]; instruments
//! only ever see sample indices, never beats — the engine is what converts
//! between the two.
//!
//! # Logging
//!
//! Main-thread-only diagnostics (queue-full drops, construction errors) are
//! emitted through [`tracing`]; the audio thread never logs.

#![warn(missing_docs)]

pub mod control;
pub mod engine;
pub mod error;
pub mod gain;
pub mod instrument;
pub mod instrument_processor;
pub mod message;
pub mod performer;
pub mod rng;
pub mod sample_data;
pub mod voice;

pub use control::{Control, ControlArray, ControlType, NoteControlArray, NoteControlType};
pub use engine::{Engine, InstrumentId, PerformerId};
pub use error::EngineError;
pub use gain::GainProcessor;
pub use instrument::{Instrument, NoteOffCallback, NoteOnCallback};
pub use instrument_processor::InstrumentProcessor;
pub use message::{Message, MessageConsumer, MessageProducer, NoteControlSnapshot, message_queue};
pub use performer::{Performer, TaskId, TaskState};
pub use rng::{AudioRng, MainRng};
pub use sample_data::{SampleData, SampleDataSlice};
pub use voice::{SamplePlaybackMode, Voice};
