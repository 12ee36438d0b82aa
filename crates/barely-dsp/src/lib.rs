//! BarelyMusician DSP primitives.
//!
//! Stateless-per-sample building blocks shared by the audio-thread voice
//! pipeline in `barely-engine`: a one-pole low/high-pass filter, a
//! phase-driven ADSR envelope, a band-limited oscillator, and a mono sample
//! player. Every type here produces exactly one output sample per call and
//! performs no allocation, so the whole crate stays safe to call from the
//! audio thread.
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible for embedded synthesis targets (see
//! `barely-dsp = { default-features = false }`). Nothing in `barely-dsp`
//! needs an allocator; the `std` feature exists only so downstream crates
//! share one feature name across the workspace.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod envelope;
pub mod math;
pub mod one_pole;
pub mod oscillator;
pub mod sample_player;

pub use envelope::{Adsr, Envelope, EnvelopeState};
pub use math::{MIN_DECIBELS, amplitude_from_decibels, decibels_from_amplitude};
pub use one_pole::{FilterType, OnePoleFilter, filter_coefficient};
pub use oscillator::{Oscillator, OscillatorShape};
pub use sample_player::SamplePlayer;
