//! Construction-time error type.
//!
//! Per-call control/note mutations keep a clamp-and-continue, boolean-return
//! contract and are never wrapped in [`EngineError`]. This enum only covers
//! failures that have no sensible "clamp and carry on" behavior.

use thiserror::Error;

/// Fallible construction-time errors for [`crate::engine::Engine`] and
/// instrument creation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    /// `Engine::new` was given a non-positive sample rate.
    #[error("sample rate must be positive, got {0}")]
    InvalidSampleRate(i32),
    /// Instrument creation was given an out-of-range voice count.
    #[error("voice count must be in 1..=32, got {0}")]
    InvalidVoiceCount(i32),
}
