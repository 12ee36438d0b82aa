//! Mono sample playback with a fractional-rate cursor.
//!
//! Nearest-neighbor (no interpolation) cursor that advances by
//! `speed * data_frequency * sample_interval` per output sample, looping
//! via `fmod` when asked.
//!
//! [`SamplePlayer`] only remembers the active slice's *metadata* (native
//! frequency, length) rather than a pointer or reference into the buffer,
//! and takes the backing sample data as a borrowed argument to
//! [`SamplePlayer::next`]. A voice pool that keeps many players alongside a
//! swappable sample-data table would otherwise have to self-reference its
//! own data; this keeps `Voice` and `SamplePlayer` ordinary, `Copy` value
//! types — the caller (the instrument processor) resolves "which buffer is
//! this voice's active slice" once per process call instead of pinning a
//! long-lived borrow.

/// Cursor-based mono sample player.
#[derive(Debug, Clone, Copy)]
pub struct SamplePlayer {
    sample_interval: f64,
    active: bool,
    length: f64,
    frequency: f64,
    speed: f64,
    cursor: f64,
    increment: f64,
}

impl SamplePlayer {
    /// Creates a player with no data loaded.
    pub fn new(sample_rate: i32) -> Self {
        Self {
            sample_interval: if sample_rate > 0 {
                1.0 / f64::from(sample_rate)
            } else {
                0.0
            },
            active: false,
            length: 0.0,
            frequency: 0.0,
            speed: 1.0,
            cursor: 0.0,
            increment: 0.0,
        }
    }

    /// Whether there is data loaded and the cursor has not run past its end.
    pub fn is_active(&self) -> bool {
        self.active && self.cursor < self.length
    }

    /// Produces the next output sample by indexing `samples` at the
    /// current cursor, then advances the cursor. `samples` must be the
    /// same length last passed to [`SamplePlayer::set_data`]; passing a
    /// shorter buffer degrades to silence rather than panicking. When
    /// `loop_` is `true` and the cursor runs past the end, it wraps via
    /// `cursor mod length` instead of going inactive.
    #[inline]
    pub fn next(&mut self, samples: &[f32], loop_: bool) -> f32 {
        if !self.is_active() {
            return 0.0;
        }
        let index = self.cursor as usize;
        let output = samples.get(index).copied().unwrap_or(0.0);
        self.cursor += self.increment;
        if self.cursor >= self.length && loop_ {
            self.cursor = if self.length > 0.0 { self.cursor % self.length } else { 0.0 };
        }
        output
    }

    /// Resets the playback cursor to the start of the data.
    pub fn reset(&mut self) {
        self.cursor = 0.0;
    }

    /// Loads new sample metadata (native frequency and sample count),
    /// replacing whatever was previously playing.
    pub fn set_data(&mut self, frequency: i32, length: usize) {
        self.active = true;
        self.length = length as f64;
        self.frequency = f64::from(frequency.max(0));
        self.recalculate_increment();
    }

    /// Clears any active data; subsequent `next` calls return silence.
    pub fn clear_data(&mut self) {
        self.active = false;
        self.length = 0.0;
        self.frequency = 0.0;
        self.recalculate_increment();
    }

    /// Sets playback speed (clamped to non-negative).
    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed.max(0.0);
        self.recalculate_increment();
    }

    fn recalculate_increment(&mut self) {
        self.increment = self.speed * self.frequency * self.sample_interval;
    }
}
