//! Immutable, root-pitch-sortable sample slice collection.
//!
//! Grounded on `examples/original_source/src/dsp/sample_data.cpp`'s
//! `Select()`: slices are scanned in ascending `root_pitch` order, grouped
//! by equal root pitch, and the group nearest the target pitch is chosen
//! (ties broken uniformly at random via [`crate::rng::AudioRng`]). The scan
//! requires ascending order to find groups correctly, so [`SampleData::new`]
//! sorts once at construction rather than assuming anything about the order
//! the caller supplied its slices in.

use crate::rng::AudioRng;

/// One mono sample buffer plus the pitch it plays back at unit speed and
/// the rate it was recorded at.
#[derive(Debug, Clone)]
pub struct SampleDataSlice {
    root_pitch: f64,
    frequency: i32,
    samples: Vec<f32>,
}

impl SampleDataSlice {
    /// Creates a slice from owned sample data.
    pub fn new(root_pitch: f64, frequency: i32, samples: Vec<f32>) -> Self {
        Self { root_pitch, frequency, samples }
    }

    /// The pitch, in octaves, at which this slice plays back at unit speed.
    pub fn root_pitch(&self) -> f64 {
        self.root_pitch
    }

    /// The native sampling rate of this slice's audio data.
    pub fn frequency(&self) -> i32 {
        self.frequency
    }

    /// The raw mono sample data, for feeding a
    /// [`barely_dsp::SamplePlayer::next`] call.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }
}

/// An immutable, owned collection of [`SampleDataSlice`]s supporting
/// nearest-root-pitch selection.
#[derive(Debug, Clone, Default)]
pub struct SampleData {
    slices: Vec<SampleDataSlice>,
}

impl SampleData {
    /// Creates a sample data view, sorted ascending by root pitch so that
    /// [`SampleData::select`]'s group-scan is correct regardless of the
    /// order the caller supplied slices in.
    pub fn new(mut slices: Vec<SampleDataSlice>) -> Self {
        slices.sort_by(|a, b| a.root_pitch.total_cmp(&b.root_pitch));
        Self { slices }
    }

    /// Whether this view has no slices at all.
    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    /// Selects the slice whose root pitch is nearest `pitch`, breaking ties
    /// uniformly at random among the nearest group via `rng`. Returns
    /// `None` for an empty view.
    pub fn select(&self, pitch: f64, rng: &mut AudioRng) -> Option<&SampleDataSlice> {
        self.select_index(pitch, rng).map(|index| &self.slices[index])
    }

    /// Like [`SampleData::select`], but returns the chosen slice's index
    /// instead of a borrow, so a voice can remember which slice it is
    /// playing and re-resolve it (via [`SampleData::get`]) on every
    /// process call instead of holding a long-lived reference into a
    /// [`SampleData`] that may be swapped out from under it.
    pub fn select_index(&self, pitch: f64, rng: &mut AudioRng) -> Option<usize> {
        if self.slices.is_empty() {
            return None;
        }
        let slice_count = self.slices.len();
        let mut current_pitch = self.slices[0].root_pitch;
        let mut current_start_index = 0usize;
        let mut i = 0usize;
        while i < slice_count {
            let candidate_pitch = self.slices[i].root_pitch;
            if current_pitch != candidate_pitch {
                if pitch <= candidate_pitch {
                    if pitch - current_pitch > candidate_pitch - pitch {
                        current_start_index = i;
                        while i < slice_count && self.slices[i].root_pitch == candidate_pitch {
                            i += 1;
                        }
                    }
                    return Some(Self::pick(current_start_index, i, rng));
                }
                current_pitch = candidate_pitch;
                current_start_index = i;
            }
            i += 1;
        }
        Some(Self::pick(current_start_index, slice_count, rng))
    }

    /// Borrows the slice at `index`, as previously returned by
    /// [`SampleData::select_index`]. Panics if `index` is out of bounds
    /// for this view (callers only ever pass back indices this same
    /// [`SampleData`] handed out).
    pub fn get(&self, index: usize) -> &SampleDataSlice {
        &self.slices[index]
    }

    fn pick(start: usize, end: usize, rng: &mut AudioRng) -> usize {
        if start + 1 == end {
            start
        } else {
            rng.generate_range(start as u32, end as u32) as usize
        }
    }
}
