//! Clamped control values shared between the instrument controller and
//! whatever the caller exposes as a public parameter surface.
//!
//! A clamping `value`/`min`/`max` triple that reports whether `set` actually
//! changed anything, plus the fixed `ControlType`/`NoteControlType` ordinal
//! lists every message on the wire is indexed by.

/// Instrument-level control identifiers. Ordinal order is part of this
/// crate's ABI contract and must not be reordered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ControlType {
    /// Output gain, in decibels.
    Gain = 0,
    /// Number of simultaneous voices (1..=32).
    VoiceCount = 1,
    /// Oscillator waveform, stored as an [`crate::OscillatorShape`] ordinal.
    OscillatorShape = 2,
    /// Sample playback mode, stored as a [`SamplePlaybackMode`] ordinal.
    SamplePlaybackMode = 3,
    /// Envelope attack time, in seconds.
    Attack = 4,
    /// Envelope decay time, in seconds.
    Decay = 5,
    /// Envelope sustain level, in `[0, 1]`.
    Sustain = 6,
    /// Envelope release time, in seconds.
    Release = 7,
    /// Instrument-wide pitch shift, in octaves.
    PitchShift = 8,
    /// Whether a `NoteOn` for an already-ringing pitch retriggers its voice.
    Retrigger = 9,
    /// Voice filter type, stored as a [`crate::FilterType`] ordinal.
    FilterType = 10,
    /// Voice filter cutoff frequency, in hertz.
    FilterFrequency = 11,
}

/// Total number of [`ControlType`] variants.
pub const CONTROL_TYPE_COUNT: usize = 12;

impl ControlType {
    /// All control types in ordinal order.
    pub const ALL: [ControlType; CONTROL_TYPE_COUNT] = [
        ControlType::Gain,
        ControlType::VoiceCount,
        ControlType::OscillatorShape,
        ControlType::SamplePlaybackMode,
        ControlType::Attack,
        ControlType::Decay,
        ControlType::Sustain,
        ControlType::Release,
        ControlType::PitchShift,
        ControlType::Retrigger,
        ControlType::FilterType,
        ControlType::FilterFrequency,
    ];

    fn index(self) -> usize {
        self as usize
    }

    fn default_min_max(self) -> (f32, f32, f32) {
        match self {
            ControlType::Gain => (0.0, -80.0, 24.0),
            ControlType::VoiceCount => (8.0, 1.0, 32.0),
            ControlType::OscillatorShape => (0.0, 0.0, 4.0),
            ControlType::SamplePlaybackMode => (0.0, 0.0, 3.0),
            ControlType::Attack => (0.05, 0.0, 60.0),
            ControlType::Decay => (0.0, 0.0, 60.0),
            ControlType::Sustain => (1.0, 0.0, 1.0),
            ControlType::Release => (0.0, 0.0, 60.0),
            ControlType::PitchShift => (0.0, -99.0, 99.0),
            ControlType::Retrigger => (0.0, 0.0, 1.0),
            ControlType::FilterType => (0.0, 0.0, 2.0),
            ControlType::FilterFrequency => (0.0, 0.0, 48_000.0),
        }
    }
}

/// Per-note control identifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NoteControlType {
    /// Per-note pitch shift, in octaves, added to the voice's base pitch.
    PitchShift = 0,
    /// Per-note gain multiplier, linear.
    Gain = 1,
}

/// Total number of [`NoteControlType`] variants.
pub const NOTE_CONTROL_TYPE_COUNT: usize = 2;

impl NoteControlType {
    /// All note control types in ordinal order.
    pub const ALL: [NoteControlType; NOTE_CONTROL_TYPE_COUNT] =
        [NoteControlType::PitchShift, NoteControlType::Gain];

    fn index(self) -> usize {
        self as usize
    }

    fn default_min_max(self) -> (f32, f32, f32) {
        match self {
            NoteControlType::PitchShift => (0.0, -99.0, 99.0),
            NoteControlType::Gain => (1.0, 0.0, 1.0),
        }
    }
}

/// A single clamped control value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Control {
    value: f32,
    min_value: f32,
    max_value: f32,
}

impl Control {
    fn new(default_value: f32, min_value: f32, max_value: f32) -> Self {
        debug_assert!(default_value >= min_value && default_value <= max_value);
        Self { value: default_value, min_value, max_value }
    }

    /// Current value.
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Minimum permitted value.
    pub fn min_value(&self) -> f32 {
        self.min_value
    }

    /// Maximum permitted value.
    pub fn max_value(&self) -> f32 {
        self.max_value
    }

    /// Clamps `new_value` into range and stores it. Returns whether the
    /// stored value changed.
    pub fn set_value(&mut self, new_value: f32) -> bool {
        let clamped = new_value.clamp(self.min_value, self.max_value);
        if clamped != self.value {
            self.value = clamped;
            true
        } else {
            false
        }
    }
}

/// A fixed set of one [`Control`] per [`ControlType`].
#[derive(Debug, Clone, Copy)]
pub struct ControlArray {
    controls: [Control; CONTROL_TYPE_COUNT],
}

impl Default for ControlArray {
    fn default() -> Self {
        let mut controls = [Control::new(0.0, 0.0, 0.0); CONTROL_TYPE_COUNT];
        for control_type in ControlType::ALL {
            let (default_value, min, max) = control_type.default_min_max();
            controls[control_type.index()] = Control::new(default_value, min, max);
        }
        Self { controls }
    }
}

impl ControlArray {
    /// Creates a control array at every control's default value.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a control's current value.
    pub fn get(&self, control_type: ControlType) -> f32 {
        self.controls[control_type.index()].value()
    }

    /// Reads the full [`Control`] (value/min/max) for a type.
    pub fn control(&self, control_type: ControlType) -> Control {
        self.controls[control_type.index()]
    }

    /// Clamps and stores `value` for `control_type`. Returns whether the
    /// value changed.
    pub fn set(&mut self, control_type: ControlType, value: f32) -> bool {
        self.controls[control_type.index()].set_value(value)
    }
}

/// A fixed set of one [`Control`] per [`NoteControlType`], attached to a
/// single sounding note.
#[derive(Debug, Clone, Copy)]
pub struct NoteControlArray {
    controls: [Control; NOTE_CONTROL_TYPE_COUNT],
}

impl Default for NoteControlArray {
    fn default() -> Self {
        let mut controls = [Control::new(0.0, 0.0, 0.0); NOTE_CONTROL_TYPE_COUNT];
        for note_control_type in NoteControlType::ALL {
            let (default_value, min, max) = note_control_type.default_min_max();
            controls[note_control_type.index()] = Control::new(default_value, min, max);
        }
        Self { controls }
    }
}

impl NoteControlArray {
    /// Creates a note control array at every control's default value.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a note control's current value.
    pub fn get(&self, note_control_type: NoteControlType) -> f32 {
        self.controls[note_control_type.index()].value()
    }

    /// Clamps and stores `value` for `note_control_type`. Returns whether
    /// the value changed.
    pub fn set(&mut self, note_control_type: NoteControlType, value: f32) -> bool {
        self.controls[note_control_type.index()].set_value(value)
    }
}
