use serde::{Deserialize, Serialize};

pub const MIN_PITCH: i32 = 0;
pub const MAX_PITCH: i32 = 127;

const DEFAULT_MIN_SHIFT: i64 = 50;
const DEFAULT_MIN_DURATION: i64 = 50;

// Every struct here is read from `<degradation>__<kwarg>` JSON, so unknown keys are rejected
// rather than silently ignored.

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PitchShiftParams {
    pub min_pitch: i32,
    pub max_pitch: i32,
    /// Relative probabilities of each shift; index `len / 2` is the note's current pitch.
    pub distribution: Option<Vec<f64>>,
}

impl Default for PitchShiftParams {
    fn default() -> Self {
        Self {
            min_pitch: MIN_PITCH,
            max_pitch: MAX_PITCH,
            distribution: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct TimeShiftParams {
    pub min_shift: i64,
    pub max_shift: Option<i64>,
    pub align_onset: bool,
}

impl Default for TimeShiftParams {
    fn default() -> Self {
        Self {
            min_shift: DEFAULT_MIN_SHIFT,
            max_shift: None,
            align_onset: false,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct OnsetShiftParams {
    pub min_shift: i64,
    pub max_shift: Option<i64>,
    pub min_duration: i64,
    pub max_duration: Option<i64>,
    pub align_onset: bool,
    pub align_dur: bool,
}

impl Default for OnsetShiftParams {
    fn default() -> Self {
        Self {
            min_shift: DEFAULT_MIN_SHIFT,
            max_shift: None,
            min_duration: DEFAULT_MIN_DURATION,
            max_duration: None,
            align_onset: false,
            align_dur: false,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct OffsetShiftParams {
    pub min_shift: i64,
    pub max_shift: Option<i64>,
    pub min_duration: i64,
    pub max_duration: Option<i64>,
    pub align_dur: bool,
}

impl Default for OffsetShiftParams {
    fn default() -> Self {
        Self {
            min_shift: DEFAULT_MIN_SHIFT,
            max_shift: None,
            min_duration: DEFAULT_MIN_DURATION,
            max_duration: None,
            align_dur: false,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RemoveNoteParams {}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct AddNoteParams {
    pub min_pitch: i32,
    pub max_pitch: i32,
    pub min_duration: i64,
    pub max_duration: Option<i64>,
    pub align_pitch: bool,
    /// Draw onset and duration from values already present in the excerpt.
    pub align_time: bool,
}

impl Default for AddNoteParams {
    fn default() -> Self {
        Self {
            min_pitch: MIN_PITCH,
            max_pitch: MAX_PITCH,
            min_duration: DEFAULT_MIN_DURATION,
            max_duration: None,
            align_pitch: false,
            align_time: false,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SplitNoteParams {
    pub min_duration: i64,
    pub num_splits: usize,
}

impl Default for SplitNoteParams {
    fn default() -> Self {
        Self {
            min_duration: DEFAULT_MIN_DURATION,
            num_splits: 1,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct JoinNotesParams {
    pub max_gap: i64,
    pub max_notes: usize,
    pub only_first: bool,
}

impl Default for JoinNotesParams {
    fn default() -> Self {
        Self {
            max_gap: 50,
            max_notes: 20,
            only_first: false,
        }
    }
}

/// One parameter set per degradation, as configured for a whole dataset run.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DegradationParams {
    pub pitch_shift: PitchShiftParams,
    pub time_shift: TimeShiftParams,
    pub onset_shift: OnsetShiftParams,
    pub offset_shift: OffsetShiftParams,
    pub remove_note: RemoveNoteParams,
    pub add_note: AddNoteParams,
    pub split_note: SplitNoteParams,
    pub join_notes: JoinNotesParams,
}
