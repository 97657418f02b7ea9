use thiserror::Error;

/// Hard failures raised while turning raw tabular input into a [`NoteTable`](crate::NoteTable).
///
/// These are distinct from an infeasible degradation, which is an expected outcome and is
/// reported through [`Outcome::Infeasible`](crate::Outcome::Infeasible) instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchemaError {
    #[error("note table is missing the required column '{0}'")]
    MissingColumn(&'static str),

    #[error("track value '{value}' in row {row} is not numeric")]
    NonNumericTrack { row: usize, value: String },

    #[error("note {index} overlaps another note on track {track}")]
    Overlap { index: usize, track: u32 },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SampleError {
    #[error("cannot sample from an empty set of ranges")]
    NoRanges,

    #[error("ranges have a total length of {0}, which is not positive")]
    EmptyRanges(f64),

    #[error("expected {expected} range weights but got {actual}")]
    WeightCount { expected: usize, actual: usize },

    #[error("range weights must be finite, non-negative and not all zero")]
    InvalidWeights,

    #[error("split_range_sample tried to return a value outside of any range")]
    OutsideRanges,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown degradation '{name}', expected one of: {valid}")]
pub struct UnknownDegradation {
    pub name: String,
    pub valid: String,
}

/// Invalid dataset-generation settings, caught before any excerpt is processed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("expected {expected} relative probabilities (one per degradation) but got {actual}")]
    DistributionLength { expected: usize, actual: usize },

    #[error("relative probabilities must be finite, non-negative and not all zero")]
    InvalidDistribution,

    #[error("clean proportion must lie in [0, 1], got {0}")]
    CleanProportion(f64),

    #[error("no labels left to sample: every degradation has probability 0 and no clean excerpts are wanted")]
    NoLabels,

    #[error("split proportions must be finite, non-negative and not all zero")]
    InvalidSplits,

    #[error("degradation keyword '{0}' must be of the form <degradation>__<kwarg>")]
    KwargKey(String),

    #[error("degradation keywords must be a JSON object")]
    KwargObject,

    #[error("give either --degradation-kwargs or --degradation-kwarg-json, not both")]
    ConflictingKwargs,
}
