use thiserror::Error;

use crate::params::SynthId;

#[derive(Debug, Error)]
pub enum SynthError {
    #[error("Preset error: {0}")]
    Preset(#[from] PresetError),
    #[error("{synth:?} has no parameter {index} (it has {count})")]
    UnknownParameter {
        synth: SynthId,
        index: usize,
        count: usize,
    },
    /// A temporary render buffer could not be allocated. The render is
    /// abandoned before the target sample is touched.
    #[error("Could not allocate {samples} samples for {purpose}")]
    Allocation {
        samples: usize,
        purpose: &'static str,
    },
    #[error("Preset document error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PresetError {
    #[error("Empty preset")]
    Empty,
    #[error("Unprintable char {ch:?} at pos {pos}")]
    UnprintableChar { ch: char, pos: usize },
    #[error("{synth:?} takes {max} values, preset has {count}")]
    TooManyValues {
        synth: SynthId,
        count: usize,
        max: usize,
    },
}
