//! DSP primitives for the offline synth renders.
//!
//! Everything here is deterministic: noise sources are seeded and all state
//! is created fresh per render, so the same parameters always produce the
//! same sample buffer.

pub mod convolver;
pub mod echo;
pub mod envelope;
pub mod filter;
pub mod fm;
pub mod oscillator;
pub mod renderer;

use crate::error::SynthError;

/// Allocate `len` zeroed samples, reporting failure instead of aborting.
pub(crate) fn zeroed_buffer(len: usize, purpose: &'static str) -> Result<Vec<f32>, SynthError> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| SynthError::Allocation { samples: len, purpose })?;
    buffer.resize(len, 0.0);
    Ok(buffer)
}
