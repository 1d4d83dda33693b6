//! Offline FFT convolution reverb with a synthetic room.
//!
//! The impulse response is seeded decaying noise, so a given size always
//! yields the same tail. The whole dry buffer is convolved in one zero-padded
//! FFT pass (linear, not circular) and the result is cut back to the input
//! length.

use log::{trace, warn};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rustfft::FftPlanner;
use rustfft::num_complex::Complex32;

use crate::error::SynthError;

/// Longest impulse response, in samples.
pub const MAX_IMPULSE_LEN: usize = 50_000;

/// Decay reached at the last impulse tap (-60 dB).
const TAIL_FLOOR: f32 = 0.001;

#[derive(Debug, Clone)]
pub struct Convolver {
    impulse: Vec<f32>,
}

impl Convolver {
    /// Build a room of `size` samples, clamped to `1..=MAX_IMPULSE_LEN`.
    pub fn new(size: usize, seed: u64) -> Self {
        let len = size.clamp(1, MAX_IMPULSE_LEN);
        let mut rng = SmallRng::seed_from_u64(seed);
        let decay_rate = TAIL_FLOOR.ln() / len as f32;

        let mut impulse: Vec<f32> = (0..len)
            .map(|i| rng.random_range(-1.0f32..1.0) * (decay_rate * i as f32).exp())
            .collect();
        // No direct path: the dry signal is mixed separately.
        impulse[0] = 0.0;

        let energy: f32 = impulse.iter().map(|x| x * x).sum();
        if energy > 0.0 {
            let norm = energy.sqrt().recip();
            impulse.iter_mut().for_each(|x| *x *= norm);
        }
        Convolver { impulse }
    }

    pub fn impulse(&self) -> &[f32] {
        &self.impulse
    }

    /// Convolve `input` with the room; the output has the input's length.
    pub fn process(&self, input: &[f32]) -> Result<Vec<f32>, SynthError> {
        if input.is_empty() {
            warn!("reverb: empty input, nothing to convolve");
            return Ok(Vec::new());
        }

        let fft_len = (input.len() + self.impulse.len() - 1).next_power_of_two();
        trace!(
            "reverb: {} input samples, {} impulse taps, fft size {fft_len}",
            input.len(),
            self.impulse.len()
        );

        let mut signal = complex_buffer(fft_len, input)?;
        let mut room = complex_buffer(fft_len, &self.impulse)?;

        let mut planner = FftPlanner::<f32>::new();
        let forward = planner.plan_fft_forward(fft_len);
        let inverse = planner.plan_fft_inverse(fft_len);

        forward.process(&mut signal);
        forward.process(&mut room);
        for (s, r) in signal.iter_mut().zip(&room) {
            *s *= *r;
        }
        inverse.process(&mut signal);

        let scale = 1.0 / fft_len as f32;
        Ok(signal[..input.len()].iter().map(|c| c.re * scale).collect())
    }
}

// Zero-padded complex copy of `samples`.
fn complex_buffer(len: usize, samples: &[f32]) -> Result<Vec<Complex32>, SynthError> {
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(len).map_err(|_| SynthError::Allocation {
        samples: len,
        purpose: "reverb fft",
    })?;
    buffer.extend(samples.iter().map(|&x| Complex32::new(x, 0.0)));
    buffer.resize(len, Complex32::new(0.0, 0.0));
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    fn direct_convolution(input: &[f32], impulse: &[f32]) -> Vec<f32> {
        (0..input.len())
            .map(|n| {
                (0..impulse.len().min(n + 1))
                    .map(|k| impulse[k] * input[n - k])
                    .sum()
            })
            .collect()
    }

    #[test]
    fn impulse_has_unit_energy_and_no_direct_tap() {
        let conv = Convolver::new(2000, 7);
        let ir = conv.impulse();
        assert_eq!(ir.len(), 2000);
        assert_eq!(ir[0], 0.0);
        let energy: f32 = ir.iter().map(|x| x * x).sum();
        assert!(approx_eq!(f32, energy, 1.0, epsilon = 1e-4), "energy {energy}");
    }

    #[test]
    fn impulse_decays() {
        let conv = Convolver::new(10_000, 7);
        let ir = conv.impulse();
        let head: f32 = ir[1..1000].iter().map(|x| x.abs()).sum();
        let tail: f32 = ir[9000..].iter().map(|x| x.abs()).sum();
        assert!(tail < head * 0.01, "tail {tail} should be far below head {head}");
    }

    #[test]
    fn size_is_clamped() {
        assert_eq!(Convolver::new(0, 1).impulse().len(), 1);
        assert_eq!(Convolver::new(1_000_000, 1).impulse().len(), MAX_IMPULSE_LEN);
    }

    #[test]
    fn output_matches_direct_convolution() {
        let conv = Convolver::new(64, 3);
        let input: Vec<f32> = (0..300).map(|i| ((i as f32) * 0.37).sin()).collect();
        let fast = conv.process(&input).unwrap();
        let slow = direct_convolution(&input, conv.impulse());
        assert_eq!(fast.len(), input.len());
        for (i, (a, b)) in fast.iter().zip(&slow).enumerate() {
            assert!(approx_eq!(f32, *a, *b, epsilon = 1e-3), "sample {i}: fft {a} vs direct {b}");
        }
    }

    #[test]
    fn seeded_room_is_deterministic() {
        let input = [1.0, 0.5, -0.25, 0.0, 0.0];
        let a = Convolver::new(32, 9).process(&input).unwrap();
        let b = Convolver::new(32, 9).process(&input).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert!(Convolver::new(100, 1).process(&[]).unwrap().is_empty());
    }
}
