//! Carrier/modulator oscillators. Sawtooth and square are PolyBLEP-corrected.

use std::f64::consts::PI;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Supported waveform shapes, in slider order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Zero,
    Sine,
    Square,
    Sawtooth,
    Triangle,
    Noise,
}

impl Waveform {
    /// Shape slider value to waveform. Unknown values fall back to sine.
    pub fn from_value(value: f32) -> Self {
        match value as i64 {
            0 => Waveform::Zero,
            1 => Waveform::Sine,
            2 => Waveform::Square,
            3 => Waveform::Sawtooth,
            4 => Waveform::Triangle,
            5 => Waveform::Noise,
            _ => Waveform::Sine,
        }
    }
}

/// Seeded uniform white noise in `[-1, 1)`.
#[derive(Debug, Clone)]
pub struct Noise {
    rng: SmallRng,
}

impl Noise {
    pub fn new(seed: u64) -> Self {
        Noise {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn next_sample(&mut self) -> f64 {
        self.rng.random_range(-1.0..1.0)
    }
}

/// Phase-accumulating oscillator. The shape is chosen per call so the same
/// state can be driven by whatever the instrument controls select.
#[derive(Debug, Clone)]
pub struct Oscillator {
    pub frequency: f64,
    /// Phase in cycles, `[0, 1)`.
    phase: f64,
    sample_rate: f64,
}

impl Oscillator {
    pub fn new(sample_rate: f64) -> Self {
        Oscillator {
            frequency: 0.0,
            phase: 0.0,
            sample_rate,
        }
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn set_phase(&mut self, phase: f64) {
        self.phase = phase.rem_euclid(1.0);
    }

    /// Phase increment per sample at the current frequency.
    fn phase_inc(&self) -> f64 {
        self.frequency / self.sample_rate
    }

    /// Evaluate `waveform` at the current phase shifted by `phase_offset`
    /// cycles, then advance. Negative frequencies run the phase backwards.
    pub fn next_sample(&mut self, waveform: Waveform, phase_offset: f64, noise: &mut Noise) -> f64 {
        let inc = self.phase_inc();
        let t = (self.phase + phase_offset).rem_euclid(1.0);
        let dt = inc.abs();
        let sample = match waveform {
            Waveform::Zero => 0.0,
            Waveform::Sine => (2.0 * PI * t).sin(),
            Waveform::Square => square(t, dt),
            Waveform::Sawtooth => sawtooth(t, dt),
            Waveform::Triangle => triangle(t),
            Waveform::Noise => noise.next_sample(),
        };

        self.phase = (self.phase + inc).rem_euclid(1.0);
        if !self.phase.is_finite() {
            self.phase = 0.0;
        }
        sample
    }
}

fn sawtooth(t: f64, dt: f64) -> f64 {
    let naive = 2.0 * t - 1.0;
    naive - poly_blep(t, dt)
}

fn square(t: f64, dt: f64) -> f64 {
    let mut value = if t < 0.5 { 1.0 } else { -1.0 };
    value += poly_blep(t, dt);
    value -= poly_blep((t + 0.5) % 1.0, dt);
    value
}

// -1 → +1 over the first half cycle, back down over the second.
fn triangle(t: f64) -> f64 {
    if t < 0.5 { 4.0 * t - 1.0 } else { 3.0 - 4.0 * t }
}

/// PolyBLEP (Polynomial Band-Limited Step) correction around the wrap of
/// a phase `t` in `[0, 1)` advancing by `dt` per sample.
fn poly_blep(t: f64, dt: f64) -> f64 {
    if dt <= 0.0 || dt >= 1.0 {
        0.0
    } else if t < dt {
        let t = t / dt;
        2.0 * t - t * t - 1.0
    } else if t > 1.0 - dt {
        let t = (t - 1.0) / dt;
        t * t + 2.0 * t + 1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(waveform: Waveform, frequency: f64, n: usize) -> Vec<f64> {
        let mut osc = Oscillator::new(44100.0);
        osc.frequency = frequency;
        let mut noise = Noise::new(1);
        (0..n).map(|_| osc.next_sample(waveform, 0.0, &mut noise)).collect()
    }

    #[test]
    fn sine_zero_at_start() {
        let s = run(Waveform::Sine, 440.0, 1)[0];
        assert!(s.abs() < 1e-10, "Sine should start near 0, got {s}");
    }

    #[test]
    fn shapes_in_range() {
        for waveform in [
            Waveform::Sine,
            Waveform::Square,
            Waveform::Sawtooth,
            Waveform::Triangle,
            Waveform::Noise,
        ] {
            for s in run(waveform, 440.0, 44100) {
                assert!(s.abs() <= 1.5, "{waveform:?} out of range: {s}");
            }
        }
    }

    #[test]
    fn zero_is_silent() {
        assert!(run(Waveform::Zero, 440.0, 100).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn negative_frequency_keeps_phase_wrapped() {
        let mut osc = Oscillator::new(44100.0);
        osc.frequency = -3000.0;
        let mut noise = Noise::new(1);
        for _ in 0..1000 {
            osc.next_sample(Waveform::Sine, 0.0, &mut noise);
            assert!((0.0..1.0).contains(&osc.phase()), "phase escaped: {}", osc.phase());
        }
    }

    #[test]
    fn phase_offset_shifts_sine() {
        let mut osc = Oscillator::new(44100.0);
        let mut noise = Noise::new(1);
        let s = osc.next_sample(Waveform::Sine, 0.25, &mut noise);
        assert!((s - 1.0).abs() < 1e-9, "quarter-cycle offset should peak, got {s}");
    }

    #[test]
    fn noise_is_seeded() {
        let a = run(Waveform::Noise, 0.0, 64);
        let b = run(Waveform::Noise, 0.0, 64);
        assert_eq!(a, b);
        assert!(a.iter().any(|&s| s != a[0]));
    }

    #[test]
    fn unknown_shape_is_sine() {
        assert_eq!(Waveform::from_value(9.0), Waveform::Sine);
        assert_eq!(Waveform::from_value(-1.0), Waveform::Sine);
        assert_eq!(Waveform::from_value(3.0), Waveform::Sawtooth);
    }
}
