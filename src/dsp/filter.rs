//! Biquad filter for the echo feedback path.
//!
//! Coefficients follow the Audio EQ Cookbook (Robert Bristow-Johnson) and the
//! state runs in Direct Form II Transposed. The output is scaled by a flat
//! gain so Karplus-Strong mode can push the resonator.

use std::f64::consts::PI;

/// Filter kinds the FM controls can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    None,
    Lowpass,
    Bandpass,
}

#[derive(Debug, Clone)]
pub struct Filter {
    pub kind: FilterKind,
    pub frequency: f64,
    pub resonance: f64,
    pub gain: f64,

    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,

    z1: f64,
    z2: f64,

    sample_rate: f64,
}

impl Filter {
    pub fn new(kind: FilterKind, frequency: f64, resonance: f64, gain: f64, sample_rate: f64) -> Self {
        let mut f = Filter {
            kind,
            frequency,
            resonance,
            gain,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            z1: 0.0,
            z2: 0.0,
            sample_rate,
        };
        f.update_coefficients();
        f
    }

    /// Recompute coefficients from the current settings. Cutoff is kept
    /// inside `[1 Hz, 0.49 * sample_rate]` and Q never drops below 0.1.
    pub fn update_coefficients(&mut self) {
        let nyquist_guard = 0.49 * self.sample_rate;
        let frequency = if self.frequency.is_finite() {
            self.frequency.clamp(1.0, nyquist_guard.max(1.0))
        } else {
            1.0
        };
        let q = if self.resonance.is_finite() { self.resonance.max(0.1) } else { 0.1 };

        let w0 = 2.0 * PI * frequency / self.sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;

        let (b0, b1, b2) = match self.kind {
            FilterKind::None => (a0, a1, a2),
            FilterKind::Lowpass => {
                let b1 = 1.0 - cos_w0;
                (b1 / 2.0, b1, b1 / 2.0)
            }
            FilterKind::Bandpass => (alpha, 0.0, -alpha),
        };

        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = a1 / a0;
        self.a2 = a2 / a0;
    }

    /// Process a single sample through the filter.
    pub fn process(&mut self, input: f64) -> f64 {
        if self.kind == FilterKind::None {
            return input;
        }
        let output = self.b0 * input + self.z1;
        self.z1 = self.b1 * input - self.a1 * output + self.z2;
        self.z2 = self.b2 * input - self.a2 * output;
        output * self.gain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_passes_through() {
        let mut f = Filter::new(FilterKind::None, 1000.0, 0.5, 0.8, 44100.0);
        for x in [0.0, 0.5, -1.0, 0.25] {
            assert_eq!(f.process(x), x);
        }
    }

    #[test]
    fn lowpass_passes_dc_times_gain() {
        let mut f = Filter::new(FilterKind::Lowpass, 5000.0, 0.707, 2.0, 44100.0);
        let mut output = 0.0;
        for _ in 0..1000 {
            output = f.process(1.0);
        }
        assert!((output - 2.0).abs() < 0.001, "Lowpass should pass DC scaled by gain, got {output}");
    }

    #[test]
    fn bandpass_blocks_dc() {
        let mut f = Filter::new(FilterKind::Bandpass, 1000.0, 0.5, 0.8, 44100.0);
        let mut output = 1.0;
        for _ in 0..5000 {
            output = f.process(1.0);
        }
        assert!(output.abs() < 0.001, "Bandpass should block DC, got {output}");
    }

    #[test]
    fn lowpass_attenuates_high_freq() {
        let mut f = Filter::new(FilterKind::Lowpass, 200.0, 0.707, 1.0, 44100.0);
        let mut max_out = 0.0_f64;
        for i in 0..4410 {
            let t = i as f64 / 44100.0;
            let out = f.process((2.0 * PI * 10000.0 * t).sin());
            if i > 1000 {
                max_out = max_out.max(out.abs());
            }
        }
        assert!(max_out < 0.01, "Lowpass@200Hz should strongly attenuate 10kHz, got {max_out}");
    }

    #[test]
    fn degenerate_settings_stay_finite() {
        for (freq, res) in [(0.0, 0.0), (1e9, 0.5), (f64::NAN, f64::NAN), (-5.0, -1.0)] {
            let mut f = Filter::new(FilterKind::Bandpass, freq, res, 0.8, 44100.0);
            for i in 0..2000 {
                let input = if i % 100 == 0 { 1.0 } else { 0.0 };
                let out = f.process(input);
                assert!(out.is_finite(), "freq {freq} res {res}: output not finite at {i}");
            }
        }
    }
}
