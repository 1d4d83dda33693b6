//! Waveform editor seam.
//!
//! The synths never own sample memory. They drive a `SampleEditor`, which is
//! whatever the host uses to store the instrument sample, through the same
//! narrow set of editing operations a user would trigger by hand. `SampleBuffer`
//! is the in-memory implementation used by the WASM surface and the tests.

use std::f64::consts::PI;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::dsp::zeroed_buffer;
use crate::error::SynthError;
use crate::params::LoopType;

/// Noise colours of the base-wave generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseKind {
    White,
    Pink,
    Brown,
}

impl NoiseKind {
    /// `0` white, `1` pink, `2` brown; anything else is white.
    pub fn from_index(index: i64) -> Self {
        match index {
            1 => NoiseKind::Pink,
            2 => NoiseKind::Brown,
            _ => NoiseKind::White,
        }
    }
}

/// Base waveforms the editor can fill a sample with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseWave {
    Sine,
    Square,
    Triangle,
    Sawtooth,
    HalfSine,
    AbsoluteSine,
    Noise(NoiseKind),
}

/// Operations the synths need from the sample editor.
pub trait SampleEditor {
    fn is_empty_sample(&self) -> bool;

    /// Current sample length in frames.
    fn sample_len(&self) -> usize;

    /// Replace the sample with `len` frames of silence and return the new
    /// length. Loop settings reset along with the content.
    fn prepare_sample(&mut self, len: usize) -> Result<usize, SynthError>;

    fn select_all(&mut self);

    /// Remove the selected range.
    fn cut(&mut self);

    /// Sample at `index` in `[-1, 1]`; out-of-range reads are silent.
    fn float_sample(&self, index: usize) -> f32;

    /// Store a sample, clipping to `[-1, 1]`. Out-of-range writes are dropped.
    fn set_float_sample(&mut self, index: usize, value: f32);

    /// Fill the whole sample with `periods` cycles of `wave` at `amplitude`.
    fn generate(&mut self, wave: BaseWave, amplitude: f32, periods: f32);

    fn set_loop_type(&mut self, loop_type: LoopType);
    fn set_repeat_start(&mut self, index: usize);
    fn set_repeat_end(&mut self, index: usize);

    /// Tell listeners the waveform changed.
    fn notify_changed(&mut self);
}

/// In-memory sample with selection, loop settings and a change counter.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    data: Vec<f32>,
    selection: Option<(usize, usize)>,
    loop_type: LoopType,
    repeat_start: usize,
    repeat_end: usize,
    changes: u64,
    rng: SmallRng,
}

impl SampleBuffer {
    pub fn new(seed: u64) -> Self {
        SampleBuffer {
            data: Vec::new(),
            selection: None,
            loop_type: LoopType::None,
            repeat_start: 0,
            repeat_end: 0,
            changes: 0,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Start from existing audio.
    pub fn from_samples(samples: Vec<f32>, seed: u64) -> Self {
        SampleBuffer {
            data: samples,
            ..SampleBuffer::new(seed)
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.data
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.data
    }

    pub fn loop_type(&self) -> LoopType {
        self.loop_type
    }

    pub fn repeat_range(&self) -> (usize, usize) {
        (self.repeat_start, self.repeat_end)
    }

    pub fn selection(&self) -> Option<(usize, usize)> {
        self.selection
    }

    /// How many change notifications have been sent.
    pub fn change_count(&self) -> u64 {
        self.changes
    }

    fn fill_noise(&mut self, kind: NoiseKind, amplitude: f32) {
        // Paul Kellet's economy pink filter.
        let (mut b0, mut b1, mut b2) = (0.0f32, 0.0f32, 0.0f32);
        let mut brown = 0.0f32;
        for slot in self.data.iter_mut() {
            let white: f32 = self.rng.random_range(-1.0..1.0);
            let value = match kind {
                NoiseKind::White => white,
                NoiseKind::Pink => {
                    b0 = 0.99765 * b0 + white * 0.0990460;
                    b1 = 0.96300 * b1 + white * 0.2965164;
                    b2 = 0.57000 * b2 + white * 1.0526913;
                    (b0 + b1 + b2 + white * 0.1848) * 0.25
                }
                NoiseKind::Brown => {
                    brown = (brown + white * 0.1).clamp(-1.0, 1.0);
                    brown
                }
            };
            *slot = clip(value * amplitude);
        }
    }
}

impl Default for SampleBuffer {
    fn default() -> Self {
        SampleBuffer::new(0)
    }
}

/// Clip to `[-1, 1]`; NaN becomes silence.
fn clip(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-1.0, 1.0)
    }
}

/// One period of a base waveform at phase `t` in `[0, 1)`.
fn base_wave(wave: BaseWave, t: f64) -> f64 {
    let sine = (2.0 * PI * t).sin();
    match wave {
        BaseWave::Sine => sine,
        BaseWave::Square => {
            if t < 0.5 {
                1.0
            } else {
                -1.0
            }
        }
        BaseWave::Triangle => {
            if t < 0.25 {
                4.0 * t
            } else if t < 0.75 {
                2.0 - 4.0 * t
            } else {
                4.0 * t - 4.0
            }
        }
        BaseWave::Sawtooth => 2.0 * t - 1.0,
        BaseWave::HalfSine => sine.max(0.0),
        BaseWave::AbsoluteSine => sine.abs(),
        BaseWave::Noise(_) => 0.0,
    }
}

impl SampleEditor for SampleBuffer {
    fn is_empty_sample(&self) -> bool {
        self.data.is_empty()
    }

    fn sample_len(&self) -> usize {
        self.data.len()
    }

    fn prepare_sample(&mut self, len: usize) -> Result<usize, SynthError> {
        self.data = zeroed_buffer(len, "sample")?;
        self.selection = None;
        self.loop_type = LoopType::None;
        self.repeat_start = 0;
        self.repeat_end = 0;
        Ok(len)
    }

    fn select_all(&mut self) {
        self.selection = Some((0, self.data.len()));
    }

    fn cut(&mut self) {
        let Some((start, end)) = self.selection.take() else {
            return;
        };
        let end = end.min(self.data.len());
        let start = start.min(end);
        self.data.drain(start..end);
        let len = self.data.len();
        self.repeat_start = self.repeat_start.min(len);
        self.repeat_end = self.repeat_end.min(len);
        if len == 0 {
            self.loop_type = LoopType::None;
        }
    }

    fn float_sample(&self, index: usize) -> f32 {
        self.data.get(index).copied().unwrap_or(0.0)
    }

    fn set_float_sample(&mut self, index: usize, value: f32) {
        if let Some(slot) = self.data.get_mut(index) {
            *slot = clip(value);
        }
    }

    fn generate(&mut self, wave: BaseWave, amplitude: f32, periods: f32) {
        if let BaseWave::Noise(kind) = wave {
            self.fill_noise(kind, amplitude);
            return;
        }
        let len = self.data.len() as f64;
        let periods = periods as f64;
        for (i, slot) in self.data.iter_mut().enumerate() {
            let t = (i as f64 / len * periods).rem_euclid(1.0);
            let value = base_wave(wave, t) * amplitude as f64;
            *slot = clip(value as f32);
        }
    }

    fn set_loop_type(&mut self, loop_type: LoopType) {
        self.loop_type = loop_type;
    }

    fn set_repeat_start(&mut self, index: usize) {
        self.repeat_start = index.min(self.data.len());
    }

    fn set_repeat_end(&mut self, index: usize) {
        self.repeat_end = index.min(self.data.len());
    }

    fn notify_changed(&mut self) {
        self.changes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_buffer_is_empty() {
        let buf = SampleBuffer::new(1);
        assert!(buf.is_empty_sample());
        assert_eq!(buf.float_sample(0), 0.0);
    }

    #[test]
    fn prepare_zeroes_and_resets_loop() {
        let mut buf = SampleBuffer::from_samples(vec![0.5; 10], 1);
        buf.set_loop_type(LoopType::Forward);
        buf.set_repeat_end(10);
        assert_eq!(buf.prepare_sample(4).unwrap(), 4);
        assert_eq!(buf.samples(), &[0.0; 4]);
        assert_eq!(buf.loop_type(), LoopType::None);
        assert_eq!(buf.repeat_range(), (0, 0));
    }

    #[test]
    fn select_all_and_cut_clears() {
        let mut buf = SampleBuffer::from_samples(vec![0.1, 0.2, 0.3], 1);
        buf.cut();
        assert_eq!(buf.sample_len(), 3, "cut without selection is a no-op");
        buf.select_all();
        buf.cut();
        assert!(buf.is_empty_sample());
        assert_eq!(buf.selection(), None);
    }

    #[test]
    fn writes_clip_and_ignore_out_of_range() {
        let mut buf = SampleBuffer::from_samples(vec![0.0; 2], 1);
        buf.set_float_sample(0, 3.0);
        buf.set_float_sample(1, f32::NAN);
        buf.set_float_sample(5, 0.5);
        assert_eq!(buf.samples(), &[1.0, 0.0]);
        assert_eq!(buf.float_sample(5), 0.0);
    }

    #[test]
    fn generate_with_unbounded_arguments_stays_finite() {
        let mut buf = SampleBuffer::from_samples(vec![0.0; 50], 1);
        for (amplitude, periods) in [(f32::INFINITY, 1.0), (1.0, f32::INFINITY), (f32::NAN, f32::NAN)] {
            for wave in [BaseWave::Sine, BaseWave::Triangle, BaseWave::Noise(NoiseKind::Pink)] {
                buf.generate(wave, amplitude, periods);
                assert!(
                    buf.samples().iter().all(|x| x.is_finite() && x.abs() <= 1.0),
                    "{wave:?} amplitude {amplitude} periods {periods}"
                );
            }
        }
    }

    #[test]
    fn sine_generation_covers_periods() {
        let mut buf = SampleBuffer::from_samples(vec![0.0; 100], 1);
        buf.generate(BaseWave::Sine, 0.5, 2.0);
        let s = buf.samples();
        assert_eq!(s[0], 0.0);
        assert!((s[12] - 0.5 * (2.0 * PI * 0.24).sin() as f32).abs() < 1e-6);
        // second period starts at the midpoint
        assert!(s[50].abs() < 1e-6);
        assert!(s.iter().all(|x| x.abs() <= 0.5 + 1e-6));
    }

    #[test]
    fn shaped_waves_stay_in_amplitude() {
        for wave in [
            BaseWave::Square,
            BaseWave::Triangle,
            BaseWave::Sawtooth,
            BaseWave::HalfSine,
            BaseWave::AbsoluteSine,
        ] {
            let mut buf = SampleBuffer::from_samples(vec![0.0; 64], 1);
            buf.generate(wave, 0.75, 3.0);
            assert!(
                buf.samples().iter().all(|x| x.abs() <= 0.75 + 1e-6),
                "{wave:?} exceeds amplitude"
            );
        }
        let mut buf = SampleBuffer::from_samples(vec![0.0; 64], 1);
        buf.generate(BaseWave::AbsoluteSine, 1.0, 1.0);
        assert!(buf.samples().iter().all(|&x| x >= 0.0));
    }

    #[test]
    fn noise_is_seeded_and_coloured() {
        let mut a = SampleBuffer::from_samples(vec![0.0; 256], 5);
        let mut b = SampleBuffer::from_samples(vec![0.0; 256], 5);
        a.generate(BaseWave::Noise(NoiseKind::White), 1.0, 1.0);
        b.generate(BaseWave::Noise(NoiseKind::White), 1.0, 1.0);
        assert_eq!(a.samples(), b.samples());

        let mut brown = SampleBuffer::from_samples(vec![0.0; 256], 5);
        brown.generate(BaseWave::Noise(NoiseKind::Brown), 1.0, 1.0);
        let max_step = brown
            .samples()
            .windows(2)
            .map(|w| (w[1] - w[0]).abs())
            .fold(0.0f32, f32::max);
        assert!(max_step <= 0.1 + 1e-6, "brown noise should move in small steps, got {max_step}");
    }

    #[test]
    fn repeat_range_is_bounded_by_length() {
        let mut buf = SampleBuffer::from_samples(vec![0.0; 8], 1);
        buf.set_repeat_start(2);
        buf.set_repeat_end(100);
        assert_eq!(buf.repeat_range(), (2, 8));
    }

    #[test]
    fn notifications_are_counted() {
        let mut buf = SampleBuffer::new(1);
        buf.notify_changed();
        buf.notify_changed();
        assert_eq!(buf.change_count(), 2);
    }
}
