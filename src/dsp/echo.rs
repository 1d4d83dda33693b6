//! Echo / feedback line with a Karplus-Strong capable resonator.

use super::filter::Filter;
use super::zeroed_buffer;
use crate::error::SynthError;

/// Mono circular delay holding up to half a second of audio.
///
/// The ring is allocated zeroed for every render, so no echo state leaks
/// from one note into the next.
#[derive(Debug, Clone)]
pub struct EchoLine {
    buffer: Vec<f32>,
    cursor: usize,
}

impl EchoLine {
    pub fn new(sample_rate: f64) -> Result<Self, SynthError> {
        let capacity = (sample_rate / 2.0).max(1.0) as usize + 1;
        Ok(EchoLine {
            buffer: zeroed_buffer(capacity, "echo line")?,
            cursor: 0,
        })
    }

    /// Push one sample and return `input + delayed * level`.
    ///
    /// The delayed sample is filtered, scaled by `feedback` and soft-clipped
    /// with `tanh` before it re-enters the ring, which keeps the high-gain
    /// Karplus-Strong loop bounded.
    pub fn process(&mut self, input: f32, delay: usize, feedback: f32, level: f32, filter: &mut Filter) -> f32 {
        let capacity = self.buffer.len();
        if capacity < 2 {
            return input;
        }
        let delay = delay.clamp(1, capacity - 1);
        let read = (self.cursor + capacity - delay) % capacity;
        let delayed = self.buffer[read];

        let recirculated = (filter.process(delayed as f64) * feedback as f64).tanh() as f32;
        self.buffer[self.cursor] = input + recirculated;
        self.cursor = (self.cursor + 1) % capacity;

        input + delayed * level
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::filter::FilterKind;

    fn passthrough() -> Filter {
        Filter::new(FilterKind::None, 1000.0, 0.5, 1.0, 1000.0)
    }

    #[test]
    fn ring_holds_half_a_second() {
        let echo = EchoLine::new(44100.0).unwrap();
        assert_eq!(echo.buffer.len(), 22051);
    }

    #[test]
    fn dry_when_level_zero() {
        let mut echo = EchoLine::new(1000.0).unwrap();
        let mut filter = passthrough();
        for x in [0.5, -0.25, 1.0, 0.0] {
            assert_eq!(echo.process(x, 10, 0.5, 0.0, &mut filter), x);
        }
    }

    #[test]
    fn impulse_returns_after_delay() {
        let mut echo = EchoLine::new(1000.0).unwrap();
        let mut filter = passthrough();
        echo.process(1.0, 10, 0.0, 1.0, &mut filter);
        for i in 1..10 {
            let out = echo.process(0.0, 10, 0.0, 1.0, &mut filter);
            assert_eq!(out, 0.0, "no echo expected at sample {i}");
        }
        let out = echo.process(0.0, 10, 0.0, 1.0, &mut filter);
        assert!((out - 1.0).abs() < 1e-6, "first echo should be the impulse, got {out}");
    }

    #[test]
    fn feedback_is_saturated() {
        let mut echo = EchoLine::new(1000.0).unwrap();
        let mut filter = Filter::new(FilterKind::None, 1000.0, 0.5, 10.0, 1000.0);
        let mut peak = 0.0_f32;
        echo.process(1.0, 5, 50.0, 1.0, &mut filter);
        for _ in 0..5000 {
            let out = echo.process(0.0, 5, 50.0, 1.0, &mut filter);
            assert!(out.is_finite());
            peak = peak.max(out.abs());
        }
        assert!(peak <= 1.0 + 1e-6, "recirculation should stay within tanh bounds, got {peak}");
    }

    #[test]
    fn oversized_delay_is_clamped_to_half_a_second() {
        let mut echo = EchoLine::new(1000.0).unwrap();
        let mut filter = passthrough();
        echo.process(1.0, usize::MAX, 0.0, 1.0, &mut filter);
        for i in 1..500 {
            let out = echo.process(0.0, usize::MAX, 0.0, 1.0, &mut filter);
            assert_eq!(out, 0.0, "no echo expected at sample {i}");
        }
        let out = echo.process(0.0, usize::MAX, 0.0, 1.0, &mut filter);
        assert!((out - 1.0).abs() < 1e-6, "longest echo should land at 500 samples, got {out}");
    }
}
