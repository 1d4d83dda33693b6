//! FM instrument: two oscillators, an envelope and the echo/filter line
//! combined into one sample-accurate step.
//!
//! `FmControls` is derived from the FM sliders once per render; every curve
//! that turns a normalized slider into a physical quantity (Hz, seconds,
//! samples) lives in `FmControls::from_params`.

use log::trace;

use super::echo::EchoLine;
use super::envelope::Envelope;
use super::filter::{Filter, FilterKind};
use super::oscillator::{Noise, Oscillator, Waveform};
use super::zeroed_buffer;
use crate::error::SynthError;
use crate::params::{FmParams, PARAM_MAX_VALUE, normalize_finite};

/// Note number the carrier/modulator sliders count up from.
pub const NOTE_START: i32 = 36;

/// Equal-tempered frequency of a MIDI note (A4 = note 69 = 440 Hz).
pub fn note_to_frequency(note: i32) -> f64 {
    440.0 * 2.0_f64.powf((note as f64 - 69.0) / 12.0)
}

// Note offset of a frequency slider, held to the slider range.
fn note_slider(value: f32) -> i32 {
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, PARAM_MAX_VALUE) as i32
}

// Normalized slider held to `[0, 1]`.
fn unit(value: f32) -> f64 {
    normalize_finite(value).clamp(0.0, 1.0) as f64
}

/// How the modulator acts on the carrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modulation {
    None,
    Amplitude,
    Frequency,
    Ring,
    Tremolo,
    Vibrato,
}

impl Modulation {
    /// Mode slider to modulation. Mode 6 (Karplus-Strong) modulates
    /// amplitude; unknown modes play the bare carrier.
    pub fn from_value(value: f32) -> Self {
        match value as i64 {
            1 | 6 => Modulation::Amplitude,
            2 => Modulation::Frequency,
            3 => Modulation::Ring,
            4 => Modulation::Tremolo,
            5 => Modulation::Vibrato,
            _ => Modulation::None,
        }
    }
}

/// Mode slider value that turns the echo line into a plucked-string resonator.
pub const KARPLUS_STRONG_MODE: f32 = 6.0;

/// How carrier and modulator frequencies are derived from their sliders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencyModel {
    /// Note-synced carrier, modulator as a slow LFO.
    Lfo,
    /// Both oscillators synced to notes.
    Note,
    /// As `Note`, with the modulator starting a fraction of a cycle ahead.
    NotePhase,
    /// Note-synced carrier, modulator a free fraction of Nyquist.
    Free,
}

impl FrequencyModel {
    pub fn from_value(value: f32) -> Self {
        match value as i64 {
            1 => FrequencyModel::Note,
            2 => FrequencyModel::NotePhase,
            3 => FrequencyModel::Free,
            _ => FrequencyModel::Lfo,
        }
    }
}

/// Modulator start phase (cycles) for `FrequencyModel::NotePhase`.
const PHASE_OFFSET: f64 = 0.3;

/// Filter control below which the feedback path stays unfiltered.
const FILTER_THRESHOLD: f32 = 0.05;

/// Lowest resonator cutoff in Karplus-Strong mode.
const KARPLUS_STRONG_MIN_CUTOFF: f64 = 150.0;

/// Carrier phase shift per unit of last output and feedback gain.
const FEEDBACK_PHASE_DEPTH: f64 = 0.005;

/// Engine-side configuration for one FM render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FmControls {
    pub modulation: Modulation,
    pub karplus_strong: bool,
    pub carrier: Waveform,
    pub carrier_amplitude: f64,
    pub modulator: Waveform,
    pub modulator_amplitude: f64,
    /// Carrier frequency before the transient sweep, Hz.
    pub carrier_freq: f64,
    pub modulator_freq: f64,
    /// Modulator start phase in cycles.
    pub modulator_phase: f64,
    /// Envelope times in seconds, sustain as a level.
    pub attack: f64,
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
    pub echo_delay_samples: usize,
    pub echo_feedback: f32,
    pub echo_level: f32,
    pub filter: FilterKind,
    pub filter_freq: f64,
    pub filter_resonance: f64,
    pub filter_gain: f64,
    /// Reverb send, normalized.
    pub spacetime: f32,
    /// Self-feedback gain, `>= 1`.
    pub feedback: f64,
    pub transient_amplitude: f64,
    /// Length of the transient sweep, never zero.
    pub transient_samples: usize,
}

impl FmControls {
    pub fn from_params(p: &FmParams, sample_rate: u32) -> Self {
        let sr = sample_rate as f64;
        let half_rate = (sample_rate / 2) as f64;

        let carrier_note = note_slider(p.carrier_freq);
        let mod_note = note_slider(p.mod_freq);
        let mod_norm = unit(p.mod_freq);
        let (carrier_freq, modulator_freq, modulator_phase) = match FrequencyModel::from_value(p.freq_model) {
            FrequencyModel::Note => (
                note_to_frequency(NOTE_START + carrier_note),
                note_to_frequency(NOTE_START + mod_note),
                0.0,
            ),
            FrequencyModel::NotePhase => (
                note_to_frequency(NOTE_START + carrier_note),
                note_to_frequency(NOTE_START + mod_note),
                PHASE_OFFSET,
            ),
            FrequencyModel::Free => (note_to_frequency(carrier_note), mod_norm * sr / 2.0, 0.0),
            FrequencyModel::Lfo => (note_to_frequency(NOTE_START + carrier_note), (0.01 + mod_norm) * 4.0, 0.0),
        };

        let delay = unit(p.echo_size);
        let karplus_strong = p.modulation == KARPLUS_STRONG_MODE;

        let filter_control = normalize_finite(p.filter);
        let mut filter = if filter_control > FILTER_THRESHOLD {
            FilterKind::Bandpass
        } else {
            FilterKind::None
        };
        let f = filter_control.clamp(0.0, 1.0) as f64;
        let mut filter_freq = half_rate * f * f * f;
        let mut filter_gain = 0.8;
        let mut echo_level = normalize_finite(p.echo_level);
        if karplus_strong {
            filter = FilterKind::Lowpass;
            filter_gain = 10.0;
            filter_freq = filter_freq.max(KARPLUS_STRONG_MIN_CUTOFF);
            echo_level = 1.0;
        }

        let transient_norm = normalize_finite(p.transient_size).max(0.0) as f64;
        let transient_samples = ((sr / 2.0 * transient_norm) as usize).max(1);

        let controls = FmControls {
            modulation: Modulation::from_value(p.modulation),
            karplus_strong,
            carrier: Waveform::from_value(p.carrier_shape),
            carrier_amplitude: normalize_finite(p.carrier_amp) as f64,
            modulator: Waveform::from_value(p.mod_shape),
            modulator_amplitude: normalize_finite(p.mod_amp) as f64,
            carrier_freq,
            modulator_freq,
            modulator_phase,
            attack: normalize_finite(p.attack) as f64,
            decay: normalize_finite(p.decay) as f64,
            sustain: unit(p.decay),
            release: normalize_finite(p.release) as f64 * 0.5,
            echo_delay_samples: (delay * delay * delay * half_rate) as usize,
            echo_feedback: normalize_finite(p.echo_feedback),
            echo_level,
            filter,
            filter_freq,
            filter_resonance: 0.5,
            filter_gain,
            spacetime: normalize_finite(p.spacetime),
            feedback: 1.0 + 100.0 * normalize_finite(p.feedback) as f64,
            transient_amplitude: normalize_finite(p.transient) as f64,
            transient_samples,
        };
        trace!("fm controls: {controls:?}");
        controls
    }

    /// Carrier frequency at render sample `i`: a fast downward sweep from
    /// above the base pitch that settles once `i` passes the transient length.
    pub fn transient_frequency(&self, i: usize) -> f64 {
        let offset = i as f64 / self.transient_samples as f64;
        let amp = self.transient_amplitude;
        let base = self.carrier_freq;
        base + amp * (base * ((-offset * offset * offset * 1000.0).tanh() + 1.0) * (10.0 * amp))
    }
}

/// Per-render voice state.
#[derive(Debug, Clone)]
pub struct FmInstrument {
    controls: FmControls,
    carrier: Oscillator,
    modulator: Oscillator,
    carrier_freq: f64,
    envelope: Envelope,
    echo: EchoLine,
    filter: Filter,
    noise: Noise,
    last: f64,
}

impl FmInstrument {
    pub fn new(controls: &FmControls, sample_rate: u32, seed: u64) -> Result<Self, SynthError> {
        let sr = sample_rate as f64;

        let mut modulator = Oscillator::new(sr);
        modulator.frequency = controls.modulator_freq;
        modulator.set_phase(controls.modulator_phase);

        let mut envelope = Envelope::new(sr);
        envelope.attack = controls.attack;
        envelope.decay = controls.decay;
        envelope.sustain = controls.sustain;
        envelope.release = controls.release;

        Ok(FmInstrument {
            controls: *controls,
            carrier: Oscillator::new(sr),
            modulator,
            carrier_freq: controls.carrier_freq,
            envelope,
            echo: EchoLine::new(sr)?,
            filter: Filter::new(
                controls.filter,
                controls.filter_freq,
                controls.filter_resonance,
                controls.filter_gain,
                sr,
            ),
            noise: Noise::new(seed),
            last: 0.0,
        })
    }

    pub fn set_carrier_frequency(&mut self, freq: f64) {
        self.carrier_freq = freq;
    }

    /// Start the envelope from silence.
    pub fn trigger(&mut self) {
        self.envelope.trigger();
    }

    /// Produce one output sample.
    pub fn play(&mut self) -> f32 {
        let c = &self.controls;
        let a = c.modulator_amplitude;
        let m = self.modulator.next_sample(c.modulator, 0.0, &mut self.noise);

        self.carrier.frequency = match c.modulation {
            Modulation::Frequency => self.carrier_freq * (1.0 + a * m),
            Modulation::Vibrato => self.carrier_freq * (1.0 + 0.06 * a * m),
            _ => self.carrier_freq,
        };
        let phase_offset = self.last * (c.feedback - 1.0) * FEEDBACK_PHASE_DEPTH;
        let carrier = self.carrier.next_sample(c.carrier, phase_offset, &mut self.noise) * c.carrier_amplitude;

        let voice = match c.modulation {
            Modulation::None | Modulation::Frequency | Modulation::Vibrato => carrier,
            Modulation::Amplitude => carrier * (1.0 + a * m) / (1.0 + a),
            Modulation::Ring => carrier * m * a,
            Modulation::Tremolo => carrier * (1.0 - a * (0.5 + 0.5 * m)),
        };

        let dry = (voice * self.envelope.next_sample()) as f32;
        let out = self.echo.process(
            dry,
            c.echo_delay_samples,
            c.echo_feedback,
            c.echo_level,
            &mut self.filter,
        );
        self.last = if out.is_finite() { out as f64 } else { 0.0 };
        out
    }
}

/// Output of the per-sample render loop.
#[derive(Debug, Clone)]
pub struct DryRender {
    /// `capacity` samples; everything past `frames_rendered` is zero.
    pub samples: Vec<f32>,
    pub frames_rendered: usize,
}

/// Zero-sample pairs past the nominal length that end overflow rendering.
const SILENCE_LIMIT: usize = 5;

/// Run the instrument for up to `capacity` samples. Once past `nominal`
/// samples, rendering stops early after more than `SILENCE_LIMIT`
/// consecutive exact-zero pairs.
pub fn render_dry(
    controls: &FmControls,
    sample_rate: u32,
    nominal: usize,
    capacity: usize,
    seed: u64,
) -> Result<DryRender, SynthError> {
    let mut samples = zeroed_buffer(capacity, "dry signal")?;
    let mut instrument = FmInstrument::new(controls, sample_rate, seed)?;

    let mut frames_rendered = 0;
    let mut silence = 0;
    let mut last = 0.0f32;
    for (i, slot) in samples.iter_mut().enumerate() {
        instrument.set_carrier_frequency(controls.transient_frequency(i));
        if i == 0 {
            instrument.trigger();
        }
        let x = instrument.play();
        *slot = x;
        frames_rendered = i + 1;

        if last == 0.0 && x == 0.0 {
            silence += 1;
        } else if x != 0.0 {
            silence = 0;
        }
        if i > nominal && silence > SILENCE_LIMIT {
            break;
        }
        last = x;
    }

    Ok(DryRender {
        samples,
        frames_rendered,
    })
}
