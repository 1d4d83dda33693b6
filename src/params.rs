//! Named, bounded synth sliders and their typed views.
//!
//! A `SynthDefinition` is what the parameter dialog shows: a list of
//! labelled sliders whose `value` fields the user mutates. The engine never
//! reads those sliders by position; it converts them into the typed
//! `CycleParams` / `FmParams` records first. Slider 0 is always the synth
//! selector.

use serde::{Deserialize, Serialize};

use crate::error::SynthError;

/// Upper bound of most sliders. One printable ASCII char per value in the
/// compact preset notation (`' '` = 0 … `'~'` = 94).
pub const PARAM_MAX_VALUE: f32 = 94.0;

/// Map a raw slider value in `[0, PARAM_MAX_VALUE]` onto `[0, 1]`.
pub fn normalize(value: f32) -> f32 {
    value / PARAM_MAX_VALUE
}

/// `normalize`, reading NaN and infinite sliders as zero.
pub fn normalize_finite(value: f32) -> f32 {
    let n = normalize(value);
    if n.is_finite() { n } else { 0.0 }
}

/// Available synth variants. The discriminant is the selector value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SynthId {
    Cycle = 0,
    Fm = 1,
}

impl SynthId {
    pub const ALL: [SynthId; 2] = [SynthId::Cycle, SynthId::Fm];

    /// Interpret a selector slider value. Values are truncated; anything
    /// below 1 (including NaN) selects Cycle, anything above selects FM.
    pub fn from_value(value: f32) -> Self {
        if value >= 1.0 { SynthId::Fm } else { SynthId::Cycle }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Slider count, selector included.
    pub fn param_count(self) -> usize {
        match self {
            SynthId::Cycle => CycleParams::COUNT,
            SynthId::Fm => FmParams::COUNT,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SynthId::Cycle => "\u{11} cycle \u{10}",
            SynthId::Fm => "\u{11} FM \u{10}",
        }
    }
}

/// Sample loop modes understood by the waveform editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopType {
    #[default]
    None = 0,
    Forward = 1,
    PingPong = 2,
    OneShot = 3,
}

impl LoopType {
    /// Values outside the enumerated range (negative, `>= 4`, NaN) mean no loop.
    pub fn from_value(value: f32) -> Self {
        match value as i64 {
            1 => LoopType::Forward,
            2 => LoopType::PingPong,
            3 => LoopType::OneShot,
            _ => LoopType::None,
        }
    }
}

/// A single labelled slider. `min <= value <= max` is kept by the dialog,
/// not by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthParameter {
    pub name: String,
    pub value: f32,
    pub min: f32,
    pub max: f32,
}

impl SynthParameter {
    fn new(name: &str, value: f32, min: f32, max: f32) -> Self {
        SynthParameter {
            name: name.to_string(),
            value,
            min,
            max,
        }
    }
}

/// The slider set of one synth variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthDefinition {
    pub id: SynthId,
    pub params: Vec<SynthParameter>,
}

impl SynthDefinition {
    pub fn new(id: SynthId) -> Self {
        match id {
            SynthId::Cycle => Self::cycle(),
            SynthId::Fm => Self::fm(),
        }
    }

    fn cycle() -> Self {
        let d = CycleParams::default();
        let max = PARAM_MAX_VALUE;
        SynthDefinition {
            id: SynthId::Cycle,
            params: vec![
                SynthParameter::new(SynthId::Cycle.label(), 0.0, 0.0, SYNTH_LAST),
                SynthParameter::new("volume", d.volume, 0.0, max),
                SynthParameter::new("wave amp", d.wave_amp, 0.0, max),
                SynthParameter::new("wave type", d.wave_type, 1.0, 9.0),
                SynthParameter::new("multiply", d.multiply, 0.0, max),
                SynthParameter::new("feedback", d.feedback, 0.0, max),
                SynthParameter::new("AM", d.am, 0.0, max),
                SynthParameter::new("loop type", d.loop_type, 1.0, 2.0),
            ],
        }
    }

    fn fm() -> Self {
        let d = FmParams::default();
        let max = PARAM_MAX_VALUE;
        SynthDefinition {
            id: SynthId::Fm,
            params: vec![
                SynthParameter::new(SynthId::Fm.label(), 1.0, 0.0, SYNTH_LAST),
                SynthParameter::new("volume", d.volume, 0.0, max),
                SynthParameter::new("size", d.size, 1.0, 12.0),
                SynthParameter::new("attack", d.attack, 0.0, max),
                SynthParameter::new("decay", d.decay, 1.0, max),
                SynthParameter::new("release", d.release, 0.0, max),
                SynthParameter::new("freq model", d.freq_model, 0.0, 4.0),
                SynthParameter::new("carrier freq", d.carrier_freq, 0.0, max),
                SynthParameter::new("  SIN SQ SAW TRI NOIZ", d.carrier_shape, 1.0, 5.0),
                SynthParameter::new("  AMP              ", d.carrier_amp, 0.0, max),
                SynthParameter::new("mod freq", d.mod_freq, 0.0, max),
                SynthParameter::new("  SIN SQ SAW TRI NOIZ", d.mod_shape, 1.0, 5.0),
                SynthParameter::new("  AMP             ", d.mod_amp, 0.0, max),
                SynthParameter::new("NO AM FM RI TRE VIB KS", d.modulation, 0.0, 6.0),
                SynthParameter::new("transient", d.transient, 0.0, max),
                SynthParameter::new("  SIZE           ", d.transient_size, 1.0, max),
                SynthParameter::new("feedback", d.feedback, 0.0, max),
                SynthParameter::new("delay", d.echo_level, 0.0, max),
                SynthParameter::new("  SIZE          ", d.echo_size, 0.0, max),
                SynthParameter::new("  FEEDBACK      ", d.echo_feedback, 0.1, max),
                SynthParameter::new("spacetime", d.spacetime, 0.0, max),
                SynthParameter::new("filter", d.filter, 0.0, max),
                SynthParameter::new("loop type", d.loop_type, 0.0, 3.0),
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Current slider values in slider order.
    pub fn values(&self) -> Vec<f32> {
        self.params.iter().map(|p| p.value).collect()
    }

    /// The selector slider (index 0).
    pub fn selector(&self) -> f32 {
        self.params.first().map_or(self.id as usize as f32, |p| p.value)
    }

    pub fn set_value(&mut self, index: usize, value: f32) -> Result<(), SynthError> {
        let count = self.params.len();
        match self.params.get_mut(index) {
            Some(param) => {
                param.value = value;
                Ok(())
            }
            None => Err(SynthError::UnknownParameter {
                synth: self.id,
                index,
                count,
            }),
        }
    }

    /// Overwrite slider values from the front; sliders past the end of
    /// `values` keep their current value.
    pub fn load_values(&mut self, values: &[f32]) {
        for (param, &value) in self.params.iter_mut().zip(values) {
            param.value = value;
        }
    }
}

/// Highest selector value.
pub const SYNTH_LAST: f32 = SynthId::Fm as usize as f32;

fn value_at(values: &[f32], index: usize, fallback: f32) -> f32 {
    values.get(index).copied().unwrap_or(fallback)
}

/// Typed view of the Cycle sliders (raw slider values).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CycleParams {
    pub volume: f32,
    pub wave_amp: f32,
    /// 1 sine, 2 square, 3 triangle, 4 sawtooth, 5 half-sine,
    /// 6 absolute-sine, 7..9 noise (white, pink, brown).
    pub wave_type: f32,
    pub multiply: f32,
    pub feedback: f32,
    pub am: f32,
    pub loop_type: f32,
}

impl Default for CycleParams {
    fn default() -> Self {
        CycleParams {
            volume: PARAM_MAX_VALUE / 2.0,
            wave_amp: 70.0,
            wave_type: 1.0,
            multiply: 0.0,
            feedback: 0.0,
            am: 0.0,
            loop_type: 1.0,
        }
    }
}

impl CycleParams {
    pub const COUNT: usize = 8;

    pub fn from_values(values: &[f32]) -> Self {
        let d = CycleParams::default();
        CycleParams {
            volume: value_at(values, 1, d.volume),
            wave_amp: value_at(values, 2, d.wave_amp),
            wave_type: value_at(values, 3, d.wave_type),
            multiply: value_at(values, 4, d.multiply),
            feedback: value_at(values, 5, d.feedback),
            am: value_at(values, 6, d.am),
            loop_type: value_at(values, 7, d.loop_type),
        }
    }

    /// Slider values, selector included.
    pub fn to_values(&self) -> Vec<f32> {
        vec![
            SynthId::Cycle as usize as f32,
            self.volume,
            self.wave_amp,
            self.wave_type,
            self.multiply,
            self.feedback,
            self.am,
            self.loop_type,
        ]
    }
}

/// Typed view of the FM sliders (raw slider values).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FmParams {
    pub volume: f32,
    /// Render length in sixths of a second.
    pub size: f32,
    pub attack: f32,
    pub decay: f32,
    pub release: f32,
    pub freq_model: f32,
    pub carrier_freq: f32,
    pub carrier_shape: f32,
    pub carrier_amp: f32,
    pub mod_freq: f32,
    pub mod_shape: f32,
    pub mod_amp: f32,
    pub modulation: f32,
    pub transient: f32,
    pub transient_size: f32,
    pub feedback: f32,
    /// Echo wet level (the "delay" slider).
    pub echo_level: f32,
    pub echo_size: f32,
    pub echo_feedback: f32,
    pub spacetime: f32,
    pub filter: f32,
    pub loop_type: f32,
}

impl Default for FmParams {
    fn default() -> Self {
        FmParams {
            volume: 42.0,
            size: 4.0,
            attack: 0.0,
            decay: 7.0,
            release: 9.0,
            freq_model: 0.0,
            carrier_freq: 24.0,
            carrier_shape: 1.0,
            carrier_amp: 92.0,
            mod_freq: 49.0,
            mod_shape: 1.0,
            mod_amp: 79.0,
            modulation: 3.0,
            transient: 92.0,
            transient_size: 15.0,
            feedback: 11.0,
            echo_level: 0.0,
            echo_size: 10.0,
            echo_feedback: 0.1,
            spacetime: 61.0,
            filter: 0.0,
            loop_type: 3.0,
        }
    }
}

impl FmParams {
    pub const COUNT: usize = 23;

    pub fn from_values(values: &[f32]) -> Self {
        let d = FmParams::default();
        FmParams {
            volume: value_at(values, 1, d.volume),
            size: value_at(values, 2, d.size),
            attack: value_at(values, 3, d.attack),
            decay: value_at(values, 4, d.decay),
            release: value_at(values, 5, d.release),
            freq_model: value_at(values, 6, d.freq_model),
            carrier_freq: value_at(values, 7, d.carrier_freq),
            carrier_shape: value_at(values, 8, d.carrier_shape),
            carrier_amp: value_at(values, 9, d.carrier_amp),
            mod_freq: value_at(values, 10, d.mod_freq),
            mod_shape: value_at(values, 11, d.mod_shape),
            mod_amp: value_at(values, 12, d.mod_amp),
            modulation: value_at(values, 13, d.modulation),
            transient: value_at(values, 14, d.transient),
            transient_size: value_at(values, 15, d.transient_size),
            feedback: value_at(values, 16, d.feedback),
            echo_level: value_at(values, 17, d.echo_level),
            echo_size: value_at(values, 18, d.echo_size),
            echo_feedback: value_at(values, 19, d.echo_feedback),
            spacetime: value_at(values, 20, d.spacetime),
            filter: value_at(values, 21, d.filter),
            loop_type: value_at(values, 22, d.loop_type),
        }
    }

    /// Slider values, selector included.
    pub fn to_values(&self) -> Vec<f32> {
        vec![
            SynthId::Fm as usize as f32,
            self.volume,
            self.size,
            self.attack,
            self.decay,
            self.release,
            self.freq_model,
            self.carrier_freq,
            self.carrier_shape,
            self.carrier_amp,
            self.mod_freq,
            self.mod_shape,
            self.mod_amp,
            self.modulation,
            self.transient,
            self.transient_size,
            self.feedback,
            self.echo_level,
            self.echo_size,
            self.echo_feedback,
            self.spacetime,
            self.filter,
            self.loop_type,
        ]
    }
}
