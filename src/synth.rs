//! Synth dispatcher: the render session that owns the slider sets and
//! writes synthesized audio into a `SampleEditor`.
//!
//! ```text
//! sliders ─► typed params ─► FmControls ─► dry render ─► [reverb] ─► mix into editor
//!                         └► Cycle: base wave ─► foldback/AM ─► editor
//! ```

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::dsp::convolver::Convolver;
use crate::dsp::fm::{FmControls, render_dry};
use crate::editor::{BaseWave, NoiseKind, SampleEditor};
use crate::error::SynthError;
use crate::params::{
    CycleParams, FmParams, LoopType, PARAM_MAX_VALUE, SynthDefinition, SynthId, normalize,
    normalize_finite,
};
use crate::preset::{self, Preset, PresetDocument};

/// Length of a freshly prepared Cycle sample, in frames.
pub const CYCLE_LENGTH: usize = 100;

/// Spacetime above which the reverb runs.
const REVERB_THRESHOLD: f32 = 0.04;

/// Impulse response length at full spacetime.
const REVERB_MAX_SIZE: f32 = 50_000.0;

/// Spacetime above which forward-loop overflow grows past the default.
const OVERFLOW_SPACETIME: f32 = 0.1;

const DEFAULT_OVERFLOW: usize = 3;

/// Engine-wide settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sample rate every curve is computed against.
    pub sample_rate: u32,
    /// Render on top of the existing sample instead of preparing a new one.
    pub additive: bool,
    /// Seed for the noise oscillator and the reverb room.
    pub noise_seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            sample_rate: 44100,
            additive: false,
            noise_seed: 0x5EED,
        }
    }
}

/// What a render did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderReport {
    pub synth: SynthId,
    /// Length of the written sample.
    pub nominal_samples: usize,
    /// Upper bound of rendered frames including loop overflow.
    pub frame_capacity: usize,
    /// Frames actually rendered; below capacity when overflow ended on silence.
    pub frames_rendered: usize,
    pub reverb_applied: bool,
}

/// Result of `Synth::process`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The selector named another synth. The sample was cleared and the
    /// parameter dialog should be rebuilt for `to`; nothing was rendered.
    Switched { from: SynthId, to: SynthId },
    Rendered(RenderReport),
}

/// Slider sets for every synth plus the one currently shown.
#[derive(Debug, Clone)]
pub struct Synth {
    config: EngineConfig,
    definitions: Vec<SynthDefinition>,
    active: SynthId,
}

impl Synth {
    pub fn new(config: EngineConfig) -> Self {
        Synth {
            config,
            definitions: SynthId::ALL.iter().map(|&id| SynthDefinition::new(id)).collect(),
            active: SynthId::Fm,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn active(&self) -> SynthId {
        self.active
    }

    pub fn definitions(&self) -> &[SynthDefinition] {
        &self.definitions
    }

    pub fn definition(&self, id: SynthId) -> &SynthDefinition {
        &self.definitions[id.index()]
    }

    pub fn definition_mut(&mut self, id: SynthId) -> &mut SynthDefinition {
        &mut self.definitions[id.index()]
    }

    /// Set a slider of the active synth.
    pub fn set_param(&mut self, index: usize, value: f32) -> Result<(), SynthError> {
        let active = self.active;
        self.definition_mut(active).set_value(index, value)
    }

    /// Load an ASCII preset into its synth and make that synth active.
    pub fn import_ascii(&mut self, ascii: &str) -> Result<SynthId, SynthError> {
        let preset = preset::decode_ascii(ascii)?;
        Ok(self.load_preset(preset))
    }

    /// ASCII preset of the active synth.
    pub fn export_ascii(&self) -> String {
        preset::encode_ascii(self.definition(self.active))
    }

    pub fn import_json(&mut self, json: &str) -> Result<SynthId, SynthError> {
        let doc = PresetDocument::from_json(json)?;
        Ok(self.load_preset(doc.preset()?))
    }

    pub fn export_json(&self, name: &str) -> Result<String, SynthError> {
        PresetDocument::from_definition(name, self.definition(self.active)).to_json()
    }

    fn load_preset(&mut self, preset: Preset) -> SynthId {
        let id = preset.synth;
        let definition = self.definition_mut(id);
        definition.load_values(&preset.values);
        if let Some(selector) = definition.params.first_mut() {
            selector.value = id.index() as f32;
        }
        self.active = id;
        info!("preset: loaded {} values into {id:?}", preset.values.len());
        id
    }

    /// Run the synth named by `synth`, or by the active selector slider when
    /// `None`. A `preset` is imported first.
    ///
    /// If that synth is not the active one, this only switches: a non-empty
    /// sample is cleared (select all, cut) and `ProcessOutcome::Switched` is
    /// returned without rendering.
    pub fn process<E: SampleEditor>(
        &mut self,
        editor: &mut E,
        synth: Option<SynthId>,
        preset: Option<&str>,
    ) -> Result<ProcessOutcome, SynthError> {
        if let Some(preset) = preset {
            self.import_ascii(preset)?;
        }

        let requested =
            synth.unwrap_or_else(|| SynthId::from_value(self.definition(self.active).selector()));
        if requested != self.active {
            if !editor.is_empty_sample() {
                editor.select_all();
                editor.cut();
            }
            let from = self.active;
            self.active = requested;
            self.definition_mut(requested).set_value(0, requested.index() as f32)?;
            info!("synth: switched {from:?} -> {requested:?}");
            return Ok(ProcessOutcome::Switched { from, to: requested });
        }

        let report = match self.active {
            SynthId::Cycle => self.render_cycle(editor)?,
            SynthId::Fm => self.render_fm(editor)?,
        };
        Ok(ProcessOutcome::Rendered(report))
    }

    fn target_len<E: SampleEditor>(&self, editor: &mut E, len: usize) -> Result<usize, SynthError> {
        if editor.is_empty_sample() || !self.config.additive {
            editor.prepare_sample(len)
        } else {
            Ok(editor.sample_len())
        }
    }

    fn render_cycle<E: SampleEditor>(&self, editor: &mut E) -> Result<RenderReport, SynthError> {
        let p = CycleParams::from_values(&self.definition(SynthId::Cycle).values());
        let len = self.target_len(editor, CYCLE_LENGTH)?;

        editor.generate(cycle_wave(p.wave_type), normalize(p.wave_amp), 1.0 + p.multiply);

        let scale = 2.0 * normalize(p.volume);
        let foldback = 1.0 + p.feedback * 2.0;
        let am = normalize(p.am);
        for i in 0..len {
            let mut v = (editor.float_sample(i) * foldback).sin();
            if p.am >= 1.0 {
                v *= ((i / 2) as f32 * am).sin();
            }
            editor.set_float_sample(i, v * scale);
        }

        editor.set_loop_type(LoopType::from_value(p.loop_type));
        editor.set_repeat_start(0);
        editor.set_repeat_end(len);
        editor.notify_changed();

        debug!("cycle: {len} frames, wave type {}", p.wave_type);
        Ok(RenderReport {
            synth: SynthId::Cycle,
            nominal_samples: len,
            frame_capacity: len,
            frames_rendered: len,
            reverb_applied: false,
        })
    }

    fn render_fm<E: SampleEditor>(&self, editor: &mut E) -> Result<RenderReport, SynthError> {
        let p = FmParams::from_values(&self.definition(SynthId::Fm).values());
        let sr = self.config.sample_rate;
        let seed = self.config.noise_seed;
        let controls = FmControls::from_params(&p, sr);

        let nominal = fm_length(sr, p.size)?;
        let overflow = overflow_factor(LoopType::from_value(p.loop_type), controls.spacetime);
        let capacity = overflow.checked_mul(nominal).ok_or(SynthError::Allocation {
            samples: usize::MAX,
            purpose: "fm overflow",
        })?;
        if nominal == 0 {
            warn!("fm: size {} gives an empty render", p.size);
        }

        // Everything that can fail runs before the target is touched.
        let dry = render_dry(&controls, sr, nominal, capacity, seed)?;
        let spacetime = controls.spacetime;
        let reverb_applied = spacetime > REVERB_THRESHOLD;
        let wet = if reverb_applied {
            let size = (spacetime.min(1.0) * REVERB_MAX_SIZE) as usize;
            Some(Convolver::new(size, seed).process(&dry.samples)?)
        } else {
            None
        };
        let len = self.target_len(editor, nominal)?;

        let scale = drive(normalize_finite(p.volume));
        let dry_gain = 1.0 - spacetime * spacetime * spacetime;
        let wet_gain = spacetime * spacetime * 2.0;
        for (i, &x) in dry.samples.iter().enumerate() {
            let mixed = match &wet {
                Some(wet) => x * dry_gain + wet[i] * wet_gain,
                None => x,
            };
            let j = i % nominal;
            let old = editor.float_sample(j);
            editor.set_float_sample(j, old + mixed * scale);
        }

        if p.loop_type >= 1.0 {
            editor.set_repeat_start(0);
            editor.set_repeat_end(len);
        }
        editor.set_loop_type(LoopType::from_value(p.loop_type));
        editor.notify_changed();

        debug!(
            "fm: {nominal} nominal frames, {}/{capacity} rendered, reverb {reverb_applied}",
            dry.frames_rendered
        );
        Ok(RenderReport {
            synth: SynthId::Fm,
            nominal_samples: nominal,
            frame_capacity: capacity,
            frames_rendered: dry.frames_rendered,
            reverb_applied,
        })
    }
}

impl Default for Synth {
    fn default() -> Self {
        Synth::new(EngineConfig::default())
    }
}

/// Nominal FM length: a sixth of a second per size step. The size is held
/// to `[0, PARAM_MAX_VALUE]`; NaN renders nothing.
fn fm_length(sample_rate: u32, size: f32) -> Result<usize, SynthError> {
    let steps = if size.is_nan() {
        0
    } else {
        size.clamp(0.0, PARAM_MAX_VALUE) as usize
    };
    ((sample_rate / 6) as usize)
        .checked_mul(steps)
        .ok_or(SynthError::Allocation {
            samples: usize::MAX,
            purpose: "fm render",
        })
}

/// Exponential volume drive: linear below, cubic boost above.
fn drive(volume: f32) -> f32 {
    volume + (3.0 * volume * volume * volume).max(0.0)
}

/// How many nominal lengths a render may run. Only forward loops overflow,
/// longer with more reverb so the tail can fade before the seam.
fn overflow_factor(loop_type: LoopType, spacetime: f32) -> usize {
    if loop_type != LoopType::Forward {
        return 1;
    }
    let spacetime = spacetime.clamp(0.0, 1.0);
    if spacetime > OVERFLOW_SPACETIME {
        (1.0 + spacetime * 10.0) as usize
    } else {
        DEFAULT_OVERFLOW
    }
}

/// Cycle wave type slider to generator. Unknown types fall back to sine.
fn cycle_wave(wave_type: f32) -> BaseWave {
    match wave_type as i64 {
        2 => BaseWave::Square,
        3 => BaseWave::Triangle,
        4 => BaseWave::Sawtooth,
        5 => BaseWave::HalfSine,
        6 => BaseWave::AbsoluteSine,
        n @ 7..=9 => BaseWave::Noise(NoiseKind::from_index(n - 7)),
        _ => BaseWave::Sine,
    }
}
