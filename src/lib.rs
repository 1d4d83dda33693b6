pub mod dsp;
pub mod editor;
pub mod error;
pub mod params;
pub mod preset;
pub mod synth;

pub use crate::editor::{SampleBuffer, SampleEditor};
pub use crate::error::{PresetError, SynthError};
pub use crate::params::{SynthDefinition, SynthId};
pub use crate::synth::{EngineConfig, ProcessOutcome, RenderReport, Synth};

use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the tracker_synth version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// Render an ASCII preset into a fresh sample and return its frames.
pub fn render_preset(preset: &str, config: EngineConfig) -> Result<Vec<f32>, SynthError> {
    let mut synth = Synth::new(config);
    let id = synth.import_ascii(preset)?;
    let mut editor = SampleBuffer::new(config.noise_seed);
    synth.process(&mut editor, Some(id), None)?;
    Ok(editor.into_samples())
}

fn wasm_config(sample_rate: u32) -> EngineConfig {
    EngineConfig {
        sample_rate,
        ..EngineConfig::default()
    }
}

/// WASM-exposed: render an ASCII preset to mono f32 samples.
#[wasm_bindgen]
pub fn render_preset_samples(preset: &str, sample_rate: u32) -> Result<Vec<f32>, JsValue> {
    render_preset(preset, wasm_config(sample_rate)).map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// WASM-exposed: render an ASCII preset to a WAV byte array.
#[wasm_bindgen]
pub fn render_preset_wav(preset: &str, sample_rate: u32) -> Result<Vec<u8>, JsValue> {
    let samples = render_preset_samples(preset, sample_rate)?;
    Ok(dsp::renderer::render_wav(&samples, sample_rate))
}

/// WASM-exposed: slider definitions of every synth, for building the dialog.
#[wasm_bindgen]
pub fn synth_definitions() -> Result<JsValue, JsValue> {
    let synth = Synth::default();
    serde_wasm_bindgen::to_value(synth.definitions()).map_err(|e| JsValue::from_str(&format!("{e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_preset_cycle() {
        let samples = render_preset(" O", EngineConfig::default()).unwrap();
        assert_eq!(samples.len(), synth::CYCLE_LENGTH);
        assert!(samples.iter().any(|&x| x != 0.0));
    }

    #[test]
    fn render_preset_fm_defaults() {
        let config = EngineConfig {
            sample_rate: 8000,
            ..EngineConfig::default()
        };
        let samples = render_preset("!", config).unwrap();
        assert_eq!(samples.len(), (8000 / 6) * 4);
        assert!(samples.iter().all(|x| x.is_finite() && x.abs() <= 1.0));
    }

    #[test]
    fn render_preset_rejects_garbage() {
        assert!(matches!(
            render_preset("\u{7f}", EngineConfig::default()),
            Err(SynthError::Preset(PresetError::UnprintableChar { pos: 0, .. }))
        ));
    }

    #[test]
    fn wav_from_preset() {
        let wav = render_preset_wav(" O", 22050).unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(wav.len(), 44 + synth::CYCLE_LENGTH * 2);
    }

    #[test]
    fn config_from_json_fills_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"sample_rate": 48000}"#).unwrap();
        assert_eq!(config.sample_rate, 48000);
        assert!(!config.additive);
        assert_eq!(config.noise_seed, EngineConfig::default().noise_seed);
    }
}
