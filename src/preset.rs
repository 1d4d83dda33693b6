//! Synth presets.
//!
//! Two notations carry the same data, a synth id plus its slider values:
//!
//! - the compact ASCII form, one printable character per slider
//!   (`' '` = 0 … `'~'` = 94) with the selector first, e.g. `"!(6 ..."`;
//! - `PresetDocument`, a named JSON record for storage and the web UI.

use serde::{Deserialize, Serialize};

use crate::error::{PresetError, SynthError};
use crate::params::{PARAM_MAX_VALUE, SynthDefinition, SynthId};

const FIRST_CHAR: u32 = ' ' as u32;
const LAST_CHAR: u32 = '~' as u32;

/// A decoded preset: which synth, and its slider values selector first.
#[derive(Debug, Clone, PartialEq)]
pub struct Preset {
    pub synth: SynthId,
    pub values: Vec<f32>,
}

/// Decode the ASCII notation. Shorter presets are fine (remaining sliders
/// keep their values); longer ones are rejected.
pub fn decode_ascii(preset: &str) -> Result<Preset, PresetError> {
    let mut values = Vec::with_capacity(preset.len());
    for (pos, ch) in preset.chars().enumerate() {
        let code = ch as u32;
        if !(FIRST_CHAR..=LAST_CHAR).contains(&code) {
            return Err(PresetError::UnprintableChar { ch, pos });
        }
        values.push((code - FIRST_CHAR) as f32);
    }

    let Some(&selector) = values.first() else {
        return Err(PresetError::Empty);
    };
    let synth = SynthId::from_value(selector);
    check_count(synth, values.len())?;
    Ok(Preset { synth, values })
}

/// Encode slider values, rounding and clamping each into `0..=94`.
pub fn encode_ascii(definition: &SynthDefinition) -> String {
    definition
        .params
        .iter()
        .map(|p| {
            let v = if p.value.is_finite() {
                p.value.round().clamp(0.0, PARAM_MAX_VALUE) as u32
            } else {
                0
            };
            char::from_u32(FIRST_CHAR + v).unwrap_or(' ')
        })
        .collect()
}

fn check_count(synth: SynthId, count: usize) -> Result<(), PresetError> {
    let max = synth.param_count();
    if count > max {
        return Err(PresetError::TooManyValues { synth, count, max });
    }
    Ok(())
}

/// Named preset in JSON form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetDocument {
    pub name: String,
    pub synth: SynthId,
    /// Slider values, selector first.
    pub values: Vec<f32>,
}

impl PresetDocument {
    pub fn from_definition(name: &str, definition: &SynthDefinition) -> Self {
        PresetDocument {
            name: name.to_string(),
            synth: definition.id,
            values: definition.values(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, SynthError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, SynthError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validated preset. The document's `synth` field wins over its first value.
    pub fn preset(&self) -> Result<Preset, PresetError> {
        check_count(self.synth, self.values.len())?;
        Ok(Preset {
            synth: self.synth,
            values: self.values.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::FmParams;

    #[test]
    fn decodes_chars_to_values() {
        let preset = decode_ascii("!*~ ").unwrap();
        assert_eq!(preset.synth, SynthId::Fm);
        assert_eq!(preset.values, vec![1.0, 10.0, 94.0, 0.0]);
    }

    #[test]
    fn selector_picks_synth() {
        assert_eq!(decode_ascii(" a").unwrap().synth, SynthId::Cycle);
        assert_eq!(decode_ascii("%").unwrap().synth, SynthId::Fm);
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(decode_ascii(""), Err(PresetError::Empty));
    }

    #[test]
    fn rejects_unprintable() {
        assert_eq!(
            decode_ascii("!ab\tc"),
            Err(PresetError::UnprintableChar { ch: '\t', pos: 3 })
        );
        assert_eq!(
            decode_ascii("!é"),
            Err(PresetError::UnprintableChar { ch: 'é', pos: 1 })
        );
    }

    #[test]
    fn rejects_too_many_values() {
        let cycle = " ".repeat(9);
        assert_eq!(
            decode_ascii(&cycle),
            Err(PresetError::TooManyValues { synth: SynthId::Cycle, count: 9, max: 8 })
        );
        assert!(decode_ascii(&"!".repeat(23)).is_ok());
    }

    #[test]
    fn encode_matches_defaults() {
        let def = SynthDefinition::new(SynthId::Fm);
        let ascii = encode_ascii(&def);
        assert_eq!(ascii.len(), FmParams::COUNT);
        let decoded = decode_ascii(&ascii).unwrap();
        let expected: Vec<f32> = def.values().iter().map(|v| v.round()).collect();
        assert_eq!(decoded.values, expected);
    }

    #[test]
    fn encode_clamps() {
        let mut def = SynthDefinition::new(SynthId::Cycle);
        def.set_value(1, 500.0).unwrap();
        def.set_value(2, -3.0).unwrap();
        def.set_value(3, f32::NAN).unwrap();
        let ascii = encode_ascii(&def);
        assert_eq!(&ascii[1..4], "~  ");
    }

    #[test]
    fn document_json() {
        let def = SynthDefinition::new(SynthId::Cycle);
        let doc = PresetDocument::from_definition("pad", &def);
        let json = doc.to_json().unwrap();
        assert!(json.contains("\"synth\": \"cycle\""), "got {json}");
        assert_eq!(PresetDocument::from_json(&json).unwrap(), doc);
    }

    #[test]
    fn document_validates_length() {
        let doc = PresetDocument {
            name: "long".into(),
            synth: SynthId::Cycle,
            values: vec![0.0; 12],
        };
        assert!(matches!(doc.preset(), Err(PresetError::TooManyValues { count: 12, .. })));
    }

    #[test]
    fn bad_json_is_an_error() {
        assert!(matches!(
            PresetDocument::from_json("{ nope"),
            Err(SynthError::Json(_))
        ));
    }
}
