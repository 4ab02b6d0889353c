// Closed catalog of synth presets.
//
// A preset fully describes one timbre: the synthesis engine and its
// parameters, an optional filter, the amplitude envelope and the effects
// settings. Engines are a tagged sum type so the voice factory can match on
// them exhaustively. Selecting a preset by id is the only way callers
// change timbre; an unknown id resolves to the default (celestial pad).

use crate::config::{ChorusConfig, EffectsConfig, EnvelopeConfig, ReverbConfig, Waveform};
use crate::filter::{FilterConfig, FilterKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PresetId {
    CelestialPad,
    CrystalBells,
    EtherealStrings,
    EarthBass,
}

impl PresetId {
    pub const ALL: [PresetId; 4] = [
        PresetId::CelestialPad,
        PresetId::CrystalBells,
        PresetId::EtherealStrings,
        PresetId::EarthBass,
    ];

    pub const DEFAULT: PresetId = PresetId::CelestialPad;

    pub fn as_str(self) -> &'static str {
        match self {
            PresetId::CelestialPad => "celestial-pad",
            PresetId::CrystalBells => "crystal-bells",
            PresetId::EtherealStrings => "ethereal-strings",
            PresetId::EarthBass => "earth-bass",
        }
    }
}

impl fmt::Display for PresetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PresetId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        PresetId::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown preset: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetCategory {
    Pads,
    Bells,
    Strings,
    Bass,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OscillatorLayer {
    pub waveform: Waveform,
    /// Detune in cents.
    pub detune: f32,
    pub gain: f32,
    /// Octave shift relative to the played note.
    #[serde(default)]
    pub octave: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EngineConfig {
    Oscillator {
        waveform: Waveform,
    },
    #[serde(rename_all = "camelCase")]
    Fm {
        /// Modulator frequency as a multiple of the carrier.
        harmonicity: f32,
        modulation_index: f32,
        carrier: Waveform,
        modulator: Waveform,
        modulation_envelope: EnvelopeConfig,
    },
    Layered {
        layers: Vec<OscillatorLayer>,
    },
}

impl EngineConfig {
    pub fn oscillator_count(&self) -> usize {
        match self {
            EngineConfig::Oscillator { .. } => 1,
            EngineConfig::Fm { .. } => 2,
            EngineConfig::Layered { layers } => layers.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthPreset {
    pub id: PresetId,
    pub name: String,
    pub category: PresetCategory,
    pub engine: EngineConfig,
    pub filter: Option<FilterConfig>,
    pub envelope: EnvelopeConfig,
    pub effects: EffectsConfig,
}

fn env(attack: f32, decay: f32, sustain: f32, release: f32) -> EnvelopeConfig {
    EnvelopeConfig {
        attack,
        decay,
        sustain,
        release,
    }
}

fn layer(waveform: Waveform, detune: f32, gain: f32, octave: i32) -> OscillatorLayer {
    OscillatorLayer {
        waveform,
        detune,
        gain,
        octave,
    }
}

fn lowpass(frequency: f32, q: f32) -> Option<FilterConfig> {
    Some(FilterConfig {
        kind: FilterKind::Lowpass,
        frequency,
        q,
    })
}

fn effects(reverb: (f32, f32), chorus: Option<(f32, f32, f32)>) -> EffectsConfig {
    let (frequency, delay_time, depth) = chorus.unwrap_or((1.0, 3.5, 0.5));
    EffectsConfig {
        reverb: ReverbConfig {
            enabled: true,
            room_size: reverb.0,
            wet: reverb.1,
        },
        chorus: ChorusConfig {
            enabled: chorus.is_some(),
            frequency,
            delay_time,
            depth,
        },
    }
}

/// Look up a preset by id.
pub fn preset(id: PresetId) -> SynthPreset {
    use Waveform::*;
    match id {
        PresetId::CelestialPad => SynthPreset {
            id,
            name: "Celestial Pad".to_string(),
            category: PresetCategory::Pads,
            engine: EngineConfig::Layered {
                layers: vec![
                    layer(Sine, -5.0, 0.4, 0),
                    layer(Sine, 5.0, 0.4, 0),
                    layer(Triangle, 0.0, 0.3, 1),
                ],
            },
            filter: lowpass(2000.0, 1.0),
            envelope: env(0.8, 0.5, 0.8, 2.0),
            effects: effects((4.0, 0.6), Some((0.5, 3.5, 0.7))),
        },
        PresetId::CrystalBells => SynthPreset {
            id,
            name: "Crystal Bells".to_string(),
            category: PresetCategory::Bells,
            engine: EngineConfig::Fm {
                harmonicity: 8.0,
                modulation_index: 20.0,
                carrier: Sine,
                modulator: Sine,
                modulation_envelope: env(0.001, 0.4, 0.0, 0.5),
            },
            filter: None,
            envelope: env(0.001, 0.8, 0.1, 1.5),
            effects: effects((5.0, 0.7), None),
        },
        PresetId::EtherealStrings => SynthPreset {
            id,
            name: "Ethereal Strings".to_string(),
            category: PresetCategory::Strings,
            engine: EngineConfig::Layered {
                layers: vec![
                    layer(Sawtooth, -10.0, 0.25, 0),
                    layer(Sawtooth, 0.0, 0.3, 0),
                    layer(Sawtooth, 10.0, 0.25, 0),
                    layer(Sawtooth, 0.0, 0.2, 1),
                ],
            },
            filter: lowpass(3000.0, 0.7),
            envelope: env(0.4, 0.3, 0.7, 1.0),
            effects: effects((3.0, 0.4), Some((2.0, 2.5, 0.5))),
        },
        PresetId::EarthBass => SynthPreset {
            id,
            name: "Earth Bass".to_string(),
            category: PresetCategory::Bass,
            engine: EngineConfig::Layered {
                layers: vec![
                    layer(Sine, 0.0, 0.6, -1),
                    layer(Triangle, 0.0, 0.3, 0),
                    layer(Sawtooth, 0.0, 0.1, 0),
                ],
            },
            filter: lowpass(800.0, 2.0),
            envelope: env(0.05, 0.3, 0.6, 0.8),
            effects: effects((1.5, 0.2), None),
        },
    }
}

pub fn all_presets() -> Vec<SynthPreset> {
    PresetId::ALL.into_iter().map(preset).collect()
}

pub fn presets_by_category() -> BTreeMap<PresetCategory, Vec<SynthPreset>> {
    let mut grouped: BTreeMap<PresetCategory, Vec<SynthPreset>> = BTreeMap::new();
    for p in all_presets() {
        grouped.entry(p.category).or_default().push(p);
    }
    grouped
}

/// Resolve a preset name, falling back to the default for unknown names.
pub fn preset_or_default(name: &str) -> SynthPreset {
    preset(name.parse().unwrap_or(PresetId::DEFAULT))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_ids_match() {
        for id in PresetId::ALL {
            assert_eq!(preset(id).id, id);
            assert_eq!(id.as_str().parse::<PresetId>().unwrap(), id);
        }
    }

    #[test]
    fn test_unknown_falls_back_to_default() {
        assert_eq!(preset_or_default("kazoo").id, PresetId::CelestialPad);
        assert_eq!(preset_or_default("Earth-Bass").id, PresetId::EarthBass);
    }

    #[test]
    fn test_by_category() {
        let grouped = presets_by_category();
        assert_eq!(grouped.len(), 4);
        assert_eq!(grouped[&PresetCategory::Bells][0].id, PresetId::CrystalBells);
    }

    #[test]
    fn test_engine_json_is_tagged() {
        let json = serde_json::to_value(&preset(PresetId::CrystalBells).engine).unwrap();
        assert_eq!(json["type"], "fm");
        assert_eq!(json["modulationIndex"], 20.0);
        let pad = serde_json::to_value(&preset(PresetId::CelestialPad)).unwrap();
        assert_eq!(pad["id"], "celestial-pad");
        assert_eq!(pad["engine"]["layers"][2]["octave"], 1);
    }

    #[test]
    fn test_oscillator_counts() {
        assert_eq!(preset(PresetId::EtherealStrings).engine.oscillator_count(), 4);
        assert_eq!(preset(PresetId::CrystalBells).engine.oscillator_count(), 2);
    }
}
