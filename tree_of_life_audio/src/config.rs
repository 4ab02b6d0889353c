// Data-driven audio configuration.
//
// Two timbres are configured independently: single notes (path clicks) and
// chords (sephirah clicks). Every tunable number lives here with its shipped
// default in `Default`; the engine reads these values rather than carrying
// constants of its own. Times are milliseconds for scheduling fields
// (`duration`, delays, disposal buffers) and seconds for envelope stages, to
// match how they are authored.
//
// JSON field names are camelCase. Missing fields fall back to defaults, so
// a config file only needs the values it changes. `validate` rejects ranges
// the engine cannot honor and reports every problem at once.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Triangle,
    Sawtooth,
    Square,
}

/// ADSR stage times in seconds; sustain is a level in 0..=1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeConfig {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReverbConfig {
    pub enabled: bool,
    /// Decay time in seconds.
    pub room_size: f32,
    pub wet: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChorusConfig {
    pub enabled: bool,
    /// LFO rate in Hz.
    pub frequency: f32,
    /// Base delay in milliseconds.
    pub delay_time: f32,
    pub depth: f32,
}

/// What the effects chain factory needs from a timbre.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectsConfig {
    pub reverb: ReverbConfig,
    pub chorus: ChorusConfig,
}

/// What the simple voice factory needs from a timbre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceConfig {
    pub waveform: Waveform,
    pub envelope: EnvelopeConfig,
    pub gain: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStyle {
    Simultaneous,
    Arpeggio,
    Roll,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NoteConfig {
    pub octaves: usize,
    pub base_octave: i32,
    /// Hold time before release, ms.
    pub duration: u64,
    pub waveform: Waveform,
    pub envelope: EnvelopeConfig,
    pub gain: f32,
    pub reverb: ReverbConfig,
    pub chorus: ChorusConfig,
    /// Extra time after `duration` before a voice is disposed, ms.
    pub disposal_buffer: u64,
}

impl Default for NoteConfig {
    fn default() -> Self {
        NoteConfig {
            octaves: 1,
            base_octave: 4,
            duration: 1000,
            waveform: Waveform::Sine,
            envelope: EnvelopeConfig {
                attack: 0.3,
                decay: 0.3,
                sustain: 0.8,
                release: 1.5,
            },
            gain: 0.15,
            reverb: ReverbConfig {
                enabled: true,
                room_size: 0.7,
                wet: 0.3,
            },
            chorus: ChorusConfig {
                enabled: true,
                frequency: 1.5,
                delay_time: 3.5,
                depth: 0.7,
            },
            disposal_buffer: 1000,
        }
    }
}

impl NoteConfig {
    pub fn voice(&self) -> VoiceConfig {
        VoiceConfig {
            waveform: self.waveform,
            envelope: self.envelope,
            gain: self.gain,
        }
    }

    pub fn effects(&self) -> EffectsConfig {
        EffectsConfig {
            reverb: self.reverb,
            chorus: self.chorus,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChordConfig {
    pub octaves: usize,
    pub base_octave: i32,
    pub duration: u64,
    pub waveform: Waveform,
    pub envelope: EnvelopeConfig,
    pub gain: f32,
    pub reverb: ReverbConfig,
    pub chorus: ChorusConfig,
    pub style: PlaybackStyle,
    /// Gap between successive voiced notes in arpeggio style, ms.
    pub arpeggio_delay: u64,
    /// Gap between successive voiced notes in roll style, ms.
    pub roll_delay: u64,
    /// Safety margin after the release tail before disposal, ms.
    pub disposal_buffer: u64,
}

impl Default for ChordConfig {
    fn default() -> Self {
        ChordConfig {
            octaves: 2,
            base_octave: 4,
            duration: 3000,
            waveform: Waveform::Sine,
            envelope: EnvelopeConfig {
                attack: 0.5,
                decay: 0.4,
                sustain: 0.7,
                release: 2.0,
            },
            gain: 0.12,
            reverb: ReverbConfig {
                enabled: true,
                room_size: 0.8,
                wet: 0.4,
            },
            chorus: ChorusConfig {
                enabled: true,
                frequency: 1.2,
                delay_time: 4.0,
                depth: 0.8,
            },
            style: PlaybackStyle::Simultaneous,
            arpeggio_delay: 150,
            roll_delay: 100,
            disposal_buffer: 500,
        }
    }
}

impl ChordConfig {
    pub fn voice(&self) -> VoiceConfig {
        VoiceConfig {
            waveform: self.waveform,
            envelope: self.envelope,
            gain: self.gain,
        }
    }

    pub fn effects(&self) -> EffectsConfig {
        EffectsConfig {
            reverb: self.reverb,
            chorus: self.chorus,
        }
    }

    /// Trigger offset of the `index`-th voiced note under the current style.
    pub fn trigger_delay(&self, index: usize) -> u64 {
        let step = match self.style {
            PlaybackStyle::Simultaneous => 0,
            PlaybackStyle::Arpeggio => self.arpeggio_delay,
            PlaybackStyle::Roll => self.roll_delay,
        };
        step * index as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub note: NoteConfig,
    pub chord: ChordConfig,
}

impl AudioConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: AudioConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();
        let n = &self.note;
        check_timbre(
            "note",
            n.octaves,
            n.base_octave,
            n.duration,
            &n.envelope,
            n.gain,
            &n.effects(),
            &mut problems,
        );
        let c = &self.chord;
        check_timbre(
            "chord",
            c.octaves,
            c.base_octave,
            c.duration,
            &c.envelope,
            c.gain,
            &c.effects(),
            &mut problems,
        );
        if c.arpeggio_delay == 0 || c.roll_delay == 0 {
            problems.push("chord: arpeggio and roll delays must be positive".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidConfig(problems.join("; ")))
        }
    }
}

/// Longest reverb decay a config may ask for, seconds.
const MAX_REVERB_DECAY: f32 = 10.0;

#[allow(clippy::too_many_arguments)]
fn check_timbre(
    label: &str,
    octaves: usize,
    base_octave: i32,
    duration: u64,
    envelope: &EnvelopeConfig,
    gain: f32,
    effects: &EffectsConfig,
    problems: &mut Vec<String>,
) {
    let unit = |x: f32| (0.0..=1.0).contains(&x);
    if !(1..=7).contains(&octaves) {
        problems.push(format!("{label}: octaves must be 1-7, got {octaves}"));
    }
    if !(0..=8).contains(&base_octave) {
        problems.push(format!("{label}: base octave must be 0-8, got {base_octave}"));
    }
    if duration == 0 {
        problems.push(format!("{label}: duration must be positive"));
    }
    let e = envelope;
    if e.attack < 0.0 || e.decay < 0.0 || e.release < 0.0 || !unit(e.sustain) {
        problems.push(format!("{label}: envelope out of range"));
    }
    if !unit(gain) {
        problems.push(format!("{label}: gain must be 0-1, got {gain}"));
    }
    let r = &effects.reverb;
    if !(r.room_size > 0.0 && r.room_size <= MAX_REVERB_DECAY) {
        problems.push(format!(
            "{label}: reverb room size must be 0-{MAX_REVERB_DECAY} s, got {}",
            r.room_size
        ));
    }
    if !unit(r.wet) {
        problems.push(format!("{label}: reverb wet must be 0-1, got {}", r.wet));
    }
    let ch = &effects.chorus;
    if ch.frequency <= 0.0 || ch.delay_time <= 0.0 || !unit(ch.depth) {
        problems.push(format!("{label}: chorus out of range"));
    }
}
