// Synth voices: the unit the engine creates, schedules and disposes.
//
// A voice is a sound source shaped by an ADSR envelope and scaled by an
// output gain, routed to one effects chain. Two varieties share that
// contract:
//
// - `Simple`: one oscillator of a configured waveform.
// - `Preset`: the engine described by a `SynthPreset` (plain oscillator,
//   two-operator FM, or detuned layers) with an optional filter ahead of
//   the output gain.
//
// Lifecycle is Created -> Running -> Disposed. Disposal releases the
// oscillators and is idempotent, so the per-voice timer and a global stop
// can race without harm. A disposed voice renders silence and reports no
// oscillators.

use crate::config::{EnvelopeConfig, VoiceConfig};
use crate::envelope::Envelope;
use crate::filter::VoiceFilter;
use crate::oscillator::Oscillator;
use crate::preset::{EngineConfig, OscillatorLayer, SynthPreset};
use std::f32::consts::TAU;
use std::fmt;
use tracing::warn;
use tree_of_life_music::pitch::Note;

/// Identifies an effects chain owned by the engine.
pub type ChainId = u64;

/// Identifies one voice: a creation serial plus the note, octave and start
/// time it was built for. The serial alone is unique; ordering by it gives
/// creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VoiceId {
    pub serial: u64,
    pub note: Note,
    pub octave: i32,
    pub started_at_ms: u64,
}

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}-{}-{}",
            self.note, self.octave, self.started_at_ms, self.serial
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Created,
    Running,
    Disposed,
}

/// Envelope, gain and routing shared by both voice kinds.
#[derive(Debug, Clone)]
struct VoiceCore {
    frequency: f32,
    sample_rate: f32,
    envelope: Envelope,
    gain: f32,
    state: VoiceState,
    destination: Option<ChainId>,
}

impl VoiceCore {
    fn new(frequency: f32, envelope: &EnvelopeConfig, gain: f32, sample_rate: f32) -> Self {
        VoiceCore {
            frequency,
            sample_rate,
            envelope: Envelope::new(envelope, sample_rate),
            gain,
            state: VoiceState::Created,
            destination: None,
        }
    }

    fn hold_samples(&self, duration_ms: u64) -> u64 {
        (duration_ms as f64 * self.sample_rate as f64 / 1000.0).round() as u64
    }
}

pub struct SimpleVoice {
    core: VoiceCore,
    oscillator: Option<Oscillator>,
}

enum VoiceSource {
    Oscillator(Oscillator),
    Fm {
        carrier: Oscillator,
        modulator: Oscillator,
        harmonicity: f32,
        modulation_index: f32,
        modulation_envelope: Envelope,
    },
    Layered(Vec<(Oscillator, OscillatorLayer)>),
}

impl VoiceSource {
    fn build(engine: &EngineConfig, sample_rate: f32) -> Self {
        match engine {
            EngineConfig::Oscillator { waveform } => {
                VoiceSource::Oscillator(Oscillator::new(*waveform))
            }
            EngineConfig::Fm {
                harmonicity,
                modulation_index,
                carrier,
                modulator,
                modulation_envelope,
            } => VoiceSource::Fm {
                carrier: Oscillator::new(*carrier),
                modulator: Oscillator::new(*modulator),
                harmonicity: *harmonicity,
                modulation_index: *modulation_index,
                modulation_envelope: Envelope::new(modulation_envelope, sample_rate),
            },
            EngineConfig::Layered { layers } => VoiceSource::Layered(
                layers
                    .iter()
                    .map(|layer| (Oscillator::new(layer.waveform), *layer))
                    .collect(),
            ),
        }
    }

    fn oscillator_count(&self) -> usize {
        match self {
            VoiceSource::Oscillator(_) => 1,
            VoiceSource::Fm { .. } => 2,
            VoiceSource::Layered(layers) => layers.len(),
        }
    }

    fn trigger(&mut self, hold_samples: u64) {
        if let VoiceSource::Fm {
            modulation_envelope,
            ..
        } = self
        {
            modulation_envelope.trigger_attack_release(hold_samples);
        }
    }

    fn next_sample(&mut self, freq: f32, sr: f32) -> f32 {
        match self {
            VoiceSource::Oscillator(osc) => osc.next_sample(freq, sr),
            VoiceSource::Fm {
                carrier,
                modulator,
                harmonicity,
                modulation_index,
                modulation_envelope,
            } => {
                let depth = *modulation_index * modulation_envelope.next();
                let m = modulator.next_sample(freq * *harmonicity, sr);
                carrier.next_sample_pm(freq, sr, depth * m / TAU)
            }
            VoiceSource::Layered(layers) => layers
                .iter_mut()
                .map(|(osc, layer)| {
                    let f = freq * 2f32.powi(layer.octave) * 2f32.powf(layer.detune / 1200.0);
                    osc.next_sample(f, sr) * layer.gain
                })
                .sum(),
        }
    }
}

pub struct PresetVoice {
    core: VoiceCore,
    source: Option<VoiceSource>,
    filter: Option<VoiceFilter>,
}

pub enum Voice {
    Simple(SimpleVoice),
    Preset(PresetVoice),
}

/// Build a single-oscillator voice.
pub fn create_voice(frequency: f32, config: &VoiceConfig, sample_rate: f32) -> Voice {
    Voice::Simple(SimpleVoice {
        core: VoiceCore::new(frequency, &config.envelope, config.gain, sample_rate),
        oscillator: Some(Oscillator::new(config.waveform)),
    })
}

/// Build a voice from a preset. A filter that cannot be built is bypassed.
pub fn create_preset_voice(
    frequency: f32,
    preset: &SynthPreset,
    gain: f32,
    sample_rate: f32,
) -> Voice {
    let filter = preset
        .filter
        .as_ref()
        .and_then(|cfg| match VoiceFilter::new(cfg, sample_rate) {
            Ok(filter) => Some(filter),
            Err(e) => {
                warn!(preset = %preset.id, "bypassing filter: {e}");
                None
            }
        });
    Voice::Preset(PresetVoice {
        core: VoiceCore::new(frequency, &preset.envelope, gain, sample_rate),
        source: Some(VoiceSource::build(&preset.engine, sample_rate)),
        filter,
    })
}

impl Voice {
    fn core(&self) -> &VoiceCore {
        match self {
            Voice::Simple(v) => &v.core,
            Voice::Preset(v) => &v.core,
        }
    }

    fn core_mut(&mut self) -> &mut VoiceCore {
        match self {
            Voice::Simple(v) => &mut v.core,
            Voice::Preset(v) => &mut v.core,
        }
    }

    pub fn frequency(&self) -> f32 {
        self.core().frequency
    }

    pub fn state(&self) -> VoiceState {
        self.core().state
    }

    pub fn is_disposed(&self) -> bool {
        self.state() == VoiceState::Disposed
    }

    /// Route the voice's output gain to an effects chain.
    pub fn connect(&mut self, chain: ChainId) {
        self.core_mut().destination = Some(chain);
    }

    pub fn destination(&self) -> Option<ChainId> {
        self.core().destination
    }

    pub fn start(&mut self) {
        let core = self.core_mut();
        if core.state == VoiceState::Created {
            core.state = VoiceState::Running;
        }
    }

    /// Attack now and release after `duration_ms`.
    pub fn trigger_attack_release(&mut self, duration_ms: u64) {
        if self.is_disposed() {
            return;
        }
        let hold = self.core().hold_samples(duration_ms);
        self.core_mut().envelope.trigger_attack_release(hold);
        if let Voice::Preset(PresetVoice {
            source: Some(source),
            ..
        }) = self
        {
            source.trigger(hold);
        }
    }

    /// Whether the voice is running and its envelope has not finished.
    pub fn is_sounding(&self) -> bool {
        let core = self.core();
        core.state == VoiceState::Running && !core.envelope.is_idle()
    }

    /// Release the voice's oscillators. Returns false if it was already
    /// disposed.
    pub fn dispose(&mut self) -> bool {
        if self.is_disposed() {
            return false;
        }
        match self {
            Voice::Simple(v) => v.oscillator = None,
            Voice::Preset(v) => {
                v.source = None;
                v.filter = None;
            }
        }
        self.core_mut().state = VoiceState::Disposed;
        true
    }

    pub fn oscillator_count(&self) -> usize {
        match self {
            Voice::Simple(v) => usize::from(v.oscillator.is_some()),
            Voice::Preset(v) => v.source.as_ref().map_or(0, VoiceSource::oscillator_count),
        }
    }

    /// Add this voice's output to `out`.
    pub fn render_into(&mut self, out: &mut [f32]) {
        if self.state() != VoiceState::Running {
            return;
        }
        match self {
            Voice::Simple(SimpleVoice {
                core,
                oscillator: Some(osc),
            }) => {
                for sample in out.iter_mut() {
                    let level = core.envelope.next();
                    *sample += osc.next_sample(core.frequency, core.sample_rate) * level * core.gain;
                }
            }
            Voice::Preset(PresetVoice {
                core,
                source: Some(source),
                filter,
            }) => {
                for sample in out.iter_mut() {
                    let level = core.envelope.next();
                    let mut s = source.next_sample(core.frequency, core.sample_rate);
                    if let Some(filter) = filter.as_mut() {
                        s = filter.process(s);
                    }
                    *sample += s * level * core.gain;
                }
            }
            _ => {}
        }
    }
}
