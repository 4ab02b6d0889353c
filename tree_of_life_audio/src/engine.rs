// Audio engine: voice lifecycle, polyphony ceiling and dynamic gain.
//
// `AudioEngine` owns every voice and effects chain. It is single-threaded
// and driven from outside: callers start notes and chords, then pull audio
// with `render` (or move the clock with `advance`). Scheduled work fires
// from the timer queue as the clock passes it.
//
// ## Clock
//
// The clock counts rendered samples. `now_ms` converts it to milliseconds,
// which is the unit every timer uses. Timers are checked at the start of
// each 128-sample block, so a timer fires at most one block late.
//
// ## Voice lifecycle
//
// Every sound-producing call follows the same per-voice order: build the
// voice, connect it to a chain, register it, recompute chain gain, start
// it, trigger its envelope (now, or via a `TriggerVoice` timer for arpeggio
// and roll styles), and schedule a `DisposeVoice` timer far enough out for
// the release tail to finish. Disposal is idempotent: the timer, a
// stop-all sweep and an explicit `dispose_voice` may all reach the same
// voice, and only the first does anything.
//
// ## Chains
//
// Single notes share one long-lived chain, built on first use. Each chord
// gets a fresh chain, disposed as soon as its last voice is gone (or at
// once, if every voice of the chord was dropped).
//
// ## Polyphony and gain
//
// The device's `GainPolicy` sets a hard ceiling on registered voices.
// Voices past it are dropped and logged at info level; nothing is queued.
// Whenever the registered count changes, every live chain's master gain is
// set to `policy.gain_for(count)` before the next voice starts, so a burst
// of notes never overshoots.
//
// ## Initialization
//
// `initialize` starts the device. Until it succeeds, sound-producing calls
// fail with `NotInitialized`; a device failure is reported as
// `AudioContextUnavailable` and leaves the engine retryable. Note names are
// parsed before anything else, so a bad name never touches engine state.

use crate::config::AudioConfig;
use crate::device::{AudioDevice, DeviceProfile, GainPolicy};
use crate::effects::EffectsChain;
use crate::error::{Error, Result};
use crate::preset::{PresetId, SynthPreset, preset};
use crate::schedule::{TimerKind, TimerQueue};
use crate::voice::{ChainId, Voice, VoiceId, create_preset_voice, create_voice};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};
use tree_of_life_music::pitch::{Note, octave_range};
use tree_of_life_music::voicing::{VoicedNote, voice_chord};

const BLOCK: usize = 128;

/// Which voice factory chord playback uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timbre {
    Basic,
    Preset(PresetId),
}

/// Outcome of one `play_chord` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChordPlayback {
    pub voicing: Vec<VoicedNote>,
    pub voices: Vec<VoiceId>,
    /// Voices not created because the ceiling was reached.
    pub dropped: usize,
}

struct ChainSlot {
    chain: EffectsChain,
    voices: BTreeSet<VoiceId>,
    shared: bool,
}

pub struct AudioEngine {
    device: Box<dyn AudioDevice>,
    sample_rate: Option<u32>,
    config: AudioConfig,
    policy: GainPolicy,
    timbre: Timbre,
    clock: u64,
    next_serial: u64,
    next_chain: ChainId,
    voices: BTreeMap<VoiceId, Voice>,
    chains: BTreeMap<ChainId, ChainSlot>,
    shared_chain: Option<ChainId>,
    timers: TimerQueue,
    scratch: Vec<f32>,
}

impl AudioEngine {
    pub fn new(device: Box<dyn AudioDevice>, config: AudioConfig, profile: DeviceProfile) -> Self {
        AudioEngine {
            device,
            sample_rate: None,
            config,
            policy: profile.gain_policy(),
            timbre: Timbre::Basic,
            clock: 0,
            next_serial: 0,
            next_chain: 0,
            voices: BTreeMap::new(),
            chains: BTreeMap::new(),
            shared_chain: None,
            timers: TimerQueue::new(),
            scratch: vec![0.0; BLOCK],
        }
    }

    // -----------------------------------------------------------------------
    // Initialization
    // -----------------------------------------------------------------------

    /// Start the output device. Repeated calls after success are no-ops.
    pub fn initialize(&mut self) -> Result<()> {
        if self.sample_rate.is_some() {
            return Ok(());
        }
        match self.device.start() {
            Ok(rate) if rate > 0 => {
                debug!(device = self.device.name(), rate, "audio initialized");
                self.sample_rate = Some(rate);
                Ok(())
            }
            Ok(_) => Err(Error::AudioContextUnavailable(
                "device reported a zero sample rate".to_string(),
            )),
            Err(e @ Error::AudioContextUnavailable(_)) => Err(e),
            Err(e) => Err(Error::AudioContextUnavailable(e.to_string())),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.sample_rate.is_some()
    }

    pub fn sample_rate(&self) -> Option<u32> {
        self.sample_rate
    }

    fn require_rate(&self) -> Result<f32> {
        self.sample_rate
            .map(|r| r as f32)
            .ok_or(Error::NotInitialized)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    pub fn policy(&self) -> &GainPolicy {
        &self.policy
    }

    pub fn max_voices(&self) -> usize {
        self.policy.max_voices
    }

    pub fn now_ms(&self) -> u64 {
        match self.sample_rate {
            Some(rate) => self.clock * 1000 / rate as u64,
            None => 0,
        }
    }

    pub fn active_voice_count(&self) -> usize {
        self.voices.len()
    }

    pub fn active_voices(&self) -> impl Iterator<Item = &VoiceId> {
        self.voices.keys()
    }

    pub fn chain_count(&self) -> usize {
        self.chains.len()
    }

    /// Master gain of the shared single-note chain, once it exists.
    pub fn current_gain(&self) -> Option<f32> {
        let id = self.shared_chain?;
        self.chains.get(&id).map(|slot| slot.chain.gain())
    }

    /// Pending disposals as (voice, due time in ms).
    pub fn scheduled_disposals(&self) -> Vec<(VoiceId, u64)> {
        let mut out: Vec<(VoiceId, u64)> = self
            .timers
            .iter()
            .filter_map(|t| match t.kind {
                TimerKind::DisposeVoice { voice } => Some((voice, t.at_ms)),
                TimerKind::TriggerVoice { .. } => None,
            })
            .collect();
        out.sort();
        out
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn timbre(&self) -> Timbre {
        self.timbre
    }

    pub fn select_preset(&mut self, id: PresetId) {
        self.timbre = Timbre::Preset(id);
    }

    pub fn use_basic_timbre(&mut self) {
        self.timbre = Timbre::Basic;
    }

    // -----------------------------------------------------------------------
    // Playback
    // -----------------------------------------------------------------------

    /// Play one note across the configured octaves on the shared chain.
    pub fn play_note(&mut self, name: &str) -> Result<Vec<VoiceId>> {
        let note: Note = name.parse()?;
        let sample_rate = self.require_rate()?;
        let cfg = self.config.note;
        let chain = self.shared_chain_id(sample_rate);
        let now = self.now_ms();

        let mut started = Vec::new();
        let mut dropped = 0;
        for octave in octave_range(cfg.octaves, cfg.base_octave) {
            if self.voices.len() >= self.policy.max_voices {
                dropped += 1;
                continue;
            }
            let voice = create_voice(note.frequency(octave) as f32, &cfg.voice(), sample_rate);
            let id = self.add_voice(voice, note, octave, chain);
            self.trigger(id, cfg.duration);
            self.timers.schedule(
                now + cfg.duration + cfg.disposal_buffer,
                TimerKind::DisposeVoice { voice: id },
            );
            started.push(id);
        }
        if dropped > 0 {
            info!(note = %note, dropped, "polyphony ceiling reached, voices dropped");
        }
        Ok(started)
    }

    /// Voice and play a chord on a fresh chain.
    pub fn play_chord(&mut self, names: &[&str]) -> Result<ChordPlayback> {
        let notes = names
            .iter()
            .map(|n| n.parse::<Note>())
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let sample_rate = self.require_rate()?;
        let cfg = self.config.chord;
        let patch: Option<SynthPreset> = match self.timbre {
            Timbre::Basic => None,
            Timbre::Preset(id) => Some(preset(id)),
        };
        let (effects, release) = match &patch {
            Some(p) => (p.effects, p.envelope.release),
            None => (cfg.effects(), cfg.envelope.release),
        };
        let release_ms = (release * 1000.0).round() as u64;

        let voicing = voice_chord(&notes);
        let chain = self.add_chain(
            EffectsChain::build(&effects, &self.policy, sample_rate),
            false,
        );
        let now = self.now_ms();

        let mut voices = Vec::new();
        let mut dropped = 0;
        for (index, voiced) in voicing.iter().enumerate() {
            let delay = cfg.trigger_delay(index);
            for octave in octave_range(cfg.octaves, cfg.base_octave + voiced.relative_octave) {
                if self.voices.len() >= self.policy.max_voices {
                    dropped += 1;
                    continue;
                }
                let freq = voiced.note.frequency(octave) as f32;
                let voice = match &patch {
                    Some(p) => create_preset_voice(freq, p, cfg.gain, sample_rate),
                    None => create_voice(freq, &cfg.voice(), sample_rate),
                };
                let id = self.add_voice(voice, voiced.note, octave, chain);
                if delay == 0 {
                    self.trigger(id, cfg.duration);
                } else {
                    self.timers.schedule(
                        now + delay,
                        TimerKind::TriggerVoice {
                            voice: id,
                            duration_ms: cfg.duration,
                        },
                    );
                }
                self.timers.schedule(
                    now + delay + cfg.duration + release_ms + cfg.disposal_buffer,
                    TimerKind::DisposeVoice { voice: id },
                );
                voices.push(id);
            }
        }

        if dropped > 0 {
            info!(
                dropped,
                ceiling = self.policy.max_voices,
                "chord voices dropped at polyphony ceiling"
            );
        }
        if voices.is_empty() {
            self.release_chain(chain);
        }
        Ok(ChordPlayback {
            voicing,
            voices,
            dropped,
        })
    }

    /// Dispose every voice and every chord chain at once.
    pub fn stop_all_voices(&mut self) {
        let count = self.voices.len();
        for (_, mut voice) in std::mem::take(&mut self.voices) {
            voice.dispose();
        }
        let chord_chains: Vec<ChainId> = self
            .chains
            .iter()
            .filter(|(_, slot)| !slot.shared)
            .map(|(id, _)| *id)
            .collect();
        for id in chord_chains {
            self.release_chain(id);
        }
        for slot in self.chains.values_mut() {
            slot.voices.clear();
        }
        self.recompute_gain();
        if count > 0 {
            debug!(count, "stopped all voices");
        }
    }

    /// Dispose one voice. Returns false if it was already gone.
    pub fn dispose_voice(&mut self, id: VoiceId) -> bool {
        let Some(mut voice) = self.voices.remove(&id) else {
            return false;
        };
        voice.dispose();
        if let Some(chain) = voice.destination() {
            let empty = match self.chains.get_mut(&chain) {
                Some(slot) => {
                    slot.voices.remove(&id);
                    slot.voices.is_empty() && !slot.shared
                }
                None => false,
            };
            if empty {
                self.release_chain(chain);
            }
        }
        self.recompute_gain();
        debug!(voice = %id, "voice disposed");
        true
    }

    // -----------------------------------------------------------------------
    // Clock and rendering
    // -----------------------------------------------------------------------

    /// Move the clock forward `ms`, firing timers and running voices as if
    /// the audio had been played.
    pub fn advance(&mut self, ms: u64) {
        let Some(rate) = self.sample_rate else {
            return;
        };
        let mut remaining = ms * rate as u64 / 1000;
        let mut sink = vec![0.0; BLOCK];
        while remaining > 0 {
            let n = remaining.min(BLOCK as u64) as usize;
            self.render(&mut sink[..n]);
            remaining -= n as u64;
        }
    }

    /// Render mono output into `out`. Silent before initialization.
    pub fn render(&mut self, out: &mut [f32]) {
        out.iter_mut().for_each(|s| *s = 0.0);
        if self.sample_rate.is_none() {
            return;
        }
        for block in out.chunks_mut(BLOCK) {
            self.fire_timers();
            self.render_block(block);
            self.clock += block.len() as u64;
        }
    }

    fn fire_timers(&mut self) {
        let now = self.now_ms();
        while let Some(timer) = self.timers.pop_if_ready(now) {
            match timer.kind {
                TimerKind::TriggerVoice { voice, duration_ms } => self.trigger(voice, duration_ms),
                TimerKind::DisposeVoice { voice } => {
                    self.dispose_voice(voice);
                }
            }
        }
    }

    fn render_block(&mut self, out: &mut [f32]) {
        let scratch = &mut self.scratch[..out.len()];
        for slot in self.chains.values_mut() {
            scratch.iter_mut().for_each(|s| *s = 0.0);
            for id in &slot.voices {
                if let Some(voice) = self.voices.get_mut(id) {
                    voice.render_into(scratch);
                }
            }
            slot.chain.process(scratch);
            for (o, s) in out.iter_mut().zip(scratch.iter()) {
                *o += s;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn shared_chain_id(&mut self, sample_rate: f32) -> ChainId {
        if let Some(id) = self.shared_chain {
            return id;
        }
        let chain = EffectsChain::build(&self.config.note.effects(), &self.policy, sample_rate);
        let id = self.add_chain(chain, true);
        self.shared_chain = Some(id);
        id
    }

    fn add_chain(&mut self, mut chain: EffectsChain, shared: bool) -> ChainId {
        let id = self.next_chain;
        self.next_chain += 1;
        chain.set_gain(self.policy.gain_for(self.voices.len()));
        self.chains.insert(
            id,
            ChainSlot {
                chain,
                voices: BTreeSet::new(),
                shared,
            },
        );
        id
    }

    fn release_chain(&mut self, id: ChainId) {
        if let Some(mut slot) = self.chains.remove(&id) {
            slot.chain.dispose();
        }
    }

    /// Connect, register, rebalance gain and start a new voice.
    fn add_voice(&mut self, mut voice: Voice, note: Note, octave: i32, chain: ChainId) -> VoiceId {
        let id = VoiceId {
            serial: self.next_serial,
            note,
            octave,
            started_at_ms: self.now_ms(),
        };
        self.next_serial += 1;

        voice.connect(chain);
        if let Some(slot) = self.chains.get_mut(&chain) {
            slot.voices.insert(id);
        }
        self.voices.insert(id, voice);
        self.recompute_gain();
        if let Some(voice) = self.voices.get_mut(&id) {
            voice.start();
        }
        debug!(voice = %id, active = self.voices.len(), "voice started");
        id
    }

    fn trigger(&mut self, id: VoiceId, duration_ms: u64) {
        if let Some(voice) = self.voices.get_mut(&id) {
            voice.trigger_attack_release(duration_ms);
        }
    }

    fn recompute_gain(&mut self) {
        let gain = self.policy.gain_for(self.voices.len());
        for slot in self.chains.values_mut() {
            slot.chain.set_gain(gain);
        }
    }
}
