// Effects chain: chorus -> reverb -> master gain -> limiter.
//
// One chain is built per playback context (a long-lived one for single
// notes, a fresh one per chord). The factory folds the device's
// `GainPolicy` into the requested settings: chorus wet mix, reverb wet
// scale, master gain and limiter ceiling all come from the policy, so a
// constrained device gets a quieter, drier chain than a desktop with the
// same config. The master gain is then moved by the engine as voices come
// and go.
//
// Each stage is an `Effect` processing one mono sample at a time.
// Disposing a chain drops its delay lines; a disposed chain outputs
// silence.

use crate::config::{ChorusConfig, EffectsConfig, ReverbConfig};
use crate::device::GainPolicy;
use std::f32::consts::TAU;

pub trait Effect {
    fn process(&mut self, input: f32) -> f32;

    fn reset(&mut self);
}

// ---------------------------------------------------------------------------
// Chorus
// ---------------------------------------------------------------------------

/// LFO-modulated delay mixed with the dry signal.
pub struct Chorus {
    buffer: Vec<f32>,
    write_pos: usize,
    base_delay: f32,
    sweep: f32,
    lfo_phase: f32,
    lfo_step: f32,
    pub wet: f32,
}

impl Chorus {
    pub fn new(config: &ChorusConfig, wet: f32, sample_rate: f32) -> Self {
        let base_delay = config.delay_time * sample_rate / 1000.0;
        let sweep = base_delay * config.depth.clamp(0.0, 1.0) * 0.5;
        let len = (base_delay + sweep).ceil() as usize + 2;
        Chorus {
            buffer: vec![0.0; len],
            write_pos: 0,
            base_delay,
            sweep,
            lfo_phase: 0.0,
            lfo_step: config.frequency / sample_rate,
            wet: wet.clamp(0.0, 1.0),
        }
    }
}

impl Effect for Chorus {
    fn process(&mut self, input: f32) -> f32 {
        let len = self.buffer.len();
        self.buffer[self.write_pos] = input;

        let delay = self.base_delay + self.sweep * (self.lfo_phase * TAU).sin();
        self.lfo_phase = (self.lfo_phase + self.lfo_step).fract();
        let read = (self.write_pos as f32 - delay).rem_euclid(len as f32);
        let i = read.floor() as usize % len;
        let frac = read - read.floor();
        let delayed = self.buffer[i] * (1.0 - frac) + self.buffer[(i + 1) % len] * frac;

        self.write_pos = (self.write_pos + 1) % len;
        input * (1.0 - self.wet) + delayed * self.wet
    }

    fn reset(&mut self) {
        self.buffer.iter_mut().for_each(|s| *s = 0.0);
        self.write_pos = 0;
        self.lfo_phase = 0.0;
    }
}

// ---------------------------------------------------------------------------
// Reverb
// ---------------------------------------------------------------------------

const COMB_DELAYS: [usize; 4] = [1116, 1188, 1277, 1356];
const ALLPASS_DELAYS: [usize; 2] = [556, 441];

/// Schroeder reverb: four parallel combs into two series allpasses. Comb
/// feedback is set so each comb decays by 60 dB over `decay` seconds.
pub struct Reverb {
    combs: [Vec<f32>; 4],
    comb_pos: [usize; 4],
    comb_feedback: [f32; 4],
    allpasses: [Vec<f32>; 2],
    allpass_pos: [usize; 2],
    pub wet: f32,
}

impl Reverb {
    pub fn new(decay: f32, wet: f32, sample_rate: f32) -> Self {
        let scale = sample_rate / 44_100.0;
        let size = |d: usize| ((d as f32 * scale) as usize).max(1);
        let decay = decay.max(0.01);
        Reverb {
            combs: COMB_DELAYS.map(|d| vec![0.0; size(d)]),
            comb_pos: [0; 4],
            comb_feedback: COMB_DELAYS
                .map(|d| 10f32.powf(-3.0 * (size(d) as f32 / sample_rate) / decay).min(0.98)),
            allpasses: ALLPASS_DELAYS.map(|d| vec![0.0; size(d)]),
            allpass_pos: [0; 2],
            wet: wet.clamp(0.0, 1.0),
        }
    }
}

impl Effect for Reverb {
    fn process(&mut self, input: f32) -> f32 {
        let mut comb_out = 0.0;
        for i in 0..4 {
            let buf = &mut self.combs[i];
            let pos = self.comb_pos[i];
            let delayed = buf[pos];
            buf[pos] = input + delayed * self.comb_feedback[i];
            self.comb_pos[i] = (pos + 1) % buf.len();
            comb_out += delayed;
        }

        let mut out = comb_out * 0.25;
        for i in 0..2 {
            let buf = &mut self.allpasses[i];
            let pos = self.allpass_pos[i];
            let delayed = buf[pos];
            buf[pos] = out + delayed * 0.5;
            out = delayed - out * 0.5;
            self.allpass_pos[i] = (pos + 1) % buf.len();
        }

        input * (1.0 - self.wet) + out * self.wet
    }

    fn reset(&mut self) {
        for buf in self.combs.iter_mut().chain(self.allpasses.iter_mut()) {
            buf.iter_mut().for_each(|s| *s = 0.0);
        }
        self.comb_pos = [0; 4];
        self.allpass_pos = [0; 2];
    }
}

// ---------------------------------------------------------------------------
// Limiter
// ---------------------------------------------------------------------------

/// Peak limiter with instant attack and a ~50 ms release, followed by a
/// hard clamp at the ceiling.
pub struct Limiter {
    ceiling: f32,
    envelope: f32,
    release: f32,
}

impl Limiter {
    pub fn new(threshold_db: f32, sample_rate: f32) -> Self {
        Limiter {
            ceiling: 10f32.powf(threshold_db / 20.0),
            envelope: 0.0,
            release: (-1.0 / (0.05 * sample_rate)).exp(),
        }
    }

    pub fn ceiling(&self) -> f32 {
        self.ceiling
    }
}

impl Effect for Limiter {
    fn process(&mut self, input: f32) -> f32 {
        self.envelope = input.abs().max(self.envelope * self.release);
        let gain = if self.envelope > self.ceiling {
            self.ceiling / self.envelope
        } else {
            1.0
        };
        (input * gain).clamp(-self.ceiling, self.ceiling)
    }

    fn reset(&mut self) {
        self.envelope = 0.0;
    }
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

struct Stages {
    chorus: Option<Chorus>,
    reverb: Option<Reverb>,
    limiter: Limiter,
}

pub struct EffectsChain {
    stages: Option<Stages>,
    gain: f32,
}

impl EffectsChain {
    /// Build a chain for `config`, adjusted for the device's `policy`.
    pub fn build(config: &EffectsConfig, policy: &GainPolicy, sample_rate: f32) -> Self {
        let ReverbConfig {
            enabled: reverb_on,
            room_size,
            wet,
        } = config.reverb;
        let chorus = config
            .chorus
            .enabled
            .then(|| Chorus::new(&config.chorus, policy.chorus_wet, sample_rate));
        let reverb =
            reverb_on.then(|| Reverb::new(room_size, wet * policy.reverb_wet_scale, sample_rate));
        EffectsChain {
            stages: Some(Stages {
                chorus,
                reverb,
                limiter: Limiter::new(policy.limiter_threshold_db, sample_rate),
            }),
            gain: policy.base_gain,
        }
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
    }

    pub fn chorus_wet(&self) -> Option<f32> {
        self.stages.as_ref()?.chorus.as_ref().map(|c| c.wet)
    }

    pub fn reverb_wet(&self) -> Option<f32> {
        self.stages.as_ref()?.reverb.as_ref().map(|r| r.wet)
    }

    pub fn limiter_ceiling(&self) -> Option<f32> {
        self.stages.as_ref().map(|s| s.limiter.ceiling())
    }

    /// Run `buf` through the chain in place.
    pub fn process(&mut self, buf: &mut [f32]) {
        let Some(stages) = self.stages.as_mut() else {
            buf.iter_mut().for_each(|s| *s = 0.0);
            return;
        };
        for sample in buf.iter_mut() {
            let mut x = *sample;
            if let Some(chorus) = stages.chorus.as_mut() {
                x = chorus.process(x);
            }
            if let Some(reverb) = stages.reverb.as_mut() {
                x = reverb.process(x);
            }
            *sample = stages.limiter.process(x * self.gain);
        }
    }

    /// Release every stage. Returns false if already disposed.
    pub fn dispose(&mut self) -> bool {
        self.stages.take().is_some()
    }

    pub fn is_disposed(&self) -> bool {
        self.stages.is_none()
    }
}
