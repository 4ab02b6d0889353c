// Linear ADSR envelope, advanced one sample at a time.
//
// `trigger_attack_release` starts the attack and arms a hold counter; when
// the counter runs out the envelope enters release from whatever level it
// has reached, so a hold shorter than attack + decay still releases
// cleanly. Stage times come from `EnvelopeConfig` in seconds and are
// converted to sample counts once, at construction. A zero-length stage
// lasts a single sample.

use crate::config::EnvelopeConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

#[derive(Debug, Clone)]
pub struct Envelope {
    attack_samples: f32,
    decay_samples: f32,
    sustain: f32,
    release_samples: f32,
    stage: Stage,
    /// Samples elapsed in the current stage.
    position: f32,
    level: f32,
    release_from: f32,
    hold: Option<u64>,
}

fn samples(seconds: f32, sample_rate: f32) -> f32 {
    (seconds * sample_rate).round().max(1.0)
}

impl Envelope {
    pub fn new(config: &EnvelopeConfig, sample_rate: f32) -> Self {
        Envelope {
            attack_samples: samples(config.attack, sample_rate),
            decay_samples: samples(config.decay, sample_rate),
            sustain: config.sustain.clamp(0.0, 1.0),
            release_samples: samples(config.release, sample_rate),
            stage: Stage::Idle,
            position: 0.0,
            level: 0.0,
            release_from: 0.0,
            hold: None,
        }
    }

    fn enter(&mut self, stage: Stage) {
        self.stage = stage;
        self.position = 0.0;
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn is_idle(&self) -> bool {
        self.stage == Stage::Idle
    }

    pub fn trigger_attack(&mut self) {
        self.enter(Stage::Attack);
        self.hold = None;
    }

    /// Attack now, release after `hold_samples`.
    pub fn trigger_attack_release(&mut self, hold_samples: u64) {
        self.trigger_attack();
        self.hold = Some(hold_samples);
    }

    pub fn trigger_release(&mut self) {
        self.hold = None;
        if self.stage == Stage::Idle {
            return;
        }
        self.enter(Stage::Release);
        self.release_from = self.level;
    }

    pub fn next(&mut self) -> f32 {
        if let Some(remaining) = self.hold {
            if remaining == 0 {
                self.trigger_release();
            } else {
                self.hold = Some(remaining - 1);
            }
        }

        match self.stage {
            Stage::Idle => {}
            Stage::Attack => {
                self.position += 1.0;
                self.level = (self.position / self.attack_samples).min(1.0);
                if self.position >= self.attack_samples {
                    self.enter(Stage::Decay);
                }
            }
            Stage::Decay => {
                self.position += 1.0;
                let t = (self.position / self.decay_samples).min(1.0);
                self.level = 1.0 - (1.0 - self.sustain) * t;
                if self.position >= self.decay_samples {
                    self.enter(Stage::Sustain);
                }
            }
            Stage::Sustain => self.level = self.sustain,
            Stage::Release => {
                self.position += 1.0;
                let t = (self.position / self.release_samples).min(1.0);
                self.level = self.release_from * (1.0 - t);
                if self.position >= self.release_samples {
                    self.level = 0.0;
                    self.enter(Stage::Idle);
                }
            }
        }
        self.level
    }
}
