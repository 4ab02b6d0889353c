// Tree of Life audio
//
// Synthesis and voice management for playing the notes and chords of a
// musical system. Everything runs on one thread; audio is pulled from the
// engine block by block, and deferred work (delayed triggers, disposals)
// rides a timer queue keyed to the engine clock.
//
// Architecture:
// - config.rs: Note and chord timbre configuration with defaults and validation
// - device.rs: Output device seam, device profiles, gain policy
// - oscillator.rs: Phase-accumulator oscillator with phase modulation
// - envelope.rs: Linear ADSR with hold-then-release triggering
// - filter.rs: Per-voice biquad filter
// - preset.rs: Closed preset catalog (oscillator, FM, layered engines)
// - voice.rs: Simple and preset voices, voice ids, idempotent disposal
// - effects.rs: Chorus, reverb, limiter and the effects chain factory
// - schedule.rs: Timer queue for delayed triggers and disposals
// - engine.rs: Voice lifecycle, polyphony ceiling, dynamic gain, mixing
// - service.rs: UI-boundary wrapper with now-playing and error state
// - interaction.rs: Path and sephirah click handlers over a `NotePlayer`
// - wav.rs: Offline rendering to WAV
// - error.rs: Crate error type
//
// See `tree_of_life_music` for pitches, chord detection and voicing.

pub mod config;
pub mod device;
pub mod effects;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod filter;
pub mod interaction;
pub mod oscillator;
pub mod preset;
pub mod schedule;
pub mod service;
pub mod voice;
pub mod wav;

pub use error::{Error, Result};
