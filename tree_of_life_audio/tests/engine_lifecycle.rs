// Voice lifecycle, polyphony and gain checks through the public API.

use std::cell::Cell;
use std::rc::Rc;
use tree_of_life_audio::Error;
use tree_of_life_audio::config::{AudioConfig, PlaybackStyle};
use tree_of_life_audio::device::{AudioDevice, DeviceProfile, OfflineDevice};
use tree_of_life_audio::engine::AudioEngine;
use tree_of_life_audio::preset::PresetId;

fn engine_with(config: AudioConfig, profile: DeviceProfile) -> AudioEngine {
    let mut engine = AudioEngine::new(Box::new(OfflineDevice::new(8000)), config, profile);
    engine.initialize().unwrap();
    engine
}

fn engine() -> AudioEngine {
    engine_with(AudioConfig::default(), DeviceProfile::desktop())
}

/// Refuses to start until told otherwise.
struct FlakyDevice {
    ready: Rc<Cell<bool>>,
    attempts: Rc<Cell<usize>>,
}

impl AudioDevice for FlakyDevice {
    fn start(&mut self) -> tree_of_life_audio::Result<u32> {
        self.attempts.set(self.attempts.get() + 1);
        if self.ready.get() {
            Ok(8000)
        } else {
            Err(Error::AudioContextUnavailable("needs a user gesture".into()))
        }
    }

    fn name(&self) -> &str {
        "flaky"
    }
}

#[test]
fn test_play_note_schedules_one_disposal_per_voice() {
    let mut engine = engine();
    let voices = engine.play_note("C").unwrap();
    assert_eq!(voices.len(), 1);
    let disposals = engine.scheduled_disposals();
    assert_eq!(disposals.len(), voices.len());
    assert_eq!(disposals[0], (voices[0], 2000));
}

#[test]
fn test_multi_octave_note_disposals() {
    let mut config = AudioConfig::default();
    config.note.octaves = 3;
    let mut engine = engine_with(config, DeviceProfile::desktop());
    let voices = engine.play_note("G").unwrap();
    let octaves: Vec<i32> = voices.iter().map(|v| v.octave).collect();
    assert_eq!(octaves, vec![3, 4, 5]);
    let disposals = engine.scheduled_disposals();
    assert_eq!(disposals.len(), 3);
    assert!(disposals.iter().all(|(_, at)| *at == 2000));
}

#[test]
fn test_ceiling_never_exceeded() {
    for profile in [DeviceProfile::desktop(), DeviceProfile::constrained()] {
        let mut config = AudioConfig::default();
        config.chord.octaves = 4;
        let mut engine = engine_with(config, profile);
        let ceiling = engine.max_voices();
        // Seven notes over four octaves is 28 voices requested.
        let playback = engine
            .play_chord(&["C", "D", "E", "F", "G", "A", "B"])
            .unwrap();
        assert_eq!(playback.voices.len(), ceiling);
        assert_eq!(playback.dropped, 28 - ceiling);
        assert!(engine.active_voice_count() <= ceiling);

        engine.play_note("C").unwrap();
        assert!(engine.active_voice_count() <= ceiling);
    }
}

#[test]
fn test_gain_non_increasing_and_floored() {
    let mut engine = engine();
    let policy = *engine.policy();
    let mut gains = Vec::new();
    for name in ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B", "C"] {
        engine.play_note(name).unwrap();
        gains.push(engine.current_gain().unwrap());
    }
    assert!(gains.windows(2).all(|w| w[1] <= w[0]));
    assert!(gains.iter().all(|g| *g >= policy.floor_gain));
    assert_eq!(*gains.last().unwrap(), policy.floor_gain);
}

#[test]
fn test_gain_recovers_as_voices_end() {
    let mut engine = engine();
    engine.play_note("C").unwrap();
    engine.play_note("E").unwrap();
    let busy = engine.current_gain().unwrap();
    engine.advance(2100);
    assert_eq!(engine.active_voice_count(), 0);
    assert!(engine.current_gain().unwrap() > busy);
}

#[test]
fn test_stop_all_races_timers() {
    let mut engine = engine();
    let voices = engine.play_note("C").unwrap();
    engine.play_chord(&["D", "F#", "A"]).unwrap();
    engine.stop_all_voices();
    assert_eq!(engine.active_voice_count(), 0);
    assert!(!engine.dispose_voice(voices[0]));
    engine.advance(10_000);
    assert_eq!(engine.pending_timers(), 0);
    engine.stop_all_voices();

    let mut idle = AudioEngine::new(
        Box::new(OfflineDevice::default()),
        AudioConfig::default(),
        DeviceProfile::desktop(),
    );
    idle.stop_all_voices();
}

#[test]
fn test_init_failure_is_retryable() {
    let ready = Rc::new(Cell::new(false));
    let attempts = Rc::new(Cell::new(0));
    let device = FlakyDevice {
        ready: ready.clone(),
        attempts: attempts.clone(),
    };
    let mut engine = AudioEngine::new(
        Box::new(device),
        AudioConfig::default(),
        DeviceProfile::desktop(),
    );

    assert!(matches!(
        engine.initialize(),
        Err(Error::AudioContextUnavailable(_))
    ));
    assert!(!engine.is_initialized());
    assert!(matches!(engine.play_note("C"), Err(Error::NotInitialized)));

    ready.set(true);
    engine.initialize().unwrap();
    engine.initialize().unwrap();
    assert_eq!(attempts.get(), 2);
    assert_eq!(engine.play_note("C").unwrap().len(), 1);
}

#[test]
fn test_invalid_pitch_fails_before_state_changes() {
    let mut engine = engine();
    let err = engine.play_note("X#").unwrap_err();
    assert!(matches!(
        err,
        Error::Music(tree_of_life_music::Error::InvalidPitchClass(_))
    ));
    assert!(engine.play_chord(&["C", "Q", "G"]).is_err());
    assert_eq!(engine.active_voice_count(), 0);
    assert_eq!(engine.chain_count(), 0);
    assert_eq!(engine.pending_timers(), 0);
}

#[test]
fn test_chord_voicing_shifts_octaves() {
    let mut config = AudioConfig::default();
    config.chord.octaves = 1;
    let mut engine = engine_with(config, DeviceProfile::desktop());
    let playback = engine.play_chord(&["C", "E", "G", "D"]).unwrap();
    let d = playback
        .voices
        .iter()
        .find(|v| v.note.to_string() == "D")
        .unwrap();
    assert_eq!(d.octave, 5);
    let c = playback
        .voices
        .iter()
        .find(|v| v.note.to_string() == "C")
        .unwrap();
    assert_eq!(c.octave, 4);
}

#[test]
fn test_duplicate_chord_tones_collapse() {
    let mut config = AudioConfig::default();
    config.chord.octaves = 1;
    let mut engine = engine_with(config, DeviceProfile::desktop());
    let playback = engine.play_chord(&["C", "E", "G", "C", "G"]).unwrap();
    assert_eq!(playback.voicing.len(), 3);
    assert_eq!(playback.voices.len(), 3);
}

#[test]
fn test_roll_style_staggers_triggers() {
    let mut config = AudioConfig::default();
    config.chord.style = PlaybackStyle::Roll;
    config.chord.octaves = 1;
    let mut engine = engine_with(config, DeviceProfile::desktop());
    let playback = engine.play_chord(&["C", "E", "G"]).unwrap();
    let disposals = engine.scheduled_disposals();
    let due: Vec<u64> = playback
        .voices
        .iter()
        .map(|id| disposals.iter().find(|(v, _)| v == id).unwrap().1)
        .collect();
    assert_eq!(due, vec![5500, 5600, 5700]);
}

#[test]
fn test_preset_chord_renders() {
    for id in PresetId::ALL {
        let mut engine = engine();
        engine.select_preset(id);
        engine.play_chord(&["A", "C#", "E"]).unwrap();
        let mut buf = vec![0.0; 8000];
        engine.render(&mut buf);
        let ceiling = 10f32.powf(engine.policy().limiter_threshold_db / 20.0);
        assert!(buf.iter().all(|s| s.is_finite() && s.abs() <= ceiling + 1e-5));
        assert!(buf.iter().any(|s| *s != 0.0), "{id}");
    }
}
