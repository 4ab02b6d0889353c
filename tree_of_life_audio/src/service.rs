// UI-facing audio service.
//
// `AudioService` wraps the engine in the contract the diagram needs: play
// calls never fail into the caller, sound is off until the user turns it on,
// and every problem lands in `AudioState::error` for the UI to show.
//
// Each play call records a now-playing entry whether or not sound is
// enabled, so the display still tracks what was clicked on a silent
// device. Entries expire one second after their note or chord duration.
// The engine is initialized lazily on the first sounding call (a user
// gesture); if the device refuses, the error is recorded and the next call
// tries again.
//
// Entry times come from the engine's sample clock once audio is running.
// Before that the service counts `advance` calls itself, since there is
// nothing to render.

use crate::engine::AudioEngine;
use crate::interaction::NotePlayer;
use crate::preset::PresetId;
use tracing::{error, warn};
use tree_of_life_music::chord::detect;
use tree_of_life_music::pitch::Note;

/// Extra time a now-playing entry stays listed past its duration, ms.
const NOW_PLAYING_LINGER_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NowPlayingEntry {
    pub id: u64,
    pub source: String,
    pub notes: Vec<String>,
    /// Detected chord name, for chord entries that form one.
    pub chord: Option<String>,
    pub started_at_ms: u64,
    pub duration_ms: u64,
}

impl NowPlayingEntry {
    pub fn display_text(&self) -> String {
        let notes = self.notes.join(", ");
        match &self.chord {
            Some(chord) => format!("{} {chord} ({notes})", self.source),
            None => format!("{}: {notes}", self.source),
        }
    }

    fn expires_at(&self) -> u64 {
        self.started_at_ms + self.duration_ms + NOW_PLAYING_LINGER_MS
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioState {
    pub initialized: bool,
    pub playing: bool,
    pub sound_enabled: bool,
    pub now_playing: Vec<NowPlayingEntry>,
    pub error: Option<String>,
}

pub struct AudioService {
    engine: AudioEngine,
    state: AudioState,
    /// Time passed while the engine had no clock of its own, ms.
    idle_ms: u64,
    next_entry: u64,
}

impl AudioService {
    pub fn new(engine: AudioEngine) -> Self {
        AudioService {
            engine,
            state: AudioState::default(),
            idle_ms: 0,
            next_entry: 0,
        }
    }

    pub fn state(&self) -> &AudioState {
        &self.state
    }

    pub fn engine(&self) -> &AudioEngine {
        &self.engine
    }

    /// Turn sound on (initializing the engine) or off (silencing it).
    pub fn set_sound_enabled(&mut self, enabled: bool) {
        self.state.sound_enabled = enabled;
        if enabled {
            self.ensure_initialized();
        } else {
            self.engine.stop_all_voices();
            self.state.playing = false;
        }
    }

    pub fn stop_all_sounds(&mut self) {
        self.engine.stop_all_voices();
        self.state.now_playing.clear();
        self.state.playing = false;
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.state.error = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.state.error = None;
    }

    pub fn select_preset(&mut self, id: PresetId) {
        self.engine.select_preset(id);
    }

    pub fn use_basic_timbre(&mut self) {
        self.engine.use_basic_timbre();
    }

    pub fn play_note(&mut self, note: &str, source: &str) {
        let duration = self.engine.config().note.duration;
        let parsed = match note.parse::<Note>() {
            Ok(n) => n,
            Err(e) => {
                warn!(source, "rejected note: {e}");
                self.set_error(e.to_string());
                return;
            }
        };
        self.record(source, vec![parsed.to_string()], None, duration);

        if self.ensure_sound() {
            let result = self.engine.play_note(note);
            self.finish(result.map(|_| ()));
        }
    }

    pub fn play_chord(&mut self, notes: &[&str], source: &str) {
        let duration = self.engine.config().chord.duration;
        let parsed = match notes
            .iter()
            .map(|n| n.parse::<Note>())
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(source, "rejected chord: {e}");
                self.set_error(e.to_string());
                return;
            }
        };
        let chord = detect(&parsed).map(|c| c.to_string());
        let names = parsed.iter().map(Note::to_string).collect();
        self.record(source, names, chord, duration);

        if self.ensure_sound() {
            let result = self.engine.play_chord(notes);
            self.finish(result.map(|_| ()));
        }
    }

    /// Move time forward, firing engine timers and expiring entries.
    pub fn advance(&mut self, ms: u64) {
        if self.engine.is_initialized() {
            self.engine.advance(ms);
        } else {
            self.idle_ms += ms;
        }
        self.refresh();
    }

    /// Pull audio from the engine.
    pub fn render(&mut self, out: &mut [f32]) {
        self.engine.render(out);
        self.refresh();
    }

    /// Service time: idle time plus the engine clock.
    pub fn now_ms(&self) -> u64 {
        self.idle_ms + self.engine.now_ms()
    }

    fn refresh(&mut self) {
        let now = self.now_ms();
        self.state.now_playing.retain(|e| e.expires_at() > now);
        self.state.playing = self.engine.active_voice_count() > 0;
    }

    fn record(&mut self, source: &str, notes: Vec<String>, chord: Option<String>, duration: u64) {
        let id = self.next_entry;
        self.next_entry += 1;
        self.state.now_playing.push(NowPlayingEntry {
            id,
            source: source.to_string(),
            notes,
            chord,
            started_at_ms: self.now_ms(),
            duration_ms: duration,
        });
    }

    /// Whether a play call should reach the engine.
    fn ensure_sound(&mut self) -> bool {
        self.state.sound_enabled && self.ensure_initialized()
    }

    fn ensure_initialized(&mut self) -> bool {
        match self.engine.initialize() {
            Ok(()) => {
                self.state.initialized = true;
                true
            }
            Err(e) => {
                error!("audio initialization failed: {e}");
                self.state.initialized = false;
                self.set_error(e.to_string());
                false
            }
        }
    }

    fn finish(&mut self, result: crate::Result<()>) {
        match result {
            Ok(()) => self.state.playing = self.engine.active_voice_count() > 0,
            Err(e) => self.set_error(e.to_string()),
        }
    }
}

impl NotePlayer for AudioService {
    fn play_note(&mut self, note: &str, source: &str) {
        AudioService::play_note(self, note, source);
    }

    fn play_chord(&mut self, notes: &[&str], source: &str) {
        AudioService::play_chord(self, notes, source);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AudioConfig;
    use crate::device::{DeviceProfile, OfflineDevice};

    fn service() -> AudioService {
        AudioService::new(AudioEngine::new(
            Box::new(OfflineDevice::new(8000)),
            AudioConfig::default(),
            DeviceProfile::desktop(),
        ))
    }

    #[test]
    fn test_silent_by_default_but_tracked() {
        let mut service = service();
        service.play_note("C", "Path 11");
        assert!(!service.state().initialized);
        assert!(!service.state().playing);
        assert_eq!(service.state().now_playing.len(), 1);
        assert_eq!(service.state().now_playing[0].display_text(), "Path 11: C");
    }

    #[test]
    fn test_enabled_sound_plays() {
        let mut service = service();
        service.set_sound_enabled(true);
        assert!(service.state().initialized);
        service.play_chord(&["C", "E", "G"], "Keter (Below)");
        assert!(service.state().playing);
        assert_eq!(service.engine().active_voice_count(), 6);
        assert_eq!(
            service.state().now_playing[0].display_text(),
            "Keter (Below) CM (C, E, G)"
        );
    }

    #[test]
    fn test_entries_expire() {
        let mut service = service();
        service.play_note("D", "Path 12");
        service.advance(1999);
        assert_eq!(service.state().now_playing.len(), 1);
        service.advance(1);
        assert!(service.state().now_playing.is_empty());
    }

    #[test]
    fn test_entries_expire_on_rendered_time() {
        let mut service = AudioService::new(AudioEngine::new(
            Box::new(OfflineDevice::new(44_100)),
            AudioConfig::default(),
            DeviceProfile::desktop(),
        ));
        service.set_sound_enabled(true);
        service.play_note("C", "Path 11");
        let mut block = [0.0; 128];
        // 689 blocks of 128 samples is just under 2000 ms at 44.1 kHz.
        for _ in 0..689 {
            service.render(&mut block);
        }
        assert_eq!(service.now_ms(), 1999);
        assert_eq!(service.state().now_playing.len(), 1);
        for _ in 0..4 {
            service.render(&mut block);
        }
        assert!(service.now_ms() >= 2000 && service.now_ms() < 2020);
        assert!(service.state().now_playing.is_empty());
    }

    #[test]
    fn test_idle_time_carries_into_engine_time() {
        let mut service = service();
        service.advance(500);
        service.play_note("F", "Path 15");
        assert_eq!(service.state().now_playing[0].started_at_ms, 500);
        service.set_sound_enabled(true);
        service.advance(1999);
        assert_eq!(service.now_ms(), 2499);
        assert_eq!(service.state().now_playing.len(), 1);
        service.advance(1);
        assert!(service.state().now_playing.is_empty());
    }

    #[test]
    fn test_nothing_sounding_is_not_playing() {
        let mut service = service();
        service.set_sound_enabled(true);
        service.play_chord(&[], "Malkuth (Below)");
        assert_eq!(service.engine().active_voice_count(), 0);
        assert!(!service.state().playing);
    }

    #[test]
    fn test_bad_note_sets_error() {
        let mut service = service();
        service.set_sound_enabled(true);
        service.play_note("H", "Path 13");
        assert!(service.state().error.is_some());
        assert!(service.state().now_playing.is_empty());
        service.clear_error();
        assert!(service.state().error.is_none());
    }

    #[test]
    fn test_disable_and_stop() {
        let mut service = service();
        service.set_sound_enabled(true);
        service.play_note("E", "Path 14");
        service.set_sound_enabled(false);
        assert_eq!(service.engine().active_voice_count(), 0);
        assert_eq!(service.state().now_playing.len(), 1);
        service.stop_all_sounds();
        assert!(service.state().now_playing.is_empty());
    }
}
