// Click handlers for the Tree of Life diagram.
//
// `TreeInteraction` resolves clicks against a published `MusicalSystem` and
// hands the resulting notes to an injected `NotePlayer`. A path click plays
// the path's note; a sephirah click plays the chord of the paths leaving it
// (its Below grouping) and reports both groupings' notes for display along
// with the paths to highlight. Playback goes through the trait so the
// handlers work against the real audio service or a recording stub.

use tree_of_life_music::pitch::Note;
use tree_of_life_music::system::MusicalSystem;
use tree_of_life_music::tree::{
    PathNumber, Position, Sephirah, find_path, grouping_name, paths_above, paths_below,
};

/// Something that can sound notes on behalf of the UI. Implementations
/// must not fail into the caller.
pub trait NotePlayer {
    fn play_note(&mut self, note: &str, source: &str);

    fn play_chord(&mut self, notes: &[&str], source: &str);
}

/// What a sephirah click resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChordNotes {
    pub sephirah: Sephirah,
    pub above: Vec<Note>,
    pub below: Vec<Note>,
    /// Paths of the chord that was played.
    pub highlighted: Vec<PathNumber>,
}

pub struct TreeInteraction<'a> {
    system: &'a MusicalSystem,
}

impl<'a> TreeInteraction<'a> {
    pub fn new(system: &'a MusicalSystem) -> Self {
        TreeInteraction { system }
    }

    fn notes(&self, paths: &[PathNumber]) -> Vec<Note> {
        paths
            .iter()
            .filter_map(|p| self.system.note_for_path(*p))
            .collect()
    }

    /// Play the note on `path`. Returns the note, or None for an unknown or
    /// unassigned path.
    pub fn path_clicked(&self, player: &mut dyn NotePlayer, path: PathNumber) -> Option<Note> {
        find_path(path)?;
        let note = self.system.note_for_path(path)?;
        player.play_note(&note.to_string(), &format!("Path {path}"));
        Some(note)
    }

    /// Play the Below chord of `sephirah`, if it has one.
    pub fn sephirah_clicked(&self, player: &mut dyn NotePlayer, sephirah: Sephirah) -> ChordNotes {
        let below_paths = paths_below(sephirah);
        let above = self.notes(&paths_above(sephirah));
        let below = self.notes(&below_paths);

        if !below.is_empty() {
            let names: Vec<String> = below.iter().map(Note::to_string).collect();
            let refs: Vec<&str> = names.iter().map(String::as_str).collect();
            player.play_chord(&refs, &grouping_name(sephirah, Position::Below));
        }

        ChordNotes {
            sephirah,
            above,
            below,
            highlighted: below_paths,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_of_life_music::solver::{SolverConfig, solve_seeded};
    use tree_of_life_music::world::WorldName;

    #[derive(Default)]
    struct Recorder {
        notes: Vec<(String, String)>,
        chords: Vec<(Vec<String>, String)>,
    }

    impl NotePlayer for Recorder {
        fn play_note(&mut self, note: &str, source: &str) {
            self.notes.push((note.to_string(), source.to_string()));
        }

        fn play_chord(&mut self, notes: &[&str], source: &str) {
            self.chords.push((
                notes.iter().map(|n| n.to_string()).collect(),
                source.to_string(),
            ));
        }
    }

    fn system() -> MusicalSystem {
        solve_seeded(WorldName::Assiah, &SolverConfig::default(), 7)
            .unwrap()
            .to_system("2024-01-01")
    }

    #[test]
    fn test_path_click_plays_assigned_note() {
        let system = system();
        let tree = TreeInteraction::new(&system);
        let mut player = Recorder::default();
        let note = tree.path_clicked(&mut player, 11).unwrap();
        assert_eq!(player.notes, vec![(note.to_string(), "Path 11".to_string())]);
        assert!(tree.path_clicked(&mut player, 40).is_none());
        assert_eq!(player.notes.len(), 1);
    }

    #[test]
    fn test_sephirah_click_plays_below_chord() {
        let system = system();
        let tree = TreeInteraction::new(&system);
        let mut player = Recorder::default();
        let notes = tree.sephirah_clicked(&mut player, Sephirah::Keter);
        assert_eq!(notes.highlighted, vec![11, 12, 13]);
        assert!(notes.above.is_empty());
        assert_eq!(notes.below.len(), 3);
        assert_eq!(player.chords[0].1, "Keter (Below)");
        assert_eq!(player.chords[0].0.len(), 3);
    }

    #[test]
    fn test_malkuth_has_nothing_below() {
        let system = system();
        let tree = TreeInteraction::new(&system);
        let mut player = Recorder::default();
        let notes = tree.sephirah_clicked(&mut player, Sephirah::Malkuth);
        assert!(notes.below.is_empty());
        assert_eq!(notes.above.len(), 3);
        assert!(player.chords.is_empty());
    }
}
