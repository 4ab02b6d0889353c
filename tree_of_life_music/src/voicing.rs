// Chord voicing: assign each chord tone a relative octave so the chord
// sounds spread rather than muddy.
//
// Two branches:
// - Root-based. When the chord detector recognizes the notes, every tone a
//   minor or major second above the root (the b9 and 9 extensions) moves up
//   an octave; everything else stays with the root. Output keeps the input
//   order.
// - Cluster fallback. With no recognized chord the notes are laid out inside
//   one reference octave (octave 4), walked low to high, and any note within
//   two semitones of its predecessor is raised one octave above the working
//   octave. The working octave itself never moves, so a run of seconds opens
//   into two layers, not a staircase. Output is sorted by effective pitch.
//
// Neither branch uses randomness, so the same set of notes always voices
// the same way regardless of input order.

use crate::chord::detect_all;
use crate::pitch::Note;

/// Octave the cluster fallback lays notes out in.
const REFERENCE_OCTAVE: i32 = 4;

/// A chord tone with its octave offset relative to the voicing's base octave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoicedNote {
    pub note: Note,
    pub relative_octave: i32,
}

/// Voice a chord. Duplicate pitch classes are collapsed (first spelling
/// wins); an empty input gives an empty voicing.
pub fn voice_chord(notes: &[Note]) -> Vec<VoicedNote> {
    let mut unique: Vec<Note> = Vec::with_capacity(notes.len());
    for &note in notes {
        if !unique.contains(&note) {
            unique.push(note);
        }
    }

    let root = detect_all(&unique)
        .into_iter()
        .map(|chord| chord.root)
        .find(|root| unique.contains(root));

    match root {
        Some(root) => unique
            .iter()
            .map(|&note| {
                let interval = root.pitch_class().interval_to(note.pitch_class());
                let relative_octave = if interval == 1 || interval == 2 { 1 } else { 0 };
                VoicedNote {
                    note,
                    relative_octave,
                }
            })
            .collect(),
        None => voice_cluster(unique),
    }
}

fn voice_cluster(mut notes: Vec<Note>) -> Vec<VoicedNote> {
    notes.sort();
    let working_octave = 0;
    let mut previous: Option<i32> = None;
    let mut voiced: Vec<VoicedNote> = notes
        .into_iter()
        .map(|note| {
            let pitch = note.midi(REFERENCE_OCTAVE);
            let relative_octave = match previous {
                Some(prev) if pitch - prev <= 2 => working_octave + 1,
                _ => working_octave,
            };
            previous = Some(pitch);
            VoicedNote {
                note,
                relative_octave,
            }
        })
        .collect();
    voiced.sort_by_key(|v| v.note.midi(REFERENCE_OCTAVE) + v.relative_octave * 12);
    voiced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::PitchClass;

    fn notes(names: &[&str]) -> Vec<Note> {
        names.iter().map(|n| n.parse().unwrap()).collect()
    }

    fn octave_of(voicing: &[VoicedNote], pc: PitchClass) -> i32 {
        voicing
            .iter()
            .find(|v| v.note.pitch_class() == pc)
            .unwrap()
            .relative_octave
    }

    #[test]
    fn test_empty_and_single() {
        assert!(voice_chord(&[]).is_empty());
        let single = voice_chord(&notes(&["F#"]));
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].relative_octave, 0);
    }

    #[test]
    fn test_triad_stays_together() {
        let voicing = voice_chord(&notes(&["C", "E", "G"]));
        assert!(voicing.iter().all(|v| v.relative_octave == 0));
        // Root-based branch keeps input order.
        assert_eq!(voicing[1].note.pitch_class(), PitchClass::E);
    }

    #[test]
    fn test_add9_raises_the_ninth() {
        let voicing = voice_chord(&notes(&["C", "E", "G", "D"]));
        assert_eq!(octave_of(&voicing, PitchClass::C), 0);
        assert_eq!(octave_of(&voicing, PitchClass::D), 1);
        assert_eq!(octave_of(&voicing, PitchClass::E), 0);
    }

    #[test]
    fn test_cluster_opens_seconds() {
        let voicing = voice_chord(&notes(&["E", "C", "D"]));
        assert_eq!(octave_of(&voicing, PitchClass::C), 0);
        assert_ne!(octave_of(&voicing, PitchClass::D), 0);
        // Sorted by effective pitch: C4, D5, E5.
        let order: Vec<_> = voicing.iter().map(|v| v.note.pitch_class()).collect();
        assert_eq!(order, vec![PitchClass::C, PitchClass::D, PitchClass::E]);
    }

    #[test]
    fn test_duplicates_collapse() {
        let voicing = voice_chord(&notes(&["C", "E", "G", "C", "Fb"]));
        assert_eq!(voicing.len(), 3);
    }

    #[test]
    fn test_order_independent() {
        let mut a: Vec<_> = voice_chord(&notes(&["A", "C", "E", "B"]))
            .into_iter()
            .map(|v| (v.note.pitch_class(), v.relative_octave))
            .collect();
        let mut b: Vec<_> = voice_chord(&notes(&["B", "E", "C", "A"]))
            .into_iter()
            .map(|v| (v.note.pitch_class(), v.relative_octave))
            .collect();
        a.sort();
        b.sort();
        assert_eq!(a, b);
    }
}
