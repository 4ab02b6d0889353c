// Chord detection by interval matching.
//
// The input is an unordered collection of notes; octave and order are
// irrelevant. The distinct pitch classes are folded into a `PitchSet`, and
// for every candidate root present in the set the set is transposed onto
// that root and compared against the quality table. Matches come back in
// table order (the table is sorted by preference: plain triads before
// sevenths and extensions), then by root pitch class.
//
// The detected root is always one of the input notes and keeps the spelling
// the caller used.

use crate::pitch::{Note, PitchClass, PitchSet};
use std::fmt;

/// A chord quality: its interval shape above the root and display suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChordQuality {
    Unison,
    Major,
    Minor,
    Diminished,
    Augmented,
    SuspendedFourth,
    SuspendedSecond,
    Power,
    DominantSeventh,
    MajorSeventh,
    MinorSeventh,
    HalfDiminished,
    DiminishedSeventh,
    MinorMajorSeventh,
    MajorSixth,
    MinorSixth,
    AddNine,
    MinorAddNine,
    DominantNinth,
    MajorNinth,
    MinorNinth,
    SeventhSuspendedFourth,
}

impl ChordQuality {
    /// Preference order used when several qualities match.
    pub const TABLE: [ChordQuality; 22] = [
        ChordQuality::Unison,
        ChordQuality::Major,
        ChordQuality::Minor,
        ChordQuality::Diminished,
        ChordQuality::Augmented,
        ChordQuality::SuspendedFourth,
        ChordQuality::SuspendedSecond,
        ChordQuality::Power,
        ChordQuality::DominantSeventh,
        ChordQuality::MajorSeventh,
        ChordQuality::MinorSeventh,
        ChordQuality::HalfDiminished,
        ChordQuality::DiminishedSeventh,
        ChordQuality::MinorMajorSeventh,
        ChordQuality::MajorSixth,
        ChordQuality::MinorSixth,
        ChordQuality::AddNine,
        ChordQuality::MinorAddNine,
        ChordQuality::DominantNinth,
        ChordQuality::MajorNinth,
        ChordQuality::MinorNinth,
        ChordQuality::SeventhSuspendedFourth,
    ];

    /// Semitones above the root, root included.
    pub fn intervals(self) -> &'static [u8] {
        match self {
            ChordQuality::Unison => &[0],
            ChordQuality::Major => &[0, 4, 7],
            ChordQuality::Minor => &[0, 3, 7],
            ChordQuality::Diminished => &[0, 3, 6],
            ChordQuality::Augmented => &[0, 4, 8],
            ChordQuality::SuspendedFourth => &[0, 5, 7],
            ChordQuality::SuspendedSecond => &[0, 2, 7],
            ChordQuality::Power => &[0, 7],
            ChordQuality::DominantSeventh => &[0, 4, 7, 10],
            ChordQuality::MajorSeventh => &[0, 4, 7, 11],
            ChordQuality::MinorSeventh => &[0, 3, 7, 10],
            ChordQuality::HalfDiminished => &[0, 3, 6, 10],
            ChordQuality::DiminishedSeventh => &[0, 3, 6, 9],
            ChordQuality::MinorMajorSeventh => &[0, 3, 7, 11],
            ChordQuality::MajorSixth => &[0, 4, 7, 9],
            ChordQuality::MinorSixth => &[0, 3, 7, 9],
            ChordQuality::AddNine => &[0, 2, 4, 7],
            ChordQuality::MinorAddNine => &[0, 2, 3, 7],
            ChordQuality::DominantNinth => &[0, 2, 4, 7, 10],
            ChordQuality::MajorNinth => &[0, 2, 4, 7, 11],
            ChordQuality::MinorNinth => &[0, 2, 3, 7, 10],
            ChordQuality::SeventhSuspendedFourth => &[0, 5, 7, 10],
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            ChordQuality::Unison => "",
            ChordQuality::Major => "M",
            ChordQuality::Minor => "m",
            ChordQuality::Diminished => "dim",
            ChordQuality::Augmented => "aug",
            ChordQuality::SuspendedFourth => "sus4",
            ChordQuality::SuspendedSecond => "sus2",
            ChordQuality::Power => "5",
            ChordQuality::DominantSeventh => "7",
            ChordQuality::MajorSeventh => "maj7",
            ChordQuality::MinorSeventh => "m7",
            ChordQuality::HalfDiminished => "m7b5",
            ChordQuality::DiminishedSeventh => "dim7",
            ChordQuality::MinorMajorSeventh => "mMaj7",
            ChordQuality::MajorSixth => "6",
            ChordQuality::MinorSixth => "m6",
            ChordQuality::AddNine => "add9",
            ChordQuality::MinorAddNine => "madd9",
            ChordQuality::DominantNinth => "9",
            ChordQuality::MajorNinth => "maj9",
            ChordQuality::MinorNinth => "m9",
            ChordQuality::SeventhSuspendedFourth => "7sus4",
        }
    }

    fn shape(self) -> PitchSet {
        self.intervals()
            .iter()
            .map(|&i| PitchClass::from_index(i))
            .collect()
    }
}

/// A recognized chord: root note (as spelled by the caller) plus quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chord {
    pub root: Note,
    pub quality: ChordQuality,
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.root, self.quality.symbol())
    }
}

/// Every match, most preferred first. Empty input yields no matches.
pub fn detect_all(notes: &[Note]) -> Vec<Chord> {
    let set: PitchSet = notes.iter().map(|n| n.pitch_class()).collect();
    if set.is_empty() {
        return Vec::new();
    }

    let mut found = Vec::new();
    for quality in ChordQuality::TABLE {
        let shape = quality.shape();
        if shape.len() != set.len() {
            continue;
        }
        for root_pc in set.iter() {
            if set.relative_to(root_pc) == shape {
                let root = notes
                    .iter()
                    .copied()
                    .find(|n| n.pitch_class() == root_pc)
                    .unwrap_or_else(|| Note::from(root_pc));
                found.push(Chord { root, quality });
            }
        }
    }
    found
}

/// The preferred chord for a set of notes, if any. A single pitch class is
/// reported as a unison on that note.
pub fn detect(notes: &[Note]) -> Option<Chord> {
    detect_all(notes).into_iter().next()
}

/// Whether the notes form a recognized chord (or a lone tone).
pub fn is_consonant(notes: &[Note]) -> bool {
    detect(notes).is_some()
}
