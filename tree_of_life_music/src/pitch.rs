// Pitch classes, note spellings, and equal-tempered frequencies.
//
// A `PitchClass` is one of the twelve chromatic tones. A `Note` is a spelled
// pitch class (E♭ vs D♯): it keeps its spelling for display but compares,
// hashes, and orders purely by pitch class, so enharmonic spellings are the
// same note everywhere detection or set membership matters.
//
// Frequencies are twelve-tone equal temperament relative to A4 = 440 Hz. The
// octave number belongs to the pitch class, not the spelling: B♯4 and C4 are
// the same frequency.
//
// `PitchSet` is a 12-bit mask over pitch classes. Chord detection, triad
// signatures and solver coverage checks all work on it.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Concert pitch for A4.
pub const A4_HZ: f64 = 440.0;

// ---------------------------------------------------------------------------
// Pitch classes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Semitones above C (0-11).
    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u8) -> PitchClass {
        Self::ALL[(index % 12) as usize]
    }

    /// Canonical (sharp) name.
    pub fn name(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C♯",
            PitchClass::D => "D",
            PitchClass::DSharp => "D♯",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F♯",
            PitchClass::G => "G",
            PitchClass::GSharp => "G♯",
            PitchClass::A => "A",
            PitchClass::ASharp => "A♯",
            PitchClass::B => "B",
        }
    }

    pub fn transpose(self, semitones: i32) -> PitchClass {
        Self::from_index((self.index() as i32 + semitones).rem_euclid(12) as u8)
    }

    /// Ascending interval from `self` up to `other`, reduced mod 12.
    pub fn interval_to(self, other: PitchClass) -> u8 {
        (other.index() + 12 - self.index()) % 12
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Spelled notes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Letter {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Letter {
    fn natural_index(self) -> i32 {
        match self {
            Letter::C => 0,
            Letter::D => 2,
            Letter::E => 4,
            Letter::F => 5,
            Letter::G => 7,
            Letter::A => 9,
            Letter::B => 11,
        }
    }

    fn from_char(c: char) -> Option<Letter> {
        match c.to_ascii_uppercase() {
            'C' => Some(Letter::C),
            'D' => Some(Letter::D),
            'E' => Some(Letter::E),
            'F' => Some(Letter::F),
            'G' => Some(Letter::G),
            'A' => Some(Letter::A),
            'B' => Some(Letter::B),
            _ => None,
        }
    }

    fn as_char(self) -> char {
        match self {
            Letter::C => 'C',
            Letter::D => 'D',
            Letter::E => 'E',
            Letter::F => 'F',
            Letter::G => 'G',
            Letter::A => 'A',
            Letter::B => 'B',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Accidental {
    Flat,
    Natural,
    Sharp,
}

impl Accidental {
    fn offset(self) -> i32 {
        match self {
            Accidental::Flat => -1,
            Accidental::Natural => 0,
            Accidental::Sharp => 1,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Accidental::Flat => "♭",
            Accidental::Natural => "",
            Accidental::Sharp => "♯",
        }
    }
}

/// A spelled pitch class. Equality, ordering and hashing ignore spelling.
#[derive(Debug, Clone, Copy)]
pub struct Note {
    pub letter: Letter,
    pub accidental: Accidental,
}

impl Note {
    pub const fn new(letter: Letter, accidental: Accidental) -> Self {
        Note { letter, accidental }
    }

    pub fn pitch_class(self) -> PitchClass {
        PitchClass::from_index(
            (self.letter.natural_index() + self.accidental.offset()).rem_euclid(12) as u8,
        )
    }

    /// MIDI-style pitch number (C4 = 60).
    pub fn midi(self, octave: i32) -> i32 {
        (octave + 1) * 12 + self.pitch_class().index() as i32
    }

    /// Equal-tempered frequency in Hz.
    pub fn frequency(self, octave: i32) -> f64 {
        let semitones_from_a4 = (octave - 4) * 12 + self.pitch_class().index() as i32 - 9;
        A4_HZ * 2f64.powf(semitones_from_a4 as f64 / 12.0)
    }
}

impl From<PitchClass> for Note {
    fn from(pc: PitchClass) -> Self {
        let (letter, accidental) = match pc {
            PitchClass::C => (Letter::C, Accidental::Natural),
            PitchClass::CSharp => (Letter::C, Accidental::Sharp),
            PitchClass::D => (Letter::D, Accidental::Natural),
            PitchClass::DSharp => (Letter::D, Accidental::Sharp),
            PitchClass::E => (Letter::E, Accidental::Natural),
            PitchClass::F => (Letter::F, Accidental::Natural),
            PitchClass::FSharp => (Letter::F, Accidental::Sharp),
            PitchClass::G => (Letter::G, Accidental::Natural),
            PitchClass::GSharp => (Letter::G, Accidental::Sharp),
            PitchClass::A => (Letter::A, Accidental::Natural),
            PitchClass::ASharp => (Letter::A, Accidental::Sharp),
            PitchClass::B => (Letter::B, Accidental::Natural),
        };
        Note::new(letter, accidental)
    }
}

impl PartialEq for Note {
    fn eq(&self, other: &Self) -> bool {
        self.pitch_class() == other.pitch_class()
    }
}

impl Eq for Note {}

impl Hash for Note {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.pitch_class().hash(state);
    }
}

impl PartialOrd for Note {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Note {
    fn cmp(&self, other: &Self) -> Ordering {
        self.pitch_class().cmp(&other.pitch_class())
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.letter.as_char(), self.accidental.symbol())
    }
}

impl FromStr for Note {
    type Err = Error;

    /// Accepts a letter (any case) optionally followed by `#`, `♯`, `b`, or
    /// `♭`, with surrounding whitespace ignored.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        let letter = chars
            .next()
            .and_then(Letter::from_char)
            .ok_or_else(|| Error::InvalidPitchClass(s.to_string()))?;
        let accidental = match chars.as_str() {
            "" => Accidental::Natural,
            "#" | "♯" => Accidental::Sharp,
            "b" | "♭" => Accidental::Flat,
            _ => return Err(Error::InvalidPitchClass(s.to_string())),
        };
        Ok(Note::new(letter, accidental))
    }
}

impl Serialize for Note {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Note {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Pitch-class sets
// ---------------------------------------------------------------------------

const PITCH_MASK: u16 = 0x0FFF;

/// A set of pitch classes as a 12-bit mask (bit 0 = C).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PitchSet(u16);

impl PitchSet {
    pub const EMPTY: PitchSet = PitchSet(0);

    pub fn from_bits(bits: u16) -> Self {
        PitchSet(bits & PITCH_MASK)
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn insert(&mut self, pc: PitchClass) {
        self.0 |= 1 << pc.index();
    }

    pub fn contains(self, pc: PitchClass) -> bool {
        self.0 & (1 << pc.index()) != 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn is_subset(self, other: PitchSet) -> bool {
        self.0 & !other.0 == 0
    }

    pub fn union(self, other: PitchSet) -> PitchSet {
        PitchSet(self.0 | other.0)
    }

    /// The set transposed so that `root` lands on bit 0.
    pub fn relative_to(self, root: PitchClass) -> PitchSet {
        let r = root.index() as u32;
        if r == 0 {
            return self;
        }
        PitchSet::from_bits((self.0 >> r) | (self.0 << (12 - r)))
    }

    /// Members in ascending pitch-class order.
    pub fn iter(self) -> impl Iterator<Item = PitchClass> {
        PitchClass::ALL.into_iter().filter(move |pc| self.contains(*pc))
    }
}

impl FromIterator<PitchClass> for PitchSet {
    fn from_iter<I: IntoIterator<Item = PitchClass>>(iter: I) -> Self {
        let mut set = PitchSet::EMPTY;
        for pc in iter {
            set.insert(pc);
        }
        set
    }
}

// ---------------------------------------------------------------------------
// Frequency model
// ---------------------------------------------------------------------------

/// Frequency of a note name at the given octave.
pub fn frequency_of(note: &str, octave: i32) -> Result<f64> {
    Ok(note.parse::<Note>()?.frequency(octave))
}

/// `count` consecutive octaves centered on `base_octave`. An even count puts
/// the extra octave below the base.
pub fn octave_range(count: usize, base_octave: i32) -> Vec<i32> {
    let start = base_octave - (count / 2) as i32;
    (0..count as i32).map(|i| start + i).collect()
}

/// One frequency per octave, in the order given.
pub fn frequencies_across_octaves(note: &str, octaves: &[i32]) -> Result<Vec<f64>> {
    let note: Note = note.parse()?;
    Ok(octaves.iter().map(|&o| note.frequency(o)).collect())
}

pub fn octave_frequency_map(note: &str, octaves: &[i32]) -> Result<BTreeMap<i32, f64>> {
    let note: Note = note.parse()?;
    Ok(octaves.iter().map(|&o| (o, note.frequency(o))).collect())
}

/// Parse a note name that may carry a trailing octave number ("C#4", "Bb-1").
pub fn extract_note_name(s: &str) -> Result<Note> {
    let name = s
        .trim()
        .trim_end_matches(|c: char| c.is_ascii_digit() || c == '-');
    name.parse().map_err(|_| Error::InvalidPitchClass(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_a4_is_reference() {
        assert_eq!(frequency_of("A", 4).unwrap(), 440.0);
    }

    #[test]
    fn test_octave_doubles_frequency() {
        for pc in PitchClass::ALL {
            let note = Note::from(pc);
            for octave in 0..8 {
                let ratio = note.frequency(octave + 1) / note.frequency(octave);
                assert_relative_eq!(ratio, 2.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_middle_c() {
        assert_relative_eq!(frequency_of("C", 4).unwrap(), 261.6256, epsilon = 1e-4);
    }

    #[test]
    fn test_enharmonics_match() {
        assert_eq!(frequency_of("C♯", 4).unwrap(), frequency_of("D♭", 4).unwrap());
        assert_eq!(frequency_of("c#", 4).unwrap(), frequency_of("Db", 4).unwrap());
        assert_eq!("E#".parse::<Note>().unwrap().pitch_class(), PitchClass::F);
        assert_eq!("Cb".parse::<Note>().unwrap().pitch_class(), PitchClass::B);
        assert_eq!("bb".parse::<Note>().unwrap().pitch_class(), PitchClass::ASharp);
    }

    #[test]
    fn test_invalid_pitch_class() {
        for bad in ["", "H", "C##", "Cx", "BB", "do"] {
            assert!(
                matches!(frequency_of(bad, 4), Err(Error::InvalidPitchClass(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_trims_whitespace() {
        assert_eq!(" F# ".parse::<Note>().unwrap().pitch_class(), PitchClass::FSharp);
    }

    #[test]
    fn test_spelling_preserved_for_display() {
        let eb: Note = "Eb".parse().unwrap();
        let ds: Note = "D#".parse().unwrap();
        assert_eq!(eb, ds);
        assert_eq!(eb.to_string(), "E♭");
        assert_eq!(ds.to_string(), "D♯");
    }

    #[test]
    fn test_octave_range() {
        assert_eq!(octave_range(1, 4), vec![4]);
        assert_eq!(octave_range(2, 4), vec![3, 4]);
        assert_eq!(octave_range(3, 4), vec![3, 4, 5]);
        assert_eq!(octave_range(4, 4), vec![2, 3, 4, 5]);
        assert!(octave_range(0, 4).is_empty());
    }

    #[test]
    fn test_frequencies_across_octaves_preserves_order() {
        let freqs = frequencies_across_octaves("A", &[5, 3, 4]).unwrap();
        assert_eq!(freqs, vec![880.0, 220.0, 440.0]);
        let map = octave_frequency_map("A", &[3, 4]).unwrap();
        assert_eq!(map[&4], 440.0);
    }

    #[test]
    fn test_extract_note_name() {
        assert_eq!(extract_note_name("C#4").unwrap().pitch_class(), PitchClass::CSharp);
        assert_eq!(extract_note_name("Bb-1").unwrap().pitch_class(), PitchClass::ASharp);
        assert!(extract_note_name("X4").is_err());
    }

    #[test]
    fn test_pitch_set_relative() {
        let e_major: PitchSet = [PitchClass::E, PitchClass::GSharp, PitchClass::B]
            .into_iter()
            .collect();
        let shape = e_major.relative_to(PitchClass::E);
        assert_eq!(shape.bits(), 0b1001_0001);
        assert_eq!(e_major.len(), 3);
        assert!(shape.contains(PitchClass::C));
    }

    #[test]
    fn test_note_serde_round_trips_spelling() {
        let note: Note = "Ab".parse().unwrap();
        let json = serde_json::to_string(&note).unwrap();
        assert_eq!(json, "\"A♭\"");
        let back: Note = serde_json::from_str(&json).unwrap();
        assert_eq!(back.to_string(), "A♭");
    }
}
