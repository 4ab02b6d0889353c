// Frequency model, chord detection and voicing checks through the public API.

use approx::assert_relative_eq;
use tree_of_life_music::Error;
use tree_of_life_music::chord::{ChordQuality, detect};
use tree_of_life_music::pitch::{
    Note, PitchClass, frequencies_across_octaves, frequency_of, octave_range,
};
use tree_of_life_music::voicing::voice_chord;

const SPELLINGS: [&str; 17] = [
    "C", "C#", "Db", "D", "D#", "Eb", "E", "F", "F#", "Gb", "G", "G#", "Ab", "A", "A#", "Bb", "B",
];

fn notes(names: &[&str]) -> Vec<Note> {
    names.iter().map(|n| n.parse().unwrap()).collect()
}

#[test]
fn test_frequency_monotonic_in_octave() {
    for name in SPELLINGS {
        let freqs = frequencies_across_octaves(name, &octave_range(9, 4)).unwrap();
        for pair in freqs.windows(2) {
            assert!(pair[1] > pair[0], "{name}");
            assert_relative_eq!(pair[1] / pair[0], 2.0, epsilon = 1e-12);
        }
    }
}

#[test]
fn test_reference_and_enharmonics() {
    assert_eq!(frequency_of("A", 4).unwrap(), 440.0);
    assert_eq!(frequency_of("C♯", 4).unwrap(), frequency_of("D♭", 4).unwrap());
    assert_eq!(frequency_of("G#", 2).unwrap(), frequency_of("Ab", 2).unwrap());
}

#[test]
fn test_semitone_ratio() {
    let a = frequency_of("A", 4).unwrap();
    let bb = frequency_of("Bb", 4).unwrap();
    assert_relative_eq!(bb / a, 2f64.powf(1.0 / 12.0), epsilon = 1e-12);
}

#[test]
fn test_invalid_name_fails_at_boundary() {
    let err = frequency_of("Q", 4).unwrap_err();
    assert!(matches!(err, Error::InvalidPitchClass(ref s) if s == "Q"));
}

#[test]
fn test_detector_examples() {
    let c_major = detect(&notes(&["C", "E", "G"])).unwrap();
    assert_eq!(c_major.root.pitch_class(), PitchClass::C);
    assert_eq!(c_major.quality, ChordQuality::Major);
    assert_eq!(detect(&notes(&["C"])).unwrap().to_string(), "C");
    assert!(detect(&[]).is_none());
}

#[test]
fn test_voicing_raises_second() {
    let voicing = voice_chord(&notes(&["C", "D", "E"]));
    let octave = |pc: PitchClass| {
        voicing
            .iter()
            .find(|v| v.note.pitch_class() == pc)
            .unwrap()
            .relative_octave
    };
    assert_eq!(octave(PitchClass::C), 0);
    assert_ne!(octave(PitchClass::D), 0);
}

#[test]
fn test_voicing_stable_across_orderings() {
    let sets: [&[&str]; 3] = [&["C", "E", "G", "D"], &["F", "A", "C", "G"], &["C", "D", "E"]];
    for set in sets {
        let mut reversed = set.to_vec();
        reversed.reverse();
        let mut a: Vec<(PitchClass, i32)> = voice_chord(&notes(set))
            .iter()
            .map(|v| (v.note.pitch_class(), v.relative_octave))
            .collect();
        let mut b: Vec<(PitchClass, i32)> = voice_chord(&notes(&reversed))
            .iter()
            .map(|v| (v.note.pitch_class(), v.relative_octave))
            .collect();
        a.sort();
        b.sort();
        assert_eq!(a, b, "{set:?}");
    }
}
