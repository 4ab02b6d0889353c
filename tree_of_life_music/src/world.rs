// Tonal worlds and the triads derived from them.
//
// Each of the four worlds is the union of three neighbouring major keys: a
// nine-tone palette, a center key, and the three related key roots. Every
// related root contributes its major triad and the minor triad a major sixth
// above it (the relative minor). Triads that share a pitch-class set are the
// same triad, so the derived list is deduplicated by `PitchSet` signature.
//
// Worlds are static data. Note spellings come from the palette, so an
// Assiah triad reads E♭ G B♭ rather than D♯ G A♯.

use crate::error::Error;
use crate::pitch::{Accidental, Letter, Note, PitchClass, PitchSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WorldName {
    Assiah,
    Yetzirah,
    Atziluth,
    Briah,
}

impl WorldName {
    pub const ALL: [WorldName; 4] = [
        WorldName::Assiah,
        WorldName::Yetzirah,
        WorldName::Atziluth,
        WorldName::Briah,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WorldName::Assiah => "Assiah",
            WorldName::Yetzirah => "Yetzirah",
            WorldName::Atziluth => "Atziluth",
            WorldName::Briah => "Briah",
        }
    }

    pub fn world(self) -> World {
        World::new(self)
    }
}

impl fmt::Display for WorldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorldName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let wanted = s.trim();
        WorldName::ALL
            .into_iter()
            .find(|w| w.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::UnknownWorld(s.to_string()))
    }
}

const fn nat(letter: Letter) -> Note {
    Note::new(letter, Accidental::Natural)
}

const fn flat(letter: Letter) -> Note {
    Note::new(letter, Accidental::Flat)
}

const fn sharp(letter: Letter) -> Note {
    Note::new(letter, Accidental::Sharp)
}

/// A tonal palette: nine tones, a center key, and three related key roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct World {
    pub name: WorldName,
    pub palette: [Note; 9],
    pub center: Note,
    pub related_keys: [Note; 3],
}

impl World {
    pub fn new(name: WorldName) -> World {
        use Letter::*;
        let (palette, center, related_keys) = match name {
            WorldName::Assiah => (
                [
                    flat(B),
                    nat(C),
                    nat(D),
                    flat(E),
                    nat(F),
                    nat(G),
                    nat(A),
                    flat(A),
                    flat(D),
                ],
                flat(E),
                [flat(B), flat(E), flat(A)],
            ),
            WorldName::Yetzirah => (
                [
                    nat(F),
                    nat(G),
                    nat(A),
                    flat(B),
                    nat(C),
                    nat(D),
                    nat(E),
                    nat(B),
                    sharp(F),
                ],
                nat(C),
                [nat(F), nat(C), nat(G)],
            ),
            WorldName::Atziluth => (
                [
                    nat(D),
                    nat(E),
                    sharp(F),
                    nat(G),
                    nat(A),
                    nat(B),
                    sharp(C),
                    sharp(G),
                    sharp(D),
                ],
                nat(A),
                [nat(D), nat(A), nat(E)],
            ),
            WorldName::Briah => (
                [
                    sharp(C),
                    sharp(D),
                    nat(F),
                    sharp(F),
                    sharp(G),
                    sharp(A),
                    nat(C),
                    nat(B),
                    nat(E),
                ],
                sharp(F),
                [sharp(C), sharp(F), nat(B)],
            ),
        };
        World {
            name,
            palette,
            center,
            related_keys,
        }
    }

    pub fn palette_set(&self) -> PitchSet {
        self.palette.iter().map(|n| n.pitch_class()).collect()
    }

    /// The palette's spelling of a pitch class, or the canonical sharp name
    /// for tones outside the palette.
    pub fn spell(&self, pc: PitchClass) -> Note {
        self.palette
            .iter()
            .copied()
            .find(|n| n.pitch_class() == pc)
            .unwrap_or_else(|| Note::from(pc))
    }

    /// Major and relative-minor triads of each related key, deduplicated by
    /// pitch-class set, in key order.
    pub fn triads(&self) -> Vec<Triad> {
        let mut triads: Vec<Triad> = Vec::with_capacity(6);
        for key in self.related_keys {
            let major = Triad::build(self, key.pitch_class(), TriadQuality::Major);
            let minor = Triad::build(self, key.pitch_class().transpose(9), TriadQuality::Minor);
            for triad in [major, minor] {
                if !triads.iter().any(|t| t.signature() == triad.signature()) {
                    triads.push(triad);
                }
            }
        }
        triads
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriadQuality {
    Major,
    Minor,
}

impl TriadQuality {
    fn third(self) -> i32 {
        match self {
            TriadQuality::Major => 4,
            TriadQuality::Minor => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triad {
    pub root: Note,
    pub quality: TriadQuality,
    pub tones: [Note; 3],
}

impl Triad {
    fn build(world: &World, root: PitchClass, quality: TriadQuality) -> Triad {
        Triad {
            root: world.spell(root),
            quality,
            tones: [
                world.spell(root),
                world.spell(root.transpose(quality.third())),
                world.spell(root.transpose(7)),
            ],
        }
    }

    /// Order-free identity of the triad.
    pub fn signature(&self) -> PitchSet {
        self.tones.iter().map(|n| n.pitch_class()).collect()
    }

    /// Neighbouring triads share a tone, or have roots a third, fourth or
    /// fifth apart in either direction. A triad is not its own neighbour.
    pub fn is_related_to(&self, other: &Triad) -> bool {
        if self.signature() == other.signature() {
            return false;
        }
        if self.signature().bits() & other.signature().bits() != 0 {
            return true;
        }
        let interval = self.root.pitch_class().interval_to(other.root.pitch_class());
        matches!(interval, 3 | 4 | 5 | 7 | 8 | 9)
    }
}

impl fmt::Display for Triad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.root, self.quality)
    }
}
