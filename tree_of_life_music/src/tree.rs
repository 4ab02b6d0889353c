// Fixed Tree of Life topology: ten sephirot joined by twenty-two paths.
//
// Paths are numbered 11-32 and run from the upper sephirah (`from`) to the
// lower one (`to`). A sephirah's "Below" grouping is every path leaving it;
// its "Above" grouping is every path arriving at it. All named groupings are
// derived from `PATHS` rather than listed by hand, in sephirah order with
// Above before Below (Keter has no Above, Malkuth no Below).
//
// Two further fixed structures sit on top of the groupings:
// - Tree-Triads: the three triangles Keter-Hockmah-Binah (Supernal),
//   Hesed-Gevurah-Tiferet (Ethical) and Netzach-Hod-Yesod (Astral).
// - Triad slots: seven groupings, most of them overlapping a Tree-Triad, where the
//   solver may realize the remaining triads of a world.

use serde::{Deserialize, Serialize};
use std::fmt;

pub type PathNumber = u8;

pub const FIRST_PATH: PathNumber = 11;
pub const LAST_PATH: PathNumber = 32;
pub const PATH_COUNT: usize = 22;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Sephirah {
    Keter,
    Hockmah,
    Binah,
    Hesed,
    Gevurah,
    Tiferet,
    Netzach,
    Hod,
    Yesod,
    Malkuth,
}

impl Sephirah {
    pub const ALL: [Sephirah; 10] = [
        Sephirah::Keter,
        Sephirah::Hockmah,
        Sephirah::Binah,
        Sephirah::Hesed,
        Sephirah::Gevurah,
        Sephirah::Tiferet,
        Sephirah::Netzach,
        Sephirah::Hod,
        Sephirah::Yesod,
        Sephirah::Malkuth,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Sephirah::Keter => "Keter",
            Sephirah::Hockmah => "Hockmah",
            Sephirah::Binah => "Binah",
            Sephirah::Hesed => "Hesed",
            Sephirah::Gevurah => "Gevurah",
            Sephirah::Tiferet => "Tiferet",
            Sephirah::Netzach => "Netzach",
            Sephirah::Hod => "Hod",
            Sephirah::Yesod => "Yesod",
            Sephirah::Malkuth => "Malkuth",
        }
    }

    /// Position on the tree, 1 (Keter) through 10 (Malkuth).
    pub fn number(self) -> u8 {
        self as u8 + 1
    }

    pub fn from_name(name: &str) -> Option<Sephirah> {
        Sephirah::ALL
            .into_iter()
            .find(|s| s.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for Sephirah {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One connection between two sephirot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Path {
    pub number: PathNumber,
    pub from: Sephirah,
    pub to: Sephirah,
}

const fn path(number: PathNumber, from: Sephirah, to: Sephirah) -> Path {
    Path { number, from, to }
}

pub const PATHS: [Path; PATH_COUNT] = {
    use Sephirah::*;
    [
        path(11, Keter, Hockmah),
        path(12, Keter, Binah),
        path(13, Keter, Tiferet),
        path(14, Hockmah, Binah),
        path(15, Hockmah, Tiferet),
        path(16, Hockmah, Hesed),
        path(17, Binah, Gevurah),
        path(18, Binah, Tiferet),
        path(19, Hesed, Gevurah),
        path(20, Hesed, Tiferet),
        path(21, Hesed, Netzach),
        path(22, Gevurah, Tiferet),
        path(23, Gevurah, Hod),
        path(24, Tiferet, Netzach),
        path(25, Tiferet, Hod),
        path(26, Tiferet, Yesod),
        path(27, Netzach, Hod),
        path(28, Netzach, Yesod),
        path(29, Netzach, Malkuth),
        path(30, Hod, Yesod),
        path(31, Hod, Malkuth),
        path(32, Yesod, Malkuth),
    ]
};

pub fn path_numbers() -> impl Iterator<Item = PathNumber> {
    FIRST_PATH..=LAST_PATH
}

pub fn find_path(number: PathNumber) -> Option<&'static Path> {
    PATHS.iter().find(|p| p.number == number)
}

/// Paths leaving a sephirah, ascending.
pub fn paths_below(sephirah: Sephirah) -> Vec<PathNumber> {
    PATHS
        .iter()
        .filter(|p| p.from == sephirah)
        .map(|p| p.number)
        .collect()
}

/// Paths arriving at a sephirah, ascending.
pub fn paths_above(sephirah: Sephirah) -> Vec<PathNumber> {
    PATHS
        .iter()
        .filter(|p| p.to == sephirah)
        .map(|p| p.number)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    Above,
    Below,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Above => f.write_str("Above"),
            Position::Below => f.write_str("Below"),
        }
    }
}

/// A named set of paths sounded together as a chord.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grouping {
    pub name: String,
    pub paths: Vec<PathNumber>,
}

/// "Keter (Below)", "Hod (Above)", ...
pub fn grouping_name(sephirah: Sephirah, position: Position) -> String {
    format!("{sephirah} ({position})")
}

pub fn sephirah_grouping(sephirah: Sephirah, position: Position) -> Grouping {
    let paths = match position {
        Position::Above => paths_above(sephirah),
        Position::Below => paths_below(sephirah),
    };
    Grouping {
        name: grouping_name(sephirah, position),
        paths,
    }
}

/// Every non-empty Above/Below grouping in tree order.
pub fn sephirah_groupings() -> Vec<Grouping> {
    Sephirah::ALL
        .into_iter()
        .flat_map(|s| [Position::Above, Position::Below].map(|p| sephirah_grouping(s, p)))
        .filter(|g| !g.paths.is_empty())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeTriad {
    pub name: &'static str,
    pub paths: [PathNumber; 3],
}

pub const SUPERNAL: TreeTriad = TreeTriad {
    name: "Supernal Tree-Triad",
    paths: [11, 12, 14],
};
pub const ETHICAL: TreeTriad = TreeTriad {
    name: "Ethical Tree-Triad",
    paths: [19, 20, 22],
};
pub const ASTRAL: TreeTriad = TreeTriad {
    name: "Astral Tree-Triad",
    paths: [27, 28, 30],
};

pub const TREE_TRIADS: [TreeTriad; 3] = [SUPERNAL, ETHICAL, ASTRAL];

/// Groupings where the solver places the triads the Tree-Triads don't carry.
pub fn triad_slots() -> Vec<Grouping> {
    use Position::*;
    use Sephirah::*;
    [
        (Keter, Below),
        (Hockmah, Below),
        (Hesed, Below),
        (Tiferet, Below),
        (Netzach, Below),
        (Hod, Above),
        (Yesod, Above),
    ]
    .into_iter()
    .map(|(s, p)| sephirah_grouping(s, p))
    .collect()
}
