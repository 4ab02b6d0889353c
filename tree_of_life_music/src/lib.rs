// Tree of Life music model
//
// Pitch handling, chord recognition and voicing for the Tree of Life
// diagram, plus the solver that assigns a note to each of its 22 paths.
//
// Architecture:
// - pitch.rs: Pitch classes, spelled notes, pitch-class sets, equal-tempered
//   frequencies and octave ranges
// - chord.rs: Interval-table chord detection
// - voicing.rs: Relative-octave spreading of chord tones
// - world.rs: The four tonal worlds and their derived triads
// - tree.rs: Fixed sephirot/path topology, groupings, Tree-Triads, triad slots
// - system.rs: Path assignments, chord listings, the published record and
//   its JSON store
// - solver.rs: Seeded randomized constraint search with scoring and retry
// - error.rs: Crate error type
//
// The solver is deterministic given a seed.

pub mod chord;
pub mod error;
pub mod pitch;
pub mod solver;
pub mod system;
pub mod tree;
pub mod voicing;
pub mod world;

pub use error::{Error, Result};
