// Error types for the music crate.
//
// `InvalidPitchClass` is a data-integrity error: a note name outside the
// twelve-tone set reached the frequency model. It is never recovered
// internally. `SolverExhausted` is the solver's only failure, returned after
// the attempt cap is spent; individual failed attempts never surface here
// (see `solver::AttemptFailure`).

use crate::world::WorldName;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid pitch class: {0:?}")]
    InvalidPitchClass(String),

    #[error("unknown world: {0:?}")]
    UnknownWorld(String),

    #[error("no valid musical system for {world} after {attempts} attempts")]
    SolverExhausted { world: WorldName, attempts: usize },

    #[error("musical system is invalid: {0}")]
    InvalidSystem(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
