// Error types for the audio crate.
//
// `AudioContextUnavailable` is the recoverable one: the device refused to
// start, and the engine stays uninitialized so the next user gesture can
// retry. Pitch errors arrive wrapped from the music crate and are never
// swallowed by the engine; the service layer turns every error into UI
// state instead of propagating it.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("audio context unavailable: {0}")]
    AudioContextUnavailable(String),

    #[error("audio engine used before initialization")]
    NotInitialized,

    #[error("invalid audio configuration: {0}")]
    InvalidConfig(String),

    #[error("filter could not be built: {0}")]
    Filter(String),

    #[error(transparent)]
    Music(#[from] tree_of_life_music::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
