//! Error types for voxnote

use thiserror::Error;

/// Result type alias using voxnote's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in voxnote
#[derive(Error, Debug)]
pub enum Error {
    #[error("Audio unavailable: {0}")]
    Audio(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("Remote service error: {0}")]
    RemoteService(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Settings error: {0}")]
    Settings(#[from] rusqlite::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
