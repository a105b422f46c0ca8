// Error types shared across the storage and playback layers
use std::path::PathBuf;
use thiserror::Error;

/// Failures coming out of the library store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(#[from] rusqlite::Error),

    #[error("{0} not found")]
    NotFound(String),
}

/// Failures coming out of the playback engine and its output
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("cannot play {}: file does not exist", .0.display())]
    MissingFile(PathBuf),

    #[error("failed to open {}: {reason}", .path.display())]
    Open { path: PathBuf, reason: String },

    #[error("audio output unavailable: {0}")]
    Output(String),

    #[error("seek failed: {0}")]
    Seek(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
