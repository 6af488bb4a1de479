use std::path::PathBuf;

use thiserror::Error;

/// Library error type for camswap operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The managed media directory exists but is not a directory.
    #[error("invalid media directory: {0}")]
    BadDir(PathBuf),

    /// A content reference could not be opened for reading.
    #[error("content not readable: {0}")]
    Unreadable(String),

    /// The staged copy of an import was missing or empty.
    #[error("staged file is empty: {0}")]
    EmptyStage(PathBuf),

    /// Image-to-video conversion did not produce a usable file.
    #[error("conversion failed for {path}: {reason}")]
    Conversion { path: PathBuf, reason: String },

    /// A setting value did not parse for its key.
    #[error("invalid setting: {0}")]
    InvalidValue(String),

    /// Unknown media kind name.
    #[error("unknown media kind: {0}")]
    UnknownKind(String),

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Config store (de)serialization error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML/serde configuration error.
    #[error(transparent)]
    Config(#[from] serde_yaml::Error),

    /// A blocking worker panicked or was cancelled.
    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
