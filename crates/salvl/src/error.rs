//! Error types for level conversion.

use std::path::PathBuf;

use salvl_decode::DecodeError;
use thiserror::Error;

/// Errors produced while converting a level.
#[derive(Error, Debug)]
pub enum Error {
    /// Geometry decoding failed.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// A file could not be read or written.
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The level container is malformed or of an unknown kind.
    #[error("invalid level: {0}")]
    InvalidLevel(String),

    /// A texture could not be decoded or encoded.
    #[error("texture {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The asset service rejected or garbled a request.
    #[error("upload failed: {0}")]
    Upload(String),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid command-line or option value.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for conversion operations.
pub type Result<T> = std::result::Result<T, Error>;
