//! Decode error types.

use thiserror::Error;

/// Errors produced while decoding source polygon data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A read ran past the end of the buffer.
    #[error("unexpected end of data at offset {offset}: needed {needed} bytes, buffer is {len}")]
    UnexpectedEof {
        /// Offset the read started at.
        offset: usize,
        /// Number of bytes requested.
        needed: usize,
        /// Total buffer length.
        len: usize,
    },

    /// An index referenced past the end of a source array.
    #[error("index {index} out of range for array of length {len}")]
    InvalidIndex {
        /// The offending index.
        index: usize,
        /// Length of the indexed array.
        len: usize,
    },

    /// A strip chunk referenced a vertex the vertex stream never defined.
    #[error("strip references undefined vertex {index}")]
    MissingVertex {
        /// Absolute vertex index.
        index: u32,
    },

    /// Structurally invalid model data.
    #[error("invalid model: {0}")]
    InvalidModel(String),
}

/// Result type for decode operations.
pub type DecodeResult<T> = Result<T, DecodeError>;
