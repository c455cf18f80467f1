//! Error types for editor operations.
//!
//! This module provides the [`EditorError`] type for all editor library
//! operations and the [`Result`] convenience type.

use thiserror::Error;

/// Error type for all editor library operations.
///
/// Covers the two failure classes surfaced to users — transport failures
/// and rejected API calls — plus local misuse of the editor (operating on
/// an unloaded record or an out-of-range field index).
#[derive(Error, Debug)]
pub enum EditorError {
    /// Network or transport failure before an HTTP status was received.
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx response from the catalog backend.
    ///
    /// `message` carries the server's own error text verbatim when the
    /// response body provides one.
    #[error("{message}")]
    Api {
        /// HTTP status code of the rejected request.
        status: u16,
        /// Server-provided error message, or a generic fallback.
        message: String,
    },

    /// An operation required a loaded record but none is loaded.
    #[error("No record loaded")]
    NoRecord,

    /// The given field index does not exist in the cached field list.
    #[error("No field at index {0}")]
    FieldOutOfRange(usize),
}

impl EditorError {
    /// HTTP status of an [`EditorError::Api`] error, if that is what this is.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            EditorError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Convenience type alias for [`std::result::Result`] with [`EditorError`].
pub type Result<T> = std::result::Result<T, EditorError>;
