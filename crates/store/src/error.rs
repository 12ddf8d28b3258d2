//! Error taxonomy for document store operations.

use thiserror::Error;

/// Errors that can occur when talking to a document store.
///
/// Every failure is recoverable from the caller's point of view: store
/// errors are surfaced to the user, never allowed to take the session down.
#[derive(Debug, Error)]
pub enum StoreError {
    /// HTTP transport failed (connection, TLS, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend accepted the request but rejected it.
    #[error("store rejected request ({status}): {message}")]
    Api {
        /// HTTP status code returned by the backend.
        status: u16,
        /// Error message from the backend, verbatim.
        message: String,
    },

    /// A response could not be decoded.
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The referenced document does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A write was not applicable to the stored field.
    ///
    /// Raised for example when an atomic increment targets a field that
    /// holds a non-numeric value.
    #[error("invalid field: {0}")]
    InvalidField(String),
}

impl StoreError {
    /// Whether this error means the referenced document is missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
