//! Unified error handling for the console.
//!
//! Sellers run their own console, so unlike the buyer-facing storefront
//! there is no message scrubbing here: store errors surface verbatim.

use thiserror::Error;
use warung_store::StoreError;

use crate::config::ConfigError;
use crate::products::ProductFormError;

/// Application-level error type for the console.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// Document store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Product form input did not validate.
    #[error("Form error: {0}")]
    Form(#[from] ProductFormError),

    /// Configuration failed to load.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for `ConsoleError`.
pub type Result<T> = std::result::Result<T, ConsoleError>;
