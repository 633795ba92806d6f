//! Error types for categorical encoding.

use thiserror::Error;

/// Errors that can occur during categorical transforms.
#[derive(Debug, Error)]
pub enum TransformError {
    /// Value was not present when the transformer was constructed.
    #[error("Unknown category '{0}'")]
    UnknownCategory(String),

    /// Code outside the learned vocabulary range.
    #[error("Code {code} out of range for vocabulary of {uniques}")]
    CodeOutOfRange { code: i32, uniques: usize },
}
