//! Error types for engine FFI operations.

use thiserror::Error;

/// Errors that can occur while driving the synthesis engine.
#[derive(Debug, Error)]
pub enum SynthError {
    /// Failed to load the engine shared library.
    #[error("Failed to load engine library '{path}': {source}")]
    LoadError {
        path: String,
        #[source]
        source: libloading::Error,
    },

    /// Required symbol not found in the engine library.
    #[error("Symbol '{symbol}' not found in engine library")]
    SymbolNotFound { symbol: String },

    /// Columns disagree on row count, or the column set is empty.
    #[error("Schema mismatch: {reason}")]
    SchemaMismatch { reason: String },

    /// Operation attempted on a model whose handle was already destroyed.
    #[error("Model handle already disposed")]
    UseAfterDispose,

    /// The engine returned a null handle.
    #[error("Engine call '{call}' returned a null handle")]
    NativeCallFailure { call: &'static str },

    /// The flow-control callback panicked during training.
    #[error("Flow-control callback panicked: {0}")]
    ControllerPanicked(String),

    /// Snapshot record could not be encoded or decoded.
    #[error("Snapshot codec error: {0}")]
    SnapshotCodec(#[from] serde_json::Error),

    /// Engine-produced snapshot state could not be read.
    #[error("Invalid snapshot state: {0}")]
    InvalidSnapshotState(String),
}

impl SynthError {
    /// Create a load error.
    pub fn load_error(path: impl Into<String>, source: libloading::Error) -> Self {
        Self::LoadError {
            path: path.into(),
            source,
        }
    }

    /// Create a symbol not found error.
    pub fn symbol_not_found(symbol: impl Into<String>) -> Self {
        Self::SymbolNotFound {
            symbol: symbol.into(),
        }
    }

    /// Create a schema mismatch error.
    pub fn schema_mismatch(reason: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            reason: reason.into(),
        }
    }

    /// Create a native call failure for a named entry point.
    pub fn native_call_failure(call: &'static str) -> Self {
        Self::NativeCallFailure { call }
    }
}

/// Result type for engine operations.
pub type SynthResult<T> = Result<T, SynthError>;
