//! Error types for the demo programs.

use qlab_hal::HalError;
use qlab_ir::IrError;
use thiserror::Error;

/// Errors raised by the demo library.
#[derive(Debug, Error)]
pub enum DemoError {
    /// Standard input closed before a valid answer was read.
    #[error("Input closed before a valid answer was given")]
    InputClosed,

    /// Terminal or file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Circuit construction failed.
    #[error("Circuit error: {0}")]
    Circuit(#[from] IrError),

    /// Backend execution failed.
    #[error("Backend error: {0}")]
    Backend(#[from] HalError),

    /// JSON encoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A value was outside the range the program accepts.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Configuration could not be loaded or is inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for demo operations.
pub type DemoResult<T> = Result<T, DemoError>;
