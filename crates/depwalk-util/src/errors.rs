use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for depwalk file loading and setup operations.
#[derive(Debug, Error, Diagnostic)]
pub enum DepwalkError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or malformed walker configuration.
    #[error("Configuration error: {message}")]
    #[diagnostic(help("Check the walker configuration file for syntax errors"))]
    Config { message: String },

    /// Invalid or malformed lock-file pins.
    #[error("Lock file error: {message}")]
    #[diagnostic(help("Regenerate the lock file or remove the offending entry"))]
    LockFile { message: String },

    /// Logging could not be initialised.
    #[error("Logging setup failed: {message}")]
    Logging { message: String },
}
