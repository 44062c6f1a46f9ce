use miette::Diagnostic;
use thiserror::Error;

/// Failure to parse a version, floating version or version range.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum VersionError {
    #[error("version string is empty")]
    Empty,

    #[error("invalid version '{input}': {reason}")]
    InvalidVersion { input: String, reason: String },

    #[error("invalid floating version '{input}'")]
    #[diagnostic(help("Floating versions look like `1.*`, `1.0.*`, `1.0.0-beta*` or `*`"))]
    InvalidFloat { input: String },

    #[error("invalid version range '{input}': {reason}")]
    #[diagnostic(help("Ranges look like `1.0`, `[1.0]`, `[1.0, 2.0)` or `(, 2.0]`"))]
    InvalidRange { input: String, reason: String },
}

impl VersionError {
    pub(crate) fn version(input: &str, reason: impl Into<String>) -> Self {
        Self::InvalidVersion {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn range(input: &str, reason: impl Into<String>) -> Self {
        Self::InvalidRange {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}
