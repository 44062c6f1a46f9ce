use miette::Diagnostic;
use thiserror::Error;

/// Failure reported by a dependency provider.
#[derive(Debug, Error, Diagnostic)]
pub enum ProviderError {
    /// The source could not be reached or returned garbage.
    #[error("transport error from {source_name}: {message}")]
    Transport {
        source_name: String,
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("operation cancelled")]
    Cancelled,
}

impl ProviderError {
    pub fn transport(source_name: &str, message: impl Into<String>) -> Self {
        Self::Transport {
            source_name: source_name.to_string(),
            message: message.into(),
        }
    }
}

/// Fatal outcome of a walk.
#[derive(Debug, Error, Diagnostic)]
pub enum WalkError {
    #[error("dependency walk was cancelled")]
    Cancelled,

    #[error("circular dependency detected: {}", chain.join(" -> "))]
    #[diagnostic(help("Remove one of the edges in the chain"))]
    CircularDependency { chain: Vec<String> },
}
