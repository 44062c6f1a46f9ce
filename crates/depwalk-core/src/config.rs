use serde::{Deserialize, Serialize};
use std::path::Path;

use depwalk_util::errors::DepwalkError;

/// Default number of provider calls allowed in flight at once.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 8;

/// Resolution walker settings, read from a TOML file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkerConfig {
    /// Expand dependencies of dependencies. When false only the root is resolved.
    #[serde(default = "default_true")]
    pub recursive: bool,

    #[serde(
        default = "default_max_concurrent_requests",
        rename = "max-concurrent-requests"
    )]
    pub max_concurrent_requests: usize,

    /// Race filesystem-backed providers before http ones for fixed ranges.
    #[serde(default = "default_true", rename = "prefer-filesystem-sources")]
    pub prefer_filesystem_sources: bool,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            prefer_filesystem_sources: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_concurrent_requests() -> usize {
    DEFAULT_MAX_CONCURRENT_REQUESTS
}

impl WalkerConfig {
    /// Parse a configuration from TOML text. Missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> miette::Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| DepwalkError::Config {
            message: format!("Failed to parse walker config: {e}"),
        })?;
        if config.max_concurrent_requests == 0 {
            return Err(DepwalkError::Config {
                message: "max-concurrent-requests must be at least 1".to_string(),
            }
            .into());
        }
        Ok(config)
    }

    /// Load the configuration from `path`.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DepwalkError::Config {
            message: format!("Failed to read walker config {}: {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Load the configuration from `path`, or return defaults if the file doesn't exist.
    pub fn load_or_default(path: &Path) -> miette::Result<Self> {
        if path.is_file() {
            Self::from_path(path)
        } else {
            tracing::debug!("no walker config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }
}
