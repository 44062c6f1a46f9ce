//! Tracing subscriber setup for binaries and tests embedding the walker.

use tracing_subscriber::EnvFilter;

use crate::errors::DepwalkError;

/// Install a global fmt subscriber filtered by `RUST_LOG`, falling back to
/// `default_directive` (e.g. `"warn"` or `"depwalk_resolver=debug"`).
pub fn init(default_directive: &str) -> Result<(), DepwalkError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| DepwalkError::Logging {
            message: e.to_string(),
        })
}

/// Like [`init`], but writes through the test harness capture and ignores
/// a subscriber that is already installed.
pub fn init_for_tests() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}
