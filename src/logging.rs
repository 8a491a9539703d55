//! Log output for binaries and tests embedding the compiler.

use tracing_subscriber::EnvFilter;

/// Install a compact `tracing` subscriber filtered by `RUST_LOG`, falling
/// back to `info`.
///
/// Calling it again once a subscriber is installed is an error, which tests
/// are free to ignore.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init()
}
