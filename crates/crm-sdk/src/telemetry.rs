use tracing_subscriber::EnvFilter;

use crate::error::{SdkError, SdkResult};

/// Install a global `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// `default_directive` (e.g. `"info"` or `"crm_audit=debug"`) when unset.
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(default_directive: &str) -> SdkResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .map_err(|e| SdkError::Tracing(e.to_string()))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| SdkError::Tracing(e.to_string()))
}
