//! Logging setup for requester processes.

use tracing_subscriber::EnvFilter;

/// Filter applied when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "requester=info";

/// Install a fmt subscriber filtered by `RUST_LOG`, falling back to
/// [`DEFAULT_LOG_FILTER`]. Does nothing when a global subscriber is already set.
pub fn init_tracing() {
    init_tracing_with(DEFAULT_LOG_FILTER);
}

/// Like [`init_tracing`], with a caller-chosen fallback filter.
pub fn init_tracing_with(default_filter: &str) {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    // Losing the race to another initializer is fine.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
