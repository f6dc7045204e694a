//! Tracing/logging initialization.
//!
//! JSON lines with timestamps. Stock services emit one event per committed
//! posting or transition, so the default `info` level doubles as an audit trail.

use tracing_subscriber::EnvFilter;

/// Initialize tracing/logging for the process from `RUST_LOG`.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    install(filter);
}

/// Initialize with `directive`; an unparsable directive falls back to `info`.
pub fn init_with_filter(directive: &str) {
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"));
    install(filter);
}

fn install(filter: EnvFilter) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}
