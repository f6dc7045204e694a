//! Tracing and logging (shared setup).

/// Initialize process-wide logging with the filter from `RUST_LOG` (default `info`).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Initialize process-wide logging with an explicit filter directive,
/// typically `StockroomConfig::log_filter`.
pub fn init_with_filter(directive: &str) {
    tracing::init_with_filter(directive);
}

/// Tracing configuration (filters, layers).
pub mod tracing;
