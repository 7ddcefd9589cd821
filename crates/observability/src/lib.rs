//! Tracing and logging setup shared by every binary and test harness.

/// Subscriber configuration (filters, output format).
pub mod tracing;

pub use crate::tracing::LoggingSettings;

/// Initialize process-wide logging with the defaults (`RUST_LOG`, else `info`; JSON).
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Initialize process-wide logging from configuration.
pub fn init_with(settings: &LoggingSettings) {
    tracing::init_with(settings);
}
