//! Tracing/logging setup shared by bus hosts and tests.

/// Initialize process-wide logging with the default configuration
/// (JSON lines, `RUST_LOG` or `info`).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(&ObservabilityConfig::default());
}

/// Initialize process-wide logging with an explicit configuration.
pub fn init_with(config: ObservabilityConfig) {
    tracing::init(&config);
}

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use tracing::{LogFormat, ObservabilityConfig};
