//! Process-wide tracing setup shared by catalog binaries and tests.

/// Initialize tracing filtered by `RUST_LOG` (default `info`).
///
/// Output is JSON unless `LOG_FORMAT=pretty`. Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(tracing::LogFormat::from_env());
}

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use tracing::LogFormat;
