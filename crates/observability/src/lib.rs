//! Tracing/logging setup shared by product list binaries and services.

/// Initialize process-wide tracing.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Subscriber configuration (filters, output format).
pub mod tracing;

pub use tracing::{LogFormat, UnknownLogFormat};
