//! Tracing and logging (shared setup).

/// Initialize process-wide observability (tracing/logging).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init(config: &LogConfig) {
    tracing::init(config);
}

/// Log output settings.
pub mod logging;

/// Tracing subscriber installation.
pub mod tracing;

pub use logging::{LogConfig, LogFormat, UnknownLogFormat};
