//! Tracing and logging setup shared by every binary.

/// Initialize process-wide tracing.
///
/// `level` is the configured `LOG_LEVEL`; `json` selects JSON lines over
/// human-readable text. Safe to call multiple times; subsequent calls are no-ops.
pub fn init(level: &str, json: bool) {
    tracing::init(level, json);
}

/// Tracing configuration (filters, layers).
pub mod tracing;
