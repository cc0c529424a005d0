//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

/// Map a configured log level onto an `EnvFilter` directive.
///
/// Accepts the usual level names in any case, plus `WARNING` and `CRITICAL`
/// spellings. Anything else is passed through as a raw directive
/// (e.g. `paksa_api=debug,tower_http=info`).
pub fn level_directive(level: &str) -> String {
    match level.trim().to_ascii_lowercase().as_str() {
        "" => "info".to_string(),
        "trace" => "trace".to_string(),
        "debug" => "debug".to_string(),
        "info" => "info".to_string(),
        "warn" | "warning" => "warn".to_string(),
        "error" | "critical" | "fatal" => "error".to_string(),
        "off" | "none" => "off".to_string(),
        _ => level.trim().to_string(),
    }
}

/// Initialize tracing/logging for the process.
///
/// `RUST_LOG` takes precedence over `level` when set.
pub fn init(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level_directive(level)))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::SystemTime);

    let _ = if json {
        builder.json().with_target(false).try_init()
    } else {
        builder.with_target(true).try_init()
    };
}
