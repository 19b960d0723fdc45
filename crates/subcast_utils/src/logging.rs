use std::str::FromStr;

/// Initialize tracing for the application.
///
/// `default_level` is parsed as a `tracing::Level` ("error", "warn", "info",
/// "debug", "trace"); anything unparseable falls back to INFO.
pub fn init(default_level: &str) {
    let level = tracing::Level::from_str(default_level).unwrap_or(tracing::Level::INFO);

    // try_init so tests and library consumers can call this more than once
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init();
}
