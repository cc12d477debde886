//! Tracing subscriber setup for the binaries

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Map a `--log-level` value to a tracing level, defaulting to info
pub fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Install the global compact subscriber
///
/// Output goes to stderr when `stderr` is set so stdout stays clean.
pub fn init(level: &str, stderr: bool) {
    let builder = FmtSubscriber::builder()
        .with_max_level(parse_level(level))
        .with_target(false)
        .with_thread_ids(false)
        .compact();

    if stderr {
        builder.with_writer(std::io::stderr).init();
    } else {
        builder.init();
    }
}
