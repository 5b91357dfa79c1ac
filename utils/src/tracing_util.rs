//! Helpers related to tracing, used by main entrypoints

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Initialize tracing with the default configuration.
///
/// Events go to stderr; stdout is reserved for operator-facing progress.
/// The level defaults to `warn` and can be raised with `RUST_LOG`.
pub fn initialize_tracing() {
    // Don't include timestamps and such because they're not really useful and
    // too verbose, and plus several log targets such as journald will already
    // include timestamps.
    let format = tracing_subscriber::fmt::format()
        .without_time()
        .with_target(false)
        .compact();
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .event_format(format)
        .with_writer(std::io::stderr)
        .init();
}
