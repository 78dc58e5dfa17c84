use std::io;

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber.
///
/// - Filter from `RUST_LOG`, `info` when unset
/// - Always writes to stderr; stdout carries the reports
/// - `json` switches to one flattened JSON object per event
pub fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_writer(io::stderr);

    if json {
        builder.json().flatten_event(true).init();
    } else {
        builder.with_target(false).init();
    }
}
