//! Log output for the `refactor` CLI and `refactord`.
//!
//! stdout belongs to the program's result (refactored code, job report JSON),
//! so every log line is written to stderr, in either human or JSON form.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter from `RUST_LOG`, falling back to `level`.
fn log_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

/// Install the process-wide subscriber. Returns `false` when one was already
/// installed, in which case the call has no effect.
pub fn init_tracing(json: bool, level: Level) -> bool {
    // Each layer is typed by its position in the stack, so build them apart.
    let (plain, structured) = if json {
        let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
        (None, Some(layer.json()))
    } else {
        let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
        (Some(layer), None)
    };

    tracing_subscriber::registry()
        .with(log_filter(level))
        .with(plain)
        .with(structured)
        .try_init()
        .is_ok()
}
