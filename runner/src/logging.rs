//! Diagnostics for batch runs.
//!
//! The batch report owns stdout and child stderr is passed through to stderr,
//! so runner diagnostics are interleaved with item stderr there, compact and
//! filtered by `RUST_LOG`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the stderr subscriber used by the `runner` binary.
///
/// Without `RUST_LOG` only warnings show up, such as a drain abandoned after
/// an item or an interrupt. `RUST_LOG=batch_runner=info` adds per-item results
/// and the batch tally; `debug` adds spawns and state transitions.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
