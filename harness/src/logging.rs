//! Development-time tracing for debugging harness runs.
//!
//! Diagnostics go to stderr and are filtered via `RUST_LOG`; they are not
//! part of a run's captured artifacts. Server logs and step reports are
//! written under the results directory regardless of this filter.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber for development logging.
///
/// Reads `RUST_LOG`. Defaults to `warn` if unset.
///
/// # Example
/// ```bash
/// RUST_LOG=harness=debug,e2e=debug cargo run -p e2e -- run hot-reload
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
