//! Diagnostics for the CLI.
//!
//! Command output (JSON) goes to stdout; tracing goes to stderr so it never
//! mixes with it.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Reads `RUST_LOG`, defaults to `warn`. Compact format on stderr.
///
/// ```bash
/// RUST_LOG=notchfocus_core=debug notchfocus run
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
