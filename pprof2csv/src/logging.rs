//! Diagnostic output shared by the command-line tools.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Default level for a given number of `-v` flags.
pub fn level_for_verbosity(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Install a stderr subscriber. `RUST_LOG` wins over the verbosity count.
///
/// Calling this twice is harmless; the second subscriber is discarded.
pub fn init_tracing(verbosity: u8) {
    let level = level_for_verbosity(verbosity);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(level.into()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
