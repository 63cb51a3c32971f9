// Logging setup. RUST_LOG takes precedence over the configured level.

use crate::config::LogConfig;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// Returns false if a subscriber was already installed.
pub fn init(config: &LogConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = if config.format.eq_ignore_ascii_case("json") {
        builder.json().try_init()
    } else {
        builder.with_target(false).try_init()
    };

    result.is_ok()
}
