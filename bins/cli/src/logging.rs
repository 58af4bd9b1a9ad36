//! Tracing subscriber setup. Logs go to stderr so stdout stays parseable.

use std::io;
use tracing_subscriber::EnvFilter;

/// Filter directives, e.g. `GDINO_LOG=debug` or `GDINO_LOG=gdino_config=debug`.
pub const LOG_ENV: &str = "GDINO_LOG";

/// `json` switches to JSON lines; anything else keeps the text format.
pub const LOG_FORMAT_ENV: &str = "GDINO_LOG_FORMAT";

const DEFAULT_DIRECTIVE: &str = "info";

/// Install the global subscriber. Fails when one is already installed.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false);
    if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    }
}
