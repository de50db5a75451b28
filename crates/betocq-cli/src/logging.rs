//! tracing-subscriber installation

use tracing_subscriber::EnvFilter;

/// Set to `json` for JSON-lines logs
pub const LOG_FORMAT_ENV_VAR: &str = "BETOCQ_LOG_FORMAT";

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `--verbose`; logs go
/// to stderr so stdout stays parseable. A second call is a no-op.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));
    let json = std::env::var(LOG_FORMAT_ENV_VAR)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false);
    // Already installed
    let _ = if json { builder.json().try_init() } else { builder.try_init() };
}
