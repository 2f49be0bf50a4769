//! Tracing subscriber setup for harness binaries and test runners.

use tracing_subscriber::EnvFilter;

/// Set to `json` for one JSON object per log line (CI log collectors).
pub const LOG_FORMAT_ENV: &str = "STREAMPROBE_LOG_FORMAT";

/// Install a `fmt` subscriber filtered by `RUST_LOG` plus `default_directive`
/// (for example `"info"` or `"streamprobe=debug"`).
///
/// Returns `false` when a global subscriber was already installed, which is
/// the normal case for the second caller in a test binary.
pub fn init_tracing(default_directive: &str) -> bool {
    let filter = match default_directive.parse() {
        Ok(directive) => EnvFilter::from_default_env().add_directive(directive),
        Err(_) => EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
    };

    let json = std::env::var(LOG_FORMAT_ENV)
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if json {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    }
}
