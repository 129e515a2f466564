//! Logging setup for triagectl
//!
//! Diagnostics go to stderr through `tracing`; report lines own stdout.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter (`info`, `triage_common=debug`, ...)
pub const LOG_ENV: &str = "TRIAGE_LOG";

/// Filter from `$TRIAGE_LOG`, default `info`; `--verbose` forces `debug`
pub fn filter(verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new("debug");
    }
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn init(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
