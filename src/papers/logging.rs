//! Logging setup for the binary.
//!
//! The library only emits `tracing` events; nothing is printed unless a
//! subscriber is installed. `init_logging` installs a compact `fmt` layer on
//! stderr so log lines never mix with command output on stdout.
//!
//! # Environment Variables
//!
//! - `PAPERS_LOG`: filter directive (like `RUST_LOG`), e.g. `papers=debug`.
//!   Defaults to `warn`, or `debug` with `--verbose`.

use std::io;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

pub const LOG_ENV: &str = "PAPERS_LOG";

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "warn"
    }
}

/// Builds the filter: `PAPERS_LOG` when set and valid, the default otherwise.
pub fn build_env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)))
}

/// Installs the global subscriber. Calling it twice is harmless.
pub fn init_logging(verbose: bool) {
    let _ = Registry::default()
        .with(build_env_filter(verbose))
        .with(
            fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .try_init();
}
