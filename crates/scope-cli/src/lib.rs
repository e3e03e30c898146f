//! AnomalyScope command-line probe
//!
//! `anomalyscope scan` samples the configured providers, prints a summary
//! and writes anomaly records; `reanalyze` recomputes a stored record
//! offline; `validate-config` checks the settings file.
//!
//! Exit status: `0` cycle complete, `1` cycle failed (or anomaly found
//! with `--fail-on-anomaly`), `2` configuration error.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod cli;
pub mod commands;
pub mod summary;

pub use cli::{Cli, Command};
pub use commands::{run, Exit};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber
///
/// `RUST_LOG` overrides the default `info` filter. Logs go to stderr so the
/// summary on stdout stays machine-readable.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
