//! Telemetry setup for concept-rag
//!
//! Installs the global `tracing` subscriber. `RUST_LOG` takes precedence over
//! the CLI verbosity. Logs go to stderr so stdout stays clean for results.

use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, Registry};

use tracing::debug;

use crate::cli::Verbosity;

/// Default directive for a verbosity level
pub fn default_directive(verbosity: Verbosity) -> &'static str {
    match verbosity {
        Verbosity::Quiet => "error",
        Verbosity::Normal => "warn,concept_rag=info",
        Verbosity::Verbose => "info,concept_rag=debug",
        Verbosity::VeryVerbose => "debug,concept_rag=trace",
    }
}

fn env_filter(verbosity: Verbosity) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)))
}

/// Install the global subscriber. Returns false when one was already set,
/// in which case the existing subscriber stays in place.
pub fn init(verbosity: Verbosity) -> bool {
    let subscriber = Registry::default().with(env_filter(verbosity)).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(matches!(verbosity, Verbosity::VeryVerbose)),
    );
    match tracing::subscriber::set_global_default(subscriber) {
        Ok(()) => {
            debug!(verbosity = verbosity.as_str(), "Telemetry initialized");
            true
        }
        Err(e) => {
            debug!(error = %e, "Global subscriber already set");
            false
        }
    }
}
