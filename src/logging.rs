//! Diagnostic logging to stderr.
//!
//! Stdout carries command output (JSON reports, generated Markdown), so all
//! log lines go to stderr. The filter comes from `SEEV_LOG` using the usual
//! `tracing` directive syntax and defaults to `warn`.

use tracing_subscriber::EnvFilter;

pub const ENV_LOG: &str = "SEEV_LOG";

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init(verbose: bool) {
    let default = if verbose { "seev=debug,seev_core=debug,info" } else { "warn" };
    let filter = EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
