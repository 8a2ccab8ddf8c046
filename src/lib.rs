pub mod cli;
pub mod commands;
pub mod config;
pub mod core_state;
pub mod db;
pub mod dto;
pub mod models;

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `RUST_LOG` wins over `fallback_filter`.
///
/// Logs go to stderr so command output on stdout stays machine-readable.
pub fn init_tracing(fallback_filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback_filter)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
