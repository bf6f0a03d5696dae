//! # Logging
//!
//! Installs the `tracing` subscriber for binaries and embedding hosts.
//!
//! ## Log Levels
//! - `RUST_LOG=debug` - Show debug messages everywhere
//! - `RUST_LOG=caja_db=trace` - Trace the storage layer only
//! - Default: [`DEFAULT_LOG_FILTER`]

use tracing_subscriber::EnvFilter;

/// Filter used when neither `RUST_LOG` nor a configured filter is set.
pub const DEFAULT_LOG_FILTER: &str = "info,caja=debug,sqlx=warn";

/// Initializes the tracing subscriber with the default filter.
pub fn init_tracing() {
    init_tracing_with(DEFAULT_LOG_FILTER);
}

/// Initializes the tracing subscriber; `RUST_LOG` overrides `default_filter`.
///
/// Calling it again after a subscriber is installed does nothing.
pub fn init_tracing_with(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        init_tracing();
        init_tracing_with("debug");
    }
}
