//! # Configuration
//!
//! Loaded from environment variables with fallback to defaults.
//!
//! ```text
//! CAJA_DB_PATH              ./caja.db
//! CAJA_STORE_NAME           Caja POS
//! CAJA_DB_MAX_CONNECTIONS   5
//! CAJA_LOG                  info,caja=debug,sqlx=warn   (RUST_LOG wins)
//! ```

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use caja_core::Money;
use caja_db::DbConfig;

use crate::logging::DEFAULT_LOG_FILTER;

/// Service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PosConfig {
    /// SQLite database file (`:memory:` for an ephemeral store)
    pub db_path: PathBuf,

    /// Store name (displayed on receipts)
    pub store_name: String,

    /// Pool size
    pub db_max_connections: u32,

    /// Default tracing filter
    pub log_filter: String,
}

impl Default for PosConfig {
    fn default() -> Self {
        PosConfig {
            db_path: PathBuf::from("./caja.db"),
            store_name: "Caja POS".to_string(),
            db_max_connections: 5,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl PosConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = PosConfig::default();

        let db_max_connections = match lookup("CAJA_DB_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::InvalidValue("CAJA_DB_MAX_CONNECTIONS".to_string()))?,
            None => defaults.db_max_connections,
        };

        let store_name = lookup("CAJA_STORE_NAME").unwrap_or(defaults.store_name);
        if store_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue("CAJA_STORE_NAME".to_string()));
        }

        Ok(PosConfig {
            db_path: lookup("CAJA_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            store_name,
            db_max_connections,
            log_filter: lookup("CAJA_LOG").unwrap_or(defaults.log_filter),
        })
    }

    /// Pool settings for [`caja_db::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        if self.db_path.as_os_str() == ":memory:" {
            return DbConfig::in_memory();
        }
        DbConfig::new(&self.db_path).max_connections(self.db_max_connections)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

/// Formats an amount as Chilean pesos: `$1.000`, `-$200`.
///
/// The amount is quantized first; pesos have no decimals.
pub fn format_currency(amount: Money) -> String {
    let units = amount.quantize().units();
    let digits = units.unsigned_abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    if units < 0 {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}
