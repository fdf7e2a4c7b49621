//! Register API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use kassa_core::TaxRate;

/// Default `tracing` filter when `KASSA_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,kassa=debug";

/// Register API configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP server port
    pub http_port: u16,

    /// SQLite database file
    pub database_path: String,

    /// Pool size
    pub db_max_connections: u32,

    /// Register this server is attached to (scope of "one open shift")
    pub register_id: String,

    pub venue_name: String,

    /// Currency code; picks the denomination set
    pub currency: String,

    /// Tax included in prices, in percent
    pub tax_rate_percent: f64,

    /// Quiet window before a denomination count is saved
    pub autosave_window: Duration,

    /// Idle time after which a shift's autosave worker stops
    pub autosave_idle: Duration,

    /// Rows in the Z-report top services list
    pub top_services: usize,

    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            http_port: 8080,
            database_path: "./kassa.db".to_string(),
            db_max_connections: 5,
            register_id: kassa_core::DEFAULT_REGISTER_ID.to_string(),
            venue_name: "Kassa".to_string(),
            currency: "UAH".to_string(),
            tax_rate_percent: 0.0,
            autosave_window: kassa_core::denomination::AUTOSAVE_DEBOUNCE,
            autosave_idle: kassa_db::AUTOSAVE_IDLE_STOP,
            top_services: 10,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = AppConfig::default();

        let tax_rate_percent: f64 = parse_or(&get, "KASSA_TAX_RATE", defaults.tax_rate_percent)?;
        if !(0.0..=100.0).contains(&tax_rate_percent) {
            return Err(ConfigError::InvalidValue("KASSA_TAX_RATE".to_string()));
        }

        let db_max_connections: u32 = parse_or(&get, "KASSA_DB_MAX_CONNECTIONS", defaults.db_max_connections)?;
        if db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("KASSA_DB_MAX_CONNECTIONS".to_string()));
        }

        let autosave_ms: u64 = parse_or(
            &get,
            "KASSA_AUTOSAVE_MS",
            defaults.autosave_window.as_millis() as u64,
        )?;
        let autosave_idle_secs: u64 = parse_or(&get, "KASSA_AUTOSAVE_IDLE_SECS", defaults.autosave_idle.as_secs())?;

        Ok(AppConfig {
            http_port: parse_or(&get, "KASSA_HTTP_PORT", defaults.http_port)?,
            database_path: get("KASSA_DATABASE_PATH").unwrap_or(defaults.database_path),
            db_max_connections,
            register_id: get("KASSA_REGISTER_ID").unwrap_or(defaults.register_id),
            venue_name: get("KASSA_VENUE_NAME").unwrap_or(defaults.venue_name),
            currency: get("KASSA_CURRENCY").unwrap_or(defaults.currency),
            tax_rate_percent,
            autosave_window: Duration::from_millis(autosave_ms),
            autosave_idle: Duration::from_secs(autosave_idle_secs),
            top_services: parse_or(&get, "KASSA_TOP_SERVICES", defaults.top_services)?,
            log_filter: get("KASSA_LOG").unwrap_or(defaults.log_filter),
        })
    }

    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_percentage(self.tax_rate_percent)
    }
}

fn parse_or<T: FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, ConfigError> {
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
