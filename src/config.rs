//! Application configuration loaded from environment variables.

use std::time::Duration;

use serde::Deserialize;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Refresh Behavior ===
    /// Seconds between automatic refreshes of each exchange source.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Funding interval (hours) substituted when a per-symbol lookup has not
    /// resolved yet or failed.
    #[serde(default = "default_fallback_interval_hours")]
    pub fallback_interval_hours: f64,

    /// Concurrent workers in the interval resolver pool.
    #[serde(default = "default_resolver_workers")]
    pub resolver_workers: usize,

    // === Presentation ===
    /// Page size used when a query does not specify one.
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,

    // === Persistence ===
    /// Path of the durable per-symbol funding-interval cache.
    #[serde(default = "default_interval_cache_path")]
    pub interval_cache_path: String,

    /// Path of the durable favorites file.
    #[serde(default = "default_favorites_path")]
    pub favorites_path: String,

    // === Server Configuration ===
    /// HTTP server port for the scanner API.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Emit logs as JSON lines instead of human-readable text.
    #[serde(default)]
    pub log_json: bool,

    /// Enable verbose logging.
    #[serde(default)]
    pub verbose: bool,
}

fn default_refresh_interval_secs() -> u64 {
    30
}

fn default_fallback_interval_hours() -> f64 {
    4.0
}

fn default_resolver_workers() -> usize {
    6
}

fn default_page_size() -> usize {
    50
}

fn default_interval_cache_path() -> String {
    "funding_intervals.json".to_string()
}

fn default_favorites_path() -> String {
    "funding_favorites.json".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> crate::error::Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env()?;
        Ok(config)
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.refresh_interval_secs == 0 {
            return Err("REFRESH_INTERVAL_SECS must be at least 1".to_string());
        }

        if !self.fallback_interval_hours.is_finite() || self.fallback_interval_hours <= 0.0 {
            return Err("FALLBACK_INTERVAL_HOURS must be a positive number".to_string());
        }

        if self.resolver_workers == 0 {
            return Err("RESOLVER_WORKERS must be at least 1".to_string());
        }

        if self.default_page_size == 0 {
            return Err("DEFAULT_PAGE_SIZE must be at least 1".to_string());
        }

        if self.interval_cache_path.is_empty() {
            return Err("INTERVAL_CACHE_PATH must not be empty".to_string());
        }

        if self.favorites_path.is_empty() {
            return Err("FAVORITES_PATH must not be empty".to_string());
        }

        Ok(())
    }

    /// Refresh cadence as a [`Duration`].
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval_secs(),
            fallback_interval_hours: default_fallback_interval_hours(),
            resolver_workers: default_resolver_workers(),
            default_page_size: default_page_size(),
            interval_cache_path: default_interval_cache_path(),
            favorites_path: default_favorites_path(),
            port: default_port(),
            rust_log: default_log_level(),
            log_json: false,
            verbose: false,
        }
    }
}
