//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use fulfillment::OrchestratorConfig;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` (default `"0.0.0.0"`), `PORT` (default `3000`)
/// - `RUST_LOG` tracing filter (default `"info"`), `LOG_FORMAT` `text` or `json`
/// - `DATABASE_URL`: PostgreSQL stores when set, in-memory stores otherwise
/// - `REDIS_URL`: Redis cache when set, in-memory cache otherwise
/// - `ORDER_CACHE_TTL_SECS` (3600), `SALES_REPORT_CACHE_TTL_SECS` (86400)
/// - `EXTERNAL_CALL_TIMEOUT_MS` (5000), `LOW_STOCK_THRESHOLD` (2)
/// - `NOTIFICATION_QUEUE_CAPACITY` (1024), `NOTIFICATION_TIMEOUT_MS` (3000)
/// - `REPAIR_INTERVAL_SECS` (300): period of the background repair sweep, `0` disables it
///
/// Unparseable values fall back to the default.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub order_cache_ttl_secs: u64,
    pub sales_report_cache_ttl_secs: u64,
    pub external_call_timeout_ms: u64,
    pub low_stock_threshold: i64,
    pub notification_queue_capacity: usize,
    pub notification_timeout_ms: u64,
    pub repair_interval_secs: u64,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        fn parse_var<T: FromStr>(
            lookup: &impl Fn(&str) -> Option<String>,
            name: &str,
        ) -> Option<T> {
            lookup(name).and_then(|v| v.trim().parse().ok())
        }
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Self {
            host: non_empty("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT").unwrap_or(defaults.port),
            log_level: non_empty("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: parse_var(&lookup, "LOG_FORMAT").unwrap_or(defaults.log_format),
            database_url: non_empty("DATABASE_URL"),
            redis_url: non_empty("REDIS_URL"),
            order_cache_ttl_secs: parse_var(&lookup, "ORDER_CACHE_TTL_SECS")
                .unwrap_or(defaults.order_cache_ttl_secs),
            sales_report_cache_ttl_secs: parse_var(&lookup, "SALES_REPORT_CACHE_TTL_SECS")
                .unwrap_or(defaults.sales_report_cache_ttl_secs),
            external_call_timeout_ms: parse_var(&lookup, "EXTERNAL_CALL_TIMEOUT_MS")
                .unwrap_or(defaults.external_call_timeout_ms),
            low_stock_threshold: parse_var(&lookup, "LOW_STOCK_THRESHOLD")
                .unwrap_or(defaults.low_stock_threshold),
            notification_queue_capacity: parse_var(&lookup, "NOTIFICATION_QUEUE_CAPACITY")
                .unwrap_or(defaults.notification_queue_capacity),
            notification_timeout_ms: parse_var(&lookup, "NOTIFICATION_TIMEOUT_MS")
                .unwrap_or(defaults.notification_timeout_ms),
            repair_interval_secs: parse_var(&lookup, "REPAIR_INTERVAL_SECS")
                .unwrap_or(defaults.repair_interval_secs),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            order_cache_ttl: Duration::from_secs(self.order_cache_ttl_secs),
            sales_report_cache_ttl: Duration::from_secs(self.sales_report_cache_ttl_secs),
            external_call_timeout: Duration::from_millis(self.external_call_timeout_ms),
            low_stock_threshold: self.low_stock_threshold,
        }
    }

    pub fn notification_timeout(&self) -> Duration {
        Duration::from_millis(self.notification_timeout_ms)
    }

    /// Period of the background repair sweep, `None` when disabled.
    pub fn repair_interval(&self) -> Option<Duration> {
        (self.repair_interval_secs > 0).then(|| Duration::from_secs(self.repair_interval_secs))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            redis_url: None,
            order_cache_ttl_secs: 3600,
            sales_report_cache_ttl_secs: 86400,
            external_call_timeout_ms: 5000,
            low_stock_threshold: 2,
            notification_queue_capacity: 1024,
            notification_timeout_ms: 3000,
            repair_interval_secs: 300,
        }
    }
}
