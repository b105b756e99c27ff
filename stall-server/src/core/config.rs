use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;

/// Server configuration
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | WORK_DIR | ./data | working directory (print log database) |
/// | HTTP_PORT | 3000 | HTTP API port |
/// | CATALOG_PATH | `<WORK_DIR>/catalog.json` | catalog seed |
/// | EVENT_NAME | STALL | `event_name` in receipt templates |
/// | TIMEZONE | Europe/Rome | timezone for receipt dates |
/// | PRINTER_CONNECT_TIMEOUT_MS | 5000 | printer connect timeout |
/// | EVENT_BUS_CAPACITY | 1024 | kitchen event channel capacity |
/// | LOG_LEVEL | info | tracing level |
/// | LOG_DIR | (unset) | enable daily rolling log files |
/// | ENVIRONMENT | development | environment name |
///
/// # Example
///
/// ```ignore
/// WORK_DIR=/srv/stall HTTP_PORT=8080 EVENT_NAME="SAGRA 2026" cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory
    pub work_dir: String,
    /// HTTP API port
    pub http_port: u16,
    /// Catalog seed file; defaults to `<work_dir>/catalog.json`
    pub catalog_path: Option<String>,
    /// Event name shown on receipts
    pub event_name: String,
    /// Timezone for receipt dates
    pub timezone: Tz,
    /// Printer connect timeout (ms)
    pub printer_connect_timeout_ms: u64,
    /// Kitchen event channel capacity
    pub event_bus_capacity: usize,
    pub log_level: String,
    pub log_dir: Option<String>,
    /// development | staging | production
    pub environment: String,
}

impl Config {
    /// Load configuration from the environment
    ///
    /// Unset or unparseable variables fall back to their defaults.
    pub fn from_env() -> Self {
        let timezone = std::env::var("TIMEZONE")
            .ok()
            .and_then(|tz| match tz.parse::<Tz>() {
                Ok(tz) => Some(tz),
                Err(_) => {
                    tracing::warn!(timezone = %tz, "Unknown TIMEZONE, using Europe/Rome");
                    None
                }
            })
            .unwrap_or(chrono_tz::Europe::Rome);

        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            catalog_path: std::env::var("CATALOG_PATH").ok(),
            event_name: std::env::var("EVENT_NAME").unwrap_or_else(|_| "STALL".into()),
            timezone,
            printer_connect_timeout_ms: std::env::var("PRINTER_CONNECT_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),
            event_bus_capacity: std::env::var("EVENT_BUS_CAPACITY")
                .ok()
                .and_then(|p| p.parse().ok())
                .filter(|c| *c > 0)
                .unwrap_or(1024),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok(),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        }
    }

    /// Override the work dir and port
    ///
    /// Mostly used by tests
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config.catalog_path = None;
        config
    }

    pub fn catalog_path(&self) -> PathBuf {
        match &self.catalog_path {
            Some(p) => PathBuf::from(p),
            None => PathBuf::from(&self.work_dir).join("catalog.json"),
        }
    }

    pub fn order_store_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("orders.redb")
    }

    pub fn print_log_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("print_log.redb")
    }

    pub fn printer_connect_timeout(&self) -> Duration {
        Duration::from_millis(self.printer_connect_timeout_ms)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
