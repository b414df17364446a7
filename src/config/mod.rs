//! Configuration module for the paper library client.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default backend location when no override is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Request timeout used when none (or an unusable one) is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the paper backend
    pub api_url: String,
    /// Path to the JSON file holding the search history
    pub history_path: PathBuf,
    /// Directory exports are written to
    pub export_dir: PathBuf,
    /// Upper bound for a single HTTP request
    pub request_timeout: Duration,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let api_url = env::var("PAPERLIB_API_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let history_path = env::var("PAPERLIB_HISTORY_PATH")
            .unwrap_or_else(|_| "./data/search_history.json".to_string())
            .into();

        let export_dir = env::var("PAPERLIB_EXPORT_DIR")
            .unwrap_or_else(|_| ".".to_string())
            .into();

        let timeout_secs = match env::var("PAPERLIB_REQUEST_TIMEOUT_SECS") {
            Ok(raw) => parse_timeout_secs(&raw),
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        let log_level = env::var("PAPERLIB_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Self {
            api_url,
            history_path,
            export_dir,
            request_timeout: Duration::from_secs(timeout_secs),
            log_level,
        }
    }
}

/// Parse a request timeout in whole seconds. Zero would fail every request,
/// so it is rejected like any unparsable value.
fn parse_timeout_secs(raw: &str) -> u64 {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => secs,
        _ => {
            tracing::warn!(
                "Invalid PAPERLIB_REQUEST_TIMEOUT_SECS {:?}, using {}",
                raw,
                DEFAULT_TIMEOUT_SECS
            );
            DEFAULT_TIMEOUT_SECS
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            history_path: PathBuf::from("./data/search_history.json"),
            export_dir: PathBuf::from("."),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            log_level: "info".to_string(),
        }
    }
}
