//! Environment-driven configuration for the API client, fetcher and error reporting.

use std::env;
use std::net::{AddrParseError, SocketAddr};

use crate::fetcher::FetcherConfig;

const DEFAULT_DASHBOARD_ADDR: &str = "127.0.0.1:8080";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_token: Option<String>,
    pub timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000/api".to_string(),
            api_token: None,
            timeout_ms: 10_000,
        }
    }
}

/// Options for the external error-reporting collaborator.
///
/// Reporting is only considered enabled when a DSN is configured.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorReportingConfig {
    pub dsn: Option<String>,
    pub traces_sample_rate: f64,
    pub replays_session_sample_rate: f64,
    pub replays_on_error_sample_rate: f64,
    pub environment: String,
    pub release: Option<String>,
}

impl Default for ErrorReportingConfig {
    fn default() -> Self {
        Self {
            dsn: None,
            traces_sample_rate: 0.1,
            replays_session_sample_rate: 0.1,
            replays_on_error_sample_rate: 1.0,
            environment: "development".to_string(),
            release: None,
        }
    }
}

impl ErrorReportingConfig {
    pub fn is_enabled(&self) -> bool {
        self.dsn.is_some()
    }
}

pub fn api_config_from_env() -> ApiConfig {
    let mut config = ApiConfig::default();

    if let Some(base_url) = env_string("BETDASH_API_BASE_URL") {
        config.base_url = base_url;
    }
    config.api_token = env_string("BETDASH_API_TOKEN");
    if let Some(timeout_ms) = env_string("BETDASH_API_TIMEOUT_MS").and_then(|raw| raw.parse().ok())
    {
        config.timeout_ms = timeout_ms;
    }

    config
}

pub fn fetcher_config_from_env() -> FetcherConfig {
    let mut config = FetcherConfig::default();

    if let Some(debounce_ms) =
        env_string("BETDASH_FETCH_DEBOUNCE_MS").and_then(|raw| raw.parse().ok())
    {
        config.debounce_ms = debounce_ms;
    }

    config
}

pub fn error_reporting_config_from_env() -> ErrorReportingConfig {
    let mut config = ErrorReportingConfig::default();

    config.dsn = env_string("BETDASH_SENTRY_DSN");
    if let Some(rate) = env_sample_rate("BETDASH_SENTRY_TRACES_SAMPLE_RATE") {
        config.traces_sample_rate = rate;
    }
    if let Some(rate) = env_sample_rate("BETDASH_SENTRY_REPLAYS_SESSION_SAMPLE_RATE") {
        config.replays_session_sample_rate = rate;
    }
    if let Some(rate) = env_sample_rate("BETDASH_SENTRY_REPLAYS_ON_ERROR_SAMPLE_RATE") {
        config.replays_on_error_sample_rate = rate;
    }
    if let Some(environment) = env_string("BETDASH_ENVIRONMENT") {
        config.environment = environment;
    }
    config.release = env_string("BETDASH_RELEASE");

    config
}

/// Whether the dashboard should serve the in-memory demo dataset.
pub fn use_demo_from_env() -> bool {
    env_string("BETDASH_USE_DEMO")
        .and_then(|raw| parse_bool(&raw))
        .unwrap_or(false)
}

/// Listen address for the dashboard server, `127.0.0.1:8080` unless
/// `BETDASH_DASHBOARD_ADDR` is set.
pub fn dashboard_addr_from_env() -> Result<SocketAddr, AddrParseError> {
    env_string("BETDASH_DASHBOARD_ADDR")
        .as_deref()
        .unwrap_or(DEFAULT_DASHBOARD_ADDR)
        .parse()
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub(crate) fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}

fn env_sample_rate(key: &str) -> Option<f64> {
    env_string(key)
        .and_then(|raw| raw.parse::<f64>().ok())
        .filter(|rate| (0.0..=1.0).contains(rate))
}
