//! Shared logging configuration and initialization.

use std::net::SocketAddr;

use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{env_string, parse_bool, ErrorReportingConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" => Some(Self::Pretty),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            include_target: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoggingInitError {
    #[error("logging already initialized: {0}")]
    AlreadyInitialized(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Reads `BETDASH_LOG_LEVEL`, `BETDASH_LOG_FORMAT` and `BETDASH_LOG_TARGET`.
/// Blank or unrecognised values keep the default.
pub fn logging_config_from_env() -> LoggingConfig {
    let defaults = LoggingConfig::default();

    LoggingConfig {
        level: env_string("BETDASH_LOG_LEVEL").unwrap_or(defaults.level),
        format: env_string("BETDASH_LOG_FORMAT")
            .and_then(|raw| LogFormat::parse(&raw))
            .unwrap_or(defaults.format),
        include_target: env_string("BETDASH_LOG_TARGET")
            .and_then(|raw| parse_bool(&raw))
            .unwrap_or(defaults.include_target),
    }
}

pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingInitError> {
    let env_filter =
        EnvFilter::try_new(config.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(config.include_target)
        .with_ansi(matches!(config.format, LogFormat::Pretty));

    match config.format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.pretty().finish())?,
    }

    Ok(())
}

pub fn log_app_start(config: &LoggingConfig) {
    info!(
        component = "dashboard_server",
        event = "app.start",
        log_level = %config.level,
        log_format = ?config.format,
        include_target = config.include_target
    );
}

pub fn log_app_bind(bound_addr: SocketAddr) {
    info!(
        component = "dashboard_server",
        event = "app.bind",
        bind_addr = %bound_addr,
        routes = "/dashboard/analytics,/dashboard/reload,/dashboard/state"
    );
}

/// Records which analytics source backs the dashboard; absent details log as `-`.
pub fn log_source_selected(source: &str, reason: Option<&str>, base_url: Option<&str>) {
    info!(
        component = "dashboard_server",
        event = "source.selected",
        source,
        reason = reason.unwrap_or("-"),
        base_url = base_url.unwrap_or("-")
    );
}

/// Records how the error-reporting collaborator was configured at startup.
pub fn log_error_reporting(config: &ErrorReportingConfig) {
    if config.is_enabled() {
        info!(
            component = "dashboard_server",
            event = "error_reporting.configured",
            environment = %config.environment,
            release = config.release.as_deref().unwrap_or("-"),
            traces_sample_rate = config.traces_sample_rate,
            replays_session_sample_rate = config.replays_session_sample_rate,
            replays_on_error_sample_rate = config.replays_on_error_sample_rate
        );
    } else {
        info!(
            component = "dashboard_server",
            event = "error_reporting.disabled",
            environment = %config.environment
        );
    }
}
