//! betdash core crate.
//!
//! Current implemented scope:
//! - filter criteria and sparse query parameter derivation
//! - analytics dataset model with empty-default decoding
//! - filtered data fetcher with stale-response suppression
//! - HTTP and in-memory analytics query services
//! - dashboard JSON routes and environment configuration

mod config;
mod dashboard;
mod dataset;
mod fetcher;
mod filters;
mod observability;
mod service;
#[cfg(test)]
mod test_support;

pub use config::{
    api_config_from_env, dashboard_addr_from_env, error_reporting_config_from_env,
    fetcher_config_from_env, use_demo_from_env, ApiConfig, ErrorReportingConfig,
};
pub use dashboard::{dashboard_router, demo_dataset, HEATMAP_DAYS, HEATMAP_TIME_SLOTS};
pub use dataset::{
    parse_dataset, AnalyticsDataset, BookmakerComparisonRow, Heatmap, HeatmapCell,
    MonthlyRoiPoint, OddsBucket, SportWinRateRow,
};
pub use fetcher::{
    FetchError, FetchPhase, FetchState, FetchView, FetcherConfig, FilteredDataFetcher,
    FALLBACK_ERROR_MESSAGE, RATE_LIMITED_STATUS,
};
pub use filters::{
    FilterCriteria, QueryParameters, QueryParametersMemo, PARAM_ACCOUNT_ID, PARAM_BOOKMAKER,
    PARAM_END_DATE, PARAM_EVENT, PARAM_MAX_ODDS, PARAM_MIN_ODDS, PARAM_SPORT, PARAM_START_DATE,
    PARAM_STATUS, PARAM_TIPSTER, STATUS_ALL,
};
pub use observability::{
    init_logging, log_app_bind, log_app_start, log_error_reporting, log_source_selected,
    logging_config_from_env, LogFormat, LoggingConfig, LoggingInitError,
};
pub use service::{
    AnalyticsQueryService, HttpAnalyticsService, InMemoryAnalyticsService, QueryFailure,
};
