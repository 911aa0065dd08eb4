use std::sync::Arc;

use betdash::{
    api_config_from_env, dashboard_addr_from_env, dashboard_router,
    error_reporting_config_from_env, fetcher_config_from_env, init_logging, log_app_bind,
    log_app_start, log_error_reporting, log_source_selected, logging_config_from_env,
    use_demo_from_env, AnalyticsQueryService, FilteredDataFetcher, HttpAnalyticsService,
    InMemoryAnalyticsService,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logging_cfg = logging_config_from_env();
    init_logging(&logging_cfg)?;
    log_app_start(&logging_cfg);
    log_error_reporting(&error_reporting_config_from_env());

    let addr = dashboard_addr_from_env()?;

    let service = service_from_env()?;
    let fetcher = FilteredDataFetcher::new(service, fetcher_config_from_env());
    let app = dashboard_router(fetcher);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    log_app_bind(bound_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

fn service_from_env() -> Result<Arc<dyn AnalyticsQueryService>, reqwest::Error> {
    if use_demo_from_env() {
        log_source_selected("demo", Some("BETDASH_USE_DEMO"), None);
        return Ok(Arc::new(InMemoryAnalyticsService::demo()));
    }

    let cfg = api_config_from_env();
    log_source_selected("http", None, Some(&cfg.base_url));
    Ok(Arc::new(HttpAnalyticsService::new(&cfg)?))
}
