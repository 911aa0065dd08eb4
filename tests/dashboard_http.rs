use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use betdash::{
    dashboard_router, AnalyticsDataset, AnalyticsQueryService, FetcherConfig, FilterCriteria,
    FilteredDataFetcher, InMemoryAnalyticsService, MonthlyRoiPoint, QueryFailure,
    QueryParameters,
};
use tokio::sync::oneshot;
use tokio::time::timeout;
use tower::util::ServiceExt;

type Outcome = Result<AnalyticsDataset, QueryFailure>;

/// Parks gated queries until released; ungated ones answer with a dataset
/// labelled by their `sport` parameter.
#[derive(Default)]
struct GatedService {
    calls: Mutex<Vec<QueryParameters>>,
    gates: Mutex<HashMap<QueryParameters, oneshot::Receiver<Outcome>>>,
}

impl GatedService {
    fn gate(&self, criteria: &FilterCriteria) -> oneshot::Sender<Outcome> {
        let (tx, rx) = oneshot::channel();
        self.gates
            .lock()
            .expect("gate lock should not be poisoned")
            .insert(criteria.query_parameters(), rx);
        tx
    }

    fn call_count(&self) -> usize {
        self.calls
            .lock()
            .expect("call log lock should not be poisoned")
            .len()
    }
}

#[async_trait]
impl AnalyticsQueryService for GatedService {
    async fn get_performance(&self, params: &QueryParameters) -> Outcome {
        self.calls
            .lock()
            .expect("call log lock should not be poisoned")
            .push(params.clone());
        let gate = self
            .gates
            .lock()
            .expect("gate lock should not be poisoned")
            .remove(params);
        match gate {
            Some(rx) => rx.await.unwrap_or(Err(QueryFailure::Opaque)),
            None => Ok(dataset_labelled(params.get("sport").unwrap_or("none"))),
        }
    }
}

fn dataset_labelled(label: &str) -> AnalyticsDataset {
    AnalyticsDataset {
        monthly_roi: vec![MonthlyRoiPoint {
            month: label.to_string(),
            invested: 100.0,
            result: 10.0,
            roi: 10.0,
        }],
        ..AnalyticsDataset::default()
    }
}

fn sport_criteria(sport: &str) -> FilterCriteria {
    FilterCriteria {
        sport: Some(sport.to_string()),
        ..FilterCriteria::for_account("acct-1")
    }
}

fn app_with(service: &InMemoryAnalyticsService) -> Router {
    let fetcher = FilteredDataFetcher::new(Arc::new(service.clone()), FetcherConfig::default());
    dashboard_router(fetcher)
}

fn gated_app(service: &Arc<GatedService>) -> Router {
    let service: Arc<dyn AnalyticsQueryService> = service.clone();
    dashboard_router(FilteredDataFetcher::new(service, FetcherConfig::default()))
}

async fn send(app: &Router, method: Method, uri: &str) -> serde_json::Value {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .expect("request should build"),
        )
        .await
        .expect("dashboard request should succeed");

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body should be readable");
    serde_json::from_slice(&body).expect("response body should be json")
}

fn spawn_request(
    app: &Router,
    method: Method,
    uri: &'static str,
) -> tokio::task::JoinHandle<serde_json::Value> {
    let app = app.clone();
    tokio::spawn(async move { send(&app, method, uri).await })
}

async fn wait_for_loading(app: &Router) -> serde_json::Value {
    timeout(Duration::from_secs(2), async {
        loop {
            let json = send(app, Method::GET, "/dashboard/state").await;
            if json["isLoading"] == true {
                return json;
            }
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("state should report loading while a fetch is in flight")
}

fn month_label(json: &serde_json::Value) -> Option<&str> {
    json["data"]["monthlyRoi"][0]["month"].as_str()
}

#[tokio::test]
async fn analytics_endpoint_fetches_with_derived_parameters() {
    let service = InMemoryAnalyticsService::demo();
    let app = app_with(&service);

    let json = send(
        &app,
        Method::GET,
        "/dashboard/analytics?accountId=acct-1&status=all&sport=soccer&tipster=",
    )
    .await;

    assert_eq!(json["isLoading"], false);
    assert!(json["error"].is_null());
    assert_eq!(json["data"]["monthlyRoi"]
            .as_array()
            .expect("monthlyRoi should be an array")
            .len(), 6);
    assert!(json["updatedAt"].is_string());

    let calls = service.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].account_id(), Some("acct-1"));
    assert_eq!(calls[0].get("sport"), Some("soccer"));
    assert_eq!(calls[0].get("status"), None);
    assert_eq!(calls[0].get("tipster"), None);
}

#[tokio::test]
async fn analytics_endpoint_without_account_returns_empty_dataset() {
    let service = InMemoryAnalyticsService::demo();
    let app = app_with(&service);

    let json = send(&app, Method::GET, "/dashboard/analytics?sport=soccer").await;

    assert_eq!(json["isLoading"], false);
    assert!(json["error"].is_null());
    assert_eq!(json["data"]["monthlyRoi"], serde_json::json!([]));
    assert_eq!(json["data"]["oddsDistribution"], serde_json::json!([]));
    assert_eq!(json["data"]["heatmap"], serde_json::json!({}));
    assert_eq!(json["data"]["bookmakerComparison"], serde_json::json!([]));
    assert_eq!(json["data"]["winRateBySport"], serde_json::json!([]));
    assert!(service.calls().is_empty());
}

#[tokio::test]
async fn repeated_identical_query_does_not_refetch_but_reload_does() {
    let service = InMemoryAnalyticsService::demo();
    let app = app_with(&service);

    send(&app, Method::GET, "/dashboard/analytics?accountId=acct-1&sport=tennis").await;
    send(&app, Method::GET, "/dashboard/analytics?sport=tennis&accountId=acct-1").await;
    assert_eq!(service.calls().len(), 1);

    let json = send(&app, Method::POST, "/dashboard/reload").await;
    assert_eq!(json["isLoading"], false);

    let calls = service.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], calls[1]);
}

#[tokio::test]
async fn failure_is_reported_and_stale_data_kept() {
    let service = InMemoryAnalyticsService::demo();
    let app = app_with(&service);

    send(&app, Method::GET, "/dashboard/analytics?accountId=acct-1").await;
    service.fail_with(QueryFailure::Status {
        status: 503,
        message: "maintenance".to_string(),
    });

    let json = send(&app, Method::POST, "/dashboard/reload").await;
    assert_eq!(json["error"]["status"], 503);
    assert!(json["error"]["message"]
        .as_str()
        .expect("error message should be a string")
        .contains("maintenance"));
    assert_eq!(
        json["data"]["winRateBySport"]
            .as_array()
            .expect("winRateBySport should be an array")
            .len(),
        3
    );
}

#[tokio::test]
async fn state_endpoint_is_read_only() {
    let service = InMemoryAnalyticsService::demo();
    let app = app_with(&service);

    let json = send(&app, Method::GET, "/dashboard/state").await;
    assert_eq!(json["isLoading"], false);
    assert!(json["updatedAt"].is_null());
    assert!(service.calls().is_empty());
}

#[tokio::test]
async fn state_endpoint_reports_loading_while_fetch_is_in_flight() {
    let service = Arc::new(GatedService::default());
    let release = service.gate(&sport_criteria("soccer"));
    let app = gated_app(&service);

    let pending = spawn_request(
        &app,
        Method::GET,
        "/dashboard/analytics?accountId=acct-1&sport=soccer",
    );

    let loading = wait_for_loading(&app).await;
    assert!(loading["error"].is_null());
    assert!(loading["updatedAt"].is_null());

    assert!(release.send(Ok(dataset_labelled("soccer"))).is_ok());
    let settled = timeout(Duration::from_secs(2), pending)
        .await
        .expect("analytics request should finish once released")
        .expect("analytics request task should not panic");

    assert_eq!(settled["isLoading"], false);
    assert_eq!(month_label(&settled), Some("soccer"));
    let json = send(&app, Method::GET, "/dashboard/state").await;
    assert_eq!(month_label(&json), Some("soccer"));
}

#[tokio::test]
async fn newer_analytics_request_supersedes_in_flight_fetch() {
    let service = Arc::new(GatedService::default());
    let release_first = service.gate(&sport_criteria("soccer"));
    let app = gated_app(&service);

    let first = spawn_request(
        &app,
        Method::GET,
        "/dashboard/analytics?accountId=acct-1&sport=soccer",
    );
    wait_for_loading(&app).await;

    let second = timeout(
        Duration::from_secs(2),
        send(
            &app,
            Method::GET,
            "/dashboard/analytics?accountId=acct-1&sport=tennis",
        ),
    )
    .await
    .expect("newer request should not queue behind the in-flight fetch");

    assert_eq!(second["isLoading"], false);
    assert_eq!(month_label(&second), Some("tennis"));

    assert!(release_first.send(Ok(dataset_labelled("soccer"))).is_ok());
    let first = timeout(Duration::from_secs(2), first)
        .await
        .expect("superseded request should still answer")
        .expect("analytics request task should not panic");

    assert_eq!(month_label(&first), Some("tennis"));
    let json = send(&app, Method::GET, "/dashboard/state").await;
    assert_eq!(json["isLoading"], false);
    assert_eq!(month_label(&json), Some("tennis"));
    assert_eq!(service.call_count(), 2);
}
