//! Analytics query service: where the fetcher gets its datasets from.

use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::ApiConfig;
use crate::dashboard::demo_dataset;
use crate::dataset::{parse_dataset, AnalyticsDataset};
use crate::filters::QueryParameters;

const PERFORMANCE_PATH: &str = "/analytics/performance";

/// Failure shapes a query can settle with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryFailure {
    #[error("analytics request failed with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("analytics transport error: {0}")]
    Transport(String),
    #[error("failed to decode analytics response: {0}")]
    Decode(String),
    #[error("{0}")]
    Message(String),
    #[error("unrecognized analytics failure")]
    Opaque,
}

impl QueryFailure {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[async_trait]
pub trait AnalyticsQueryService: Send + Sync + 'static {
    async fn get_performance(
        &self,
        params: &QueryParameters,
    ) -> Result<AnalyticsDataset, QueryFailure>;
}

/// Talks to the backend performance endpoint over HTTP.
#[derive(Debug, Clone)]
pub struct HttpAnalyticsService {
    client: reqwest::Client,
    performance_url: String,
    api_token: Option<String>,
}

impl HttpAnalyticsService {
    pub fn new(cfg: &ApiConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            performance_url: format!("{}{}", cfg.base_url.trim_end_matches('/'), PERFORMANCE_PATH),
            api_token: cfg.api_token.clone(),
        })
    }

    pub fn performance_url(&self) -> &str {
        &self.performance_url
    }
}

#[async_trait]
impl AnalyticsQueryService for HttpAnalyticsService {
    async fn get_performance(
        &self,
        params: &QueryParameters,
    ) -> Result<AnalyticsDataset, QueryFailure> {
        let url = reqwest::Url::parse_with_params(&self.performance_url, params.iter())
            .map_err(|err| QueryFailure::Transport(format!("invalid analytics url: {err}")))?;

        debug!(
            component = "analytics_service",
            event = "analytics.http.request",
            url = %url
        );

        let mut request = self.client.get(url);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|err| QueryFailure::Transport(err.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| QueryFailure::Transport(err.to_string()))?;

        if !status.is_success() {
            let message = error_message_from_body(&body).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
            return Err(QueryFailure::Status {
                status: status.as_u16(),
                message,
            });
        }

        parse_dataset(&body).map_err(|err| QueryFailure::Decode(err.to_string()))
    }
}

fn error_message_from_body(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

/// Serves a fixed outcome from memory and records every query it receives.
#[derive(Clone)]
pub struct InMemoryAnalyticsService {
    outcome: Arc<RwLock<Result<AnalyticsDataset, QueryFailure>>>,
    calls: Arc<Mutex<Vec<QueryParameters>>>,
}

impl InMemoryAnalyticsService {
    pub fn new(dataset: AnalyticsDataset) -> Self {
        Self::with_outcome(Ok(dataset))
    }

    pub fn failing(failure: QueryFailure) -> Self {
        Self::with_outcome(Err(failure))
    }

    pub fn demo() -> Self {
        Self::new(demo_dataset())
    }

    fn with_outcome(outcome: Result<AnalyticsDataset, QueryFailure>) -> Self {
        Self {
            outcome: Arc::new(RwLock::new(outcome)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn replace_dataset(&self, dataset: AnalyticsDataset) {
        self.set_outcome(Ok(dataset));
    }

    pub fn fail_with(&self, failure: QueryFailure) {
        self.set_outcome(Err(failure));
    }

    pub fn calls(&self) -> Vec<QueryParameters> {
        self.calls
            .lock()
            .expect("in-memory call log lock should not be poisoned")
            .clone()
    }

    fn set_outcome(&self, outcome: Result<AnalyticsDataset, QueryFailure>) {
        let mut guard = self
            .outcome
            .write()
            .expect("in-memory outcome lock should not be poisoned");
        *guard = outcome;
    }
}

#[async_trait]
impl AnalyticsQueryService for InMemoryAnalyticsService {
    async fn get_performance(
        &self,
        params: &QueryParameters,
    ) -> Result<AnalyticsDataset, QueryFailure> {
        self.calls
            .lock()
            .expect("in-memory call log lock should not be poisoned")
            .push(params.clone());

        self.outcome
            .read()
            .expect("in-memory outcome lock should not be poisoned")
            .clone()
    }
}
