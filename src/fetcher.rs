//! Filtered data fetcher: turns filter criteria into committed analytics state.
//!
//! Every fetch carries the generation that was current when it started. A
//! fetch may only commit while its generation is still current; starting a new
//! fetch, resetting for an account-less context, or dropping the fetcher all
//! advance the generation, so a slower superseded response never overwrites
//! newer state. The in-flight request itself is not aborted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::dataset::AnalyticsDataset;
use crate::filters::{FilterCriteria, QueryParameters, QueryParametersMemo};
use crate::service::{AnalyticsQueryService, QueryFailure};

pub const FALLBACK_ERROR_MESSAGE: &str = "failed to load performance data";
pub const RATE_LIMITED_STATUS: u16 = 429;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetcherConfig {
    /// Quiet period before a triggered fetch calls the service. Zero disables it.
    pub debounce_ms: u64,
}

/// Uniform error surfaced to consumers, whatever shape the failure had.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{message}")]
pub struct FetchError {
    pub message: String,
    pub status: Option<u16>,
}

impl FetchError {
    pub fn from_failure(failure: &QueryFailure) -> Self {
        let message = match failure {
            QueryFailure::Opaque => FALLBACK_ERROR_MESSAGE.to_string(),
            QueryFailure::Message(message) if message.trim().is_empty() => {
                FALLBACK_ERROR_MESSAGE.to_string()
            }
            QueryFailure::Message(message) => message.clone(),
            other => other.to_string(),
        };

        Self {
            message,
            status: failure.status(),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status == Some(RATE_LIMITED_STATUS)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchPhase {
    Idle,
    Loading,
    Ready,
    Failed(FetchError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchState {
    pub data: AnalyticsDataset,
    pub phase: FetchPhase,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for FetchState {
    fn default() -> Self {
        Self {
            data: AnalyticsDataset::default(),
            phase: FetchPhase::Idle,
            updated_at: None,
        }
    }
}

impl FetchState {
    pub fn is_loading(&self) -> bool {
        matches!(self.phase, FetchPhase::Loading)
    }

    pub fn error(&self) -> Option<&FetchError> {
        match &self.phase {
            FetchPhase::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn view(&self) -> FetchView {
        FetchView {
            data: self.data.clone(),
            is_loading: self.is_loading(),
            error: self.error().cloned(),
            updated_at: self.updated_at,
        }
    }
}

/// What the presentation layer renders from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchView {
    pub data: AnalyticsDataset,
    pub is_loading: bool,
    pub error: Option<FetchError>,
    pub updated_at: Option<DateTime<Utc>>,
}

struct Shared {
    service: Arc<dyn AnalyticsQueryService>,
    state: watch::Sender<FetchState>,
    generation: AtomicU64,
    debounce: Duration,
}

impl Shared {
    fn begin(&self) -> u64 {
        let mut generation = 0;
        self.state.send_modify(|state| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            state.phase = FetchPhase::Loading;
        });
        generation
    }

    fn reset(&self) {
        self.state.send_if_modified(|state| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            if *state == FetchState::default() {
                return false;
            }
            *state = FetchState::default();
            true
        });
    }

    fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn commit(&self, generation: u64, outcome: Result<AnalyticsDataset, FetchError>) -> bool {
        self.state.send_if_modified(|state| {
            if !self.is_current(generation) {
                return false;
            }
            match outcome {
                Ok(data) => {
                    state.data = data;
                    state.phase = FetchPhase::Ready;
                    state.updated_at = Some(Utc::now());
                }
                Err(err) => state.phase = FetchPhase::Failed(err),
            }
            true
        })
    }
}

/// Keeps analytics state in step with the filter criteria it is fed.
///
/// Must be used from within a Tokio runtime: fetches run as spawned tasks.
pub struct FilteredDataFetcher {
    shared: Arc<Shared>,
    memo: QueryParametersMemo,
    active: Option<QueryParameters>,
}

impl FilteredDataFetcher {
    pub fn new(service: Arc<dyn AnalyticsQueryService>, cfg: FetcherConfig) -> Self {
        let (state, _) = watch::channel(FetchState::default());

        Self {
            shared: Arc::new(Shared {
                service,
                state,
                generation: AtomicU64::new(0),
                debounce: Duration::from_millis(cfg.debounce_ms),
            }),
            memo: QueryParametersMemo::new(),
            active: None,
        }
    }

    /// Applies the latest criteria and returns the handle of a fetch if one was started.
    ///
    /// Without an account identifier the state is reset and nothing is fetched.
    /// Otherwise a fetch starts only if the derived parameters differ from the
    /// active query.
    pub fn update(&mut self, criteria: &FilterCriteria) -> Option<JoinHandle<()>> {
        let params = self.memo.derive(criteria);

        if params.account_id().is_none() {
            self.active = None;
            self.shared.reset();
            return None;
        }

        if self.active.as_ref() == Some(params) {
            return None;
        }

        let params = params.clone();
        self.active = Some(params.clone());
        Some(self.spawn(params))
    }

    /// Re-issues the active query even though its parameters did not change.
    pub fn reload(&self) -> Option<JoinHandle<()>> {
        match &self.active {
            Some(params) => Some(self.spawn(params.clone())),
            None => {
                self.shared.reset();
                None
            }
        }
    }

    pub fn state(&self) -> FetchState {
        self.shared.state.borrow().clone()
    }

    pub fn view(&self) -> FetchView {
        self.shared.state.borrow().view()
    }

    pub fn subscribe(&self) -> watch::Receiver<FetchState> {
        self.shared.state.subscribe()
    }

    pub fn active_query(&self) -> Option<&QueryParameters> {
        self.active.as_ref()
    }

    fn spawn(&self, params: QueryParameters) -> JoinHandle<()> {
        let generation = self.shared.begin();
        tokio::spawn(run_fetch(Arc::clone(&self.shared), generation, params))
    }
}

impl Drop for FilteredDataFetcher {
    fn drop(&mut self) {
        self.shared.invalidate();
    }
}

async fn run_fetch(shared: Arc<Shared>, generation: u64, params: QueryParameters) {
    if !shared.debounce.is_zero() {
        tokio::time::sleep(shared.debounce).await;
        if !shared.is_current(generation) {
            debug!(
                component = "analytics_fetcher",
                event = "analytics.fetch.debounced",
                generation
            );
            return;
        }
    }

    debug!(
        component = "analytics_fetcher",
        event = "analytics.fetch.start",
        generation,
        param_count = params.len()
    );

    let outcome = shared
        .service
        .get_performance(&params)
        .await
        .map_err(|failure| FetchError::from_failure(&failure));
    let failure = outcome.as_ref().err().cloned();

    if !shared.commit(generation, outcome) {
        debug!(
            component = "analytics_fetcher",
            event = "analytics.fetch.discarded",
            generation
        );
        return;
    }

    match failure {
        Some(err) if !err.is_rate_limited() => error!(
            component = "analytics_fetcher",
            event = "analytics.fetch.error",
            generation,
            status = ?err.status,
            message = %err.message
        ),
        Some(_) => {}
        None => debug!(
            component = "analytics_fetcher",
            event = "analytics.fetch.commit",
            generation
        ),
    }
}
