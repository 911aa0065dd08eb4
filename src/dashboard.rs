//! Dashboard HTTP routes over a shared fetcher, plus demo data.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{Months, Utc};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::dataset::{
    AnalyticsDataset, BookmakerComparisonRow, HeatmapCell, MonthlyRoiPoint, OddsBucket,
    SportWinRateRow,
};
use crate::fetcher::{FetchState, FetchView, FilteredDataFetcher};
use crate::filters::FilterCriteria;

pub const HEATMAP_DAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
pub const HEATMAP_TIME_SLOTS: [&str; 4] = ["00-06", "06-12", "12-18", "18-24"];

/// Builds the dashboard routes.
///
/// The fetcher lock is only held while a fetch is triggered, never while it
/// runs, so a newer request can supersede an in-flight one and
/// `/dashboard/state` answers from the watch channel at any time.
pub fn dashboard_router(fetcher: FilteredDataFetcher) -> Router {
    let state = fetcher.subscribe();
    Router::new()
        .route("/dashboard/analytics", get(get_analytics))
        .route("/dashboard/reload", post(post_reload))
        .route("/dashboard/state", get(get_state))
        .with_state(DashboardAppState {
            fetcher: Arc::new(Mutex::new(fetcher)),
            state,
        })
}

pub fn demo_dataset() -> AnalyticsDataset {
    let today = Utc::now().date_naive();
    let monthly_roi = (0..6u32)
        .rev()
        .filter_map(|back| today.checked_sub_months(Months::new(back)))
        .enumerate()
        .map(|(idx, month)| {
            let invested = 400.0 + 50.0 * idx as f64;
            let result = [-32.0, 18.5, 44.0, -12.0, 27.5, 61.0][idx % 6];
            MonthlyRoiPoint {
                month: month.format("%Y-%m").to_string(),
                invested,
                result,
                roi: round2(result / invested * 100.0),
            }
        })
        .collect();

    let odds_distribution = [
        ("1.01-1.50", 42u64, 33u64, 3.1),
        ("1.51-2.00", 58, 31, 5.4),
        ("2.01-3.00", 35, 13, -2.2),
        ("3.01+", 14, 3, -18.6),
    ]
    .into_iter()
    .map(|(range, count, wins, roi)| OddsBucket {
        range: range.to_string(),
        count,
        wins,
        roi,
    })
    .collect();

    let mut heatmap = BTreeMap::new();
    for (day_idx, day) in HEATMAP_DAYS.iter().enumerate() {
        let mut slots = BTreeMap::new();
        for (slot_idx, slot) in HEATMAP_TIME_SLOTS.iter().enumerate() {
            let invested = 20.0 * (slot_idx + 1) as f64;
            let result = ((day_idx * 3 + slot_idx * 5) % 9) as f64 - 4.0;
            slots.insert(
                (*slot).to_string(),
                HeatmapCell {
                    invested,
                    result,
                    roi: round2(result / invested * 100.0),
                },
            );
        }
        heatmap.insert((*day).to_string(), slots);
    }

    let bookmaker_comparison = [
        ("bet365", 61u64, 820.0, 44.0, 55.7),
        ("pinnacle", 47, 690.0, 58.5, 57.4),
        ("betfair", 41, 505.0, -21.0, 46.3),
    ]
    .into_iter()
    .map(|(bookmaker, bets, invested, result, win_rate)| BookmakerComparisonRow {
        bookmaker: bookmaker.to_string(),
        bets,
        invested,
        result,
        roi: round2(result / invested * 100.0),
        win_rate,
    })
    .collect();

    let win_rate_by_sport = [
        ("soccer", 88u64, 49u64, 4.8),
        ("tennis", 39, 22, 7.1),
        ("basketball", 22, 9, -6.3),
    ]
    .into_iter()
    .map(|(sport, bets, wins, roi)| SportWinRateRow {
        sport: sport.to_string(),
        bets,
        wins,
        win_rate: round2(wins as f64 / bets as f64 * 100.0),
        roi,
    })
    .collect();

    AnalyticsDataset {
        monthly_roi,
        odds_distribution,
        heatmap,
        bookmaker_comparison,
        win_rate_by_sport,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Clone)]
struct DashboardAppState {
    fetcher: Arc<Mutex<FilteredDataFetcher>>,
    state: watch::Receiver<FetchState>,
}

impl DashboardAppState {
    fn current_view(&self) -> FetchView {
        self.state.borrow().view()
    }
}

async fn get_analytics(
    State(state): State<DashboardAppState>,
    Query(criteria): Query<FilterCriteria>,
) -> Json<FetchView> {
    let handle = state.fetcher.lock().await.update(&criteria);

    info!(
        component = "dashboard_server",
        event = "http.analytics.request",
        has_account = criteria.has_account(),
        fetch_started = handle.is_some()
    );

    settle(handle).await;
    Json(state.current_view())
}

async fn post_reload(State(state): State<DashboardAppState>) -> Json<FetchView> {
    let handle = state.fetcher.lock().await.reload();

    info!(
        component = "dashboard_server",
        event = "http.reload.request",
        fetch_started = handle.is_some()
    );

    settle(handle).await;
    Json(state.current_view())
}

async fn get_state(State(state): State<DashboardAppState>) -> Json<FetchView> {
    Json(state.current_view())
}

async fn settle(handle: Option<JoinHandle<()>>) {
    if let Some(handle) = handle {
        if let Err(err) = handle.await {
            warn!(
                component = "dashboard_server",
                event = "analytics.fetch.join_failed",
                error = %err
            );
        }
    }
}
