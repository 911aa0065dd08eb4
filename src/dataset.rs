//! Analytics dataset returned by the performance endpoint.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Day label -> time-slot label -> aggregate.
pub type Heatmap = BTreeMap<String, BTreeMap<String, HeatmapCell>>;

/// The aggregated payload behind every chart on the dashboard.
///
/// Each collection is independent. A collection missing from a response, or
/// sent as `null`, decodes to its empty container so consumers never see a
/// partially shaped dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsDataset {
    #[serde(default, deserialize_with = "null_as_default")]
    pub monthly_roi: Vec<MonthlyRoiPoint>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub odds_distribution: Vec<OddsBucket>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub heatmap: Heatmap,
    #[serde(default, deserialize_with = "null_as_default")]
    pub bookmaker_comparison: Vec<BookmakerComparisonRow>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub win_rate_by_sport: Vec<SportWinRateRow>,
}

impl AnalyticsDataset {
    pub fn is_empty(&self) -> bool {
        self.monthly_roi.is_empty()
            && self.odds_distribution.is_empty()
            && self.heatmap.is_empty()
            && self.bookmaker_comparison.is_empty()
            && self.win_rate_by_sport.is_empty()
    }

    pub fn heatmap_cell(&self, day: &str, time_slot: &str) -> Option<&HeatmapCell> {
        self.heatmap.get(day).and_then(|slots| slots.get(time_slot))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MonthlyRoiPoint {
    pub month: String,
    pub invested: f64,
    pub result: f64,
    pub roi: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OddsBucket {
    pub range: String,
    pub count: u64,
    pub wins: u64,
    pub roi: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeatmapCell {
    pub invested: f64,
    pub result: f64,
    pub roi: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookmakerComparisonRow {
    pub bookmaker: String,
    pub bets: u64,
    pub invested: f64,
    pub result: f64,
    pub roi: f64,
    pub win_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SportWinRateRow {
    pub sport: String,
    pub bets: u64,
    pub wins: u64,
    pub win_rate: f64,
    pub roi: f64,
}

pub fn parse_dataset(body: &str) -> Result<AnalyticsDataset, serde_json::Error> {
    serde_json::from_str(body)
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
