//! Filter criteria and the sparse query parameters derived from them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Status value meaning "no status filter".
pub const STATUS_ALL: &str = "all";

pub const PARAM_ACCOUNT_ID: &str = "accountId";
pub const PARAM_STATUS: &str = "status";
pub const PARAM_TIPSTER: &str = "tipster";
pub const PARAM_BOOKMAKER: &str = "bookmaker";
pub const PARAM_SPORT: &str = "sport";
pub const PARAM_EVENT: &str = "event";
pub const PARAM_START_DATE: &str = "startDate";
pub const PARAM_END_DATE: &str = "endDate";
pub const PARAM_MIN_ODDS: &str = "minOdds";
pub const PARAM_MAX_ODDS: &str = "maxOdds";

/// User-selected constraints narrowing which betting records are aggregated.
///
/// Every field is optional; a blank string is treated the same as an absent
/// field when query parameters are derived.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterCriteria {
    pub account_id: Option<String>,
    pub status: Option<String>,
    pub tipster: Option<String>,
    pub bookmaker: Option<String>,
    pub sport: Option<String>,
    pub event: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub min_odds: Option<String>,
    pub max_odds: Option<String>,
}

impl FilterCriteria {
    pub fn for_account(account_id: impl Into<String>) -> Self {
        Self {
            account_id: Some(account_id.into()),
            ..Self::default()
        }
    }

    pub fn has_account(&self) -> bool {
        non_blank(&self.account_id).is_some()
    }

    pub fn query_parameters(&self) -> QueryParameters {
        QueryParameters::from_criteria(self)
    }

    fn named_fields(&self) -> [(&'static str, &Option<String>); 10] {
        [
            (PARAM_ACCOUNT_ID, &self.account_id),
            (PARAM_STATUS, &self.status),
            (PARAM_TIPSTER, &self.tipster),
            (PARAM_BOOKMAKER, &self.bookmaker),
            (PARAM_SPORT, &self.sport),
            (PARAM_EVENT, &self.event),
            (PARAM_START_DATE, &self.start_date),
            (PARAM_END_DATE, &self.end_date),
            (PARAM_MIN_ODDS, &self.min_odds),
            (PARAM_MAX_ODDS, &self.max_odds),
        ]
    }
}

/// Query string parameters sent to the analytics service.
///
/// Only fields that carry a real constraint are present, keyed by their
/// camelCase name. Ordered so that equal criteria compare and hash equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryParameters(BTreeMap<String, String>);

impl QueryParameters {
    pub fn from_criteria(criteria: &FilterCriteria) -> Self {
        let mut params = BTreeMap::new();

        for (name, value) in criteria.named_fields() {
            let Some(value) = non_blank(value) else {
                continue;
            };
            if name == PARAM_STATUS && value.eq_ignore_ascii_case(STATUS_ALL) {
                continue;
            }
            params.insert(name.to_string(), value.to_string());
        }

        Self(params)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn account_id(&self) -> Option<&str> {
        self.get(PARAM_ACCOUNT_ID)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Caches the last derivation so that structurally equal criteria are not
/// re-derived.
#[derive(Debug, Default)]
pub struct QueryParametersMemo {
    last_criteria: Option<FilterCriteria>,
    params: QueryParameters,
    recomputations: u64,
}

impl QueryParametersMemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn derive(&mut self, criteria: &FilterCriteria) -> &QueryParameters {
        if self.last_criteria.as_ref() != Some(criteria) {
            self.params = QueryParameters::from_criteria(criteria);
            self.last_criteria = Some(criteria.clone());
            self.recomputations += 1;
        }

        &self.params
    }

    pub fn recomputations(&self) -> u64 {
        self.recomputations
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|trimmed| !trimmed.is_empty())
}
