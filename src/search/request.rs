//! Search request as accepted from the controller layer.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};
use crate::index::SortOrder;

/// A validated search request. Field names follow the request body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    /// Free text matched against the boosted text fields.
    pub search: Option<String>,
    /// Filter expression in the field-qualified query grammar.
    pub filters: Option<String>,
    /// Facets keyed by logical field name.
    pub aggregations: BTreeMap<String, AggregationConfig>,
    pub sort: Vec<SortSpec>,
    pub limit: Option<usize>,
    pub offset: usize,
    pub geo_location_filter: Option<GeoLocationFilter>,
    /// Legacy `filter_<name>` / `facet_<name>_<attr>` parameters.
    pub params: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AggregationConfig {
    pub limit: Option<i64>,
    /// When false, counts ignore the user's own filters.
    pub counts_filtered: bool,
    pub min_count: Option<u32>,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            limit: None,
            counts_filtered: true,
            min_count: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    #[serde(default)]
    pub order: SortOrder,
}

/// GeoJSON polygon, either inline or as a JSON-encoded string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocationFilter {
    pub bounding_box: serde_json::Value,
}

impl SearchRequest {
    /// Parse a JSON request body.
    pub fn from_json(body: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(|e| SearchError::InvalidRequest {
            path: "params".to_string(),
            reason: e.to_string(),
        })
    }

    /// The free-text query, if it has any non-blank content.
    pub fn text(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// The filter expression, if it has any non-blank content.
    pub fn filter_expression(&self) -> Option<&str> {
        self.filters
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// A legacy parameter, ignoring blank values.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Page size after defaulting and capping.
    pub fn page_size(&self, default_limit: usize, max_limit: usize) -> Result<usize> {
        match self.limit {
            None => Ok(default_limit.min(max_limit)),
            Some(0) => Err(SearchError::InvalidRequest {
                path: "params.limit".to_string(),
                reason: "must be greater than zero".to_string(),
            }),
            Some(limit) => Ok(limit.min(max_limit)),
        }
    }
}

/// Shared cancellation flag for one request.
///
/// Checked once, right before the index is queried.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
