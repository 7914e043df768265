//! Shaped search results.

use serde::Serialize;

use crate::index::FacetBucket;

/// Search results mapped back into domain entities.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult<E> {
    /// Total matches reported by the index, not the page size.
    pub total: u64,
    pub query_time_ms: u64,
    pub items: Vec<E>,
    pub facets: Vec<FacetResult>,
}

/// Buckets of one facet, in backend order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetResult {
    pub name: String,
    pub buckets: Vec<FacetBucket>,
}

impl<E> SearchResult<E> {
    pub fn facet(&self, name: &str) -> Option<&FacetResult> {
        self.facets.iter().find(|f| f.name == name)
    }
}
