//! In-memory index backend with a canned select response.
//!
//! Used by the CLI's offline `search --response` mode and by tests; every
//! call is recorded so callers can inspect what would have been sent.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use super::solr::parse_select_response;
use super::{IndexClient, RawResult, SolrQuery};
use crate::error::{Result, SearchError};
use crate::model::IndexDocument;

#[derive(Debug, Default)]
pub struct StaticIndex {
    response: RawResult,
    queries: Mutex<Vec<SolrQuery>>,
    stored: Mutex<BTreeMap<String, Vec<IndexDocument>>>,
    deleted: Mutex<Vec<(String, String)>>,
    commits: Mutex<Vec<String>>,
}

impl StaticIndex {
    pub fn new(response: RawResult) -> Self {
        Self {
            response,
            ..Self::default()
        }
    }

    /// Build from a Solr select response body.
    pub fn from_solr_json(body: &serde_json::Value) -> Result<Self> {
        Ok(Self::new(parse_select_response(body)?))
    }

    /// Build from a file holding a Solr select response.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| SearchError::io(path, e))?;
        let body: serde_json::Value =
            serde_json::from_str(&contents).map_err(|e| SearchError::invalid_file(path, e))?;
        Self::from_solr_json(&body)
    }

    /// Every query passed to `select`, in order.
    pub fn queries(&self) -> Vec<SolrQuery> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last_query(&self) -> Option<SolrQuery> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// Documents added to `core`, in insertion order.
    pub fn documents(&self, core: &str) -> Vec<IndexDocument> {
        self.stored
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(core)
            .cloned()
            .unwrap_or_default()
    }

    /// `(core, id)` pairs passed to `delete_by_id`.
    pub fn deleted(&self) -> Vec<(String, String)> {
        self.deleted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn commits(&self) -> Vec<String> {
        self.commits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl IndexClient for StaticIndex {
    fn select(&self, query: &SolrQuery) -> Result<RawResult> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(query.clone());
        Ok(self.response.clone())
    }

    fn add(&self, core: &str, documents: &[IndexDocument]) -> Result<()> {
        self.stored
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(core.to_string())
            .or_default()
            .extend_from_slice(documents);
        Ok(())
    }

    fn delete_by_id(&self, core: &str, ids: &[String]) -> Result<()> {
        let mut deleted = self.deleted.lock().unwrap_or_else(PoisonError::into_inner);
        deleted.extend(ids.iter().map(|id| (core.to_string(), id.clone())));
        Ok(())
    }

    fn commit(&self, core: &str) -> Result<()> {
        self.commits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(core.to_string());
        Ok(())
    }
}
