//! Index client contract and the backend query it executes.
//!
//! [`SolrQuery`] is built by the search orchestrator and rendered into
//! Solr request parameters; [`RawResult`] is what comes back before it is
//! mapped into domain entities.

pub mod solr;
pub mod static_index;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::IndexDocument;

pub use solr::SolrHttpClient;
pub use static_index::StaticIndex;

/// The index backend as seen by the search service.
///
/// Implementations own transport concerns (timeouts, retries); the search
/// service issues at most one call per request.
pub trait IndexClient: Send + Sync {
    /// Start a query against `core`.
    fn create_query(&self, core: &str) -> SolrQuery {
        SolrQuery::new(core)
    }

    fn select(&self, query: &SolrQuery) -> Result<RawResult>;

    fn add(&self, core: &str, documents: &[IndexDocument]) -> Result<()>;

    fn delete_by_id(&self, core: &str, ids: &[String]) -> Result<()>;

    fn commit(&self, core: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        })
    }
}

/// One filter clause, optionally tagged so facets can exclude it.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterQuery {
    pub clause: String,
    pub tag: Option<String>,
}

/// A facet declaration on a physical field.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FacetField {
    pub field: String,
    pub mincount: Option<u32>,
    /// Negative means unlimited.
    pub limit: Option<i64>,
    pub prefix: Option<String>,
    /// Filter tag whose clauses are ignored when counting.
    pub exclude_tag: Option<String>,
}

/// A backend query under construction.
#[derive(Debug, Clone, PartialEq)]
pub struct SolrQuery {
    pub core: String,
    /// Main query; `*:*` matches everything.
    pub query: String,
    /// Boosted text fields for the free-text query.
    pub query_fields: Vec<(String, f32)>,
    pub filter_queries: Vec<FilterQuery>,
    pub facets: Vec<FacetField>,
    pub sort: Vec<(String, SortOrder)>,
    pub start: usize,
    pub rows: usize,
}

impl SolrQuery {
    pub const MATCH_ALL: &'static str = "*:*";

    pub fn new(core: &str) -> Self {
        Self {
            core: core.to_string(),
            query: Self::MATCH_ALL.to_string(),
            query_fields: Vec::new(),
            filter_queries: Vec::new(),
            facets: Vec::new(),
            sort: Vec::new(),
            start: 0,
            rows: 10,
        }
    }

    /// Free-text query over boosted fields.
    pub fn set_text_query(&mut self, text: &str, fields: Vec<(String, f32)>) -> &mut Self {
        self.query = text.to_string();
        self.query_fields = fields;
        self
    }

    pub fn add_filter_query(&mut self, clause: impl Into<String>) -> &mut Self {
        self.filter_queries.push(FilterQuery {
            clause: clause.into(),
            tag: None,
        });
        self
    }

    pub fn add_tagged_filter_query(&mut self, clause: impl Into<String>, tag: &str) -> &mut Self {
        self.filter_queries.push(FilterQuery {
            clause: clause.into(),
            tag: Some(tag.to_string()),
        });
        self
    }

    pub fn add_facet(&mut self, facet: FacetField) -> &mut Self {
        self.facets.push(facet);
        self
    }

    pub fn add_sort(&mut self, field: impl Into<String>, order: SortOrder) -> &mut Self {
        self.sort.push((field.into(), order));
        self
    }

    pub fn set_pagination(&mut self, start: usize, rows: usize) -> &mut Self {
        self.start = start;
        self.rows = rows;
        self
    }

    /// Solr request parameters, in a stable order.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("q".to_string(), self.query.clone())];
        if !self.query_fields.is_empty() {
            params.push(("defType".to_string(), "edismax".to_string()));
            let qf = self
                .query_fields
                .iter()
                .map(|(field, boost)| format!("{field}^{boost}"))
                .collect::<Vec<_>>()
                .join(" ");
            params.push(("qf".to_string(), qf));
            // No fielded clauses inside the free text
            params.push(("uf".to_string(), "-*".to_string()));
        }
        for fq in &self.filter_queries {
            let value = match &fq.tag {
                Some(tag) => format!("{{!tag={tag}}}{}", fq.clause),
                None => fq.clause.clone(),
            };
            params.push(("fq".to_string(), value));
        }
        if !self.facets.is_empty() {
            params.push(("facet".to_string(), "true".to_string()));
            for facet in &self.facets {
                let value = match &facet.exclude_tag {
                    Some(tag) => format!("{{!ex={tag}}}{}", facet.field),
                    None => facet.field.clone(),
                };
                params.push(("facet.field".to_string(), value));
                let per_field = |name: &str| format!("f.{}.facet.{name}", facet.field);
                if let Some(mincount) = facet.mincount {
                    params.push((per_field("mincount"), mincount.to_string()));
                }
                if let Some(limit) = facet.limit {
                    params.push((per_field("limit"), limit.to_string()));
                }
                if let Some(prefix) = &facet.prefix {
                    params.push((per_field("prefix"), prefix.clone()));
                }
            }
        }
        if !self.sort.is_empty() {
            let sort = self
                .sort
                .iter()
                .map(|(field, order)| format!("{field} {order}"))
                .collect::<Vec<_>>()
                .join(",");
            params.push(("sort".to_string(), sort));
        }
        params.push(("start".to_string(), self.start.to_string()));
        params.push(("rows".to_string(), self.rows.to_string()));
        params.push(("wt".to_string(), "json".to_string()));
        params
    }
}

/// One facet bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetBucket {
    pub term: String,
    pub count: u64,
}

/// Backend answer before entity mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResult {
    pub num_found: u64,
    pub query_time_ms: u64,
    pub documents: Vec<IndexDocument>,
    /// Buckets per physical facet field, in backend order.
    pub facets: BTreeMap<String, Vec<FacetBucket>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values<'a>(params: &'a [(String, String)], key: &str) -> Vec<&'a str> {
        params
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    #[test]
    fn test_default_params_match_all() {
        let params = SolrQuery::new("public").to_params();
        assert_eq!(values(&params, "q"), vec!["*:*"]);
        assert!(values(&params, "defType").is_empty());
        assert_eq!(values(&params, "rows"), vec!["10"]);
    }

    #[test]
    fn test_text_query_params() {
        let mut q = SolrQuery::new("public");
        q.set_text_query(
            "heat pump",
            vec![("txt_content".to_string(), 1.0), ("txt_title".to_string(), 2.0)],
        );
        let params = q.to_params();
        assert_eq!(values(&params, "defType"), vec!["edismax"]);
        assert_eq!(values(&params, "qf"), vec!["txt_content^1 txt_title^2"]);
        assert_eq!(values(&params, "uf"), vec!["-*"]);
    }

    #[test]
    fn test_filter_and_facet_params() {
        let mut q = SolrQuery::new("public");
        q.add_filter_query("entity_type:data")
            .add_tagged_filter_query("str_s_language:en", "user")
            .add_facet(FacetField {
                field: "str_s_language".to_string(),
                mincount: Some(1),
                limit: Some(20),
                prefix: Some("e".to_string()),
                exclude_tag: Some("user".to_string()),
            })
            .add_sort("dt_created", SortOrder::Desc)
            .add_sort("id", SortOrder::Asc)
            .set_pagination(20, 5);
        let params = q.to_params();
        assert_eq!(
            values(&params, "fq"),
            vec!["entity_type:data", "{!tag=user}str_s_language:en"]
        );
        assert_eq!(values(&params, "facet.field"), vec!["{!ex=user}str_s_language"]);
        assert_eq!(values(&params, "f.str_s_language.facet.mincount"), vec!["1"]);
        assert_eq!(values(&params, "f.str_s_language.facet.limit"), vec!["20"]);
        assert_eq!(values(&params, "f.str_s_language.facet.prefix"), vec!["e"]);
        assert_eq!(values(&params, "sort"), vec!["dt_created desc,id asc"]);
        assert_eq!(values(&params, "start"), vec!["20"]);
        assert_eq!(values(&params, "rows"), vec!["5"]);
    }
}
