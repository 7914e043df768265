//! Solr HTTP transport and select-response parsing.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use tracing::{debug, error};

use super::{FacetBucket, IndexClient, RawResult, SolrQuery};
use crate::config::SolrConfig;
use crate::error::{Result, SearchError};
use crate::model::IndexDocument;

/// Blocking HTTP client for one Solr server.
pub struct SolrHttpClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SelectResponse {
    #[serde(rename = "responseHeader", default)]
    header: ResponseHeader,
    response: Option<ResponseBody>,
    facet_counts: Option<FacetCounts>,
    error: Option<SolrErrorBody>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseHeader {
    #[serde(rename = "QTime", default)]
    qtime: u64,
}

#[derive(Debug, Deserialize)]
struct ResponseBody {
    #[serde(rename = "numFound")]
    num_found: u64,
    #[serde(default)]
    docs: Vec<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct FacetCounts {
    #[serde(default)]
    facet_fields: BTreeMap<String, Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct SolrErrorBody {
    msg: Option<String>,
    code: Option<u16>,
}

impl SolrHttpClient {
    pub fn new(config: &SolrConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.read_timeout_ms))
            .build()
            .map_err(|e| SearchError::Backend(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, core: &str, handler: &str) -> String {
        format!("{}/{}/{}", self.base_url, core, handler)
    }

    fn update(&self, core: &str, body: &serde_json::Value) -> Result<()> {
        let url = self.url(core, "update");
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .map_err(|e| transport_error(&url, e))?;
        check_status(&url, response)?;
        Ok(())
    }
}

impl IndexClient for SolrHttpClient {
    fn select(&self, query: &SolrQuery) -> Result<RawResult> {
        let url = self.url(&query.core, "select");
        let params = query.to_params();
        debug!(url = %url, params = params.len(), "Solr select");

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .map_err(|e| transport_error(&url, e))?;
        let response = check_status(&url, response)?;
        let body: serde_json::Value = response.json().map_err(|e| {
            error!(url = %url, error = %e, "Unreadable Solr response");
            SearchError::Backend(format!("unreadable response: {e}"))
        })?;
        parse_select_response(&body)
    }

    fn add(&self, core: &str, documents: &[IndexDocument]) -> Result<()> {
        let body = serde_json::Value::Array(documents.iter().map(IndexDocument::to_json).collect());
        debug!(core, count = documents.len(), "Solr add");
        self.update(core, &body)
    }

    fn delete_by_id(&self, core: &str, ids: &[String]) -> Result<()> {
        debug!(core, count = ids.len(), "Solr delete");
        self.update(core, &serde_json::json!({ "delete": ids }))
    }

    fn commit(&self, core: &str) -> Result<()> {
        self.update(core, &serde_json::json!({ "commit": {} }))
    }
}

fn transport_error(url: &str, e: reqwest::Error) -> SearchError {
    error!(url, error = %e, "Solr request failed");
    SearchError::Backend(format!("request failed: {e}"))
}

/// Pass successful responses through; turn the rest into `Backend` errors,
/// using Solr's own error message when the body carries one.
fn check_status(url: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .json::<SelectResponse>()
        .ok()
        .and_then(|r| r.error)
        .and_then(|e| e.msg)
        .unwrap_or_else(|| status.to_string());
    error!(url, status = status.as_u16(), message = %message, "Solr returned an error");
    Err(SearchError::Backend(format!(
        "Solr returned {}: {message}",
        status.as_u16()
    )))
}

/// Parse a `wt=json` select response.
///
/// Facet counts arrive as flat `[term, count, term, count, ...]` arrays.
pub fn parse_select_response(body: &serde_json::Value) -> Result<RawResult> {
    let parsed = SelectResponse::deserialize(body)
        .map_err(|e| SearchError::Backend(format!("malformed select response: {e}")))?;

    if let Some(err) = parsed.error {
        return Err(SearchError::Backend(format!(
            "Solr error {}: {}",
            err.code.unwrap_or_default(),
            err.msg.unwrap_or_default()
        )));
    }
    let body = parsed
        .response
        .ok_or_else(|| SearchError::Backend("select response has no 'response'".to_string()))?;

    let mut facets = BTreeMap::new();
    if let Some(counts) = parsed.facet_counts {
        for (field, flat) in counts.facet_fields {
            facets.insert(field.clone(), parse_facet_pairs(&field, &flat)?);
        }
    }

    Ok(RawResult {
        num_found: body.num_found,
        query_time_ms: parsed.header.qtime,
        documents: body.docs.iter().map(IndexDocument::from_json).collect(),
        facets,
    })
}

fn parse_facet_pairs(field: &str, flat: &[serde_json::Value]) -> Result<Vec<FacetBucket>> {
    if flat.len() % 2 != 0 {
        return Err(SearchError::Backend(format!(
            "facet '{field}' has an odd number of entries"
        )));
    }
    flat.chunks(2)
        .map(|pair| {
            let term = pair[0].as_str();
            let count = pair[1].as_u64();
            match (term, count) {
                (Some(term), Some(count)) => Ok(FacetBucket {
                    term: term.to_string(),
                    count,
                }),
                _ => Err(SearchError::Backend(format!(
                    "facet '{field}' has a malformed bucket"
                ))),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{FacetField, SortOrder};
    use crate::model::FieldValue;
    use mockito::Matcher;

    fn select_body() -> serde_json::Value {
        serde_json::json!({
            "responseHeader": {"status": 0, "QTime": 7},
            "response": {
                "numFound": 42,
                "start": 0,
                "docs": [
                    {"id": "d1", "entity_type": "data", "txt_data_name": "Report"},
                    {"id": "d2", "entity_type": "data"}
                ]
            },
            "facet_counts": {
                "facet_queries": {},
                "facet_fields": {
                    "str_ss_data_property_language": ["en", 30, "de", 12]
                }
            }
        })
    }

    #[test]
    fn test_parse_select_response() {
        let raw = parse_select_response(&select_body()).unwrap();
        assert_eq!(raw.num_found, 42);
        assert_eq!(raw.query_time_ms, 7);
        assert_eq!(raw.documents.len(), 2);
        assert_eq!(
            raw.documents[0].get("txt_data_name"),
            Some(&FieldValue::Str("Report".to_string()))
        );
        let buckets = &raw.facets["str_ss_data_property_language"];
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].term, "en");
        assert_eq!(buckets[1].count, 12);
    }

    #[test]
    fn test_parse_error_body() {
        let body = serde_json::json!({
            "responseHeader": {"status": 400, "QTime": 1},
            "error": {"msg": "undefined field foo", "code": 400}
        });
        let err = parse_select_response(&body).unwrap_err();
        assert!(err.to_string().contains("undefined field foo"));
    }

    #[test]
    fn test_parse_odd_facet_array() {
        let body = serde_json::json!({
            "response": {"numFound": 0, "docs": []},
            "facet_counts": {"facet_fields": {"f": ["en", 3, "de"]}}
        });
        assert!(matches!(
            parse_select_response(&body),
            Err(SearchError::Backend(_))
        ));
    }

    fn client_for(server: &mockito::Server) -> SolrHttpClient {
        SolrHttpClient::new(&SolrConfig {
            base_url: format!("{}/solr/", server.url()),
            ..SolrConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_select_sends_params() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/solr/public/select")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("fq".into(), "entity_type:data".into()),
                Matcher::UrlEncoded("facet.field".into(), "{!ex=user}str_s_language".into()),
                Matcher::UrlEncoded("sort".into(), "dt_created desc".into()),
                Matcher::UrlEncoded("wt".into(), "json".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(select_body().to_string())
            .create();

        let mut query = SolrQuery::new("public");
        query
            .add_filter_query("entity_type:data")
            .add_facet(FacetField {
                field: "str_s_language".to_string(),
                exclude_tag: Some("user".to_string()),
                ..FacetField::default()
            })
            .add_sort("dt_created", SortOrder::Desc);
        let raw = client_for(&server).select(&query).unwrap();
        assert_eq!(raw.num_found, 42);
        mock.assert();
    }

    #[test]
    fn test_select_http_error_is_backend() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/solr/public/select")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":{"msg":"core is loading","code":500}}"#)
            .create();

        let err = client_for(&server)
            .select(&SolrQuery::new("public"))
            .unwrap_err();
        assert!(matches!(err, SearchError::Backend(ref m) if m.contains("core is loading")));
    }

    #[test]
    fn test_delete_posts_update() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/solr/private/update")
            .match_body(Matcher::Json(serde_json::json!({"delete": ["d1"]})))
            .with_status(200)
            .with_body(r#"{"responseHeader":{"status":0}}"#)
            .create();

        client_for(&server)
            .delete_by_id("private", &["d1".to_string()])
            .unwrap();
        mock.assert();
    }
}
