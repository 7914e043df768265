//! Facet declarations from `aggregations` and legacy `facet_<name>_<attr>`
//! parameters.

use std::collections::BTreeMap;

use tracing::debug;

use super::request::SearchRequest;
use crate::config::SearchConfig;
use crate::error::Result;
use crate::index::{FacetBucket, FacetField};
use crate::mapping::{EntityMapping, MappingContext};

/// Tag carried by user filter clauses so facets can exclude them.
pub const USER_FILTER_TAG: &str = "user";

/// Legacy attribute suffixes: `mincount`, `count` (bucket limit), `prefix`.
const LEGACY_ATTRIBUTES: [&str; 3] = ["mincount", "count", "prefix"];

/// One enabled facet.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetDescriptor {
    /// Logical field name, as reported back to the caller.
    pub key: String,
    /// Physical field resolved in the aggregation context.
    pub field: String,
    pub mincount: u32,
    pub limit: i64,
    pub prefix: Option<String>,
    /// Counts ignore the user's filters.
    pub exclude_user_filters: bool,
}

impl FacetDescriptor {
    fn new(key: &str, field: &str, config: &SearchConfig) -> Self {
        Self {
            key: key.to_string(),
            field: field.to_string(),
            mincount: config.default_facet_mincount,
            limit: config.default_facet_limit,
            prefix: None,
            exclude_user_filters: false,
        }
    }

    /// Collect every facet the request enables, in request order:
    /// `aggregations` first, then legacy-only facets.
    ///
    /// Aggregation keys must be whitelisted; legacy parameters for fields
    /// outside the aggregation mapping are ignored.
    pub fn from_request(
        request: &SearchRequest,
        mapping: &EntityMapping,
        config: &SearchConfig,
    ) -> Result<Vec<FacetDescriptor>> {
        let aggregations = mapping.context(MappingContext::Aggregation);
        let mut facets: Vec<FacetDescriptor> = Vec::new();

        for (key, agg) in &request.aggregations {
            let field = aggregations.resolve(key)?;
            let mut facet = Self::new(key, field, config);
            if let Some(limit) = agg.limit {
                facet.limit = limit;
            }
            if let Some(min_count) = agg.min_count {
                facet.mincount = min_count;
            }
            facet.exclude_user_filters = !agg.counts_filtered;
            facets.push(facet);
        }

        for (key, attrs) in legacy_params(request) {
            let Some(field) = aggregations.field(key) else {
                debug!(facet = key, "Ignoring legacy facet on unmapped field");
                continue;
            };
            let index = match facets.iter().position(|f| f.key == key) {
                Some(i) => i,
                None => {
                    facets.push(Self::new(key, &field.physical, config));
                    facets.len() - 1
                }
            };
            facets[index].apply_legacy(&attrs);
        }
        Ok(facets)
    }

    fn apply_legacy(&mut self, attrs: &BTreeMap<&str, &str>) {
        for (&attr, &value) in attrs {
            match attr {
                "mincount" => match value.parse() {
                    Ok(v) => self.mincount = v,
                    Err(_) => debug!(facet = %self.key, value, "Ignoring non-numeric mincount"),
                },
                "count" => match value.parse() {
                    Ok(v) => self.limit = v,
                    Err(_) => debug!(facet = %self.key, value, "Ignoring non-numeric count"),
                },
                "prefix" => self.prefix = Some(value.to_string()),
                _ => {}
            }
        }
    }

    /// Legacy parameters this facet reads.
    pub fn parameters(&self) -> Vec<String> {
        LEGACY_ATTRIBUTES
            .iter()
            .map(|attr| format!("facet_{}_{attr}", self.key))
            .collect()
    }

    pub fn to_facet_field(&self) -> FacetField {
        FacetField {
            field: self.field.clone(),
            mincount: Some(self.mincount),
            limit: Some(self.limit),
            prefix: self.prefix.clone(),
            exclude_tag: self
                .exclude_user_filters
                .then(|| USER_FILTER_TAG.to_string()),
        }
    }

    /// Keep buckets matching the prefix, in backend order.
    pub fn filter_buckets(&self, buckets: &[FacetBucket]) -> Vec<FacetBucket> {
        buckets
            .iter()
            .filter(|b| match &self.prefix {
                Some(prefix) => b.term.starts_with(prefix.as_str()),
                None => true,
            })
            .cloned()
            .collect()
    }
}

/// Group `facet_<name>_<attr>` parameters by name. Names may contain dots
/// but not underscores, so the attribute is the last `_` segment.
fn legacy_params(request: &SearchRequest) -> BTreeMap<&str, BTreeMap<&str, &str>> {
    let mut grouped: BTreeMap<&str, BTreeMap<&str, &str>> = BTreeMap::new();
    for (name, value) in &request.params {
        let Some((key, attr)) = name
            .strip_prefix("facet_")
            .and_then(|rest| rest.rsplit_once('_'))
        else {
            continue;
        };
        let value = value.trim();
        if key.is_empty() || value.is_empty() || !LEGACY_ATTRIBUTES.contains(&attr) {
            continue;
        }
        grouped.entry(key).or_default().insert(attr, value);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SearchError;
    use crate::model::EntityType;
    use crate::search::request::AggregationConfig;

    fn documents() -> &'static EntityMapping {
        EntityMapping::for_entity(EntityType::DocumentDescriptor)
    }

    fn bucket(term: &str, count: u64) -> FacetBucket {
        FacetBucket {
            term: term.to_string(),
            count,
        }
    }

    #[test]
    fn test_aggregation_facet() {
        let mut request = SearchRequest::default();
        request.aggregations.insert(
            "language".to_string(),
            AggregationConfig {
                limit: Some(5),
                counts_filtered: false,
                min_count: Some(2),
            },
        );
        let facets =
            FacetDescriptor::from_request(&request, documents(), &SearchConfig::default())
                .unwrap();
        assert_eq!(facets.len(), 1);
        let field = facets[0].to_facet_field();
        assert_eq!(field.field, "str_s_language");
        assert_eq!(field.limit, Some(5));
        assert_eq!(field.mincount, Some(2));
        assert_eq!(field.exclude_tag.as_deref(), Some("user"));
    }

    #[test]
    fn test_unknown_aggregation_fails() {
        let mut request = SearchRequest::default();
        request
            .aggregations
            .insert("hash".to_string(), AggregationConfig::default());
        let err = FacetDescriptor::from_request(&request, documents(), &SearchConfig::default())
            .unwrap_err();
        assert!(matches!(err, SearchError::UnknownProperty { .. }));
        assert_eq!(err.field_path(), Some("params.aggregations"));
    }

    #[test]
    fn test_legacy_facet_params() {
        let mut request = SearchRequest::default();
        request
            .params
            .insert("facet_documentGroups_prefix".to_string(), "3:".to_string());
        request
            .params
            .insert("facet_documentGroups_count".to_string(), "50".to_string());
        request
            .params
            .insert("facet_documentGroups_mincount".to_string(), "many".to_string());
        request
            .params
            .insert("facet_secret_prefix".to_string(), "x".to_string());
        let config = SearchConfig::default();
        let facets = FacetDescriptor::from_request(&request, documents(), &config).unwrap();
        assert_eq!(facets.len(), 1);
        assert_eq!(facets[0].key, "documentGroups");
        assert_eq!(facets[0].prefix.as_deref(), Some("3:"));
        assert_eq!(facets[0].limit, 50);
        assert_eq!(facets[0].mincount, config.default_facet_mincount);
        assert!(!facets[0].exclude_user_filters);
    }

    #[test]
    fn test_legacy_params_merge_into_aggregation() {
        let mut request = SearchRequest::default();
        request
            .aggregations
            .insert("authors".to_string(), AggregationConfig::default());
        request
            .params
            .insert("facet_authors_prefix".to_string(), "M".to_string());
        let facets =
            FacetDescriptor::from_request(&request, documents(), &SearchConfig::default())
                .unwrap();
        assert_eq!(facets.len(), 1);
        assert_eq!(facets[0].prefix.as_deref(), Some("M"));
    }

    #[test]
    fn test_prefix_filters_buckets() {
        let facet = FacetDescriptor {
            prefix: Some("3:".to_string()),
            ..FacetDescriptor::new(
                "documentGroups",
                "str_ss_document_groups",
                &SearchConfig::default()
            )
        };
        let buckets = vec![bucket("3:a", 9), bucket("4:b", 7), bucket("3:c", 2)];
        assert_eq!(
            facet.filter_buckets(&buckets),
            vec![bucket("3:a", 9), bucket("3:c", 2)]
        );
    }

    #[test]
    fn test_parameters() {
        let facet = FacetDescriptor::new("language", "str_s_language", &SearchConfig::default());
        assert_eq!(
            facet.parameters(),
            vec![
                "facet_language_mincount",
                "facet_language_count",
                "facet_language_prefix"
            ]
        );
    }
}
