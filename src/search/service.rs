//! Search orchestration plus index / get / delete.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, warn};

use super::facets::{FacetDescriptor, USER_FILTER_TAG};
use super::filters::FilterDescriptor;
use super::request::{CancellationToken, SearchRequest};
use super::result::{FacetResult, SearchResult};
use crate::config::Config;
use crate::error::{Result, SearchError};
use crate::index::{IndexClient, RawResult, SolrQuery};
use crate::mapping::{EntityMapping, MappingContext};
use crate::model::{Data, DocumentDescriptor, EntityType, SolrEntity, Visibility};
use crate::query::generator::escape_term;
use crate::query::QueryService;

/// A backend query ready to run, with the facets it declares.
#[derive(Debug, Clone)]
pub struct PreparedSearch {
    pub entity_type: EntityType,
    pub query: SolrQuery,
    pub facets: Vec<FacetDescriptor>,
}

/// Builds backend queries from requests and shapes the answers.
pub struct SearchService {
    config: Config,
    index: Arc<dyn IndexClient>,
    queries: &'static QueryService,
}

impl SearchService {
    pub fn new(config: Config, index: Arc<dyn IndexClient>) -> Self {
        Self {
            config,
            index,
            queries: QueryService::global(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Assemble the backend query for `request` without running it.
    pub fn prepare(
        &self,
        entity_type: EntityType,
        visibility: Visibility,
        request: &SearchRequest,
    ) -> Result<PreparedSearch> {
        let mapping = EntityMapping::for_entity(entity_type);
        let search = &self.config.search;
        let mut query = self
            .index
            .create_query(self.config.solr.core(visibility));

        if let Some(clause) =
            FilterDescriptor::EntityType(entity_type).to_clause(request, mapping)?
        {
            query.add_filter_query(clause);
        }

        let facets = FacetDescriptor::from_request(request, mapping, search)?;
        let tag_user_filters = facets.iter().any(|f| f.exclude_user_filters);

        let mut consumed = BTreeSet::new();
        for filter in FilterDescriptor::defaults(entity_type) {
            consumed.extend(filter.parameters());
            if let Some(clause) = filter.to_clause(request, mapping)? {
                add_user_filter(&mut query, clause, tag_user_filters);
            }
        }

        if let Some(text) = request.text() {
            let fields = mapping
                .text_fields()
                .iter()
                .map(|f| (f.physical.clone(), search.boosts.weight(f.role)))
                .collect();
            query.set_text_query(text, fields);
        }

        for facet in &facets {
            consumed.extend(facet.parameters());
            query.add_facet(facet.to_facet_field());
        }

        if let Some(expression) = request.filter_expression() {
            let clause = self
                .queries
                .filter_query(expression, mapping.context(MappingContext::Filter))?;
            add_user_filter(&mut query, clause, tag_user_filters);
        }

        for spec in &request.sort {
            let field = mapping.resolve(&spec.field, MappingContext::Sort)?;
            query.add_sort(field, spec.order);
        }

        let rows = request.page_size(search.default_limit, search.max_limit)?;
        query.set_pagination(request.offset, rows);

        for name in request.params.keys() {
            let legacy = name.starts_with("filter_") || name.starts_with("facet_");
            if legacy && !consumed.contains(name) {
                debug!(param = %name, entity = %entity_type, "Ignoring unsupported parameter");
            }
        }

        Ok(PreparedSearch {
            entity_type,
            query,
            facets,
        })
    }

    /// Run a search for entities of type `E`.
    ///
    /// Parsing and mapping failures propagate unchanged; the index is not
    /// queried if `cancel` is already set.
    pub fn search<E: SolrEntity>(
        &self,
        visibility: Visibility,
        request: &SearchRequest,
        cancel: &CancellationToken,
    ) -> Result<SearchResult<E>> {
        let prepared = self.prepare(E::ENTITY_TYPE, visibility, request)?;
        if cancel.is_cancelled() {
            debug!(entity = %E::ENTITY_TYPE, "Search cancelled before backend call");
            return Err(SearchError::Cancelled);
        }
        let raw = self.index.select(&prepared.query)?;
        debug!(
            entity = %E::ENTITY_TYPE,
            total = raw.num_found,
            returned = raw.documents.len(),
            qtime = raw.query_time_ms,
            "Search completed"
        );
        Ok(self.shape(&prepared, raw))
    }

    pub fn search_documents(
        &self,
        visibility: Visibility,
        request: &SearchRequest,
        cancel: &CancellationToken,
    ) -> Result<SearchResult<DocumentDescriptor>> {
        self.search(visibility, request, cancel)
    }

    pub fn search_data(
        &self,
        visibility: Visibility,
        request: &SearchRequest,
        cancel: &CancellationToken,
    ) -> Result<SearchResult<Data>> {
        self.search(visibility, request, cancel)
    }

    /// Map a raw result into entities and facet results.
    ///
    /// Documents that cannot be mapped back are logged and skipped.
    pub fn shape<E: SolrEntity>(
        &self,
        prepared: &PreparedSearch,
        raw: RawResult,
    ) -> SearchResult<E> {
        let items = raw
            .documents
            .iter()
            .filter_map(|doc| match E::from_document(doc) {
                Ok(item) => Some(item),
                Err(e) => {
                    let id = doc.get("id").and_then(|v| v.as_str()).unwrap_or("?");
                    warn!(id, error = %e, "Skipping undecodable result document");
                    None
                }
            })
            .collect();

        let aggregations =
            EntityMapping::for_entity(prepared.entity_type).context(MappingContext::Aggregation);
        let facets = prepared
            .facets
            .iter()
            .map(|facet| FacetResult {
                name: aggregations
                    .logical_name(&facet.field)
                    .unwrap_or(&facet.key)
                    .to_string(),
                buckets: raw
                    .facets
                    .get(&facet.field)
                    .map(|buckets| facet.filter_buckets(buckets))
                    .unwrap_or_default(),
            })
            .collect();

        SearchResult {
            total: raw.num_found,
            query_time_ms: raw.query_time_ms,
            items,
            facets,
        }
    }

    /// Store entities in the `visibility` core and commit.
    pub fn index<E: SolrEntity>(&self, visibility: Visibility, entities: &[E]) -> Result<()> {
        let documents = entities
            .iter()
            .map(E::to_document)
            .collect::<Result<Vec<_>>>()?;
        let core = self.config.solr.core(visibility);
        self.index.add(core, &documents)?;
        self.index.commit(core)?;
        debug!(core, entity = %E::ENTITY_TYPE, count = documents.len(), "Indexed entities");
        Ok(())
    }

    /// Fetch one entity by id.
    pub fn get<E: SolrEntity>(&self, visibility: Visibility, id: &str) -> Result<Option<E>> {
        let mut query = self
            .index
            .create_query(self.config.solr.core(visibility));
        query
            .add_filter_query(format!(
                "{}:{}",
                crate::model::ENTITY_TYPE_FIELD,
                E::ENTITY_TYPE.discriminator()
            ))
            .add_filter_query(format!("id:{}", escape_term(id)))
            .set_pagination(0, 1);
        let raw = self.index.select(&query)?;
        raw.documents.first().map(E::from_document).transpose()
    }

    /// Remove one entity by id and commit.
    pub fn delete(&self, visibility: Visibility, id: &str) -> Result<()> {
        let core = self.config.solr.core(visibility);
        self.index.delete_by_id(core, &[id.to_string()])?;
        self.index.commit(core)?;
        debug!(core, id, "Deleted entity");
        Ok(())
    }
}

/// User filters are tagged when some facet must count without them.
fn add_user_filter(query: &mut SolrQuery, clause: String, tagged: bool) {
    if tagged {
        query.add_tagged_filter_query(clause, USER_FILTER_TAG);
    } else {
        query.add_filter_query(clause);
    }
}
