//! Legacy filter parameters (`filter_<key>`) and the entity-type filter.
//!
//! Value syntax for list filters:
//!
//! ```text
//! a,b      -> field:a OR field:b
//! a|b      -> field:a AND field:b
//! a,b|c    -> (field:a OR field:b) AND field:c   (pipe binds loosest)
//! 3:*      -> field:3\:*                         (prefix match, document groups only)
//! ```

use tracing::debug;

use super::geo::BoundingBox;
use super::request::SearchRequest;
use crate::error::Result;
use crate::mapping::{EntityMapping, MappingContext};
use crate::model::{EntityType, ENTITY_TYPE_FIELD};
use crate::query::generator::escape_term;

/// One filter the orchestrator can apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDescriptor {
    Language,
    DocumentType,
    InstitutionId,
    DocumentGroups,
    Hash,
    ProjectId,
    GeoBoundingBox,
    /// Scopes results to one entity type. Always applied, never user-controlled.
    EntityType(EntityType),
}

impl FilterDescriptor {
    /// Filters available to requests for `entity_type`.
    pub fn defaults(entity_type: EntityType) -> Vec<FilterDescriptor> {
        match entity_type {
            EntityType::Data => vec![
                Self::Language,
                Self::DocumentType,
                Self::InstitutionId,
                Self::Hash,
                Self::ProjectId,
            ],
            EntityType::DocumentDescriptor => vec![
                Self::Language,
                Self::DocumentType,
                Self::InstitutionId,
                Self::DocumentGroups,
                Self::Hash,
                Self::ProjectId,
                Self::GeoBoundingBox,
            ],
        }
    }

    /// Request-facing name.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Language => "language",
            Self::DocumentType => "documentType",
            Self::InstitutionId => "institutionId",
            Self::DocumentGroups => "documentGroups",
            Self::Hash => "hash",
            Self::ProjectId => "projectId",
            Self::GeoBoundingBox => "geoLocation",
            Self::EntityType(_) => "entityType",
        }
    }

    pub fn mapping_context(&self) -> MappingContext {
        MappingContext::Filter
    }

    /// Logical field the filter targets for `entity_type`.
    fn logical_field(&self, entity_type: EntityType) -> &'static str {
        match (self, entity_type) {
            (Self::Language, EntityType::Data) => "properties.language",
            (Self::DocumentType, EntityType::Data) => "properties.type",
            _ => self.key(),
        }
    }

    /// Legacy parameters this filter reads.
    pub fn parameters(&self) -> Vec<String> {
        match self {
            Self::GeoBoundingBox | Self::EntityType(_) => Vec::new(),
            _ => vec![format!("filter_{}", self.key())],
        }
    }

    /// Render the clause for `request`, or `None` when the filter is not set.
    ///
    /// Only the geo filter validates strictly; other filters with unusable
    /// values are skipped.
    pub fn to_clause(
        &self,
        request: &SearchRequest,
        mapping: &EntityMapping,
    ) -> Result<Option<String>> {
        match self {
            Self::EntityType(entity_type) => Ok(Some(format!(
                "{ENTITY_TYPE_FIELD}:{}",
                entity_type.discriminator()
            ))),
            Self::GeoBoundingBox => {
                let Some(geo) = &request.geo_location_filter else {
                    return Ok(None);
                };
                let field = mapping.resolve(
                    self.logical_field(mapping.entity_type()),
                    MappingContext::Filter,
                )?;
                Ok(Some(BoundingBox::from_geojson(&geo.bounding_box)?.to_clause(field)))
            }
            _ => {
                let Some(value) = request.param(&format!("filter_{}", self.key())) else {
                    return Ok(None);
                };
                let field = mapping.resolve(
                    self.logical_field(mapping.entity_type()),
                    MappingContext::Filter,
                )?;
                let clause = self.list_clause(field, value);
                if clause.is_none() {
                    debug!(filter = self.key(), value, "Ignoring unusable filter value");
                }
                Ok(clause)
            }
        }
    }

    /// Single-term clause for one raw value.
    pub fn default_clause(&self, field: &str, value: &str) -> String {
        let value = value.trim();
        match self {
            Self::DocumentGroups => match value.strip_suffix('*') {
                Some(prefix) => format!("{field}:{}*", escape_term(prefix)),
                None => format!("{field}:{}", escape_term(value)),
            },
            _ => format!("{field}:{}", escape_term(value)),
        }
    }

    fn list_clause(&self, field: &str, value: &str) -> Option<String> {
        let groups: Vec<Vec<String>> = value
            .split('|')
            .map(|group| {
                group
                    .split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty() && *v != "*")
                    .map(|v| self.default_clause(field, v))
                    .collect::<Vec<_>>()
            })
            .filter(|alternatives| !alternatives.is_empty())
            .collect();

        match groups.as_slice() {
            [] => None,
            [single] => Some(single.join(" OR ")),
            _ => Some(
                groups
                    .iter()
                    .map(|alternatives| match alternatives.as_slice() {
                        [one] => one.clone(),
                        _ => format!("({})", alternatives.join(" OR ")),
                    })
                    .collect::<Vec<_>>()
                    .join(" AND "),
            ),
        }
    }
}
