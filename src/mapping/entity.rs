//! Per-entity-type mapping set: one table per context plus text-search fields.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{FieldMapping, MappingContext};
use crate::error::{Result, SearchError};
use crate::model::{EntityType, FieldValue, IndexDocument, ENTITY_TYPE_FIELD};

/// Role a text field plays in the free-text query; decides its boost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextRole {
    Content,
    Title,
    Abstract,
    TitleAlias,
}

/// A physical field searched by the free-text query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextField {
    pub role: TextRole,
    pub physical: String,
}

/// All mapping tables of one entity type.
#[derive(Debug)]
pub struct EntityMapping {
    entity_type: EntityType,
    filter: FieldMapping,
    aggregation: FieldMapping,
    sort: FieldMapping,
    document: FieldMapping,
    text_fields: Vec<TextField>,
}

impl EntityMapping {
    pub fn new(
        entity_type: EntityType,
        tables: [FieldMapping; 4],
        text_fields: Vec<TextField>,
    ) -> Result<Self> {
        let [filter, aggregation, sort, document] = tables;
        let expected = [
            (&filter, MappingContext::Filter),
            (&aggregation, MappingContext::Aggregation),
            (&sort, MappingContext::Sort),
            (&document, MappingContext::Document),
        ];
        for (table, context) in expected {
            if table.context() != context {
                return Err(SearchError::InvalidMapping(format!(
                    "{} table supplied where {} table expected for {}",
                    table.context(),
                    context,
                    entity_type
                )));
            }
        }
        if document.logical_name(ENTITY_TYPE_FIELD).is_some() {
            return Err(SearchError::InvalidMapping(format!(
                "'{ENTITY_TYPE_FIELD}' is reserved for the discriminator"
            )));
        }
        Ok(Self {
            entity_type,
            filter,
            aggregation,
            sort,
            document,
            text_fields,
        })
    }

    /// The static mapping set for `entity_type`.
    pub fn for_entity(entity_type: EntityType) -> &'static EntityMapping {
        match entity_type {
            EntityType::Data => super::tables::data(),
            EntityType::DocumentDescriptor => super::tables::document_descriptor(),
        }
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn context(&self, context: MappingContext) -> &FieldMapping {
        match context {
            MappingContext::Filter => &self.filter,
            MappingContext::Aggregation => &self.aggregation,
            MappingContext::Sort => &self.sort,
            MappingContext::Document => &self.document,
        }
    }

    pub fn resolve(&self, logical: &str, context: MappingContext) -> Result<&str> {
        self.context(context).resolve(logical)
    }

    pub fn text_fields(&self) -> &[TextField] {
        &self.text_fields
    }

    /// Forward mapping: logical values to a storable document.
    ///
    /// The discriminator is always set. Fields missing from the document
    /// table are rejected.
    pub fn to_document(&self, fields: BTreeMap<String, FieldValue>) -> Result<IndexDocument> {
        let mut doc = IndexDocument::new();
        doc.insert(
            ENTITY_TYPE_FIELD,
            FieldValue::Str(self.entity_type.discriminator().to_string()),
        );
        for (logical, value) in fields {
            let Some(mapped) = self.document.field(&logical) else {
                return Err(SearchError::unknown_property(logical, MappingContext::Document));
            };
            let value = value
                .coerce(mapped.kind)
                .map_err(|reason| SearchError::InvalidRequest {
                    path: format!("document.{logical}"),
                    reason,
                })?;
            doc.insert(mapped.physical.clone(), value);
        }
        Ok(doc)
    }

    /// Inverse mapping: a stored document back to logical values.
    ///
    /// Physical fields without a logical counterpart (`_version_`, `score`,
    /// the discriminator) are ignored.
    pub fn from_document(&self, doc: &IndexDocument) -> Result<BTreeMap<String, FieldValue>> {
        let mut fields = BTreeMap::new();
        for (physical, value) in doc.iter() {
            let Some(logical) = self.document.logical_name(physical) else {
                continue;
            };
            let Some(mapped) = self.document.field(logical) else {
                continue;
            };
            let value = value
                .clone()
                .coerce(mapped.kind)
                .map_err(|reason| SearchError::Backend(format!("field '{physical}': {reason}")))?;
            fields.insert(logical.to_string(), value);
        }
        Ok(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::FieldKind;

    fn tables() -> [FieldMapping; 4] {
        [
            FieldMapping::from_pairs(MappingContext::Filter, [("title", "txt_title")]).unwrap(),
            FieldMapping::from_pairs(MappingContext::Aggregation, [("lang", "str_s_lang")])
                .unwrap(),
            FieldMapping::from_pairs(MappingContext::Sort, [("title", "str_s_title_sort")])
                .unwrap(),
            FieldMapping::builder(MappingContext::Document)
                .field("id", "id", FieldKind::String)
                .field("title", "txt_title", FieldKind::Text)
                .build()
                .unwrap(),
        ]
    }

    #[test]
    fn test_same_field_differs_per_context() {
        let m = EntityMapping::new(EntityType::DocumentDescriptor, tables(), Vec::new()).unwrap();
        assert_eq!(m.resolve("title", MappingContext::Filter).unwrap(), "txt_title");
        assert_eq!(m.resolve("title", MappingContext::Sort).unwrap(), "str_s_title_sort");
        assert!(m.resolve("title", MappingContext::Aggregation).is_err());
    }

    #[test]
    fn test_tables_in_wrong_slots_rejected() {
        let [f, a, s, d] = tables();
        let result = EntityMapping::new(EntityType::Data, [a, f, s, d], Vec::new());
        assert!(matches!(result, Err(SearchError::InvalidMapping(_))));
    }

    #[test]
    fn test_to_document_sets_discriminator() {
        let m = EntityMapping::new(EntityType::Data, tables(), Vec::new()).unwrap();
        let mut fields = BTreeMap::new();
        fields.insert("id".to_string(), FieldValue::Str("x".to_string()));
        let doc = m.to_document(fields).unwrap();
        assert_eq!(
            doc.get(ENTITY_TYPE_FIELD).and_then(FieldValue::as_str),
            Some("data")
        );
        assert_eq!(doc.get("id").and_then(FieldValue::as_str), Some("x"));
    }

    #[test]
    fn test_from_document_ignores_unmapped_fields() {
        let m = EntityMapping::new(EntityType::Data, tables(), Vec::new()).unwrap();
        let mut doc = IndexDocument::new();
        doc.insert("id", FieldValue::Str("x".to_string()));
        doc.insert("_version_", FieldValue::Int(4));
        let fields = m.from_document(&doc).unwrap();
        assert_eq!(fields.len(), 1);
    }
}
