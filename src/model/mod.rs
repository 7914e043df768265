//! Domain entities and their index representation.

pub mod data;
pub mod document;
pub mod value;

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};
use crate::mapping::EntityMapping;

pub use data::Data;
pub use document::DocumentDescriptor;
pub use value::{FieldValue, IndexDocument};

/// Physical field holding the entity discriminator on every document.
pub const ENTITY_TYPE_FIELD: &str = "entity_type";

/// Kind of entity stored in the shared index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Data,
    DocumentDescriptor,
}

impl EntityType {
    pub const ALL: [EntityType; 2] = [EntityType::Data, EntityType::DocumentDescriptor];

    /// Value stored in [`ENTITY_TYPE_FIELD`].
    pub fn discriminator(self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::DocumentDescriptor => "document_descriptor",
        }
    }

    /// Accepts the discriminator or the short CLI alias `document`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "data" => Some(Self::Data),
            "document" | "document_descriptor" => Some(Self::DocumentDescriptor),
            _ => None,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.discriminator())
    }
}

/// Which core a request is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "public" => Some(Self::Public),
            "private" => Some(Self::Private),
            _ => None,
        }
    }
}

/// An entity that can be stored in and read back from the index.
///
/// Implementors describe themselves as logical field values; the
/// [`EntityMapping`] of their type does the physical translation.
pub trait SolrEntity: Sized + Serialize {
    const ENTITY_TYPE: EntityType;

    fn id(&self) -> &str;

    /// Logical field values. Empty optional fields are omitted.
    fn to_fields(&self) -> BTreeMap<String, FieldValue>;

    fn from_fields(fields: FieldReader) -> Result<Self>;

    fn to_document(&self) -> Result<IndexDocument> {
        EntityMapping::for_entity(Self::ENTITY_TYPE).to_document(self.to_fields())
    }

    fn from_document(doc: &IndexDocument) -> Result<Self> {
        let fields = EntityMapping::for_entity(Self::ENTITY_TYPE).from_document(doc)?;
        Self::from_fields(FieldReader::new(fields))
    }
}

/// Typed accessors over logical field values, consumed while building an entity.
#[derive(Debug, Default)]
pub struct FieldReader {
    fields: BTreeMap<String, FieldValue>,
}

impl FieldReader {
    pub fn new(fields: BTreeMap<String, FieldValue>) -> Self {
        Self { fields }
    }

    pub fn required_str(&mut self, name: &str) -> Result<String> {
        self.opt_str(name)
            .ok_or_else(|| SearchError::Backend(format!("document has no '{name}' field")))
    }

    pub fn required_datetime(&mut self, name: &str) -> Result<DateTime<Utc>> {
        self.opt_datetime(name)
            .ok_or_else(|| SearchError::Backend(format!("document has no '{name}' field")))
    }

    pub fn opt_str(&mut self, name: &str) -> Option<String> {
        match self.fields.remove(name) {
            Some(FieldValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn list(&mut self, name: &str) -> Vec<String> {
        match self.fields.remove(name) {
            Some(FieldValue::List(items)) => items,
            _ => Vec::new(),
        }
    }

    pub fn opt_datetime(&mut self, name: &str) -> Option<DateTime<Utc>> {
        self.fields.remove(name).and_then(|v| v.as_datetime())
    }

    pub fn opt_int(&mut self, name: &str) -> Option<i64> {
        self.fields.remove(name).and_then(|v| v.as_int())
    }

    /// Remove every field whose logical name starts with `prefix`,
    /// returning them keyed by the remainder.
    pub fn take_prefixed(&mut self, prefix: &str) -> BTreeMap<String, FieldValue> {
        let keys: Vec<String> = self
            .fields
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.into_iter()
            .filter_map(|k| {
                let value = self.fields.remove(&k)?;
                Some((k[prefix.len()..].to_string(), value))
            })
            .collect()
    }
}

/// Insert helpers used by `to_fields` implementations.
pub(crate) fn put_str(fields: &mut BTreeMap<String, FieldValue>, name: &str, value: &str) {
    fields.insert(name.to_string(), FieldValue::Str(value.to_string()));
}

pub(crate) fn put_opt_str(
    fields: &mut BTreeMap<String, FieldValue>,
    name: &str,
    value: Option<&String>,
) {
    if let Some(v) = value {
        put_str(fields, name, v);
    }
}

/// Empty lists are skipped; the index cannot store them.
pub(crate) fn put_list(fields: &mut BTreeMap<String, FieldValue>, name: &str, value: &[String]) {
    if !value.is_empty() {
        fields.insert(name.to_string(), FieldValue::List(value.to_vec()));
    }
}

pub(crate) fn put_datetime(
    fields: &mut BTreeMap<String, FieldValue>,
    name: &str,
    value: Option<DateTime<Utc>>,
) {
    if let Some(dt) = value {
        fields.insert(name.to_string(), FieldValue::DateTime(dt));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_type_names() {
        assert_eq!(EntityType::from_name("data"), Some(EntityType::Data));
        assert_eq!(
            EntityType::from_name("document"),
            Some(EntityType::DocumentDescriptor)
        );
        assert_eq!(EntityType::DocumentDescriptor.discriminator(), "document_descriptor");
        assert_eq!(EntityType::from_name("institution"), None);
    }

    #[test]
    fn test_take_prefixed() {
        let mut fields = BTreeMap::new();
        put_list(&mut fields, "properties.language", &["en".to_string()]);
        put_str(&mut fields, "name", "n");
        let mut reader = FieldReader::new(fields);
        let props = reader.take_prefixed("properties.");
        assert_eq!(props.len(), 1);
        assert!(props.contains_key("language"));
        assert_eq!(reader.opt_str("name").as_deref(), Some("n"));
    }
}
