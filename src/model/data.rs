//! Generic file/metadata entity ("Data").

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    put_datetime, put_list, put_opt_str, put_str, EntityType, FieldReader, FieldValue, SolrEntity,
};
use crate::error::Result;

/// Logical prefix of the free-form property fields.
pub const PROPERTY_PREFIX: &str = "properties.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Data {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Multi-valued metadata, e.g. `language -> ["en", "de"]`.
    ///
    /// Solr keeps no trace of an empty multi-valued field, so a property
    /// with no values is not written and is absent after a round trip.
    #[serde(default)]
    pub properties: BTreeMap<String, Vec<String>>,
    pub created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
}

impl SolrEntity for Data {
    const ENTITY_TYPE: EntityType = EntityType::Data;

    fn id(&self) -> &str {
        &self.id
    }

    fn to_fields(&self) -> BTreeMap<String, FieldValue> {
        let mut fields = BTreeMap::new();
        put_str(&mut fields, "id", &self.id);
        put_str(&mut fields, "name", &self.name);
        put_opt_str(&mut fields, "description", self.description.as_ref());
        put_opt_str(&mut fields, "content", self.content.as_ref());
        put_opt_str(&mut fields, "institutionId", self.institution_id.as_ref());
        put_opt_str(&mut fields, "projectId", self.project_id.as_ref());
        put_opt_str(&mut fields, "hash", self.hash.as_ref());
        put_opt_str(&mut fields, "mimeType", self.mime_type.as_ref());
        for (name, values) in &self.properties {
            put_list(&mut fields, &format!("{PROPERTY_PREFIX}{name}"), values);
        }
        put_datetime(&mut fields, "created", Some(self.created));
        put_datetime(&mut fields, "updated", self.updated);
        fields
    }

    fn from_fields(mut fields: FieldReader) -> Result<Self> {
        let properties = fields
            .take_prefixed(PROPERTY_PREFIX)
            .into_iter()
            .filter_map(|(name, value)| match value {
                FieldValue::List(items) => Some((name, items)),
                _ => None,
            })
            .collect();

        Ok(Self {
            id: fields.required_str("id")?,
            name: fields.required_str("name")?,
            description: fields.opt_str("description"),
            content: fields.opt_str("content"),
            institution_id: fields.opt_str("institutionId"),
            project_id: fields.opt_str("projectId"),
            hash: fields.opt_str("hash"),
            mime_type: fields.opt_str("mimeType"),
            properties,
            created: fields.required_datetime("created")?,
            updated: fields.opt_datetime("updated"),
        })
    }
}
