//! Document descriptor entity.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    put_datetime, put_list, put_opt_str, put_str, EntityType, FieldReader, FieldValue, SolrEntity,
};
use crate::error::Result;

/// Metadata of one indexed document (publication, report, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDescriptor {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_alias: Option<String>,
    #[serde(rename = "abstract", default, skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution_id: Option<String>,
    /// Group memberships, `<level>:<group>` (e.g. `3:climate`).
    #[serde(default)]
    pub document_groups: Vec<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<i64>,
    /// `"lat,lon"` point.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo_location: Option<String>,
    pub created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
}

impl SolrEntity for DocumentDescriptor {
    const ENTITY_TYPE: EntityType = EntityType::DocumentDescriptor;

    fn id(&self) -> &str {
        &self.id
    }

    fn to_fields(&self) -> BTreeMap<String, FieldValue> {
        let mut fields = BTreeMap::new();
        put_str(&mut fields, "id", &self.id);
        put_str(&mut fields, "title", &self.title);
        put_opt_str(&mut fields, "titleAlias", self.title_alias.as_ref());
        put_opt_str(&mut fields, "abstract", self.abstract_text.as_ref());
        put_opt_str(&mut fields, "content", self.content.as_ref());
        put_opt_str(&mut fields, "language", self.language.as_ref());
        put_opt_str(&mut fields, "documentType", self.document_type.as_ref());
        put_opt_str(&mut fields, "institutionId", self.institution_id.as_ref());
        put_list(&mut fields, "documentGroups", &self.document_groups);
        put_list(&mut fields, "authors", &self.authors);
        put_opt_str(&mut fields, "hash", self.hash.as_ref());
        put_opt_str(&mut fields, "projectId", self.project_id.as_ref());
        if let Some(pages) = self.pages {
            fields.insert("pages".to_string(), FieldValue::Int(pages));
        }
        put_opt_str(&mut fields, "geoLocation", self.geo_location.as_ref());
        put_datetime(&mut fields, "created", Some(self.created));
        put_datetime(&mut fields, "updated", self.updated);
        fields
    }

    fn from_fields(mut fields: FieldReader) -> Result<Self> {
        Ok(Self {
            id: fields.required_str("id")?,
            title: fields.required_str("title")?,
            title_alias: fields.opt_str("titleAlias"),
            abstract_text: fields.opt_str("abstract"),
            content: fields.opt_str("content"),
            language: fields.opt_str("language"),
            document_type: fields.opt_str("documentType"),
            institution_id: fields.opt_str("institutionId"),
            document_groups: fields.list("documentGroups"),
            authors: fields.list("authors"),
            hash: fields.opt_str("hash"),
            project_id: fields.opt_str("projectId"),
            pages: fields.opt_int("pages"),
            geo_location: fields.opt_str("geoLocation"),
            created: fields.required_datetime("created")?,
            updated: fields.opt_datetime("updated"),
        })
    }
}
