//! Static mapping declarations for every entity type.
//!
//! Physical names follow the index schema's dynamic-field conventions:
//! `txt_*` tokenized text, `str_s_*` / `str_ss_*` single/multi exact strings,
//! `dt_*` datetimes, `int_*` integers.

use std::sync::OnceLock;

use super::{EntityMapping, FieldKind, FieldMapping, MappingContext, TextField, TextRole};
use crate::error::Result;
use crate::model::EntityType;

/// Property names a Data item may carry under `properties.`.
pub const DATA_PROPERTIES: [&str; 5] = ["language", "type", "category", "keywords", "author"];

static DATA: OnceLock<EntityMapping> = OnceLock::new();
static DOCUMENT_DESCRIPTOR: OnceLock<EntityMapping> = OnceLock::new();

pub fn data() -> &'static EntityMapping {
    DATA.get_or_init(|| build_data().expect("static Data mapping is consistent"))
}

pub fn document_descriptor() -> &'static EntityMapping {
    DOCUMENT_DESCRIPTOR.get_or_init(|| {
        build_document_descriptor().expect("static DocumentDescriptor mapping is consistent")
    })
}

fn data_property_field(name: &str) -> (String, String) {
    (
        format!("properties.{name}"),
        format!("str_ss_data_property_{name}"),
    )
}

fn build_data() -> Result<EntityMapping> {
    let properties: Vec<(String, String)> =
        DATA_PROPERTIES.iter().map(|p| data_property_field(p)).collect();

    let mut document = FieldMapping::builder(MappingContext::Document)
        .field("id", "id", FieldKind::String)
        .field("name", "txt_data_name", FieldKind::Text)
        .field("description", "txt_data_description", FieldKind::Text)
        .field("content", "txt_data_content", FieldKind::Text)
        .field("institutionId", "str_s_data_institution_id", FieldKind::String)
        .field("projectId", "str_s_data_project_id", FieldKind::String)
        .field("hash", "str_s_data_hash", FieldKind::String)
        .field("mimeType", "str_s_data_mime_type", FieldKind::String)
        .field("created", "dt_data_created", FieldKind::DateTime)
        .field("updated", "dt_data_updated", FieldKind::DateTime);
    let mut filter = FieldMapping::builder(MappingContext::Filter)
        .field("id", "id", FieldKind::String)
        .field("name", "txt_data_name", FieldKind::Text)
        .field("institutionId", "str_s_data_institution_id", FieldKind::String)
        .field("projectId", "str_s_data_project_id", FieldKind::String)
        .field("hash", "str_s_data_hash", FieldKind::String)
        .field("mimeType", "str_s_data_mime_type", FieldKind::String)
        .field("created", "dt_data_created", FieldKind::DateTime)
        .field("updated", "dt_data_updated", FieldKind::DateTime);
    let mut aggregation = FieldMapping::builder(MappingContext::Aggregation)
        .field("institutionId", "str_s_data_institution_id", FieldKind::String)
        .field("projectId", "str_s_data_project_id", FieldKind::String)
        .field("mimeType", "str_s_data_mime_type", FieldKind::String);
    for (logical, physical) in &properties {
        document = document.field(logical, physical, FieldKind::Strings);
        filter = filter.field(logical, physical, FieldKind::Strings);
        aggregation = aggregation.field(logical, physical, FieldKind::Strings);
    }
    let sort = FieldMapping::builder(MappingContext::Sort)
        .field("id", "id", FieldKind::String)
        .field("name", "str_s_data_name_sort", FieldKind::String)
        .field("created", "dt_data_created", FieldKind::DateTime)
        .field("updated", "dt_data_updated", FieldKind::DateTime);

    EntityMapping::new(
        EntityType::Data,
        [filter.build()?, aggregation.build()?, sort.build()?, document.build()?],
        vec![
            text(TextRole::Content, "txt_data_content"),
            text(TextRole::Title, "txt_data_name"),
            text(TextRole::Abstract, "txt_data_description"),
        ],
    )
}

fn build_document_descriptor() -> Result<EntityMapping> {
    let document = FieldMapping::builder(MappingContext::Document)
        .field("id", "id", FieldKind::String)
        .field("title", "txt_title", FieldKind::Text)
        .field("titleAlias", "txt_title_alias", FieldKind::Text)
        .field("abstract", "txt_abstract", FieldKind::Text)
        .field("content", "txt_content", FieldKind::Text)
        .field("language", "str_s_language", FieldKind::String)
        .field("documentType", "str_s_document_type", FieldKind::String)
        .field("institutionId", "str_s_institution_id", FieldKind::String)
        .field("documentGroups", "str_ss_document_groups", FieldKind::Strings)
        .field("authors", "str_ss_authors", FieldKind::Strings)
        .field("hash", "str_s_hash", FieldKind::String)
        .field("projectId", "str_s_project_id", FieldKind::String)
        .field("pages", "int_pages", FieldKind::Int)
        .field("geoLocation", "geo_location", FieldKind::String)
        .field("created", "dt_created", FieldKind::DateTime)
        .field("updated", "dt_updated", FieldKind::DateTime);
    let filter = FieldMapping::builder(MappingContext::Filter)
        .field("id", "id", FieldKind::String)
        .field("title", "txt_title", FieldKind::Text)
        .field("language", "str_s_language", FieldKind::String)
        .field("documentType", "str_s_document_type", FieldKind::String)
        .field("institutionId", "str_s_institution_id", FieldKind::String)
        .field("documentGroups", "str_ss_document_groups", FieldKind::Strings)
        .field("authors", "str_ss_authors", FieldKind::Strings)
        .field("hash", "str_s_hash", FieldKind::String)
        .field("projectId", "str_s_project_id", FieldKind::String)
        .field("pages", "int_pages", FieldKind::Int)
        .field("geoLocation", "geo_location", FieldKind::String)
        .field("created", "dt_created", FieldKind::DateTime)
        .field("updated", "dt_updated", FieldKind::DateTime);
    let aggregation = FieldMapping::builder(MappingContext::Aggregation)
        .field("language", "str_s_language", FieldKind::String)
        .field("documentType", "str_s_document_type", FieldKind::String)
        .field("institutionId", "str_s_institution_id", FieldKind::String)
        .field("documentGroups", "str_ss_document_groups", FieldKind::Strings)
        .field("authors", "str_ss_authors", FieldKind::Strings)
        .field("projectId", "str_s_project_id", FieldKind::String);
    let sort = FieldMapping::builder(MappingContext::Sort)
        .field("id", "id", FieldKind::String)
        .field("title", "str_s_title_sort", FieldKind::String)
        .field("language", "str_s_language", FieldKind::String)
        .field("pages", "int_pages", FieldKind::Int)
        .field("created", "dt_created", FieldKind::DateTime)
        .field("updated", "dt_updated", FieldKind::DateTime);

    EntityMapping::new(
        EntityType::DocumentDescriptor,
        [filter.build()?, aggregation.build()?, sort.build()?, document.build()?],
        vec![
            text(TextRole::Content, "txt_content"),
            text(TextRole::Title, "txt_title"),
            text(TextRole::Abstract, "txt_abstract"),
            text(TextRole::TitleAlias, "txt_title_alias"),
        ],
    )
}

fn text(role: TextRole, physical: &str) -> TextField {
    TextField {
        role,
        physical: physical.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_tables_build() {
        assert!(build_data().is_ok());
        assert!(build_document_descriptor().is_ok());
    }

    #[test]
    fn test_data_property_mapping() {
        assert_eq!(
            data()
                .resolve("properties.language", MappingContext::Filter)
                .unwrap(),
            "str_ss_data_property_language"
        );
        assert!(data()
            .resolve("properties.secret", MappingContext::Filter)
            .is_err());
    }

    #[test]
    fn test_text_fields_are_stored_fields() {
        for mapping in [data(), document_descriptor()] {
            let document = mapping.context(MappingContext::Document);
            for field in mapping.text_fields() {
                assert!(
                    document.logical_name(&field.physical).is_some(),
                    "{} is not a stored field",
                    field.physical
                );
            }
        }
    }

    #[test]
    fn test_filter_fields_exist_in_index_schema() {
        for mapping in [data(), document_descriptor()] {
            let document = mapping.context(MappingContext::Document);
            for (logical, field) in mapping.context(MappingContext::Filter).iter() {
                assert!(
                    document.logical_name(&field.physical).is_some(),
                    "filter field {logical} points at unknown {}",
                    field.physical
                );
            }
        }
    }
}
