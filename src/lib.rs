//! `solrfacade`: filter-expression compiler and search orchestration in
//! front of a Solr index.
//!
//! This crate provides the field-qualified filter grammar, the per-entity
//! field mapping tables that whitelist what users may touch, and the
//! search service that assembles Solr queries and maps results back into
//! domain entities.

pub mod config;
pub mod error;
pub mod index;
pub mod mapping;
pub mod model;
pub mod query;
pub mod search;
