//! Field mapping tables: public (logical) field names to physical index fields.
//!
//! A [`FieldMapping`] is the whitelist for one [`MappingContext`]. Lookups are
//! exact and case-sensitive, and anything not declared is rejected. This is
//! the boundary that keeps clients away from internal-only index fields.

pub mod entity;
pub mod tables;

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::error::{Result, SearchError};

pub use entity::{EntityMapping, TextField, TextRole};

/// Where a field reference is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingContext {
    /// Filter clauses and filter expressions.
    Filter,
    /// Facet declarations.
    Aggregation,
    /// Sort clauses.
    Sort,
    /// Stored-field layout used for indexing and result shaping.
    Document,
}

impl MappingContext {
    pub const ALL: [MappingContext; 4] = [
        MappingContext::Filter,
        MappingContext::Aggregation,
        MappingContext::Sort,
        MappingContext::Document,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Filter => "filter",
            Self::Aggregation => "aggregation",
            Self::Sort => "sort",
            Self::Document => "document",
        }
    }

    /// Request field that names fields in this context.
    pub fn request_path(self) -> &'static str {
        match self {
            Self::Filter => crate::error::FILTERS_PATH,
            Self::Aggregation => "params.aggregations",
            Self::Sort => "params.sort",
            Self::Document => "document",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

impl fmt::Display for MappingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage type of a physical field, used to coerce backend values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Tokenized text, single-valued.
    Text,
    /// Exact string, single-valued.
    String,
    /// Exact string, multi-valued.
    Strings,
    /// Point in time, stored in UTC.
    DateTime,
    /// Integer.
    Int,
}

/// Physical side of a mapping entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappedField {
    pub physical: String,
    pub kind: FieldKind,
}

/// Stable identity of a mapping table, derived from its sorted entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MappingFingerprint([u8; 32]);

impl fmt::Display for MappingFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..8] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Bidirectional whitelist for one mapping context.
#[derive(Debug, Clone)]
pub struct FieldMapping {
    context: MappingContext,
    forward: BTreeMap<String, MappedField>,
    reverse: HashMap<String, String>,
    fingerprint: MappingFingerprint,
}

impl FieldMapping {
    pub fn builder(context: MappingContext) -> FieldMappingBuilder {
        FieldMappingBuilder {
            context,
            entries: Vec::new(),
        }
    }

    /// Build a table of exact-string fields from `(logical, physical)` pairs.
    pub fn from_pairs<'a>(
        context: MappingContext,
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self> {
        pairs
            .into_iter()
            .fold(Self::builder(context), |b, (logical, physical)| {
                b.field(logical, physical, FieldKind::String)
            })
            .build()
    }

    pub fn context(&self) -> MappingContext {
        self.context
    }

    pub fn fingerprint(&self) -> MappingFingerprint {
        self.fingerprint
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Resolve a logical field to its physical name, failing closed.
    pub fn resolve(&self, logical: &str) -> Result<&str> {
        match self.forward.get(logical) {
            Some(field) => Ok(&field.physical),
            None => {
                info!(field = logical, context = %self.context, "Rejected non-whitelisted field");
                Err(SearchError::unknown_property(logical, self.context))
            }
        }
    }

    pub fn field(&self, logical: &str) -> Option<&MappedField> {
        self.forward.get(logical)
    }

    /// Inverse lookup: physical name back to the logical name.
    pub fn logical_name(&self, physical: &str) -> Option<&str> {
        self.reverse.get(physical).map(String::as_str)
    }

    /// Entries in logical-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MappedField)> {
        self.forward.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Collects entries and validates uniqueness in both directions.
pub struct FieldMappingBuilder {
    context: MappingContext,
    entries: Vec<(String, MappedField)>,
}

impl FieldMappingBuilder {
    pub fn field(mut self, logical: &str, physical: &str, kind: FieldKind) -> Self {
        self.entries.push((
            logical.to_string(),
            MappedField {
                physical: physical.to_string(),
                kind,
            },
        ));
        self
    }

    pub fn build(self) -> Result<FieldMapping> {
        let mut forward = BTreeMap::new();
        let mut reverse = HashMap::new();

        for (logical, field) in self.entries {
            if logical.is_empty() || field.physical.is_empty() {
                return Err(SearchError::InvalidMapping(format!(
                    "empty field name in {} table",
                    self.context
                )));
            }
            if let Some(other) = reverse.insert(field.physical.clone(), logical.clone()) {
                return Err(SearchError::InvalidMapping(format!(
                    "'{}' and '{}' both map to '{}' in {} table",
                    other, logical, field.physical, self.context
                )));
            }
            if forward.insert(logical.clone(), field).is_some() {
                return Err(SearchError::InvalidMapping(format!(
                    "'{}' declared twice in {} table",
                    logical, self.context
                )));
            }
        }

        let fingerprint = fingerprint(self.context, &forward);
        Ok(FieldMapping {
            context: self.context,
            forward,
            reverse,
            fingerprint,
        })
    }
}

fn fingerprint(
    context: MappingContext,
    forward: &BTreeMap<String, MappedField>,
) -> MappingFingerprint {
    let mut hasher = Sha256::new();
    hasher.update(context.as_str().as_bytes());
    for (logical, field) in forward {
        // NUL separators keep ("ab", "c") distinct from ("a", "bc").
        hasher.update([0u8]);
        hasher.update(logical.as_bytes());
        hasher.update([0u8]);
        hasher.update(field.physical.as_bytes());
    }
    MappingFingerprint(hasher.finalize().into())
}
