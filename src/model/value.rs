//! Index document representation.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::mapping::FieldKind;

/// A single stored field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Str(String),
    List(Vec<String>),
    DateTime(DateTime<Utc>),
    Int(i64),
}

impl FieldValue {
    /// JSON form sent to the index. Datetimes keep sub-second precision.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Str(s) => serde_json::Value::String(s.clone()),
            Self::List(items) => serde_json::Value::from(items.clone()),
            Self::DateTime(dt) => serde_json::Value::String(format_datetime(dt)),
            Self::Int(i) => serde_json::Value::from(*i),
        }
    }

    /// Read a JSON value returned by the index. `None` for nulls and objects.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => Some(Self::Str(s.clone())),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Self::Int(i)),
                None => Some(Self::Str(n.to_string())),
            },
            serde_json::Value::Bool(b) => Some(Self::Str(b.to_string())),
            serde_json::Value::Array(items) => Some(Self::List(
                items
                    .iter()
                    .filter_map(|item| match item {
                        serde_json::Value::String(s) => Some(s.clone()),
                        serde_json::Value::Number(n) => Some(n.to_string()),
                        serde_json::Value::Bool(b) => Some(b.to_string()),
                        _ => None,
                    })
                    .collect(),
            )),
            serde_json::Value::Null | serde_json::Value::Object(_) => None,
        }
    }

    /// Convert into the representation a field of `kind` expects.
    pub fn coerce(self, kind: FieldKind) -> Result<Self, String> {
        match (kind, self) {
            (FieldKind::Text | FieldKind::String, v @ Self::Str(_)) => Ok(v),
            (FieldKind::Text | FieldKind::String, Self::List(mut items)) if items.len() == 1 => {
                Ok(Self::Str(items.remove(0)))
            }
            (FieldKind::Text | FieldKind::String, Self::Int(i)) => Ok(Self::Str(i.to_string())),
            (FieldKind::Strings, v @ Self::List(_)) => Ok(v),
            (FieldKind::Strings, Self::Str(s)) => Ok(Self::List(vec![s])),
            (FieldKind::DateTime, v @ Self::DateTime(_)) => Ok(v),
            (FieldKind::DateTime, Self::Str(s)) => parse_datetime(&s)
                .map(Self::DateTime)
                .ok_or_else(|| format!("'{s}' is not a datetime")),
            (FieldKind::Int, v @ Self::Int(_)) => Ok(v),
            (FieldKind::Int, Self::Str(s)) => s
                .parse()
                .map(Self::Int)
                .map_err(|_| format!("'{s}' is not an integer")),
            (kind, other) => Err(format!("{other:?} does not fit a {kind:?} field")),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }
}

/// Solr datetime syntax: RFC 3339 in UTC with a `Z` suffix.
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// One document as stored in the index, keyed by physical field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexDocument {
    fields: BTreeMap<String, FieldValue>,
}

impl IndexDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, physical: impl Into<String>, value: FieldValue) {
        self.fields.insert(physical.into(), value);
    }

    pub fn get(&self, physical: &str) -> Option<&FieldValue> {
        self.fields.get(physical)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    /// Build from a JSON object as found in `response.docs`.
    pub fn from_json(map: &serde_json::Map<String, serde_json::Value>) -> Self {
        let fields = map
            .iter()
            .filter_map(|(k, v)| FieldValue::from_json(v).map(|v| (k.clone(), v)))
            .collect();
        Self { fields }
    }
}

impl FromIterator<(String, FieldValue)> for IndexDocument {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_datetime_keeps_nanoseconds() {
        let dt = Utc
            .with_ymd_and_hms(2024, 3, 1, 12, 30, 5)
            .unwrap()
            .checked_add_signed(chrono::Duration::nanoseconds(123_456_789))
            .unwrap();
        let s = format_datetime(&dt);
        assert_eq!(s, "2024-03-01T12:30:05.123456789Z");
        assert_eq!(parse_datetime(&s), Some(dt));
    }

    #[test]
    fn test_coerce_string_to_datetime() {
        let v = FieldValue::Str("2024-01-15T10:00:00Z".to_string())
            .coerce(FieldKind::DateTime)
            .unwrap();
        assert_eq!(
            v.as_datetime(),
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_coerce_single_to_list_and_back() {
        let v = FieldValue::Str("en".to_string()).coerce(FieldKind::Strings).unwrap();
        assert_eq!(v.as_list(), Some(&["en".to_string()][..]));
        let v = v.coerce(FieldKind::String).unwrap();
        assert_eq!(v.as_str(), Some("en"));
    }

    #[test]
    fn test_coerce_rejects_garbage() {
        assert!(FieldValue::Str("soon".to_string())
            .coerce(FieldKind::DateTime)
            .is_err());
        assert!(FieldValue::Str("ten".to_string()).coerce(FieldKind::Int).is_err());
        assert!(FieldValue::List(vec!["a".into(), "b".into()])
            .coerce(FieldKind::String)
            .is_err());
    }

    #[test]
    fn test_document_from_json_skips_nulls() {
        let json = serde_json::json!({
            "id": "doc-1",
            "str_ss_document_groups": ["3:a", "3:b"],
            "int_pages": 12,
            "missing": null,
        });
        let doc = IndexDocument::from_json(json.as_object().unwrap());
        assert_eq!(doc.len(), 3);
        assert_eq!(doc.get("int_pages").and_then(FieldValue::as_int), Some(12));
        assert!(doc.get("missing").is_none());
    }
}
