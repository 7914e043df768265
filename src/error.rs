//! Centralized error types for solrfacade.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::mapping::MappingContext;
use crate::query::parser::ParsingError;

/// Request field that carries the filter expression.
pub const FILTERS_PATH: &str = "params.filters";
/// Request field that carries the GeoJSON bounding box.
pub const GEO_BOUNDING_BOX_PATH: &str = "params.geo_location_filter.bounding_box";

/// All errors produced by the solrfacade library.
#[derive(Error, Debug)]
pub enum SearchError {
    /// The filter expression is malformed (lexical or grammatical failure).
    #[error(transparent)]
    Parsing(#[from] ParsingError),

    /// A field is not whitelisted for the given mapping context.
    #[error("Unknown property '{field}' for {context} context")]
    UnknownProperty {
        field: String,
        context: MappingContext,
    },

    /// The geo bounding-box filter is not a usable GeoJSON polygon.
    #[error("Invalid GeoJSON bounding box: {reason}")]
    InvalidGeoJsonFilter { reason: String },

    /// A mapping table declaration is inconsistent.
    #[error("Invalid field mapping: {0}")]
    InvalidMapping(String),

    /// A request parameter failed validation.
    #[error("Invalid value for '{path}': {reason}")]
    InvalidRequest { path: String, reason: String },

    /// A configuration or fixture file could not be decoded.
    #[error("Invalid contents in '{path}': {reason}")]
    InvalidFile { path: PathBuf, reason: String },

    /// The index backend failed or returned something unusable.
    #[error("Index backend error: {0}")]
    Backend(String),

    /// The request was cancelled before the backend was queried.
    #[error("Search cancelled")]
    Cancelled,

    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias for `Result<T, SearchError>`.
pub type Result<T> = std::result::Result<T, SearchError>;

impl SearchError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an `InvalidFile` variant from a path and a decoding error.
    pub fn invalid_file(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::InvalidFile {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an `UnknownProperty` variant.
    pub fn unknown_property(field: impl Into<String>, context: MappingContext) -> Self {
        Self::UnknownProperty {
            field: field.into(),
            context,
        }
    }

    /// Create an `InvalidGeoJsonFilter` variant.
    pub fn invalid_geo(reason: impl Into<String>) -> Self {
        Self::InvalidGeoJsonFilter {
            reason: reason.into(),
        }
    }

    /// True for errors caused by the client's input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Parsing(_)
                | Self::UnknownProperty { .. }
                | Self::InvalidGeoJsonFilter { .. }
                | Self::InvalidRequest { .. }
        )
    }

    /// The request field a client error originates from.
    pub fn field_path(&self) -> Option<&str> {
        match self {
            Self::Parsing(_) => Some(FILTERS_PATH),
            Self::UnknownProperty { context, .. } => Some(context.request_path()),
            Self::InvalidGeoJsonFilter { .. } => Some(GEO_BOUNDING_BOX_PATH),
            Self::InvalidRequest { path, .. } => Some(path),
            Self::InvalidMapping(_)
            | Self::InvalidFile { .. }
            | Self::Backend(_)
            | Self::Cancelled
            | Self::Io { .. } => None,
        }
    }

    /// HTTP-equivalent status code.
    pub fn status_code(&self) -> u16 {
        if self.is_client_error() {
            400
        } else if matches!(self, Self::Cancelled) {
            499
        } else {
            500
        }
    }

    /// Build the structured response a controller returns for this error.
    ///
    /// Server-side failures are reported without detail.
    pub fn to_response(&self) -> ErrorResponse {
        let status = self.status_code();
        let violations = match self.field_path() {
            Some(path) => vec![Violation {
                property_path: path.to_string(),
                message: self.to_string(),
            }],
            None => Vec::new(),
        };
        let title = match status {
            400 => "Bad Request",
            499 => "Client Closed Request",
            _ => "Internal Server Error",
        };
        ErrorResponse {
            status,
            title: title.to_string(),
            violations,
        }
    }
}

/// Structured error body returned to API clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub status: u16,
    pub title: String,
    pub violations: Vec<Violation>,
}

/// One failing request field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub property_path: String,
    pub message: String,
}
