//! Search orchestration: request assembly, filter and facet objects, and
//! result shaping.
//!
//! A search runs in this order:
//! 1. entity-type filter (never tagged)
//! 2. legacy `filter_*` parameters and the geo bounding box
//! 3. boosted free-text query
//! 4. facet declarations
//! 5. the compiled filter expression
//! 6. sort and pagination
//! 7. one backend call, then mapping back through the entity's tables

pub mod facets;
pub mod filters;
pub mod geo;
pub mod request;
pub mod result;
pub mod service;

pub use facets::FacetDescriptor;
pub use filters::FilterDescriptor;
pub use request::{AggregationConfig, CancellationToken, GeoLocationFilter, SearchRequest, SortSpec};
pub use result::{FacetResult, SearchResult};
pub use service::{PreparedSearch, SearchService};
