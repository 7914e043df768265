//! Filter-expression compiler: tokenizer, parser, generator, and the
//! service that ties them together.
//!
//! ```text
//! "lang:(en OR de) -pages:[1 TO 5]"
//!     -> tokenize -> parse -> generate (via the filter mapping)
//!     -> "(str_s_language:en OR str_s_language:de) AND -int_pages:[1 TO 5]"
//! ```

pub mod ast;
pub mod generator;
pub mod lexer;
pub mod parser;

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use tracing::debug;

use crate::error::Result;
use crate::mapping::{FieldMapping, MappingFingerprint};

use self::generator::Generator;
use self::parser::parse_expression;

static GLOBAL: OnceLock<QueryService> = OnceLock::new();

/// Compiles filter expressions, reusing one [`Generator`] per distinct mapping.
///
/// The cache only grows with the number of distinct mapping tables, which
/// is fixed by the static declarations, so entries are never evicted.
#[derive(Debug, Default)]
pub struct QueryService {
    generators: RwLock<HashMap<MappingFingerprint, Arc<Generator>>>,
}

impl QueryService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide instance.
    pub fn global() -> &'static QueryService {
        GLOBAL.get_or_init(QueryService::new)
    }

    /// Compile `expression` into a backend filter clause.
    ///
    /// Fails with `Parsing` for malformed input and `UnknownProperty` for
    /// fields outside `mapping`. Never returns a partial clause.
    pub fn filter_query(&self, expression: &str, mapping: &FieldMapping) -> Result<String> {
        let tree = parse_expression(expression)?;
        self.generator(mapping).generate(&tree)
    }

    /// Cached generator for `mapping`, built on first use.
    pub fn generator(&self, mapping: &FieldMapping) -> Arc<Generator> {
        let key = mapping.fingerprint();
        if let Some(generator) = self
            .generators
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Arc::clone(generator);
        }

        let mut generators = self
            .generators
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(generators.entry(key).or_insert_with(|| {
            debug!(mapping = %key, context = %mapping.context(), "Building filter generator");
            Arc::new(Generator::new(mapping.clone()))
        }))
    }

    /// Number of cached generators.
    pub fn cached_generators(&self) -> usize {
        self.generators
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
