//! # spec-arg-rs
//!
//! Resolves declarative filter declarations into composable filter trees,
//! bound per request to query parameters, path variables, headers, the JSON
//! body and constant or expression values.
//!
//! ## Features
//!
//! - **Filter Interfaces**: Named filter types that extend each other, with diamond-safe traversal
//! - **Declarations**: Simple leaves, AND/OR groups, conjunctions, disjunctions, joins and fetches
//! - **Typed Conversion**: Raw values converted to the attribute type with a mismatch policy
//! - **Identity-Preserving Wrapper**: Results compare equal by declared type and structure
//! - **Configuration-Based**: Define filter types via YAML configuration
//! - **Axum Integration**: `SpecArg<F>` extractor for handlers
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use specarg::prelude::*;
//!
//! struct CustomerFilter;
//!
//! impl FilterInterface for CustomerFilter {
//!     fn filter_type() -> Arc<FilterType> {
//!         Arc::new(FilterType::new("CustomerFilter").with(OrDecl::new(vec![
//!             SpecDecl::new("gender", SpecKind::Equal).params(["gender"]),
//!             SpecDecl::new("lastName", SpecKind::Equal).params(["lastName"]),
//!         ])))
//!     }
//! }
//!
//! let resolver = SpecificationResolver::new(ResolverConfig::default());
//! let context = WebRequestContext::new("/customers")
//!     .param("gender", "MALE")
//!     .param("lastName", "Simpson");
//! let filter = resolver.resolve_as::<CustomerFilter>(&context)?;
//! assert!(filter.matches(&json!({"gender": "MALE", "lastName": "Flanders"})));
//! ```

pub mod config;
pub mod context;
pub mod core;
pub mod server;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Declarations ===
    pub use crate::core::declaration::{
        AndDecl, ConjunctionDecl, Declaration, DisjunctionDecl, JoinDecl, JoinFetchDecl,
        JoinType, MissingPathVarPolicy, OrDecl, SpecDecl, SpecKind,
    };
    pub use crate::core::filter_type::{
        EntitySchema, FilterInterface, FilterRegistry, FilterType, FilterTypeConfig,
    };

    // === Filters ===
    pub use crate::core::convert::{FallbackConverter, OnTypeMismatch};
    pub use crate::core::field::{FieldValue, ValueType};
    pub use crate::core::leaf::{Arity, LeafPredicate, LeafRegistry};
    pub use crate::core::proxy::ProxiedSpec;
    pub use crate::core::spec::Spec;

    // === Resolution ===
    pub use crate::core::error::{ResolveError, ResolveResult};
    pub use crate::core::resolver::{MethodParameter, SpecificationResolver};

    // === Context ===
    pub use crate::context::{
        EndpointMapping, ExpressionEvaluator, ProcessingContext, TeraExpressionEvaluator,
        WebRequestContext,
    };

    // === Config ===
    pub use crate::config::ResolverConfig;

    // === Server ===
    pub use crate::server::SpecArg;

    // === External dependencies ===
    pub use serde_json::{Value, json};
    pub use std::sync::Arc;
}
