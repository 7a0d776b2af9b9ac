//! Core module containing the declaration model, the filter tree and the resolver

pub mod builders;
pub mod convert;
pub mod declaration;
pub mod error;
pub mod evaluate;
pub mod field;
pub mod filter_type;
pub mod leaf;
pub mod proxy;
pub mod resolver;
pub mod spec;
pub mod walker;

pub use builders::{BuildContext, BuildNode};
pub use convert::{Converted, Converter, FallbackConverter, OnTypeMismatch};
pub use declaration::{
    AndDecl, ConjunctionDecl, Declaration, DisjunctionDecl, JoinDecl, JoinFetchDecl, JoinType,
    JoinsDecl, MissingPathVarPolicy, OrDecl, RepeatedJoinFetchDecl, SpecDecl, SpecKind,
};
pub use error::{ResolveError, ResolveResult};
pub use field::{FieldValue, ValueType};
pub use filter_type::{EntitySchema, FilterInterface, FilterRegistry, FilterType, FilterTypeConfig};
pub use leaf::{Arity, LeafKind, LeafPredicate, LeafRegistry};
pub use proxy::ProxiedSpec;
pub use resolver::{MethodParameter, ResolutionStage, SpecificationResolver};
pub use spec::{Conjunction, Disjunction, EmptyResult, Join, JoinFetch, Leaf, Spec};
pub use walker::{DeclarationCache, DeclarationEntry, DeclarationTree};
