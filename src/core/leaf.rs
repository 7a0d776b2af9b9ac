//! Leaf kinds and the registry of custom leaf predicates

use super::declaration::SpecKind;
use super::error::{ConfigError, ResolveResult};
use super::field::{FieldValue, ValueType};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Number of arguments a leaf kind accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match self {
            Arity::Exactly(n) => count == *n,
            Arity::AtLeast(n) => count >= *n,
        }
    }

    /// Whether the leaf can be built with no input value at all
    pub fn is_nullary(&self) -> bool {
        matches!(self, Arity::Exactly(0))
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exactly(n) => write!(f, "{}", n),
            Arity::AtLeast(n) => write!(f, "at least {}", n),
        }
    }
}

/// Evaluation seam for leaf kinds registered at runtime
///
/// `actual` holds every value found at the leaf's path in a record (arrays
/// are flattened, nulls kept); `args` are the converted arguments.
///
/// # Example
///
/// ```rust,ignore
/// struct Contains;
///
/// impl LeafPredicate for Contains {
///     fn matches(&self, actual: &[&Value], args: &[FieldValue]) -> bool {
///         let needle = args[0].to_string();
///         actual.iter().any(|v| v.as_str().is_some_and(|s| s.contains(&needle)))
///     }
/// }
/// ```
pub trait LeafPredicate: Send + Sync {
    fn arity(&self) -> Arity {
        Arity::Exactly(1)
    }

    /// Whether raw arguments are converted to the attribute type first
    fn requires_conversion(&self) -> bool {
        true
    }

    fn matches(&self, actual: &[&Value], args: &[FieldValue]) -> bool;
}

struct FnPredicate<F> {
    arity: Arity,
    predicate: F,
}

impl<F> LeafPredicate for FnPredicate<F>
where
    F: Fn(&[&Value], &[FieldValue]) -> bool + Send + Sync,
{
    fn arity(&self) -> Arity {
        self.arity
    }

    fn matches(&self, actual: &[&Value], args: &[FieldValue]) -> bool {
        (self.predicate)(actual, args)
    }
}

/// A registered custom leaf kind; identified by name
#[derive(Clone)]
pub struct CustomLeaf {
    name: String,
    predicate: Arc<dyn LeafPredicate>,
}

impl CustomLeaf {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn predicate(&self) -> &dyn LeafPredicate {
        self.predicate.as_ref()
    }
}

impl fmt::Debug for CustomLeaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomLeaf").field("name", &self.name).finish()
    }
}

impl PartialEq for CustomLeaf {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for CustomLeaf {}

impl Hash for CustomLeaf {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// The kind of a leaf node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LeafKind {
    Builtin(SpecKind),
    Custom(CustomLeaf),
}

impl LeafKind {
    pub fn name(&self) -> &str {
        match self {
            LeafKind::Builtin(kind) => kind.name(),
            LeafKind::Custom(custom) => custom.name(),
        }
    }

    pub fn arity(&self) -> Arity {
        match self {
            LeafKind::Builtin(kind) => match kind {
                SpecKind::IsNull | SpecKind::IsNotNull | SpecKind::True | SpecKind::False => {
                    Arity::Exactly(0)
                }
                SpecKind::Between => Arity::Exactly(2),
                SpecKind::In | SpecKind::NotIn => Arity::AtLeast(1),
                _ => Arity::Exactly(1),
            },
            LeafKind::Custom(custom) => custom.predicate.arity(),
        }
    }

    /// Whether arguments are converted to the attribute type
    ///
    /// Pattern kinds keep their raw text.
    pub fn requires_conversion(&self) -> bool {
        match self {
            LeafKind::Builtin(kind) => !matches!(
                kind,
                SpecKind::Like
                    | SpecKind::LikeIgnoreCase
                    | SpecKind::NotLike
                    | SpecKind::StartingWith
                    | SpecKind::EndingWith
                    | SpecKind::EqualIgnoreCase
                    | SpecKind::NotEqualIgnoreCase
            ),
            LeafKind::Custom(custom) => custom.predicate.requires_conversion(),
        }
    }

    /// Conversion target for the arguments of this kind on an attribute of type `attribute`
    pub fn argument_type(&self, attribute: &ValueType) -> ValueType {
        match self {
            LeafKind::Builtin(SpecKind::Null | SpecKind::NotNull) => ValueType::Boolean,
            _ if !self.requires_conversion() => ValueType::String,
            _ => attribute.clone(),
        }
    }
}

/// Registry of custom leaf kinds by name
#[derive(Clone, Default)]
pub struct LeafRegistry {
    leaves: HashMap<String, Arc<dyn LeafPredicate>>,
}

impl fmt::Debug for LeafRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.leaves.keys().collect();
        names.sort();
        f.debug_struct("LeafRegistry").field("leaves", &names).finish()
    }
}

impl LeafRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, predicate: Arc<dyn LeafPredicate>) {
        self.leaves.insert(name.into(), predicate);
    }

    /// Register a closure taking exactly `arity` arguments
    pub fn register_fn<F>(&mut self, name: impl Into<String>, arity: Arity, predicate: F)
    where
        F: Fn(&[&Value], &[FieldValue]) -> bool + Send + Sync + 'static,
    {
        self.register(name, Arc::new(FnPredicate { arity, predicate }));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.leaves.contains_key(name)
    }

    /// Resolve a declared kind to a leaf kind
    pub fn resolve(&self, kind: &SpecKind) -> ResolveResult<LeafKind> {
        match kind {
            SpecKind::Custom(name) => self
                .leaves
                .get(name)
                .map(|predicate| {
                    LeafKind::Custom(CustomLeaf {
                        name: name.clone(),
                        predicate: predicate.clone(),
                    })
                })
                .ok_or_else(|| ConfigError::UnknownSpecKind { name: name.clone() }.into()),
            builtin => Ok(LeafKind::Builtin(builtin.clone())),
        }
    }
}
