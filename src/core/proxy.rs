//! Identity-preserving wrapper
//!
//! [`ProxiedSpec`] carries the declared filter type alongside the composed
//! tree. Two wrappers are equal only when both the declared type and the
//! inner tree are equal, so a wrapper never equals its own root or a wrapper
//! of another type. Types sharing a name but declared differently count as
//! different types.

use super::error::{ConfigError, ResolveResult};
use super::filter_type::FilterType;
use super::spec::Spec;
use serde_json::Value;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A composed tree typed as its declared filter interface
#[derive(Clone)]
pub struct ProxiedSpec {
    declared: Arc<FilterType>,
    root: Option<Box<Spec>>,
}

impl ProxiedSpec {
    pub fn new(declared: Arc<FilterType>, root: Option<Spec>) -> Self {
        Self {
            declared,
            root: root.map(Box::new),
        }
    }

    pub fn declared(&self) -> &Arc<FilterType> {
        &self.declared
    }

    /// The composed tree; `None` when nothing resolved for this request
    pub fn root(&self) -> Option<&Spec> {
        self.root.as_deref()
    }

    pub fn into_root(self) -> Option<Spec> {
        self.root.map(|root| *root)
    }

    /// Whether the declared type is `name` or one of its super-types
    pub fn implements(&self, name: &str) -> bool {
        self.declared.is_subtype_of(name)
    }

    /// Call a method of the declared type
    ///
    /// Default methods registered on the type (or inherited) run first.
    /// `and`, `or` and `not` fall through to the composed tree; an empty
    /// tree is the identity for `and`/`or`.
    pub fn invoke(&self, method: &str, args: &[Spec]) -> ResolveResult<Spec> {
        if let Some(default_method) = self.declared.find_method(method) {
            tracing::trace!(filter_type = %self.declared.name(), method, "dispatching default method");
            return Ok(default_method(self, args));
        }

        let this = Spec::Proxy(self.clone());
        let unknown = || ConfigError::UnknownMethod {
            type_name: self.declared.name().to_string(),
            method: method.to_string(),
        };

        match (method, args) {
            ("and", [other]) => Ok(match self.root() {
                Some(_) => this.and(other.clone()),
                None => other.clone(),
            }),
            ("or", [other]) => Ok(match self.root() {
                Some(_) => this.or(other.clone()),
                None => other.clone(),
            }),
            ("not", []) => Ok(this.not()),
            _ => Err(unknown().into()),
        }
    }

    /// Evaluate against a record; an empty wrapper matches everything
    pub fn matches(&self, record: &Value) -> bool {
        Spec::Proxy(self.clone()).matches(record)
    }
}

impl PartialEq for ProxiedSpec {
    fn eq(&self, other: &Self) -> bool {
        self.declared == other.declared && self.root == other.root
    }
}

impl Eq for ProxiedSpec {}

impl Hash for ProxiedSpec {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.declared.name().hash(state);
        self.root.hash(state);
    }
}

impl fmt::Debug for ProxiedSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxiedSpec")
            .field("declared", &self.declared.name())
            .field("root", &self.root)
            .finish()
    }
}

impl fmt::Display for ProxiedSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.root {
            Some(root) => write!(f, "{}[{}]", self.declared.name(), root),
            None => write!(f, "{}[]", self.declared.name()),
        }
    }
}
