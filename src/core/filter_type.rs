//! Filter type descriptors
//!
//! A [`FilterType`] plays the role of a filter interface: it has a name, may
//! extend other filter types, carries the declarations attached directly to it
//! and the entity schema used to convert raw values. Default methods are kept
//! in a small dispatch table so that a wrapped specification can still run
//! them against the composed tree.

use super::declaration::{Declaration, JoinsDecl, RepeatedJoinFetchDecl};
use super::error::{ConfigError, ResolveResult};
use super::field::ValueType;
use super::proxy::ProxiedSpec;
use super::spec::Spec;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A default method callable on a wrapped specification
pub type DefaultMethod = Arc<dyn Fn(&ProxiedSpec, &[Spec]) -> Spec + Send + Sync>;

/// Attribute types of the filtered entity, keyed by dot path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntitySchema {
    attributes: IndexMap<String, ValueType>,
}

impl EntitySchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the type of an attribute
    pub fn attribute(mut self, path: impl Into<String>, value_type: ValueType) -> Self {
        self.attributes.insert(path.into(), value_type);
        self
    }

    /// Type of the attribute at `path`; undeclared attributes are strings
    pub fn attribute_type(&self, path: &str) -> ValueType {
        self.attributes
            .get(path)
            .cloned()
            .unwrap_or(ValueType::String)
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Add the attributes of `other` that this schema does not declare yet
    pub fn merge_missing(&mut self, other: &EntitySchema) {
        for (path, value_type) in &other.attributes {
            self.attributes
                .entry(path.clone())
                .or_insert_with(|| value_type.clone());
        }
    }
}

/// A named filter interface
#[derive(Clone)]
pub struct FilterType {
    name: String,
    parents: Vec<Arc<FilterType>>,
    declarations: Vec<Declaration>,
    schema: EntitySchema,
    methods: IndexMap<String, DefaultMethod>,
}

impl fmt::Debug for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterType")
            .field("name", &self.name)
            .field(
                "parents",
                &self.parents.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field("declarations", &self.declarations.len())
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Two filter types are the same type when they share a name, declarations,
/// schema, method names and super-types. Method bodies are not compared.
impl PartialEq for FilterType {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
            || (self.name == other.name
                && self.declarations == other.declarations
                && self.schema == other.schema
                && self.methods.keys().eq(other.methods.keys())
                && self.parents.len() == other.parents.len()
                && self
                    .parents
                    .iter()
                    .zip(&other.parents)
                    .all(|(a, b)| Arc::ptr_eq(a, b) || a == b))
    }
}

impl Eq for FilterType {}

impl Hash for FilterType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl FilterType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parents: Vec::new(),
            declarations: Vec::new(),
            schema: EntitySchema::default(),
            methods: IndexMap::new(),
        }
    }

    /// Add a super-type
    pub fn extends(mut self, parent: Arc<FilterType>) -> Self {
        self.parents.push(parent);
        self
    }

    /// Attach a declaration
    ///
    /// A second join (or join fetch) folds into the repeated form, so that all
    /// joins of one type are built together.
    pub fn with(mut self, declaration: impl Into<Declaration>) -> Self {
        self.push_declaration(declaration.into());
        self
    }

    pub fn schema(mut self, schema: EntitySchema) -> Self {
        self.schema = schema;
        self
    }

    /// Register a default method
    pub fn method<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&ProxiedSpec, &[Spec]) -> Spec + Send + Sync + 'static,
    {
        self.methods.insert(name.into(), Arc::new(method));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parents(&self) -> &[Arc<FilterType>] {
        &self.parents
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn entity_schema(&self) -> &EntitySchema {
        &self.schema
    }

    /// Whether this type is `name` or extends it, directly or not
    pub fn is_subtype_of(&self, name: &str) -> bool {
        self.name == name || self.parents.iter().any(|p| p.is_subtype_of(name))
    }

    /// Find a default method on this type or its ancestors, nearest first
    pub fn find_method(&self, name: &str) -> Option<&DefaultMethod> {
        self.methods
            .get(name)
            .or_else(|| self.parents.iter().find_map(|p| p.find_method(name)))
    }

    fn push_declaration(&mut self, declaration: Declaration) {
        match declaration {
            Declaration::Join(join) => {
                let existing = self.declarations.iter_mut().find(|d| {
                    matches!(d, Declaration::Join(_) | Declaration::Joins(_))
                });
                match existing {
                    Some(Declaration::Joins(joins)) => joins.joins.push(join),
                    Some(slot) => {
                        if let Declaration::Join(first) = slot.clone() {
                            *slot = Declaration::Joins(JoinsDecl {
                                joins: vec![first, join],
                            });
                        }
                    }
                    None => self.declarations.push(Declaration::Join(join)),
                }
            }
            Declaration::JoinFetch(fetch) => {
                let existing = self.declarations.iter_mut().find(|d| {
                    matches!(
                        d,
                        Declaration::JoinFetch(_) | Declaration::RepeatedJoinFetch(_)
                    )
                });
                match existing {
                    Some(Declaration::RepeatedJoinFetch(repeated)) => repeated.fetches.push(fetch),
                    Some(slot) => {
                        if let Declaration::JoinFetch(first) = slot.clone() {
                            *slot = Declaration::RepeatedJoinFetch(RepeatedJoinFetchDecl {
                                fetches: vec![first, fetch],
                            });
                        }
                    }
                    None => self.declarations.push(Declaration::JoinFetch(fetch)),
                }
            }
            other => self.declarations.push(other),
        }
    }
}

/// Binds a Rust marker type to its filter type descriptor
///
/// # Example
/// ```rust,ignore
/// struct CustomerFilter;
///
/// impl FilterInterface for CustomerFilter {
///     fn filter_type() -> Arc<FilterType> {
///         Arc::new(
///             FilterType::new("CustomerFilter")
///                 .with(SpecDecl::new("lastName", SpecKind::Like).params(["name"])),
///         )
///     }
/// }
/// ```
pub trait FilterInterface: Send + Sync + 'static {
    fn filter_type() -> Arc<FilterType>;
}

/// Declarative definition of a filter type, as found in configuration files
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterTypeConfig {
    pub name: String,

    #[serde(default)]
    pub extends: Vec<String>,

    #[serde(default)]
    pub declarations: Vec<Declaration>,

    #[serde(default)]
    pub schema: EntitySchema,
}

/// Named filter types
#[derive(Debug, Clone, Default)]
pub struct FilterRegistry {
    types: HashMap<String, Arc<FilterType>>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a filter type under its name
    pub fn register(&mut self, filter_type: Arc<FilterType>) {
        self.types
            .insert(filter_type.name().to_string(), filter_type);
    }

    pub fn get(&self, name: &str) -> Option<Arc<FilterType>> {
        self.types.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.types.keys().map(|s| s.as_str()).collect()
    }

    /// Registry holding the filter types built from `definitions`
    pub fn from_config(definitions: &[FilterTypeConfig]) -> ResolveResult<Self> {
        let mut registry = Self::new();
        registry.load(definitions)?;
        Ok(registry)
    }

    /// Build filter types from their configured definitions
    ///
    /// Parents are resolved by name among the definitions and the types already
    /// registered. Unknown parents and inheritance cycles are rejected.
    pub fn load(&mut self, definitions: &[FilterTypeConfig]) -> ResolveResult<()> {
        let by_name: HashMap<&str, &FilterTypeConfig> =
            definitions.iter().map(|d| (d.name.as_str(), d)).collect();

        for definition in definitions {
            let mut visiting = HashSet::new();
            self.build(definition, &by_name, &mut visiting)?;
        }
        Ok(())
    }

    fn build(
        &mut self,
        definition: &FilterTypeConfig,
        by_name: &HashMap<&str, &FilterTypeConfig>,
        visiting: &mut HashSet<String>,
    ) -> ResolveResult<Arc<FilterType>> {
        if let Some(built) = self.types.get(&definition.name) {
            return Ok(built.clone());
        }
        if !visiting.insert(definition.name.clone()) {
            return Err(ConfigError::CyclicInheritance {
                name: definition.name.clone(),
            }
            .into());
        }

        let mut filter_type =
            FilterType::new(definition.name.clone()).schema(definition.schema.clone());
        for parent_name in &definition.extends {
            let parent = match by_name.get(parent_name.as_str()) {
                Some(parent_definition) => self.build(parent_definition, by_name, visiting)?,
                None => self.get(parent_name).ok_or_else(|| ConfigError::UnknownFilterType {
                    name: parent_name.clone(),
                })?,
            };
            filter_type = filter_type.extends(parent);
        }
        for declaration in &definition.declarations {
            filter_type = filter_type.with(declaration.clone());
        }

        visiting.remove(&definition.name);
        let built = Arc::new(filter_type);
        self.register(built.clone());
        Ok(built)
    }
}
