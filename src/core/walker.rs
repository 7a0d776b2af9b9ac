//! Declaration tree walker
//!
//! Collects every declaration reachable from a filter type through its
//! super-types, depth first, visiting each type once. A common ancestor
//! reached along two paths therefore contributes its declarations only once.
//! Types are told apart by their definition, not only by their name, so two
//! unrelated types that happen to share a name are both visited.

use super::declaration::Declaration;
use super::error::{ResolveError, ResolveResult};
use super::filter_type::{EntitySchema, FilterType};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

/// Owner recorded for declarations attached to the parameter itself
pub const PARAMETER_OWNER: &str = "<parameter>";

/// A declaration and the type it is attached to
#[derive(Debug, Clone, PartialEq)]
pub struct DeclarationEntry {
    pub declaration: Declaration,
    pub owner: String,
}

/// Flat, order-stable list of the declarations of a filter type
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeclarationTree {
    entries: Vec<DeclarationEntry>,
    schema: EntitySchema,
}

impl DeclarationTree {
    /// Walk `root` and its super-types
    pub fn walk(root: &FilterType) -> Self {
        let mut tree = Self::default();
        let mut visited = HashSet::new();
        tree.visit(root, &mut visited);
        tracing::trace!(
            filter_type = %root.name(),
            declarations = tree.entries.len(),
            types = visited.len(),
            "walked declaration tree"
        );
        tree
    }

    fn visit<'a>(&mut self, ty: &'a FilterType, visited: &mut HashSet<&'a FilterType>) {
        if !visited.insert(ty) {
            return;
        }
        self.entries
            .extend(ty.declarations().iter().map(|declaration| DeclarationEntry {
                declaration: declaration.clone(),
                owner: ty.name().to_string(),
            }));
        self.schema.merge_missing(ty.entity_schema());
        for parent in ty.parents() {
            self.visit(parent, visited);
        }
    }

    /// Parameter-level declarations followed by the type-level tree, if any
    pub fn for_parameter(parameter: &[Declaration], type_tree: Option<&DeclarationTree>) -> Self {
        let mut tree = Self {
            entries: parameter
                .iter()
                .map(|declaration| DeclarationEntry {
                    declaration: declaration.clone(),
                    owner: PARAMETER_OWNER.to_string(),
                })
                .collect(),
            schema: EntitySchema::default(),
        };
        if let Some(type_tree) = type_tree {
            tree.entries.extend(type_tree.entries.iter().cloned());
            tree.schema.merge_missing(&type_tree.schema);
        }
        tree
    }

    /// Use `schema` for attributes not typed by the walked types
    pub fn with_schema(mut self, schema: &EntitySchema) -> Self {
        self.schema.merge_missing(schema);
        self
    }

    pub fn entries(&self) -> &[DeclarationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any leaf needs the JSON body
    pub fn requires_body(&self) -> bool {
        self.entries.iter().any(|e| e.declaration.requires_body())
    }

    /// Whether any leaf may look into a JSON body
    pub fn reads_body(&self) -> bool {
        self.entries.iter().any(|e| e.declaration.reads_body())
    }

    /// `(alias, path)` pairs declared by joins in the tree
    pub fn aliases(&self) -> Vec<(&str, &str)> {
        self.entries
            .iter()
            .flat_map(|e| e.declaration.aliases())
            .collect()
    }

    /// Merged schema; the type nearest to the root wins on conflicts
    pub fn schema(&self) -> &EntitySchema {
        &self.schema
    }

    pub fn count_owned_by(&self, owner: &str) -> usize {
        self.entries.iter().filter(|e| e.owner == owner).count()
    }
}

/// Memoized type-level trees
///
/// Entries are grouped by name and matched on the full type definition.
#[derive(Debug, Default)]
pub struct DeclarationCache {
    trees: RwLock<HashMap<String, Vec<(FilterType, Arc<DeclarationTree>)>>>,
}

impl DeclarationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached tree for `ty`, walking it on first use
    pub fn get_or_walk(&self, ty: &FilterType) -> ResolveResult<Arc<DeclarationTree>> {
        {
            let trees = self
                .trees
                .read()
                .map_err(|e| ResolveError::Internal(format!("Failed to acquire read lock: {}", e)))?;
            if let Some(tree) = Self::find(&trees, ty) {
                return Ok(tree);
            }
        }

        let tree = Arc::new(DeclarationTree::walk(ty));
        let mut trees = self
            .trees
            .write()
            .map_err(|e| ResolveError::Internal(format!("Failed to acquire write lock: {}", e)))?;
        if let Some(existing) = Self::find(&trees, ty) {
            return Ok(existing);
        }
        trees
            .entry(ty.name().to_string())
            .or_default()
            .push((ty.clone(), tree.clone()));
        Ok(tree)
    }

    fn find(
        trees: &HashMap<String, Vec<(FilterType, Arc<DeclarationTree>)>>,
        ty: &FilterType,
    ) -> Option<Arc<DeclarationTree>> {
        trees
            .get(ty.name())?
            .iter()
            .find(|(cached, _)| cached == ty)
            .map(|(_, tree)| tree.clone())
    }

    pub fn len(&self) -> usize {
        self.trees
            .read()
            .map(|trees| trees.values().map(Vec::len).sum())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
