//! Filter node model
//!
//! A [`Spec`] is the executable form of the declarations: leaves bound to an
//! attribute path and converted arguments, combined into conjunctions and
//! disjunctions. Equality is structural and ordered, so two trees are equal
//! iff they have the same shape, kinds and arguments in the same order.

use super::convert::OnTypeMismatch;
use super::declaration::JoinType;
use super::field::FieldValue;
use super::filter_type::FilterInterface;
use super::leaf::LeafKind;
use super::proxy::ProxiedSpec;
use std::fmt;

/// A filter node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Spec {
    /// Terminal predicate on one attribute
    Leaf(Leaf),
    /// Matches nothing; produced when every value of a leaf was rejected
    EmptyResult(EmptyResult),
    /// All children hold
    Conjunction(Conjunction),
    /// At least one child holds
    Disjunction(Disjunction),
    /// Negation of the inner node
    Not(Box<Spec>),
    /// Join descriptor
    Join(Join),
    /// Eager fetch descriptor
    JoinFetch(JoinFetch),
    /// Tree wrapped in its declared filter type
    Proxy(ProxiedSpec),
}

impl Spec {
    /// AND of `children`: `None` when empty, the child itself when alone
    pub fn and_all(children: Vec<Spec>) -> Option<Spec> {
        match children.len() {
            0 => None,
            1 => children.into_iter().next(),
            _ => Some(Spec::Conjunction(Conjunction::new(children))),
        }
    }

    /// OR of `children`: `None` when empty, the child itself when alone
    pub fn or_any(children: Vec<Spec>) -> Option<Spec> {
        match children.len() {
            0 => None,
            1 => children.into_iter().next(),
            _ => Some(Spec::Disjunction(Disjunction::new(children))),
        }
    }

    /// Combine with `other` so that both must hold
    pub fn and(self, other: Spec) -> Spec {
        match self {
            Spec::Conjunction(mut conjunction) => {
                conjunction.children.push(other);
                Spec::Conjunction(conjunction)
            }
            this => Spec::Conjunction(Conjunction::new(vec![this, other])),
        }
    }

    /// Combine with `other` so that either may hold
    pub fn or(self, other: Spec) -> Spec {
        match self {
            Spec::Disjunction(mut disjunction) => {
                disjunction.children.push(other);
                Spec::Disjunction(disjunction)
            }
            this => Spec::Disjunction(Disjunction::new(vec![this, other])),
        }
    }

    /// Negate this node
    pub fn not(self) -> Spec {
        match self {
            Spec::Not(inner) => *inner,
            this => Spec::Not(Box::new(this)),
        }
    }

    /// Whether this node conforms to the filter type named `name`
    ///
    /// Only wrapped nodes carry a declared type.
    pub fn is_instance_of(&self, name: &str) -> bool {
        match self {
            Spec::Proxy(proxy) => proxy.implements(name),
            _ => false,
        }
    }

    /// Whether this node conforms to the filter interface `F`
    pub fn is<F: FilterInterface>(&self) -> bool {
        self.is_instance_of(F::filter_type().name())
    }

    pub fn as_proxy(&self) -> Option<&ProxiedSpec> {
        match self {
            Spec::Proxy(proxy) => Some(proxy),
            _ => None,
        }
    }

    /// The node with any wrapping removed
    pub fn unwrapped(&self) -> Option<&Spec> {
        match self {
            Spec::Proxy(proxy) => proxy.root(),
            other => Some(other),
        }
    }

    /// Every leaf in the tree, depth first
    pub fn leaves(&self) -> Vec<&Leaf> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Leaf>) {
        match self {
            Spec::Leaf(leaf) => out.push(leaf),
            Spec::Conjunction(c) => c.children.iter().for_each(|s| s.collect_leaves(out)),
            Spec::Disjunction(d) => d.children.iter().for_each(|s| s.collect_leaves(out)),
            Spec::Not(inner) => inner.collect_leaves(out),
            Spec::Proxy(proxy) => {
                if let Some(root) = proxy.root() {
                    root.collect_leaves(out);
                }
            }
            Spec::EmptyResult(_) | Spec::Join(_) | Spec::JoinFetch(_) => {}
        }
    }
}

impl fmt::Display for Spec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Spec::Leaf(leaf) => write!(f, "{}", leaf),
            Spec::EmptyResult(empty) => write!(f, "{}", empty),
            Spec::Conjunction(c) => write!(f, "{}", c),
            Spec::Disjunction(d) => write!(f, "{}", d),
            Spec::Not(inner) => write!(f, "Not[{}]", inner),
            Spec::Join(join) => write!(f, "{}", join),
            Spec::JoinFetch(fetch) => write!(f, "{}", fetch),
            Spec::Proxy(proxy) => write!(f, "{}", proxy),
        }
    }
}

fn write_children(f: &mut fmt::Formatter<'_>, name: &str, children: &[Spec]) -> fmt::Result {
    write!(f, "{}[", name)?;
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", child)?;
    }
    write!(f, "]")
}

/// Terminal predicate bound to one attribute path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Leaf {
    kind: LeafKind,
    path: String,
    args: Vec<FieldValue>,
    policy: OnTypeMismatch,
}

impl Leaf {
    pub fn new(kind: LeafKind, path: impl Into<String>, args: Vec<FieldValue>, policy: OnTypeMismatch) -> Self {
        Self {
            kind,
            path: path.into(),
            args,
            policy,
        }
    }

    pub fn kind(&self) -> &LeafKind {
        &self.kind
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn args(&self) -> &[FieldValue] {
        &self.args
    }

    pub fn policy(&self) -> OnTypeMismatch {
        self.policy
    }
}

impl fmt::Display for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[path={}, args=[", self.kind.name(), self.path)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", arg)?;
        }
        write!(f, "]]")
    }
}

/// Always-false node standing in for a leaf whose values were all rejected
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmptyResult {
    path: String,
    rejected: Vec<String>,
}

impl EmptyResult {
    pub fn new(path: impl Into<String>, rejected: Vec<String>) -> Self {
        Self {
            path: path.into(),
            rejected,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn rejected(&self) -> &[String] {
        &self.rejected
    }
}

impl fmt::Display for EmptyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EmptyResult[path={}, rejected={:?}]", self.path, self.rejected)
    }
}

/// Ordered AND of child nodes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Conjunction {
    children: Vec<Spec>,
}

impl Conjunction {
    pub fn new(children: Vec<Spec>) -> Self {
        Self { children }
    }

    pub fn children(&self) -> &[Spec] {
        &self.children
    }
}

impl fmt::Display for Conjunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_children(f, "Conjunction", &self.children)
    }
}

/// Ordered OR of child nodes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Disjunction {
    children: Vec<Spec>,
}

impl Disjunction {
    pub fn new(children: Vec<Spec>) -> Self {
        Self { children }
    }

    pub fn children(&self) -> &[Spec] {
        &self.children
    }
}

impl fmt::Display for Disjunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_children(f, "Disjunction", &self.children)
    }
}

/// Join of an association under an alias
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Join {
    pub path: String,
    pub alias: String,
    pub join_type: JoinType,
    pub distinct: bool,
}

impl fmt::Display for Join {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Join[path={}, alias={}, type={}, distinct={}]",
            self.path, self.alias, self.join_type, self.distinct
        )
    }
}

/// Eager fetch of associations
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JoinFetch {
    pub paths: Vec<String>,
    pub alias: Option<String>,
    pub join_type: JoinType,
    pub distinct: bool,
}

impl fmt::Display for JoinFetch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "JoinFetch[paths={:?}, type={}, distinct={}]",
            self.paths, self.join_type, self.distinct
        )
    }
}
