//! Declarative filter descriptors
//!
//! A declaration describes one filter-producing rule attached to a filter type
//! or to an endpoint parameter: which attribute it constrains, where its values
//! come from, and how they are combined. Declarations are plain data; the
//! builders in [`crate::core::builders`] turn them into [`Spec`] nodes.
//!
//! # Example
//!
//! ```rust,ignore
//! let decl = SpecDecl::new("lastName", SpecKind::Like)
//!     .params(["name"])
//!     .default_val(["Simpson"]);
//! ```
//!
//! [`Spec`]: crate::core::spec::Spec

use super::convert::OnTypeMismatch;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What to do when a declaration names a path variable no template declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MissingPathVarPolicy {
    /// Fail the resolution
    #[default]
    Exception,
    /// Treat the variable as absent
    Ignore,
}

/// Join type used by join and join-fetch declarations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JoinType {
    #[default]
    Inner,
    Left,
    Right,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinType::Inner => write!(f, "INNER"),
            JoinType::Left => write!(f, "LEFT"),
            JoinType::Right => write!(f, "RIGHT"),
        }
    }
}

/// Leaf kind produced by a simple declaration
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SpecKind {
    Equal,
    EqualIgnoreCase,
    NotEqual,
    NotEqualIgnoreCase,
    Like,
    LikeIgnoreCase,
    NotLike,
    StartingWith,
    EndingWith,
    In,
    NotIn,
    /// `"true"` selects null attributes, `"false"` non-null ones
    Null,
    /// Inverse of [`SpecKind::Null`]
    NotNull,
    IsNull,
    IsNotNull,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Between,
    True,
    False,
    /// Leaf kind registered at runtime in a [`LeafRegistry`](crate::core::leaf::LeafRegistry)
    Custom(String),
}

const BUILTIN_KINDS: &[(&str, SpecKind)] = &[
    ("Equal", SpecKind::Equal),
    ("EqualIgnoreCase", SpecKind::EqualIgnoreCase),
    ("NotEqual", SpecKind::NotEqual),
    ("NotEqualIgnoreCase", SpecKind::NotEqualIgnoreCase),
    ("Like", SpecKind::Like),
    ("LikeIgnoreCase", SpecKind::LikeIgnoreCase),
    ("NotLike", SpecKind::NotLike),
    ("StartingWith", SpecKind::StartingWith),
    ("EndingWith", SpecKind::EndingWith),
    ("In", SpecKind::In),
    ("NotIn", SpecKind::NotIn),
    ("Null", SpecKind::Null),
    ("NotNull", SpecKind::NotNull),
    ("IsNull", SpecKind::IsNull),
    ("IsNotNull", SpecKind::IsNotNull),
    ("GreaterThan", SpecKind::GreaterThan),
    ("GreaterThanOrEqual", SpecKind::GreaterThanOrEqual),
    ("LessThan", SpecKind::LessThan),
    ("LessThanOrEqual", SpecKind::LessThanOrEqual),
    ("Between", SpecKind::Between),
    ("True", SpecKind::True),
    ("False", SpecKind::False),
];

impl SpecKind {
    pub fn name(&self) -> &str {
        if let SpecKind::Custom(name) = self {
            return name;
        }
        BUILTIN_KINDS
            .iter()
            .find(|(_, kind)| kind == self)
            .map(|(name, _)| *name)
            .unwrap_or("Unknown")
    }
}

impl fmt::Display for SpecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for SpecKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(BUILTIN_KINDS
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(_, kind)| kind.clone())
            .unwrap_or_else(|| SpecKind::Custom(s.to_string())))
    }
}

impl From<String> for SpecKind {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(kind) => kind,
            Err(never) => match never {},
        }
    }
}

impl From<SpecKind> for String {
    fn from(kind: SpecKind) -> Self {
        kind.name().to_string()
    }
}

fn default_distinct() -> bool {
    true
}

fn strings<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values.into_iter().map(Into::into).collect()
}

/// A simple (leaf) declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecDecl {
    /// Attribute path, possibly prefixed by a join alias (`o.itemName`)
    pub path: String,

    /// Query parameters providing the values
    #[serde(default)]
    pub params: Vec<String>,

    /// Path variables providing the values
    #[serde(default)]
    pub path_vars: Vec<String>,

    /// Request headers providing the values
    #[serde(default)]
    pub headers: Vec<String>,

    /// Dot-separated JSON body paths providing the values
    #[serde(default)]
    pub json_paths: Vec<String>,

    /// Splits each raw parameter/header value; `None` disables splitting
    #[serde(default)]
    pub param_separator: Option<char>,

    /// Leaf kind to build
    pub spec: SpecKind,

    /// Constant values; take precedence over every other source
    #[serde(default)]
    pub const_val: Vec<String>,

    /// Values used when no source provides one
    #[serde(default)]
    pub default_val: Vec<String>,

    /// Whether constant/default values are expressions
    #[serde(default)]
    pub value_in_spel: bool,

    /// Overrides the resolver-wide type mismatch policy
    #[serde(default)]
    pub on_type_mismatch: Option<OnTypeMismatch>,

    /// Overrides the resolver-wide missing path variable policy
    #[serde(default)]
    pub missing_path_var_policy: Option<MissingPathVarPolicy>,

    /// Conversion configuration (date/time formats)
    #[serde(default)]
    pub config: Vec<String>,
}

impl SpecDecl {
    pub fn new(path: impl Into<String>, spec: SpecKind) -> Self {
        Self {
            path: path.into(),
            params: Vec::new(),
            path_vars: Vec::new(),
            headers: Vec::new(),
            json_paths: Vec::new(),
            param_separator: None,
            spec,
            const_val: Vec::new(),
            default_val: Vec::new(),
            value_in_spel: false,
            on_type_mismatch: None,
            missing_path_var_policy: None,
            config: Vec::new(),
        }
    }

    pub fn params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params = strings(params);
        self
    }

    pub fn path_vars<I, S>(mut self, path_vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.path_vars = strings(path_vars);
        self
    }

    pub fn headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headers = strings(headers);
        self
    }

    pub fn json_paths<I, S>(mut self, json_paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.json_paths = strings(json_paths);
        self
    }

    pub fn separator(mut self, separator: char) -> Self {
        self.param_separator = Some(separator);
        self
    }

    pub fn const_val<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.const_val = strings(values);
        self
    }

    pub fn default_val<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_val = strings(values);
        self
    }

    /// Evaluate constant/default values as expressions
    pub fn in_spel(mut self) -> Self {
        self.value_in_spel = true;
        self
    }

    pub fn on_type_mismatch(mut self, policy: OnTypeMismatch) -> Self {
        self.on_type_mismatch = Some(policy);
        self
    }

    pub fn missing_path_var_policy(mut self, policy: MissingPathVarPolicy) -> Self {
        self.missing_path_var_policy = Some(policy);
        self
    }

    pub fn config<I, S>(mut self, config: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config = strings(config);
        self
    }

    /// Whether no explicit value source is configured
    pub fn has_no_source(&self) -> bool {
        self.params.is_empty()
            && self.path_vars.is_empty()
            && self.headers.is_empty()
            && self.json_paths.is_empty()
    }
}

/// All children must hold
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AndDecl {
    pub specs: Vec<SpecDecl>,
}

impl AndDecl {
    pub fn new(specs: Vec<SpecDecl>) -> Self {
        Self { specs }
    }
}

/// At least one child must hold
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrDecl {
    pub specs: Vec<SpecDecl>,
}

impl OrDecl {
    pub fn new(specs: Vec<SpecDecl>) -> Self {
        Self { specs }
    }
}

/// Conjunction of OR groups plus extra AND-ed leaves
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConjunctionDecl {
    #[serde(default)]
    pub or: Vec<OrDecl>,
    #[serde(default)]
    pub and: Vec<SpecDecl>,
}

impl ConjunctionDecl {
    pub fn new(or: Vec<OrDecl>, and: Vec<SpecDecl>) -> Self {
        Self { or, and }
    }
}

/// Disjunction of AND groups plus extra OR-ed leaves
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisjunctionDecl {
    #[serde(default)]
    pub and: Vec<AndDecl>,
    #[serde(default)]
    pub or: Vec<SpecDecl>,
}

impl DisjunctionDecl {
    pub fn new(and: Vec<AndDecl>, or: Vec<SpecDecl>) -> Self {
        Self { and, or }
    }
}

/// Joins an association under an alias
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinDecl {
    pub path: String,
    pub alias: String,
    #[serde(default)]
    pub join_type: JoinType,
    #[serde(default = "default_distinct")]
    pub distinct: bool,
}

impl JoinDecl {
    pub fn new(path: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            alias: alias.into(),
            join_type: JoinType::Inner,
            distinct: true,
        }
    }

    pub fn join_type(mut self, join_type: JoinType) -> Self {
        self.join_type = join_type;
        self
    }

    pub fn distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }
}

/// Several joins declared on the same type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JoinsDecl {
    pub joins: Vec<JoinDecl>,
}

/// Eagerly fetches associations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinFetchDecl {
    pub paths: Vec<String>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default = "default_fetch_join_type")]
    pub join_type: JoinType,
    #[serde(default = "default_distinct")]
    pub distinct: bool,
}

fn default_fetch_join_type() -> JoinType {
    JoinType::Left
}

impl JoinFetchDecl {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: strings(paths),
            alias: None,
            join_type: JoinType::Left,
            distinct: true,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn join_type(mut self, join_type: JoinType) -> Self {
        self.join_type = join_type;
        self
    }

    /// Count queries need `distinct(false)`
    pub fn distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }
}

/// Several join fetches declared on the same type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepeatedJoinFetchDecl {
    pub fetches: Vec<JoinFetchDecl>,
}

/// Any filter-producing declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Declaration {
    Spec(SpecDecl),
    And(AndDecl),
    Or(OrDecl),
    Conjunction(ConjunctionDecl),
    Disjunction(DisjunctionDecl),
    Join(JoinDecl),
    Joins(JoinsDecl),
    JoinFetch(JoinFetchDecl),
    RepeatedJoinFetch(RepeatedJoinFetchDecl),
}

impl Declaration {
    /// Name of the declaration kind, for logging
    pub fn kind_name(&self) -> &'static str {
        match self {
            Declaration::Spec(_) => "spec",
            Declaration::And(_) => "and",
            Declaration::Or(_) => "or",
            Declaration::Conjunction(_) => "conjunction",
            Declaration::Disjunction(_) => "disjunction",
            Declaration::Join(_) => "join",
            Declaration::Joins(_) => "joins",
            Declaration::JoinFetch(_) => "join_fetch",
            Declaration::RepeatedJoinFetch(_) => "repeated_join_fetch",
        }
    }

    /// Every leaf declaration nested in this one
    pub fn leaves(&self) -> Vec<&SpecDecl> {
        match self {
            Declaration::Spec(spec) => vec![spec],
            Declaration::And(and) => and.specs.iter().collect(),
            Declaration::Or(or) => or.specs.iter().collect(),
            Declaration::Conjunction(c) => c
                .or
                .iter()
                .flat_map(|or| or.specs.iter())
                .chain(c.and.iter())
                .collect(),
            Declaration::Disjunction(d) => d
                .and
                .iter()
                .flat_map(|and| and.specs.iter())
                .chain(d.or.iter())
                .collect(),
            Declaration::Join(_)
            | Declaration::Joins(_)
            | Declaration::JoinFetch(_)
            | Declaration::RepeatedJoinFetch(_) => Vec::new(),
        }
    }

    /// Whether resolving this declaration needs the JSON body
    pub fn requires_body(&self) -> bool {
        self.leaves().iter().any(|spec| !spec.json_paths.is_empty())
    }

    /// Whether resolving this declaration may look into a JSON body
    ///
    /// True for explicit JSON paths and for source-less leaves, which fall
    /// back to the body when the request carries one.
    pub fn reads_body(&self) -> bool {
        self.leaves().iter().any(|spec| {
            !spec.json_paths.is_empty() || (spec.has_no_source() && spec.const_val.is_empty())
        })
    }

    /// `(alias, path)` pairs introduced by joins
    pub fn aliases(&self) -> Vec<(&str, &str)> {
        match self {
            Declaration::Join(join) => vec![(join.alias.as_str(), join.path.as_str())],
            Declaration::Joins(joins) => joins
                .joins
                .iter()
                .map(|j| (j.alias.as_str(), j.path.as_str()))
                .collect(),
            Declaration::JoinFetch(fetch) => fetch_aliases(fetch),
            Declaration::RepeatedJoinFetch(repeated) => {
                repeated.fetches.iter().flat_map(fetch_aliases).collect()
            }
            _ => Vec::new(),
        }
    }
}

fn fetch_aliases(fetch: &JoinFetchDecl) -> Vec<(&str, &str)> {
    match (&fetch.alias, fetch.paths.as_slice()) {
        (Some(alias), [path]) => vec![(alias.as_str(), path.as_str())],
        _ => Vec::new(),
    }
}

impl From<SpecDecl> for Declaration {
    fn from(decl: SpecDecl) -> Self {
        Declaration::Spec(decl)
    }
}

impl From<AndDecl> for Declaration {
    fn from(decl: AndDecl) -> Self {
        Declaration::And(decl)
    }
}

impl From<OrDecl> for Declaration {
    fn from(decl: OrDecl) -> Self {
        Declaration::Or(decl)
    }
}

impl From<ConjunctionDecl> for Declaration {
    fn from(decl: ConjunctionDecl) -> Self {
        Declaration::Conjunction(decl)
    }
}

impl From<DisjunctionDecl> for Declaration {
    fn from(decl: DisjunctionDecl) -> Self {
        Declaration::Disjunction(decl)
    }
}

impl From<JoinDecl> for Declaration {
    fn from(decl: JoinDecl) -> Self {
        Declaration::Join(decl)
    }
}

impl From<JoinFetchDecl> for Declaration {
    fn from(decl: JoinFetchDecl) -> Self {
        Declaration::JoinFetch(decl)
    }
}
