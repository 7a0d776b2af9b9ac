//! In-memory evaluation of filter trees against JSON records
//!
//! Paths are dot separated. Arrays met along a path are flattened, so a leaf
//! on `orders.itemName` holds when any order's item name satisfies it. Join
//! aliases declared anywhere in the tree are expanded before lookup; join
//! and fetch nodes themselves are neutral.

use super::declaration::SpecKind;
use super::field::FieldValue;
use super::leaf::LeafKind;
use super::spec::{Leaf, Spec};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;

impl Spec {
    /// Whether `record` satisfies this filter
    pub fn matches(&self, record: &Value) -> bool {
        let mut aliases = HashMap::new();
        self.collect_aliases(&mut aliases);
        self.matches_with(record, &aliases)
    }

    fn collect_aliases<'a>(&'a self, aliases: &mut HashMap<&'a str, &'a str>) {
        match self {
            Spec::Join(join) => {
                aliases.insert(join.alias.as_str(), join.path.as_str());
            }
            Spec::JoinFetch(fetch) => {
                if let (Some(alias), [path]) = (&fetch.alias, fetch.paths.as_slice()) {
                    aliases.insert(alias.as_str(), path.as_str());
                }
            }
            Spec::Conjunction(c) => c.children().iter().for_each(|s| s.collect_aliases(aliases)),
            Spec::Disjunction(d) => d.children().iter().for_each(|s| s.collect_aliases(aliases)),
            Spec::Not(inner) => inner.collect_aliases(aliases),
            Spec::Proxy(proxy) => {
                if let Some(root) = proxy.root() {
                    root.collect_aliases(aliases);
                }
            }
            Spec::Leaf(_) | Spec::EmptyResult(_) => {}
        }
    }

    fn matches_with(&self, record: &Value, aliases: &HashMap<&str, &str>) -> bool {
        match self {
            Spec::Leaf(leaf) => leaf_matches(leaf, &lookup(record, leaf.path(), aliases)),
            Spec::EmptyResult(_) => false,
            Spec::Conjunction(c) => c.children().iter().all(|s| s.matches_with(record, aliases)),
            Spec::Disjunction(d) => d.children().iter().any(|s| s.matches_with(record, aliases)),
            Spec::Not(inner) => !inner.matches_with(record, aliases),
            Spec::Join(_) | Spec::JoinFetch(_) => true,
            Spec::Proxy(proxy) => proxy
                .root()
                .is_none_or(|root| root.matches_with(record, aliases)),
        }
    }
}

/// Every value at `path`, with a leading join alias expanded
pub(crate) fn lookup<'a>(record: &'a Value, path: &str, aliases: &HashMap<&str, &str>) -> Vec<&'a Value> {
    let expanded = match path.split_once('.') {
        Some((head, rest)) => match aliases.get(head) {
            Some(target) => format!("{}.{}", target, rest),
            None => path.to_string(),
        },
        None => path.to_string(),
    };

    let mut current = vec![record];
    for segment in expanded.split('.') {
        let mut next = Vec::new();
        for value in current {
            collect_segment(value, segment, &mut next);
        }
        current = next;
    }

    let mut flattened = Vec::new();
    for value in current {
        match value {
            Value::Array(items) => flattened.extend(items.iter()),
            other => flattened.push(other),
        }
    }
    flattened
}

fn collect_segment<'a>(value: &'a Value, segment: &str, out: &mut Vec<&'a Value>) {
    match value {
        Value::Object(map) => {
            if let Some(child) = map.get(segment) {
                out.push(child);
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_segment(item, segment, out)),
        _ => {}
    }
}

fn leaf_matches(leaf: &Leaf, actual: &[&Value]) -> bool {
    let args = leaf.args();
    let present: Vec<&Value> = actual.iter().copied().filter(|v| !v.is_null()).collect();

    let kind = match leaf.kind() {
        LeafKind::Builtin(kind) => kind,
        LeafKind::Custom(custom) => return custom.predicate().matches(actual, args),
    };

    let compare = |arg: &FieldValue, pred: fn(Ordering) -> bool| {
        present
            .iter()
            .any(|v| arg.compare_json(v).is_some_and(|ord| pred(ord)))
    };

    match kind {
        SpecKind::Equal => args.first().is_some_and(|a| compare(a, Ordering::is_eq)),
        SpecKind::NotEqual => args.first().is_some_and(|a| compare(a, Ordering::is_ne)),
        SpecKind::EqualIgnoreCase => text_match(&present, args, true, |v, a| v == a),
        SpecKind::NotEqualIgnoreCase => text_match(&present, args, true, |v, a| v != a),
        SpecKind::Like => text_match(&present, args, false, |v, a| v.contains(a)),
        SpecKind::LikeIgnoreCase => text_match(&present, args, true, |v, a| v.contains(a)),
        SpecKind::NotLike => text_match(&present, args, false, |v, a| !v.contains(a)),
        SpecKind::StartingWith => text_match(&present, args, false, |v, a| v.starts_with(a)),
        SpecKind::EndingWith => text_match(&present, args, false, |v, a| v.ends_with(a)),
        SpecKind::In => args.iter().any(|a| compare(a, Ordering::is_eq)),
        SpecKind::NotIn => present
            .iter()
            .any(|v| args.iter().all(|a| a.compare_json(v) != Some(Ordering::Equal))),
        SpecKind::Null => match args.first().and_then(FieldValue::as_bool) {
            Some(true) => present.is_empty(),
            Some(false) => !present.is_empty(),
            None => false,
        },
        SpecKind::NotNull => match args.first().and_then(FieldValue::as_bool) {
            Some(true) => !present.is_empty(),
            Some(false) => present.is_empty(),
            None => false,
        },
        SpecKind::IsNull => present.is_empty(),
        SpecKind::IsNotNull => !present.is_empty(),
        // `arg cmp record` is reversed relative to the operator
        SpecKind::GreaterThan => args.first().is_some_and(|a| compare(a, Ordering::is_lt)),
        SpecKind::GreaterThanOrEqual => args.first().is_some_and(|a| compare(a, Ordering::is_le)),
        SpecKind::LessThan => args.first().is_some_and(|a| compare(a, Ordering::is_gt)),
        SpecKind::LessThanOrEqual => args.first().is_some_and(|a| compare(a, Ordering::is_ge)),
        SpecKind::Between => match args {
            [low, high] => present.iter().any(|v| {
                low.compare_json(v).is_some_and(Ordering::is_le)
                    && high.compare_json(v).is_some_and(Ordering::is_ge)
            }),
            _ => false,
        },
        SpecKind::True => present.iter().any(|v| v.as_bool() == Some(true)),
        SpecKind::False => present.iter().any(|v| v.as_bool() == Some(false)),
        SpecKind::Custom(_) => false,
    }
}

fn text_match(
    present: &[&Value],
    args: &[FieldValue],
    ignore_case: bool,
    pred: impl Fn(&str, &str) -> bool,
) -> bool {
    let Some(arg) = args.first() else {
        return false;
    };
    let needle = arg.to_string();
    present.iter().filter_map(|v| v.as_str()).any(|text| {
        if ignore_case {
            pred(&text.to_lowercase(), &needle.to_lowercase())
        } else {
            pred(text, &needle)
        }
    })
}
