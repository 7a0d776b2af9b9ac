//! Leaf and composite builders
//!
//! Every declaration type implements [`BuildNode`]. Building reads the
//! processing context and converts values but never mutates anything; a
//! builder returning `Ok(None)` contributes nothing to its parent.

use super::convert::{Converter, FallbackConverter, OnTypeMismatch};
use super::declaration::{
    AndDecl, ConjunctionDecl, Declaration, DisjunctionDecl, JoinDecl, JoinFetchDecl, JoinsDecl,
    MissingPathVarPolicy, OrDecl, RepeatedJoinFetchDecl, SpecDecl,
};
use super::error::{RequestError, ResolveResult};
use super::field::{FieldValue, ValueType};
use super::filter_type::EntitySchema;
use super::leaf::LeafRegistry;
use super::spec::{EmptyResult, Join, JoinFetch, Leaf, Spec};
use crate::context::{ExpressionEvaluator, ProcessingContext};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Everything a builder may read while building one request's tree
pub struct BuildContext<'a> {
    context: &'a dyn ProcessingContext,
    schema: &'a EntitySchema,
    leaves: &'a LeafRegistry,
    aliases: HashMap<&'a str, &'a str>,
    evaluator: Option<&'a dyn ExpressionEvaluator>,
    fallback: Option<Arc<dyn FallbackConverter>>,
    on_type_mismatch: OnTypeMismatch,
    missing_path_var_policy: MissingPathVarPolicy,
}

impl fmt::Debug for BuildContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildContext")
            .field("schema", &self.schema)
            .field("aliases", &self.aliases)
            .field("expressions", &self.evaluator.is_some())
            .field("on_type_mismatch", &self.on_type_mismatch)
            .field("missing_path_var_policy", &self.missing_path_var_policy)
            .finish()
    }
}

impl<'a> BuildContext<'a> {
    pub fn new(context: &'a dyn ProcessingContext, schema: &'a EntitySchema, leaves: &'a LeafRegistry) -> Self {
        Self {
            context,
            schema,
            leaves,
            aliases: HashMap::new(),
            evaluator: None,
            fallback: None,
            on_type_mismatch: OnTypeMismatch::default(),
            missing_path_var_policy: MissingPathVarPolicy::default(),
        }
    }

    /// Join aliases, as `(alias, path)` pairs
    pub fn with_aliases(mut self, aliases: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        self.aliases.extend(aliases);
        self
    }

    /// Evaluate literals marked as expressions; without one they stay verbatim
    pub fn with_evaluator(mut self, evaluator: Option<&'a dyn ExpressionEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn with_fallback(mut self, fallback: Option<Arc<dyn FallbackConverter>>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Policies for declarations that leave them unset
    pub fn with_defaults(mut self, on_type_mismatch: OnTypeMismatch, missing: MissingPathVarPolicy) -> Self {
        self.on_type_mismatch = on_type_mismatch;
        self.missing_path_var_policy = missing;
        self
    }

    /// Attribute type of `path`, with a leading join alias expanded
    pub fn attribute_type(&self, path: &str) -> ValueType {
        if let Some((head, rest)) = path.split_once('.') {
            if let Some(target) = self.aliases.get(head) {
                return self.schema.attribute_type(&format!("{}.{}", target, rest));
            }
        }
        self.schema.attribute_type(path)
    }

    fn literals(&self, raw: &[String], in_expression: bool) -> ResolveResult<Vec<String>> {
        match (in_expression, self.evaluator) {
            (true, Some(evaluator)) => raw.iter().map(|value| evaluator.evaluate(value)).collect(),
            _ => Ok(raw.to_vec()),
        }
    }

    /// Raw values for a leaf: constants, then the declared sources, then defaults
    fn raw_values(&self, decl: &SpecDecl) -> ResolveResult<Option<Vec<String>>> {
        if !decl.const_val.is_empty() {
            return self.literals(&decl.const_val, decl.value_in_spel).map(Some);
        }

        let separator = decl.param_separator;
        let mut values = Vec::new();
        if decl.has_no_source() {
            values.extend(self.context.fallback_values(&decl.path, separator)?.unwrap_or_default());
        } else {
            for name in &decl.params {
                values.extend(self.context.param_values(name, separator).unwrap_or_default());
            }
            let missing = decl.missing_path_var_policy.unwrap_or(self.missing_path_var_policy);
            for name in &decl.path_vars {
                values.extend(self.context.path_variable(name, missing)?);
            }
            for name in &decl.headers {
                values.extend(self.context.header(name, separator).unwrap_or_default());
            }
            for path in &decl.json_paths {
                values.extend(self.context.body_values(path)?.unwrap_or_default());
            }
        }

        values.retain(|value| !value.trim().is_empty());
        if !values.is_empty() {
            return Ok(Some(values));
        }
        if !decl.default_val.is_empty() {
            return self.literals(&decl.default_val, decl.value_in_spel).map(Some);
        }
        Ok(None)
    }
}

/// Builds a filter node from a declaration
pub trait BuildNode {
    fn build(&self, cx: &BuildContext<'_>) -> ResolveResult<Option<Spec>>;
}

impl BuildNode for SpecDecl {
    fn build(&self, cx: &BuildContext<'_>) -> ResolveResult<Option<Spec>> {
        let kind = cx.leaves.resolve(&self.spec)?;
        let arity = kind.arity();
        let policy = self.on_type_mismatch.unwrap_or(cx.on_type_mismatch);

        let raw = if arity.is_nullary() && self.has_no_source() && self.const_val.is_empty() {
            Vec::new()
        } else {
            match cx.raw_values(self)? {
                Some(raw) => raw,
                None => return Ok(None),
            }
        };
        let raw = if arity.is_nullary() { Vec::new() } else { raw };

        let (args, rejected) = if kind.requires_conversion() {
            let target = kind.argument_type(&cx.attribute_type(&self.path));
            let converter = Converter::new(policy)
                .with_formats(self.config.clone())
                .with_fallback(cx.fallback.clone());
            let converted = converter.convert_all(&raw, &target)?;
            (converted.values, converted.rejected)
        } else {
            (raw.into_iter().map(FieldValue::String).collect(), Vec::new())
        };

        if !rejected.is_empty() {
            tracing::warn!(
                path = %self.path,
                spec = %kind.name(),
                rejected = ?rejected,
                "dropping values that do not convert to the attribute type"
            );
        }

        if !arity.accepts(args.len()) {
            if !rejected.is_empty() {
                return Ok(Some(Spec::EmptyResult(EmptyResult::new(&self.path, rejected))));
            }
            return Err(RequestError::WrongArgumentCount {
                kind: kind.name().to_string(),
                path: self.path.clone(),
                expected: arity.to_string(),
                actual: args.len(),
            }
            .into());
        }

        Ok(Some(Spec::Leaf(Leaf::new(kind, &self.path, args, policy))))
    }
}

fn build_all<'d, T: BuildNode + 'd>(
    decls: impl IntoIterator<Item = &'d T>,
    cx: &BuildContext<'_>,
) -> ResolveResult<Vec<Spec>> {
    let mut built = Vec::new();
    for decl in decls {
        if let Some(spec) = decl.build(cx)? {
            built.push(spec);
        }
    }
    Ok(built)
}

impl BuildNode for AndDecl {
    fn build(&self, cx: &BuildContext<'_>) -> ResolveResult<Option<Spec>> {
        Ok(Spec::and_all(build_all(&self.specs, cx)?))
    }
}

impl BuildNode for OrDecl {
    fn build(&self, cx: &BuildContext<'_>) -> ResolveResult<Option<Spec>> {
        Ok(Spec::or_any(build_all(&self.specs, cx)?))
    }
}

impl BuildNode for ConjunctionDecl {
    fn build(&self, cx: &BuildContext<'_>) -> ResolveResult<Option<Spec>> {
        let mut children = build_all(&self.or, cx)?;
        children.extend(build_all(&self.and, cx)?);
        Ok(Spec::and_all(children))
    }
}

impl BuildNode for DisjunctionDecl {
    fn build(&self, cx: &BuildContext<'_>) -> ResolveResult<Option<Spec>> {
        let mut children = build_all(&self.and, cx)?;
        children.extend(build_all(&self.or, cx)?);
        Ok(Spec::or_any(children))
    }
}

impl BuildNode for JoinDecl {
    fn build(&self, _cx: &BuildContext<'_>) -> ResolveResult<Option<Spec>> {
        Ok(Some(Spec::Join(Join {
            path: self.path.clone(),
            alias: self.alias.clone(),
            join_type: self.join_type,
            distinct: self.distinct,
        })))
    }
}

impl BuildNode for JoinsDecl {
    fn build(&self, cx: &BuildContext<'_>) -> ResolveResult<Option<Spec>> {
        Ok(Spec::and_all(build_all(&self.joins, cx)?))
    }
}

impl BuildNode for JoinFetchDecl {
    fn build(&self, _cx: &BuildContext<'_>) -> ResolveResult<Option<Spec>> {
        Ok(Some(Spec::JoinFetch(JoinFetch {
            paths: self.paths.clone(),
            alias: self.alias.clone(),
            join_type: self.join_type,
            distinct: self.distinct,
        })))
    }
}

impl BuildNode for RepeatedJoinFetchDecl {
    fn build(&self, cx: &BuildContext<'_>) -> ResolveResult<Option<Spec>> {
        Ok(Spec::and_all(build_all(&self.fetches, cx)?))
    }
}

impl BuildNode for Declaration {
    fn build(&self, cx: &BuildContext<'_>) -> ResolveResult<Option<Spec>> {
        match self {
            Declaration::Spec(decl) => decl.build(cx),
            Declaration::And(decl) => decl.build(cx),
            Declaration::Or(decl) => decl.build(cx),
            Declaration::Conjunction(decl) => decl.build(cx),
            Declaration::Disjunction(decl) => decl.build(cx),
            Declaration::Join(decl) => decl.build(cx),
            Declaration::Joins(decl) => decl.build(cx),
            Declaration::JoinFetch(decl) => decl.build(cx),
            Declaration::RepeatedJoinFetch(decl) => decl.build(cx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{TeraExpressionEvaluator, WebRequestContext};
    use crate::core::declaration::SpecKind;
    use crate::core::error::{ConversionError, ResolveError};
    use serde_json::json;

    fn schema() -> EntitySchema {
        EntitySchema::new()
            .attribute("gold", ValueType::Long)
            .attribute("gender", ValueType::Enum(vec!["MALE".into(), "FEMALE".into()]))
            .attribute("orders.itemName", ValueType::String)
    }

    fn build(decl: impl Into<Declaration>, context: &WebRequestContext) -> ResolveResult<Option<Spec>> {
        let schema = schema();
        let leaves = LeafRegistry::new();
        let cx = BuildContext::new(context, &schema, &leaves);
        decl.into().build(&cx)
    }

    #[test]
    fn test_leaf_from_param() {
        let context = WebRequestContext::new("/").param("lastName", "Simpson");
        let spec = build(SpecDecl::new("lastName", SpecKind::Equal).params(["lastName"]), &context)
            .unwrap()
            .unwrap();
        assert!(spec.matches(&json!({"lastName": "Simpson"})));
    }

    #[test]
    fn test_missing_value_contributes_nothing() {
        let context = WebRequestContext::new("/");
        let built = build(SpecDecl::new("lastName", SpecKind::Equal).params(["lastName"]), &context).unwrap();
        assert_eq!(built, None);
    }

    #[test]
    fn test_blank_value_is_no_value() {
        let context = WebRequestContext::new("/").param("lastName", "  ");
        let built = build(SpecDecl::new("lastName", SpecKind::Equal).params(["lastName"]), &context).unwrap();
        assert_eq!(built, None);
    }

    #[test]
    fn test_constant_beats_default_and_params() {
        let context = WebRequestContext::new("/").param("lastName", "Flanders");
        let decl = SpecDecl::new("lastName", SpecKind::Equal)
            .params(["lastName"])
            .const_val(["Simpson"])
            .default_val(["Szyslak"]);
        let spec = build(decl, &context).unwrap().unwrap();
        assert_eq!(spec.leaves()[0].args(), &[FieldValue::from("Simpson")]);
    }

    #[test]
    fn test_default_used_when_missing() {
        let context = WebRequestContext::new("/");
        let decl = SpecDecl::new("gold", SpecKind::GreaterThan)
            .params(["minGold"])
            .default_val(["10"]);
        let spec = build(decl, &context).unwrap().unwrap();
        assert_eq!(spec.leaves()[0].args(), &[FieldValue::Integer(10)]);
    }

    #[test]
    fn test_nullary_leaf_without_sources() {
        let context = WebRequestContext::new("/");
        let spec = build(SpecDecl::new("nickName", SpecKind::IsNull), &context)
            .unwrap()
            .unwrap();
        assert!(spec.leaves()[0].args().is_empty());
    }

    #[test]
    fn test_fallback_to_attribute_name() {
        let context = WebRequestContext::new("/").param("gold", "5");
        let spec = build(SpecDecl::new("gold", SpecKind::Equal), &context)
            .unwrap()
            .unwrap();
        assert_eq!(spec.leaves()[0].args(), &[FieldValue::Integer(5)]);
    }

    #[test]
    fn test_all_rejected_becomes_empty_result() {
        let context = WebRequestContext::new("/").param("gender", "ROBOT");
        let spec = build(SpecDecl::new("gender", SpecKind::Equal).params(["gender"]), &context)
            .unwrap()
            .unwrap();
        assert!(matches!(spec, Spec::EmptyResult(_)));
        assert!(!spec.matches(&json!({"gender": "MALE"})));
    }

    #[test]
    fn test_exception_policy_names_rejected_values() {
        let context = WebRequestContext::new("/")
            .param("gender", "MALE,ROBOT,FEMALE,ALIEN");
        let decl = SpecDecl::new("gender", SpecKind::In)
            .params(["gender"])
            .separator(',')
            .on_type_mismatch(OnTypeMismatch::Exception);
        match build(decl, &context).unwrap_err() {
            ResolveError::Conversion(ConversionError::ValuesRejected { values, .. }) => {
                assert_eq!(values, vec!["ROBOT", "ALIEN"]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_wrong_argument_count() {
        let context = WebRequestContext::new("/").param("gold", "1");
        let decl = SpecDecl::new("gold", SpecKind::Between).params(["gold"]);
        let err = build(decl, &context).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::Request(RequestError::WrongArgumentCount { .. })
        ));
    }

    #[test]
    fn test_and_propagates_null() {
        let context = WebRequestContext::new("/").param("firstName", "Homer");
        let first = SpecDecl::new("firstName", SpecKind::Equal).params(["firstName"]);
        let last = SpecDecl::new("lastName", SpecKind::Equal).params(["lastName"]);

        let single = build(AndDecl::new(vec![first.clone(), last.clone()]), &context).unwrap();
        let direct = build(first, &context).unwrap();
        assert_eq!(single, direct);

        let empty = WebRequestContext::new("/");
        assert_eq!(build(AndDecl::new(vec![last]), &empty).unwrap(), None);
    }

    #[test]
    fn test_conjunction_flattens_extra_leaves() {
        let context = WebRequestContext::new("/")
            .param("a", "1")
            .param("b", "2")
            .param("c", "3");
        let decl = ConjunctionDecl::new(
            vec![OrDecl::new(vec![
                SpecDecl::new("a", SpecKind::Equal).params(["a"]),
                SpecDecl::new("b", SpecKind::Equal).params(["b"]),
            ])],
            vec![SpecDecl::new("c", SpecKind::Equal).params(["c"])],
        );
        let Some(Spec::Conjunction(conjunction)) = build(decl, &context).unwrap() else {
            panic!("expected a conjunction");
        };
        assert_eq!(conjunction.children().len(), 2);
        assert!(matches!(conjunction.children()[0], Spec::Disjunction(_)));
        assert!(matches!(conjunction.children()[1], Spec::Leaf(_)));
    }

    #[test]
    fn test_alias_prefix_uses_joined_schema() {
        let schema = schema();
        let leaves = LeafRegistry::new();
        let context = WebRequestContext::new("/");
        let cx = BuildContext::new(&context, &schema, &leaves).with_aliases([("o", "orders")]);
        assert_eq!(cx.attribute_type("o.itemName"), ValueType::String);
        assert_eq!(cx.attribute_type("gold"), ValueType::Long);
    }

    #[test]
    fn test_expression_literals() {
        let schema = schema();
        let leaves = LeafRegistry::new();
        let context = WebRequestContext::new("/");
        let evaluator = TeraExpressionEvaluator::default().property("min", "7");
        let decl = SpecDecl::new("gold", SpecKind::GreaterThan)
            .params(["minGold"])
            .default_val(["#{${min} + 1}"])
            .in_spel();

        let verbatim = BuildContext::new(&context, &schema, &leaves);
        let spec = decl.build(&verbatim).unwrap().unwrap();
        assert!(matches!(spec, Spec::EmptyResult(_)));

        let evaluating = BuildContext::new(&context, &schema, &leaves).with_evaluator(Some(&evaluator as &dyn ExpressionEvaluator));
        let spec = decl.build(&evaluating).unwrap().unwrap();
        assert_eq!(spec.leaves()[0].args(), &[FieldValue::Integer(8)]);
    }
}
