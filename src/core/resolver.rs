//! Resolution orchestrator
//!
//! [`SpecificationResolver`] turns the declarations reachable from a method
//! parameter into one filter for the current request:
//!
//! ```text
//! START → WALK → BUILD → COMPOSE → WRAP → DONE
//!           ↘ UNSUPPORTED    ↘ FAILED
//! ```
//!
//! Walking is structural and may be cached per filter type. Building reads
//! the processing context; its first error is returned as is.

use super::builders::{BuildContext, BuildNode};
use super::convert::FallbackConverter;
use super::declaration::Declaration;
use super::error::{ResolveError, ResolveResult};
use super::filter_type::{EntitySchema, FilterInterface, FilterType};
use super::leaf::{LeafPredicate, LeafRegistry};
use super::proxy::ProxiedSpec;
use super::spec::Spec;
use super::walker::{DeclarationCache, DeclarationTree};
use crate::config::ResolverConfig;
use crate::context::{ExpressionEvaluator, ProcessingContext, TeraExpressionEvaluator};
use std::fmt;
use std::sync::Arc;

/// Name reported for parameters typed as a plain specification
pub const SPECIFICATION: &str = "Specification";

/// Stages of one resolution, reported in logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStage {
    Start,
    Walk,
    Build,
    Compose,
    Wrap,
    Done,
    Unsupported,
    Failed,
}

impl fmt::Display for ResolutionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResolutionStage::Start => "START",
            ResolutionStage::Walk => "WALK",
            ResolutionStage::Build => "BUILD",
            ResolutionStage::Compose => "COMPOSE",
            ResolutionStage::Wrap => "WRAP",
            ResolutionStage::Done => "DONE",
            ResolutionStage::Unsupported => "UNSUPPORTED",
            ResolutionStage::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// What a parameter is declared as
#[derive(Debug, Clone)]
enum Target {
    /// A plain specification; only parameter-level declarations apply
    Specification,
    /// A filter interface, whose tree is walked and whose result is wrapped
    Interface(Arc<FilterType>),
}

/// A resolvable parameter: its declared type plus its own declarations
#[derive(Debug, Clone)]
pub struct MethodParameter {
    target: Target,
    declarations: Vec<Declaration>,
    schema: EntitySchema,
}

impl MethodParameter {
    /// Parameter typed as a plain specification over an entity with `schema`
    pub fn specification(schema: EntitySchema) -> Self {
        Self {
            target: Target::Specification,
            declarations: Vec::new(),
            schema,
        }
    }

    /// Parameter typed as the filter interface `filter_type`
    pub fn of(filter_type: Arc<FilterType>) -> Self {
        Self {
            target: Target::Interface(filter_type),
            declarations: Vec::new(),
            schema: EntitySchema::default(),
        }
    }

    pub fn of_type<F: FilterInterface>() -> Self {
        Self::of(F::filter_type())
    }

    /// Attach a declaration to the parameter itself
    pub fn with(mut self, declaration: impl Into<Declaration>) -> Self {
        self.declarations.push(declaration.into());
        self
    }

    /// Attribute types not covered by the filter types
    pub fn schema(mut self, schema: EntitySchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn filter_type(&self) -> Option<&Arc<FilterType>> {
        match &self.target {
            Target::Interface(filter_type) => Some(filter_type),
            Target::Specification => None,
        }
    }

    pub fn type_name(&self) -> &str {
        match &self.target {
            Target::Interface(filter_type) => filter_type.name(),
            Target::Specification => SPECIFICATION,
        }
    }
}

/// Resolves method parameters to filters
pub struct SpecificationResolver {
    config: ResolverConfig,
    cache: DeclarationCache,
    leaves: LeafRegistry,
    evaluator: Option<Arc<dyn ExpressionEvaluator>>,
    fallback: Option<Arc<dyn FallbackConverter>>,
}

impl fmt::Debug for SpecificationResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecificationResolver")
            .field("config", &self.config)
            .field("cached_trees", &self.cache.len())
            .field("leaves", &self.leaves)
            .field("expressions", &self.evaluator.is_some())
            .field("fallback_converter", &self.fallback.is_some())
            .finish()
    }
}

impl Default for SpecificationResolver {
    fn default() -> Self {
        Self::new(ResolverConfig::default())
    }
}

impl SpecificationResolver {
    /// Create a resolver; expression support uses the tera evaluator over the
    /// configured properties
    pub fn new(config: ResolverConfig) -> Self {
        let evaluator: Option<Arc<dyn ExpressionEvaluator>> = config
            .spel_support
            .then(|| {
                Arc::new(TeraExpressionEvaluator::new(config.properties.clone())) as Arc<dyn ExpressionEvaluator>
            });
        Self {
            config,
            cache: DeclarationCache::new(),
            leaves: LeafRegistry::new(),
            evaluator,
            fallback: None,
        }
    }

    /// Replace the expression evaluator; only used when expression support is on
    pub fn with_expression_evaluator(mut self, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    pub fn with_fallback_converter(mut self, fallback: Arc<dyn FallbackConverter>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Register a custom leaf kind
    pub fn with_leaf(mut self, name: impl Into<String>, predicate: Arc<dyn LeafPredicate>) -> Self {
        self.leaves.register(name, predicate);
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn leaves(&self) -> &LeafRegistry {
        &self.leaves
    }

    /// Declarations reachable from `parameter`
    pub fn declarations(&self, parameter: &MethodParameter) -> ResolveResult<DeclarationTree> {
        let type_tree = match parameter.filter_type() {
            Some(filter_type) if self.config.cache_declarations => Some(self.cache.get_or_walk(filter_type)?),
            Some(filter_type) => Some(Arc::new(DeclarationTree::walk(filter_type))),
            None => None,
        };
        Ok(
            DeclarationTree::for_parameter(&parameter.declarations, type_tree.as_deref())
                .with_schema(&parameter.schema),
        )
    }

    /// Whether `parameter` has any declaration to resolve
    pub fn supports(&self, parameter: &MethodParameter) -> bool {
        self.declarations(parameter)
            .map(|tree| !tree.is_empty())
            .unwrap_or(false)
    }

    /// Whether resolving `parameter` needs the JSON body
    pub fn requires_body(&self, parameter: &MethodParameter) -> ResolveResult<bool> {
        Ok(self.declarations(parameter)?.requires_body())
    }

    /// Whether resolving `parameter` may look into a JSON body
    pub fn reads_body(&self, parameter: &MethodParameter) -> ResolveResult<bool> {
        Ok(self.declarations(parameter)?.reads_body())
    }

    /// Resolve `parameter` against one request
    ///
    /// Interface parameters always give a [`Spec::Proxy`], possibly with no
    /// root. Plain specification parameters give the composed tree, or
    /// `None` when nothing applies to this request.
    pub fn resolve(
        &self,
        parameter: &MethodParameter,
        context: &dyn ProcessingContext,
    ) -> ResolveResult<Option<Spec>> {
        let type_name = parameter.type_name();
        tracing::debug!(stage = %ResolutionStage::Start, filter_type = %type_name, "resolving");

        let tree = self.declarations(parameter)?;
        tracing::debug!(
            stage = %ResolutionStage::Walk,
            filter_type = %type_name,
            declarations = tree.len(),
            "collected declarations"
        );
        if tree.is_empty() {
            tracing::debug!(stage = %ResolutionStage::Unsupported, filter_type = %type_name, "no declarations");
            return Err(ResolveError::Unsupported {
                type_name: type_name.to_string(),
            });
        }

        let built = self.build(&tree, context).inspect_err(|e| {
            tracing::debug!(
                stage = %ResolutionStage::Failed,
                filter_type = %type_name,
                error = %e,
                "resolution failed"
            );
        })?;

        let composed = Spec::and_all(built);
        tracing::debug!(
            stage = %ResolutionStage::Compose,
            filter_type = %type_name,
            empty = composed.is_none(),
            "composed filter"
        );

        let resolved = match parameter.filter_type() {
            Some(filter_type) => {
                tracing::debug!(stage = %ResolutionStage::Wrap, filter_type = %type_name, "wrapping");
                Some(Spec::Proxy(ProxiedSpec::new(filter_type.clone(), composed)))
            }
            None => composed,
        };

        tracing::debug!(stage = %ResolutionStage::Done, filter_type = %type_name, "resolved");
        Ok(resolved)
    }

    /// Resolve the filter interface `F`
    pub fn resolve_as<F: FilterInterface>(&self, context: &dyn ProcessingContext) -> ResolveResult<ProxiedSpec> {
        self.resolve_proxy(&MethodParameter::of_type::<F>(), context)
    }

    /// Resolve an interface parameter to its wrapper
    pub fn resolve_proxy(
        &self,
        parameter: &MethodParameter,
        context: &dyn ProcessingContext,
    ) -> ResolveResult<ProxiedSpec> {
        match self.resolve(parameter, context)? {
            Some(Spec::Proxy(proxy)) => Ok(proxy),
            _ => Err(ResolveError::Internal(format!(
                "'{}' is not a filter interface",
                parameter.type_name()
            ))),
        }
    }

    fn build(&self, tree: &DeclarationTree, context: &dyn ProcessingContext) -> ResolveResult<Vec<Spec>> {
        if tree.requires_body() {
            context.prepare_body()?;
        }
        tracing::debug!(stage = %ResolutionStage::Build, declarations = tree.len(), "building");

        let evaluator = if self.config.spel_support {
            self.evaluator.as_deref()
        } else {
            None
        };
        let cx = BuildContext::new(context, tree.schema(), &self.leaves)
            .with_aliases(tree.aliases())
            .with_evaluator(evaluator)
            .with_fallback(self.fallback.clone())
            .with_defaults(self.config.on_type_mismatch, self.config.missing_path_var_policy);

        let mut built = Vec::new();
        for entry in tree.entries() {
            if let Some(spec) = entry.declaration.build(&cx)? {
                tracing::trace!(owner = %entry.owner, kind = entry.declaration.kind_name(), "built declaration");
                built.push(spec);
            }
        }
        Ok(built)
    }
}
