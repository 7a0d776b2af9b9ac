//! Processing context
//!
//! A [`ProcessingContext`] is the read-only view of one request that the
//! builders resolve declarations against: query parameters, path variables,
//! headers and the JSON body.

pub mod expression;
pub mod json_body;
pub mod path_template;
pub mod web;

pub use expression::{ExpressionEvaluator, TeraExpressionEvaluator};
pub use json_body::JsonBody;
pub use path_template::PathTemplate;
pub use web::{BodySource, EndpointMapping, WebRequestContext};

use crate::core::declaration::MissingPathVarPolicy;
use crate::core::error::ResolveResult;

/// Per-request source of raw values
///
/// Missing or empty sources yield `None`, never an error.
pub trait ProcessingContext {
    /// Query parameter values, each split on `separator` when given
    fn param_values(&self, name: &str, separator: Option<char>) -> Option<Vec<String>>;

    /// Path variable extracted from the endpoint templates
    ///
    /// Fails with an invalid-path-variable error when no matching template
    /// declares `name`, unless `policy` is [`MissingPathVarPolicy::Ignore`].
    fn path_variable(&self, name: &str, policy: MissingPathVarPolicy) -> ResolveResult<Option<String>>;

    /// Header values, each split on `separator` when given
    fn header(&self, name: &str, separator: Option<char>) -> Option<Vec<String>>;

    /// Values at a dot path of the JSON body; reads the body on first use
    fn body_values(&self, path: &str) -> ResolveResult<Option<Vec<String>>>;

    /// Read and parse the body now
    fn prepare_body(&self) -> ResolveResult<()>;

    /// Whether the body has already been read
    fn body_prepared(&self) -> bool;

    /// Whether the request carries a non-empty body declared as JSON
    fn has_json_body(&self) -> bool;

    /// First hit of params, path variables, headers and the body, in that order
    ///
    /// The body is consulted whenever the request carries a JSON body, whether
    /// or not another declaration has read it already. Requests without one
    /// skip that step.
    fn fallback_values(&self, name: &str, separator: Option<char>) -> ResolveResult<Option<Vec<String>>> {
        if let Some(values) = self.param_values(name, separator) {
            return Ok(Some(values));
        }
        if let Some(value) = self.path_variable(name, MissingPathVarPolicy::Ignore)? {
            return Ok(Some(vec![value]));
        }
        if let Some(values) = self.header(name, separator) {
            return Ok(Some(values));
        }
        if self.has_json_body() {
            return self.body_values(name);
        }
        Ok(None)
    }
}

/// Split every raw value on `separator`, keeping order
pub(crate) fn split_values<'a>(raw: impl IntoIterator<Item = &'a str>, separator: Option<char>) -> Vec<String> {
    raw.into_iter()
        .flat_map(|value| match separator {
            Some(separator) => value.split(separator).map(str::to_string).collect::<Vec<_>>(),
            None => vec![value.to_string()],
        })
        .collect()
}
