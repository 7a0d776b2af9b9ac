//! Axum extractor for resolved filters
//!
//! `SpecArg<F>` resolves the filter interface `F` against the incoming
//! request before it reaches the handler.

use crate::context::{EndpointMapping, WebRequestContext};
use crate::core::error::{RequestError, ResolveError};
use crate::core::filter_type::FilterInterface;
use crate::core::proxy::ProxiedSpec;
use crate::core::resolver::{MethodParameter, SpecificationResolver};
use axum::extract::{FromRef, FromRequest, MatchedPath, Request};
use std::marker::PhantomData;
use std::sync::Arc;

/// Axum extractor that resolves a filter interface from the request
///
/// The resolver is taken from the router state. Path templates come from an
/// [`EndpointMapping`] request extension when one is present, otherwise from
/// the matched route.
///
/// # Usage
///
/// ```rust,ignore
/// pub async fn list_customers(
///     SpecArg(filter, ..): SpecArg<CustomerFilter>,
/// ) -> Json<Vec<Customer>> {
///     Json(customers().into_iter().filter(|c| filter.matches(&json!(c))).collect())
/// }
/// ```
pub struct SpecArg<F>(pub ProxiedSpec, pub PhantomData<F>);

impl<F> SpecArg<F> {
    pub fn new(spec: ProxiedSpec) -> Self {
        Self(spec, PhantomData)
    }

    pub fn into_inner(self) -> ProxiedSpec {
        self.0
    }
}

impl<F> std::ops::Deref for SpecArg<F> {
    type Target = ProxiedSpec;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<F> std::fmt::Debug for SpecArg<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SpecArg").field(&self.0).finish()
    }
}

impl<S, F> FromRequest<S> for SpecArg<F>
where
    S: Send + Sync,
    F: FilterInterface,
    Arc<SpecificationResolver>: FromRef<S>,
{
    type Rejection = ResolveError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let resolver = Arc::<SpecificationResolver>::from_ref(state);
        let parameter = MethodParameter::of_type::<F>();

        let (parts, body) = req.into_parts();
        let mapping = match parts.extensions.get::<EndpointMapping>() {
            Some(mapping) => mapping.clone(),
            None => match parts.extensions.get::<MatchedPath>() {
                Some(matched) => EndpointMapping::single(matched.as_str())?,
                None => EndpointMapping::default(),
            },
        };

        // Only buffer the body when some declaration may read it
        let bytes = if resolver.reads_body(&parameter)? {
            let limit = resolver.config().max_body_size;
            let bytes = axum::body::to_bytes(body, limit)
                .await
                .map_err(|e| RequestError::BodyRead {
                    message: e.to_string(),
                })?;
            Some(bytes)
        } else {
            None
        };

        let mut context = WebRequestContext::from_parts(&parts, mapping)?;
        if let Some(bytes) = bytes {
            context = context.body(bytes);
        }

        let spec = resolver.resolve_proxy(&parameter, &context)?;
        tracing::debug!(filter_type = %spec.declared().name(), "extracted filter");
        Ok(SpecArg::new(spec))
    }
}
