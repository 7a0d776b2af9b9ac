//! Processing context over an HTTP request

use super::json_body::JsonBody;
use super::path_template::PathTemplate;
use super::{ProcessingContext, split_values};
use crate::core::declaration::MissingPathVarPolicy;
use crate::core::error::{PathVariableError, RequestError, ResolveResult};
use axum::body::Bytes;
use axum::extract::Query;
use axum::http::header::CONTENT_TYPE;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use indexmap::IndexMap;
use std::cell::OnceCell;
use std::fmt;
use std::sync::Arc;

/// Path templates of the endpoint handling a request
///
/// Class-level templates are combined with method-level templates; either
/// side may be empty.
#[derive(Debug, Clone, Default)]
pub struct EndpointMapping {
    templates: Vec<PathTemplate>,
}

impl EndpointMapping {
    pub fn new<C, M>(class_templates: C, method_templates: M) -> ResolveResult<Self>
    where
        C: IntoIterator,
        C::Item: AsRef<str>,
        M: IntoIterator,
        M::Item: AsRef<str>,
    {
        let classes: Vec<String> = class_templates.into_iter().map(|t| t.as_ref().to_string()).collect();
        let methods: Vec<String> = method_templates.into_iter().map(|t| t.as_ref().to_string()).collect();

        let combined: Vec<String> = match (classes.is_empty(), methods.is_empty()) {
            (true, _) => methods,
            (false, true) => classes,
            (false, false) => classes
                .iter()
                .flat_map(|class| methods.iter().map(move |method| join_paths(class, method)))
                .collect(),
        };

        let templates = combined
            .iter()
            .map(|t| PathTemplate::parse(t))
            .collect::<ResolveResult<Vec<_>>>()?;
        Ok(Self { templates })
    }

    /// Mapping with a single template
    pub fn single(template: &str) -> ResolveResult<Self> {
        Self::new(std::iter::empty::<&str>(), [template])
    }

    pub fn templates(&self) -> &[PathTemplate] {
        &self.templates
    }
}

fn join_paths(class: &str, method: &str) -> String {
    format!(
        "{}/{}",
        class.trim_end_matches('/'),
        method.trim_start_matches('/')
    )
}

/// Where the body bytes come from
#[derive(Clone)]
pub enum BodySource {
    /// Already buffered bytes
    Bytes(Bytes),
    /// A reader invoked at most once, on first body access
    Reader(Arc<dyn Fn() -> std::io::Result<Vec<u8>> + Send + Sync>),
}

impl fmt::Debug for BodySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodySource::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            BodySource::Reader(_) => write!(f, "Reader"),
        }
    }
}

/// [`ProcessingContext`] over a web request
///
/// # Example
///
/// ```rust,ignore
/// let context = WebRequestContext::new("/customers/77/orders")
///     .mapping(EndpointMapping::single("/customers/{customerId}/orders")?)
///     .param("lastName", "Simpson")
///     .header("X-Tenant", "springfield");
/// ```
#[derive(Debug, Default)]
pub struct WebRequestContext {
    path: String,
    mapping: EndpointMapping,
    params: IndexMap<String, Vec<String>>,
    headers: HeaderMap,
    content_type: Option<String>,
    body_source: Option<BodySource>,
    body: OnceCell<JsonBody>,
}

impl WebRequestContext {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Build from the head of an axum request
    pub fn from_parts(parts: &Parts, mapping: EndpointMapping) -> ResolveResult<Self> {
        let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri).map_err(|e| {
            RequestError::MalformedQuery {
                message: e.body_text(),
            }
        })?;

        let mut context = Self::new(parts.uri.path()).mapping(mapping);
        for (name, value) in pairs {
            context = context.param(name, value);
        }
        context.headers = parts.headers.clone();
        context.content_type = parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Ok(context)
    }

    pub fn mapping(mut self, mapping: EndpointMapping) -> Self {
        self.mapping = mapping;
        self
    }

    /// Append a query parameter value
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.entry(name.into()).or_default().push(value.into());
        self
    }

    /// Append a header; invalid names or values are skipped
    pub fn header<K, V>(mut self, name: K, value: V) -> Self
    where
        K: TryInto<HeaderName>,
        V: TryInto<HeaderValue>,
    {
        match (name.try_into(), value.try_into()) {
            (Ok(name), Ok(value)) => {
                if name == CONTENT_TYPE {
                    self.content_type = value.to_str().ok().map(str::to_string);
                }
                self.headers.append(name, value);
            }
            _ => tracing::warn!("skipping invalid header"),
        }
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn body(mut self, bytes: impl Into<Bytes>) -> Self {
        self.body_source = Some(BodySource::Bytes(bytes.into()));
        self
    }

    pub fn body_reader<F>(mut self, reader: F) -> Self
    where
        F: Fn() -> std::io::Result<Vec<u8>> + Send + Sync + 'static,
    {
        self.body_source = Some(BodySource::Reader(Arc::new(reader)));
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("json"))
    }

    fn json_body(&self) -> ResolveResult<&JsonBody> {
        if let Some(body) = self.body.get() {
            return Ok(body);
        }

        if !self.is_json() {
            return Err(RequestError::UnsupportedContentType {
                content_type: self.content_type.clone(),
            }
            .into());
        }

        let parsed = match &self.body_source {
            Some(BodySource::Bytes(bytes)) => JsonBody::parse(bytes)?,
            Some(BodySource::Reader(reader)) => {
                let bytes = reader().map_err(|e| RequestError::BodyRead {
                    message: e.to_string(),
                })?;
                JsonBody::parse(&bytes)?
            }
            None => {
                return Err(RequestError::MalformedBody {
                    message: "request has no body".to_string(),
                }
                .into());
            }
        };

        tracing::trace!(path = %self.path, "parsed JSON request body");
        Ok(self.body.get_or_init(|| parsed))
    }
}

impl ProcessingContext for WebRequestContext {
    fn param_values(&self, name: &str, separator: Option<char>) -> Option<Vec<String>> {
        let raw = self.params.get(name)?;
        let values = split_values(raw.iter().map(String::as_str), separator);
        (!values.is_empty()).then_some(values)
    }

    fn path_variable(&self, name: &str, policy: MissingPathVarPolicy) -> ResolveResult<Option<String>> {
        let templates = self.mapping.templates();
        // A template covering the whole path is the endpoint that was hit
        let matched = match templates.iter().find(|t| t.matches_whole(&self.path)) {
            Some(template) if template.declares(name) => template.extract(&self.path),
            Some(_) => None,
            None => templates
                .iter()
                .filter(|t| t.declares(name))
                .find_map(|t| t.extract(&self.path)),
        };
        if let Some(mut variables) = matched {
            return Ok(variables.remove(name));
        }

        match policy {
            MissingPathVarPolicy::Ignore => Ok(None),
            MissingPathVarPolicy::Exception => Err(PathVariableError::InvalidRequested {
                name: name.to_string(),
                templates: self
                    .mapping
                    .templates()
                    .iter()
                    .map(|t| t.as_str().to_string())
                    .collect(),
            }
            .into()),
        }
    }

    fn header(&self, name: &str, separator: Option<char>) -> Option<Vec<String>> {
        let raw: Vec<&str> = self
            .headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        let values = split_values(raw, separator);
        (!values.is_empty()).then_some(values)
    }

    fn body_values(&self, path: &str) -> ResolveResult<Option<Vec<String>>> {
        self.json_body()?.values(path)
    }

    fn prepare_body(&self) -> ResolveResult<()> {
        self.json_body().map(|_| ())
    }

    fn body_prepared(&self) -> bool {
        self.body.get().is_some()
    }

    fn has_json_body(&self) -> bool {
        let present = match &self.body_source {
            Some(BodySource::Bytes(bytes)) => !bytes.is_empty(),
            Some(BodySource::Reader(_)) => true,
            None => false,
        };
        present && self.is_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ResolveError;
    use axum::http::Request;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn orders_context(path: &str) -> WebRequestContext {
        WebRequestContext::new(path).mapping(
            EndpointMapping::new(["/customers/{customerId}"], ["/orders/{orderId:[0-9]+}"]).unwrap(),
        )
    }

    #[test]
    fn test_class_and_method_templates_combine() {
        let mapping = EndpointMapping::new(["/api/", "/v2"], ["/a", "b"]).unwrap();
        let templates: Vec<&str> = mapping.templates().iter().map(|t| t.as_str()).collect();
        assert_eq!(templates, vec!["/api/a", "/api/b", "/v2/a", "/v2/b"]);
    }

    #[test]
    fn test_params_split_on_separator() {
        let context = WebRequestContext::new("/").param("gender", "MALE,FEMALE").param("gender", "OTHER");
        assert_eq!(
            context.param_values("gender", Some(',')).unwrap(),
            vec!["MALE", "FEMALE", "OTHER"]
        );
        assert_eq!(
            context.param_values("gender", None).unwrap(),
            vec!["MALE,FEMALE", "OTHER"]
        );
        assert!(context.param_values("missing", None).is_none());
    }

    #[test]
    fn test_headers_split_on_separator() {
        let context = WebRequestContext::new("/")
            .header("X-First-Names", "Homer,Marge")
            .header("X-First-Names", "Ned");
        assert_eq!(
            ProcessingContext::header(&context, "X-First-Names", Some(',')).unwrap(),
            vec!["Homer", "Marge", "Ned"]
        );
        assert_eq!(
            ProcessingContext::header(&context, "X-First-Names", None).unwrap(),
            vec!["Homer,Marge", "Ned"]
        );
        assert!(ProcessingContext::header(&context, "X-Missing", Some(',')).is_none());
    }

    #[test]
    fn test_path_variables() {
        let context = orders_context("/customers/77/orders/66");
        assert_eq!(
            context.path_variable("customerId", MissingPathVarPolicy::Exception).unwrap(),
            Some("77".to_string())
        );
        assert_eq!(
            context.path_variable("orderId", MissingPathVarPolicy::Exception).unwrap(),
            Some("66".to_string())
        );
    }

    #[test]
    fn test_undeclared_path_variable() {
        let context = orders_context("/customers/77/orders/66");
        let err = context
            .path_variable("productId", MissingPathVarPolicy::Exception)
            .unwrap_err();
        assert!(matches!(err, ResolveError::PathVariable(_)));
        assert_eq!(
            context.path_variable("productId", MissingPathVarPolicy::Ignore).unwrap(),
            None
        );
    }

    #[test]
    fn test_whole_path_template_wins_over_prefix_match() {
        let mapping = EndpointMapping::new(std::iter::empty::<&str>(), ["/c/{id}/o/{orderId}", "/c/{id}"]).unwrap();
        let context = WebRequestContext::new("/c/5").mapping(mapping);

        assert_eq!(
            context.path_variable("id", MissingPathVarPolicy::Exception).unwrap(),
            Some("5".to_string())
        );
        let err = context
            .path_variable("orderId", MissingPathVarPolicy::Exception)
            .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::PathVariable(PathVariableError::InvalidRequested { ref name, .. }) if name == "orderId"
        ));
        assert_eq!(
            context.path_variable("orderId", MissingPathVarPolicy::Ignore).unwrap(),
            None
        );
    }

    #[test]
    fn test_prefix_match_used_without_whole_path_template() {
        let context = WebRequestContext::new("/customers/77/orders")
            .mapping(EndpointMapping::single("/customers/{customerId}/orders/{orderId}").unwrap());
        assert_eq!(
            context.path_variable("customerId", MissingPathVarPolicy::Exception).unwrap(),
            Some("77".to_string())
        );
        assert_eq!(
            context.path_variable("orderId", MissingPathVarPolicy::Exception).unwrap(),
            None
        );
    }

    #[test]
    fn test_fallback_order() {
        let context = orders_context("/customers/77/orders/66")
            .header("customerId", "from-header")
            .header("tenant", "springfield");
        assert_eq!(
            context.fallback_values("customerId", None).unwrap(),
            Some(vec!["77".to_string()])
        );
        assert_eq!(
            context.fallback_values("tenant", None).unwrap(),
            Some(vec!["springfield".to_string()])
        );
        assert_eq!(context.fallback_values("nothing", None).unwrap(), None);
    }

    #[test]
    fn test_fallback_reads_unprepared_body() {
        let context = WebRequestContext::new("/")
            .content_type("application/json")
            .body(r#"{"lastName":"Simpson"}"#);

        assert!(!context.body_prepared());
        assert_eq!(
            context.fallback_values("lastName", None).unwrap(),
            Some(vec!["Simpson".to_string()])
        );
    }

    #[test]
    fn test_fallback_skips_missing_or_foreign_body() {
        let no_body = WebRequestContext::new("/").content_type("application/json");
        assert!(!no_body.has_json_body());
        assert_eq!(no_body.fallback_values("lastName", None).unwrap(), None);

        let empty = WebRequestContext::new("/")
            .content_type("application/json")
            .body("");
        assert_eq!(empty.fallback_values("lastName", None).unwrap(), None);

        let form = WebRequestContext::new("/")
            .content_type("application/x-www-form-urlencoded")
            .body("lastName=Simpson");
        assert_eq!(form.fallback_values("lastName", None).unwrap(), None);
    }

    #[test]
    fn test_body_read_once() {
        let reads = Arc::new(AtomicUsize::new(0));
        let counter = reads.clone();
        let context = WebRequestContext::new("/")
            .content_type("application/json")
            .body_reader(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(br#"{"customer":{"lastName":"Simpson"}}"#.to_vec())
            });

        assert!(!context.body_prepared());
        context.prepare_body().unwrap();
        assert_eq!(
            context.body_values("customer.lastName").unwrap(),
            Some(vec!["Simpson".to_string()])
        );
        assert_eq!(
            context.fallback_values("customer.lastName", None).unwrap(),
            Some(vec!["Simpson".to_string()])
        );
        assert_eq!(reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_non_json_content_type() {
        let context = WebRequestContext::new("/").content_type("text/plain").body("x");
        let err = context.prepare_body().unwrap_err();
        assert!(matches!(
            err,
            ResolveError::Request(RequestError::UnsupportedContentType { .. })
        ));
    }

    #[test]
    fn test_body_read_failure() {
        let context = WebRequestContext::new("/")
            .content_type("application/json")
            .body_reader(|| Err(std::io::Error::other("connection reset")));
        let err = context.prepare_body().unwrap_err();
        assert!(matches!(
            err,
            ResolveError::Request(RequestError::BodyRead { .. })
        ));
    }

    #[test]
    fn test_from_parts() {
        let request = Request::builder()
            .uri("/customers/77/orders?lastName=Simpson&gender=MALE&gender=FEMALE")
            .header("content-type", "application/json")
            .body(())
            .unwrap();
        let (parts, _) = request.into_parts();
        let context = WebRequestContext::from_parts(
            &parts,
            EndpointMapping::single("/customers/{customerId}/orders").unwrap(),
        )
        .unwrap();

        assert_eq!(context.path(), "/customers/77/orders");
        assert_eq!(context.param_values("gender", None).unwrap(), vec!["MALE", "FEMALE"]);
        assert_eq!(
            context.path_variable("customerId", MissingPathVarPolicy::Exception).unwrap(),
            Some("77".to_string())
        );
    }
}
