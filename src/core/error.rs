//! Typed error handling for specification resolution
//!
//! Resolution can fail in a handful of well-defined ways. Each category has its
//! own enum so that callers can match on exactly the failure they care about
//! instead of inspecting a generic `anyhow::Error`.
//!
//! # Error Categories
//!
//! - [`ResolveError::Unsupported`]: the requested type carries no filter declaration
//! - [`PathVariableError`]: a declaration names a path variable no template declares
//! - [`ConversionError`]: raw values rejected by the converter under `EXCEPTION`
//! - [`RequestError`]: body, content type and argument count problems
//! - [`ExpressionError`]: malformed expression literals
//! - [`ConfigError`]: configuration and declaration misuse
//!
//! # Example
//!
//! ```rust,ignore
//! use specarg::prelude::*;
//!
//! match resolver.resolve(&param, &context) {
//!     Ok(spec) => println!("resolved: {:?}", spec),
//!     Err(ResolveError::Conversion(ConversionError::ValuesRejected { values, .. })) => {
//!         println!("rejected: {:?}", values);
//!     }
//!     Err(e) => eprintln!("other error: {}", e),
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

/// The main error type for specification resolution
#[derive(Debug)]
pub enum ResolveError {
    /// The requested type has no recognized filter declaration in its tree
    Unsupported { type_name: String },

    /// Path variable errors
    PathVariable(PathVariableError),

    /// Type conversion errors
    Conversion(ConversionError),

    /// Request body and argument errors
    Request(RequestError),

    /// Expression literal errors
    Expression(ExpressionError),

    /// Configuration errors
    Config(ConfigError),

    /// Internal errors (should not happen in normal operation)
    Internal(String),
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::Unsupported { type_name } => {
                write!(f, "Type '{}' declares no filter specification", type_name)
            }
            ResolveError::PathVariable(e) => write!(f, "{}", e),
            ResolveError::Conversion(e) => write!(f, "{}", e),
            ResolveError::Request(e) => write!(f, "{}", e),
            ResolveError::Expression(e) => write!(f, "{}", e),
            ResolveError::Config(e) => write!(f, "{}", e),
            ResolveError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResolveError::PathVariable(e) => Some(e),
            ResolveError::Conversion(e) => Some(e),
            ResolveError::Request(e) => Some(e),
            ResolveError::Expression(e) => Some(e),
            ResolveError::Config(e) => Some(e),
            ResolveError::Unsupported { .. } | ResolveError::Internal(_) => None,
        }
    }
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ResolveError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ResolveError::Unsupported { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ResolveError::PathVariable(_) => StatusCode::BAD_REQUEST,
            ResolveError::Conversion(_) => StatusCode::BAD_REQUEST,
            ResolveError::Request(e) => e.status_code(),
            ResolveError::Expression(_) => StatusCode::BAD_REQUEST,
            ResolveError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ResolveError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            ResolveError::Unsupported { .. } => "UNSUPPORTED_SPECIFICATION",
            ResolveError::PathVariable(_) => "INVALID_PATH_VARIABLE_REQUESTED",
            ResolveError::Conversion(e) => e.error_code(),
            ResolveError::Request(e) => e.error_code(),
            ResolveError::Expression(_) => "INVALID_EXPRESSION",
            ResolveError::Config(_) => "CONFIG_ERROR",
            ResolveError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether this error means "not applicable" rather than a failure
    pub fn is_unsupported(&self) -> bool {
        matches!(self, ResolveError::Unsupported { .. })
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            ResolveError::Conversion(ConversionError::ValuesRejected { values, target }) => {
                Some(serde_json::json!({
                    "rejected_values": values,
                    "target_type": target
                }))
            }
            ResolveError::PathVariable(PathVariableError::InvalidRequested { name, templates }) => {
                Some(serde_json::json!({
                    "path_variable": name,
                    "templates": templates
                }))
            }
            ResolveError::Expression(ExpressionError::Malformed { expression, .. }) => {
                Some(serde_json::json!({ "expression": expression }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for ResolveError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

// =============================================================================
// Path Variable Errors
// =============================================================================

/// Errors related to path variable lookup
#[derive(Debug, thiserror::Error)]
pub enum PathVariableError {
    /// The variable is not declared by any endpoint template
    #[error("Requested path variable '{name}' is not present in the endpoint templates {templates:?}")]
    InvalidRequested { name: String, templates: Vec<String> },
}

impl From<PathVariableError> for ResolveError {
    fn from(err: PathVariableError) -> Self {
        ResolveError::PathVariable(err)
    }
}

// =============================================================================
// Conversion Errors
// =============================================================================

/// Errors related to raw value conversion
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    /// One or more raw values could not be converted to the target type
    #[error("Values {values:?} cannot be converted to {target}")]
    ValuesRejected { values: Vec<String>, target: String },

    /// The fallback converter failed on a value it claimed to support
    #[error("Fallback conversion of '{value}' to {target} failed: {message}")]
    Fallback {
        value: String,
        target: String,
        message: String,
    },
}

impl ConversionError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ConversionError::ValuesRejected { .. } => "VALUES_REJECTED",
            ConversionError::Fallback { .. } => "FALLBACK_CONVERSION_FAILED",
        }
    }

    /// Raw values named by this error
    pub fn rejected_values(&self) -> Vec<String> {
        match self {
            ConversionError::ValuesRejected { values, .. } => values.clone(),
            ConversionError::Fallback { value, .. } => vec![value.clone()],
        }
    }
}

impl From<ConversionError> for ResolveError {
    fn from(err: ConversionError) -> Self {
        ResolveError::Conversion(err)
    }
}

// =============================================================================
// Request Errors
// =============================================================================

/// Errors related to the incoming request
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// A JSON body is required but the content type is not JSON
    #[error("Expected a JSON request body, got content type {content_type:?}")]
    UnsupportedContentType { content_type: Option<String> },

    /// The body is not valid JSON
    #[error("Malformed request body: {message}")]
    MalformedBody { message: String },

    /// The query string cannot be decoded
    #[error("Malformed query string: {message}")]
    MalformedQuery { message: String },

    /// The underlying transport failed while reading the body
    #[error("Failed to read request body: {message}")]
    BodyRead { message: String },

    /// A JSON path resolved to something that is not a leaf value
    #[error("Invalid value at JSON path '{path}': {message}")]
    InvalidJsonValue { path: String, message: String },

    /// The resolved arguments do not match the leaf kind's arity
    #[error("Specification {kind} on '{path}' expects {expected} argument(s), got {actual}")]
    WrongArgumentCount {
        kind: String,
        path: String,
        expected: String,
        actual: usize,
    },
}

impl RequestError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RequestError::UnsupportedContentType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            RequestError::MalformedBody { .. } => StatusCode::BAD_REQUEST,
            RequestError::MalformedQuery { .. } => StatusCode::BAD_REQUEST,
            RequestError::BodyRead { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            RequestError::InvalidJsonValue { .. } => StatusCode::BAD_REQUEST,
            RequestError::WrongArgumentCount { .. } => StatusCode::BAD_REQUEST,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            RequestError::UnsupportedContentType { .. } => "UNSUPPORTED_CONTENT_TYPE",
            RequestError::MalformedBody { .. } => "MALFORMED_BODY",
            RequestError::MalformedQuery { .. } => "MALFORMED_QUERY",
            RequestError::BodyRead { .. } => "BODY_READ_FAILED",
            RequestError::InvalidJsonValue { .. } => "INVALID_JSON_VALUE",
            RequestError::WrongArgumentCount { .. } => "WRONG_ARGUMENT_COUNT",
        }
    }
}

impl From<RequestError> for ResolveError {
    fn from(err: RequestError) -> Self {
        ResolveError::Request(err)
    }
}

// =============================================================================
// Expression Errors
// =============================================================================

/// Errors related to expression literals
#[derive(Debug, thiserror::Error)]
pub enum ExpressionError {
    /// The expression could not be parsed or evaluated
    #[error("Invalid expression '{expression}': {message}")]
    Malformed { expression: String, message: String },

    /// A `${...}` placeholder has no value and no default
    #[error("Could not resolve placeholder '{placeholder}' in '{expression}'")]
    UnresolvablePlaceholder {
        placeholder: String,
        expression: String,
    },
}

impl From<ExpressionError> for ResolveError {
    fn from(err: ExpressionError) -> Self {
        ResolveError::Expression(err)
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to configuration and declarations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to parse configuration
    #[error("Failed to parse config{}: {message}", .file.as_ref().map(|f| format!(" file '{}'", f)).unwrap_or_default())]
    ParseError {
        file: Option<String>,
        message: String,
    },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    /// IO error while reading configuration
    #[error("IO error: {message}")]
    IoError { message: String },

    /// A filter type references an unknown parent
    #[error("Unknown filter type '{name}'")]
    UnknownFilterType { name: String },

    /// Filter types extend each other in a cycle
    #[error("Filter type '{name}' inherits from itself")]
    CyclicInheritance { name: String },

    /// A path template could not be parsed
    #[error("Invalid path template '{template}': {message}")]
    InvalidTemplate { template: String, message: String },

    /// A declaration names a leaf kind nobody registered
    #[error("Unknown specification kind '{name}'")]
    UnknownSpecKind { name: String },

    /// A method was invoked that neither the filter type nor its root provides
    #[error("Filter type '{type_name}' has no method '{method}'")]
    UnknownMethod { type_name: String, method: String },
}

impl From<ConfigError> for ResolveError {
    fn from(err: ConfigError) -> Self {
        ResolveError::Config(err)
    }
}

// =============================================================================
// Conversions from external errors
// =============================================================================

impl From<serde_json::Error> for ResolveError {
    fn from(err: serde_json::Error) -> Self {
        ResolveError::Request(RequestError::MalformedBody {
            message: err.to_string(),
        })
    }
}

impl From<std::io::Error> for ResolveError {
    fn from(err: std::io::Error) -> Self {
        ResolveError::Config(ConfigError::IoError {
            message: err.to_string(),
        })
    }
}

impl From<serde_yaml::Error> for ResolveError {
    fn from(err: serde_yaml::Error) -> Self {
        ResolveError::Config(ConfigError::ParseError {
            file: None,
            message: err.to_string(),
        })
    }
}

impl From<anyhow::Error> for ResolveError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ResolveError>() {
            Ok(resolve_err) => resolve_err,
            Err(other) => ResolveError::Internal(other.to_string()),
        }
    }
}

/// A specialized Result type for resolution
pub type ResolveResult<T> = Result<T, ResolveError>;
