//! Tests for the typed error handling system
//!
//! These tests verify that:
//! - Errors return correct HTTP status codes
//! - Error responses carry stable codes and details
//! - Errors from resolution can be matched on by callers

use axum::http::StatusCode;
use axum::response::IntoResponse;
use specarg::core::error::{
    ConfigError, ConversionError, ExpressionError, PathVariableError, RequestError,
};
use specarg::prelude::*;

// =============================================================================
// HTTP Status Code Tests
// =============================================================================

mod status_code_tests {
    use super::*;

    #[test]
    fn test_unsupported_returns_500() {
        let err = ResolveError::Unsupported {
            type_name: "Empty".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_path_variable_returns_400() {
        let err = ResolveError::PathVariable(PathVariableError::InvalidRequested {
            name: "id".to_string(),
            templates: vec!["/customers".to_string()],
        });
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_rejected_values_return_400() {
        let err = ResolveError::Conversion(ConversionError::ValuesRejected {
            values: vec!["abc".to_string()],
            target: "Long".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_unsupported_content_type_returns_415() {
        let err = ResolveError::Request(RequestError::UnsupportedContentType {
            content_type: Some("text/plain".to_string()),
        });
        assert_eq!(err.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[test]
    fn test_body_read_returns_500() {
        let err = ResolveError::Request(RequestError::BodyRead {
            message: "connection reset".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_expression_returns_400() {
        let err = ResolveError::Expression(ExpressionError::UnresolvablePlaceholder {
            placeholder: "tenant".to_string(),
            expression: "${tenant}".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_config_returns_500() {
        let err = ResolveError::Config(ConfigError::UnknownSpecKind {
            name: "Fuzzy".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

// =============================================================================
// Error Response Tests
// =============================================================================

mod response_tests {
    use super::*;

    #[test]
    fn test_rejected_values_details() {
        let err = ResolveError::Conversion(ConversionError::ValuesRejected {
            values: vec!["abc".to_string(), "x".to_string()],
            target: "Long".to_string(),
        });

        let response = err.to_response();
        assert_eq!(response.code, "VALUES_REJECTED");
        let details = response.details.unwrap();
        assert_eq!(details["rejected_values"], json!(["abc", "x"]));
        assert_eq!(details["target_type"], "Long");
    }

    #[test]
    fn test_path_variable_details() {
        let err = ResolveError::PathVariable(PathVariableError::InvalidRequested {
            name: "id".to_string(),
            templates: vec!["/customers/{customerId}".to_string()],
        });

        let response = err.to_response();
        assert_eq!(response.code, "INVALID_PATH_VARIABLE_REQUESTED");
        assert!(response.message.contains("'id'"));
        assert_eq!(response.details.unwrap()["path_variable"], "id");
    }

    #[test]
    fn test_request_error_codes() {
        let err = ResolveError::Request(RequestError::WrongArgumentCount {
            kind: "Between".to_string(),
            path: "gold".to_string(),
            expected: "2".to_string(),
            actual: 1,
        });
        assert_eq!(err.error_code(), "WRONG_ARGUMENT_COUNT");
        assert!(err.to_response().details.is_none());
    }

    #[test]
    fn test_into_response_uses_status() {
        let err = ResolveError::Request(RequestError::MalformedBody {
            message: "expected value".to_string(),
        });

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

// =============================================================================
// Conversion Tests
// =============================================================================

mod conversion_tests {
    use super::*;

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<Value>("{").unwrap_err();
        let err: ResolveError = json_err.into();
        assert_eq!(err.error_code(), "MALFORMED_BODY");
    }

    #[test]
    fn test_from_anyhow_keeps_typed_error() {
        let original = ResolveError::Config(ConfigError::UnknownFilterType {
            name: "Missing".to_string(),
        });
        let err: ResolveError = anyhow::Error::new(original).into();
        assert!(matches!(
            err,
            ResolveError::Config(ConfigError::UnknownFilterType { .. })
        ));
    }

    #[test]
    fn test_from_anyhow_wraps_other_errors() {
        let err: ResolveError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, ResolveError::Internal(ref msg) if msg == "boom"));
    }
}

// =============================================================================
// Resolution Error Integration Tests
// =============================================================================

mod resolution_error_tests {
    use super::*;

    #[test]
    fn test_wrong_argument_count_is_typed() {
        let filter_type = Arc::new(
            FilterType::new("GoldRange")
                .with(SpecDecl::new("gold", SpecKind::Between).params(["gold"]))
                .schema(EntitySchema::new().attribute("gold", ValueType::Long)),
        );
        let resolver = SpecificationResolver::default();
        let context = WebRequestContext::new("/").param("gold", "10");

        let err = resolver
            .resolve_proxy(&MethodParameter::of(filter_type), &context)
            .unwrap_err();

        match err {
            ResolveError::Request(RequestError::WrongArgumentCount { kind, actual, .. }) => {
                assert_eq!(kind, "Between");
                assert_eq!(actual, 1);
            }
            other => panic!("Expected RequestError::WrongArgumentCount, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_placeholder_is_typed() {
        let filter_type = Arc::new(
            FilterType::new("Tenant").with(
                SpecDecl::new("tenant", SpecKind::Equal)
                    .const_val(["${tenant.id}"])
                    .in_spel(),
            ),
        );
        let resolver = SpecificationResolver::new(ResolverConfig::default().with_spel_support(true));

        let err = resolver
            .resolve_proxy(&MethodParameter::of(filter_type), &WebRequestContext::new("/"))
            .unwrap_err();

        match err {
            ResolveError::Expression(ExpressionError::UnresolvablePlaceholder { placeholder, .. }) => {
                assert_eq!(placeholder, "tenant.id");
            }
            other => panic!("Expected ExpressionError::UnresolvablePlaceholder, got {:?}", other),
        }
    }

    #[test]
    fn test_body_with_wrong_content_type() {
        let filter_type = Arc::new(
            FilterType::new("BodyFilter")
                .with(SpecDecl::new("lastName", SpecKind::Equal).json_paths(["lastName"])),
        );
        let resolver = SpecificationResolver::default();
        let context = WebRequestContext::new("/")
            .content_type("text/plain")
            .body("lastName=Simpson");

        let err = resolver
            .resolve_proxy(&MethodParameter::of(filter_type), &context)
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }
}
