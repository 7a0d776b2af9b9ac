//! End-to-end tests of the `SpecArg` extractor
//!
//! These tests run a small customer API and check that query parameters,
//! path variables and JSON bodies reach the resolved filters.

use axum::Json;
use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum_test::TestServer;
use specarg::prelude::*;

// =============================================================================
// Test API
// =============================================================================

struct CustomerFilter;

impl FilterInterface for CustomerFilter {
    fn filter_type() -> Arc<FilterType> {
        Arc::new(
            FilterType::new("CustomerFilter")
                .with(OrDecl::new(vec![
                    SpecDecl::new("gender", SpecKind::Equal).params(["gender"]),
                    SpecDecl::new("lastName", SpecKind::Equal).params(["lastName"]),
                ]))
                .with(SpecDecl::new("gold", SpecKind::GreaterThanOrEqual).params(["minGold"]))
                .schema(EntitySchema::new().attribute("gold", ValueType::Long)),
        )
    }
}

struct FamilyFilter;

impl FilterInterface for FamilyFilter {
    fn filter_type() -> Arc<FilterType> {
        Arc::new(
            FilterType::new("FamilyFilter")
                .with(SpecDecl::new("lastName", SpecKind::Equal).path_vars(["lastName"])),
        )
    }
}

struct SearchFilter;

impl FilterInterface for SearchFilter {
    fn filter_type() -> Arc<FilterType> {
        Arc::new(
            FilterType::new("SearchFilter")
                .with(SpecDecl::new("firstName", SpecKind::In).json_paths(["names"]))
                .with(SpecDecl::new("gold", SpecKind::LessThan).json_paths(["limits.maxGold"]))
                .schema(EntitySchema::new().attribute("gold", ValueType::Long)),
        )
    }
}

struct LastNameFilter;

impl FilterInterface for LastNameFilter {
    fn filter_type() -> Arc<FilterType> {
        Arc::new(FilterType::new("LastNameFilter").with(SpecDecl::new("lastName", SpecKind::Equal)))
    }
}

fn customers() -> Vec<Value> {
    vec![
        json!({"firstName": "Homer", "lastName": "Simpson", "gender": "MALE", "gold": 50}),
        json!({"firstName": "Marge", "lastName": "Simpson", "gender": "FEMALE", "gold": 10}),
        json!({"firstName": "Ned", "lastName": "Flanders", "gender": "MALE", "gold": 500}),
        json!({"firstName": "Maude", "lastName": "Flanders", "gender": "FEMALE", "gold": 300}),
    ]
}

fn first_names(filter: &ProxiedSpec) -> Vec<String> {
    customers()
        .into_iter()
        .filter(|c| filter.matches(c))
        .filter_map(|c| c["firstName"].as_str().map(str::to_string))
        .collect()
}

async fn list_customers(SpecArg(filter, ..): SpecArg<CustomerFilter>) -> Json<Vec<String>> {
    Json(first_names(&filter))
}

async fn list_family(filter: SpecArg<FamilyFilter>) -> Json<Vec<String>> {
    Json(first_names(&filter))
}

async fn search_customers(filter: SpecArg<SearchFilter>) -> Json<Vec<String>> {
    Json(first_names(&filter.into_inner()))
}

async fn by_last_name(filter: SpecArg<LastNameFilter>) -> Json<Vec<String>> {
    Json(first_names(&filter))
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn create_test_server(config: ResolverConfig) -> TestServer {
    init_tracing();
    let resolver = Arc::new(SpecificationResolver::new(config));
    let app = Router::new()
        .route("/customers", get(list_customers))
        .route("/families/{lastName}", get(list_family))
        .route("/customers/search", post(search_customers))
        .route("/customers/by-name", get(by_last_name).post(by_last_name))
        .with_state(resolver);
    TestServer::new(app)
}

// =============================================================================
// Query Parameter Tests
// =============================================================================

mod query_tests {
    use super::*;

    #[tokio::test]
    async fn test_no_parameters_returns_everyone() {
        let server = create_test_server(ResolverConfig::default());

        let response = server.get("/customers").await;
        response.assert_status_ok();

        let names: Vec<String> = response.json();
        assert_eq!(names.len(), 4);
    }

    #[tokio::test]
    async fn test_or_group_with_and_leaf() {
        let server = create_test_server(ResolverConfig::default());

        let response = server
            .get("/customers")
            .add_query_param("gender", "FEMALE")
            .add_query_param("lastName", "Simpson")
            .add_query_param("minGold", "50")
            .await;
        response.assert_status_ok();

        let names: Vec<String> = response.json();
        assert_eq!(names, vec!["Homer", "Maude"]);
    }

    #[tokio::test]
    async fn test_unconvertible_value_returns_empty_list() {
        let server = create_test_server(ResolverConfig::default());

        let response = server
            .get("/customers")
            .add_query_param("minGold", "lots")
            .await;
        response.assert_status_ok();

        let names: Vec<String> = response.json();
        assert!(names.is_empty());
    }

    #[tokio::test]
    async fn test_unconvertible_value_is_rejected_under_exception_policy() {
        let config = ResolverConfig::default().with_on_type_mismatch(OnTypeMismatch::Exception);
        let server = create_test_server(config);

        let response = server
            .get("/customers")
            .add_query_param("minGold", "lots")
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

        let body: Value = response.json();
        assert_eq!(body["code"], "VALUES_REJECTED");
        assert_eq!(body["details"]["rejected_values"], json!(["lots"]));
    }
}

// =============================================================================
// Path Variable Tests
// =============================================================================

mod path_variable_tests {
    use super::*;

    #[tokio::test]
    async fn test_path_variable_from_matched_route() {
        let server = create_test_server(ResolverConfig::default());

        let response = server.get("/families/Flanders").await;
        response.assert_status_ok();

        let names: Vec<String> = response.json();
        assert_eq!(names, vec!["Ned", "Maude"]);
    }
}

// =============================================================================
// JSON Body Tests
// =============================================================================

mod body_tests {
    use super::*;

    #[tokio::test]
    async fn test_json_body_values() {
        let server = create_test_server(ResolverConfig::default());

        let response = server
            .post("/customers/search")
            .json(&json!({
                "names": ["Homer", "Ned", "Maude"],
                "limits": {"maxGold": 400}
            }))
            .await;
        response.assert_status_ok();

        let names: Vec<String> = response.json();
        assert_eq!(names, vec!["Homer", "Maude"]);
    }

    #[tokio::test]
    async fn test_source_less_filter_reads_body() {
        let server = create_test_server(ResolverConfig::default());

        let response = server
            .post("/customers/by-name")
            .json(&json!({"lastName": "Flanders"}))
            .await;
        response.assert_status_ok();

        let names: Vec<String> = response.json();
        assert_eq!(names, vec!["Ned", "Maude"]);
    }

    #[tokio::test]
    async fn test_source_less_filter_prefers_query_over_body() {
        let server = create_test_server(ResolverConfig::default());

        let response = server
            .post("/customers/by-name")
            .add_query_param("lastName", "Simpson")
            .json(&json!({"lastName": "Flanders"}))
            .await;
        response.assert_status_ok();

        let names: Vec<String> = response.json();
        assert_eq!(names, vec!["Homer", "Marge"]);
    }

    #[tokio::test]
    async fn test_source_less_filter_without_body() {
        let server = create_test_server(ResolverConfig::default());

        let response = server.get("/customers/by-name").await;
        response.assert_status_ok();

        let names: Vec<String> = response.json();
        assert_eq!(names.len(), 4);
    }

    #[tokio::test]
    async fn test_malformed_json_body() {
        let server = create_test_server(ResolverConfig::default());

        let response = server
            .post("/customers/search")
            .text("{\"names\": [")
            .content_type("application/json")
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

        let body: Value = response.json();
        assert_eq!(body["code"], "MALFORMED_BODY");
    }

    #[tokio::test]
    async fn test_body_over_limit() {
        let mut config = ResolverConfig::default();
        config.max_body_size = 16;
        let server = create_test_server(config);

        let response = server
            .post("/customers/search")
            .json(&json!({"names": ["Homer", "Marge", "Bart", "Lisa", "Maggie"]}))
            .await;
        assert!(!response.status_code().is_success());
    }
}
