//! Integration tests for YAML-defined filter types

use specarg::core::error::ConfigError;
use specarg::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

const CUSTOMER_FILTERS: &str = r#"
spel_support: true
on_type_mismatch: EXCEPTION
properties:
  default.gender: FEMALE

filters:
  - name: NameFilter
    schema:
      gold: long
    declarations:
      - kind: spec
        path: lastName
        spec: Equal
        params: [lastName]

  - name: CustomerSearch
    extends: [NameFilter]
    declarations:
      - kind: or
        specs:
          - path: gender
            spec: Equal
            params: [gender]
            default_val: ["${default.gender}"]
            value_in_spel: true
          - path: gold
            spec: GreaterThan
            params: [minGold]
"#;

fn homer() -> Value {
    json!({"lastName": "Simpson", "gender": "MALE", "gold": 50})
}

fn marge() -> Value {
    json!({"lastName": "Simpson", "gender": "FEMALE", "gold": 10})
}

#[test]
fn test_parse_resolver_settings() {
    let config = ResolverConfig::from_yaml_str(CUSTOMER_FILTERS).unwrap();

    assert!(config.spel_support);
    assert_eq!(config.on_type_mismatch, OnTypeMismatch::Exception);
    assert_eq!(config.properties["default.gender"], "FEMALE");
    assert_eq!(config.filters.len(), 2);
    assert_eq!(config.max_body_size, 2 * 1024 * 1024);
}

#[test]
fn test_registry_builds_inheritance() {
    let config = ResolverConfig::from_yaml_str(CUSTOMER_FILTERS).unwrap();
    let registry = config.registry().unwrap();

    let search = registry.get("CustomerSearch").unwrap();
    assert!(search.is_subtype_of("NameFilter"));
    assert_eq!(search.parents().len(), 1);
    assert!(registry.get("NameFilter").is_some());
}

#[test]
fn test_configured_filter_resolves() {
    let config = ResolverConfig::from_yaml_str(CUSTOMER_FILTERS).unwrap();
    let search = config.registry().unwrap().get("CustomerSearch").unwrap();
    let resolver = SpecificationResolver::new(config);

    let context = WebRequestContext::new("/customers").param("lastName", "Simpson");
    let filter = resolver
        .resolve_proxy(&MethodParameter::of(search.clone()), &context)
        .unwrap();
    assert!(filter.matches(&marge()));
    assert!(!filter.matches(&homer()));

    let context = WebRequestContext::new("/customers")
        .param("lastName", "Simpson")
        .param("minGold", "20");
    let filter = resolver
        .resolve_proxy(&MethodParameter::of(search), &context)
        .unwrap();
    assert!(filter.matches(&marge()));
    assert!(filter.matches(&homer()));
}

#[test]
fn test_configured_mismatch_policy_applies() {
    let config = ResolverConfig::from_yaml_str(CUSTOMER_FILTERS).unwrap();
    let name_filter = config.registry().unwrap().get("NameFilter").unwrap();
    let search = Arc::new(
        FilterType::new("GoldOnly")
            .extends(name_filter)
            .with(SpecDecl::new("gold", SpecKind::Equal).params(["gold"])),
    );
    let resolver = SpecificationResolver::new(config);

    let context = WebRequestContext::new("/").param("gold", "plenty");
    let err = resolver
        .resolve_proxy(&MethodParameter::of(search), &context)
        .unwrap_err();
    assert_eq!(err.error_code(), "VALUES_REJECTED");
}

#[test]
fn test_unknown_parent_is_rejected() {
    let yaml = r#"
filters:
  - name: Orphan
    extends: [Missing]
"#;
    let config = ResolverConfig::from_yaml_str(yaml).unwrap();
    let err = config.registry().unwrap_err();
    assert!(matches!(
        err,
        ResolveError::Config(ConfigError::UnknownFilterType { ref name }) if name == "Missing"
    ));
}

#[test]
fn test_inheritance_cycle_is_rejected() {
    let yaml = r#"
filters:
  - name: A
    extends: [B]
  - name: B
    extends: [A]
"#;
    let config = ResolverConfig::from_yaml_str(yaml).unwrap();
    let err = config.registry().unwrap_err();
    assert!(matches!(
        err,
        ResolveError::Config(ConfigError::CyclicInheritance { .. })
    ));
}

#[test]
fn test_load_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(CUSTOMER_FILTERS.as_bytes()).unwrap();

    let config = ResolverConfig::from_yaml_file(file.path().to_str().unwrap()).unwrap();
    assert_eq!(config.filters.len(), 2);
}

#[test]
fn test_missing_file() {
    let err = ResolverConfig::from_yaml_file("/nonexistent/filters.yaml").unwrap_err();
    assert!(matches!(
        err,
        ResolveError::Config(ConfigError::FileNotFound { .. })
    ));
}

#[test]
fn test_malformed_yaml_names_file() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"filters: [name: {").unwrap();
    let path = file.path().to_str().unwrap().to_string();

    let err = ResolverConfig::from_yaml_file(&path).unwrap_err();
    match err {
        ResolveError::Config(ConfigError::ParseError { file, .. }) => {
            assert_eq!(file.as_deref(), Some(path.as_str()));
        }
        other => panic!("Expected ConfigError::ParseError, got {:?}", other),
    }
}
