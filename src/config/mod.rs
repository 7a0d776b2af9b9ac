//! Resolver configuration loading

use crate::core::convert::OnTypeMismatch;
use crate::core::declaration::MissingPathVarPolicy;
use crate::core::error::{ConfigError, ResolveResult};
use crate::core::filter_type::{FilterRegistry, FilterTypeConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const DEFAULT_MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

fn default_max_body_size() -> usize {
    DEFAULT_MAX_BODY_SIZE
}

fn default_cache_declarations() -> bool {
    true
}

/// Configuration of a [`SpecificationResolver`](crate::core::resolver::SpecificationResolver)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Evaluate literals marked as expressions
    #[serde(default)]
    pub spel_support: bool,

    /// Policy for declarations that do not set one
    #[serde(default)]
    pub on_type_mismatch: OnTypeMismatch,

    /// Policy for declarations that do not set one
    #[serde(default)]
    pub missing_path_var_policy: MissingPathVarPolicy,

    /// Values for `${...}` placeholders in expressions
    #[serde(default)]
    pub properties: HashMap<String, String>,

    /// Upper bound on the request body read by the extractor, in bytes
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,

    /// Memoize declaration trees per filter type
    #[serde(default = "default_cache_declarations")]
    pub cache_declarations: bool,

    /// Filter types defined in configuration
    #[serde(default)]
    pub filters: Vec<FilterTypeConfig>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            spel_support: false,
            on_type_mismatch: OnTypeMismatch::default(),
            missing_path_var_policy: MissingPathVarPolicy::default(),
            properties: HashMap::new(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            cache_declarations: true,
            filters: Vec::new(),
        }
    }
}

impl ResolverConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> ResolveResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::FileNotFound {
                path: path.to_string(),
            },
            _ => ConfigError::IoError {
                message: e.to_string(),
            },
        })?;
        serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                file: Some(path.to_string()),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> ResolveResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Filter types defined in this configuration
    pub fn registry(&self) -> ResolveResult<FilterRegistry> {
        FilterRegistry::from_config(&self.filters)
    }

    pub fn with_spel_support(mut self, enabled: bool) -> Self {
        self.spel_support = enabled;
        self
    }

    pub fn with_on_type_mismatch(mut self, policy: OnTypeMismatch) -> Self {
        self.on_type_mismatch = policy;
        self
    }

    pub fn with_missing_path_var_policy(mut self, policy: MissingPathVarPolicy) -> Self {
        self.missing_path_var_policy = policy;
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}
