//! Parsed JSON request body

use crate::core::error::{RequestError, ResolveResult};
use serde_json::Value;

/// A JSON body parsed once and queried by dot path
#[derive(Debug, Clone, PartialEq)]
pub struct JsonBody {
    root: Value,
}

impl JsonBody {
    pub fn parse(bytes: &[u8]) -> ResolveResult<Self> {
        let root = serde_json::from_slice(bytes).map_err(|e| RequestError::MalformedBody {
            message: e.to_string(),
        })?;
        Ok(Self { root })
    }

    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Raw values at a dot-separated `path`
    ///
    /// Arrays met before the last segment are traversed element-wise. The
    /// value found must be a primitive or an array of primitives; `null` and
    /// missing keys give `None`.
    pub fn values(&self, path: &str) -> ResolveResult<Option<Vec<String>>> {
        let mut current = vec![&self.root];
        for key in path.split('.') {
            current = current
                .into_iter()
                .flat_map(|value| descend(value, key))
                .collect();
        }

        let mut values = Vec::new();
        for value in current {
            match value {
                Value::Null => {}
                Value::Object(_) => {
                    return Err(invalid(path, "an object is not a valid filter value"));
                }
                Value::Array(items) => {
                    for item in items {
                        match item {
                            Value::Null => {}
                            Value::Object(_) | Value::Array(_) => {
                                return Err(invalid(
                                    path,
                                    "an array of non-primitive values is not a valid filter value",
                                ));
                            }
                            primitive => values.push(primitive_text(primitive)),
                        }
                    }
                }
                primitive => values.push(primitive_text(primitive)),
            }
        }

        Ok((!values.is_empty()).then_some(values))
    }
}

fn descend<'a>(value: &'a Value, key: &str) -> Vec<&'a Value> {
    match value {
        Value::Object(map) => map.get(key).into_iter().collect(),
        Value::Array(items) => items.iter().flat_map(|item| descend(item, key)).collect(),
        _ => Vec::new(),
    }
}

fn primitive_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn invalid(path: &str, message: &str) -> crate::core::error::ResolveError {
    RequestError::InvalidJsonValue {
        path: path.to_string(),
        message: message.to_string(),
    }
    .into()
}
