//! Expression literals
//!
//! Literal values of a declaration may be marked as expressions. An
//! [`ExpressionEvaluator`] turns such a literal into its final text.

use crate::core::error::{ExpressionError, ResolveResult};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;
use tera::{Context, Tera};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}:]+)(?::([^}]*))?\}").expect("Invalid regex"));

static EXPRESSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\{([^}]*)\}").expect("Invalid regex"));

/// Evaluates expression literals to text
pub trait ExpressionEvaluator: Send + Sync {
    fn evaluate(&self, expression: &str) -> ResolveResult<String>;
}

/// Evaluator backed by property placeholders and `tera` expressions
///
/// `${key}` and `${key:default}` are substituted from the properties first.
/// Each `#{...}` block is then rendered as a tera expression, so string
/// literals, arithmetic and `~` concatenation work; the properties are
/// available to it as `properties`. Text outside the blocks is kept.
#[derive(Clone, Default)]
pub struct TeraExpressionEvaluator {
    properties: HashMap<String, String>,
}

impl fmt::Debug for TeraExpressionEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TeraExpressionEvaluator")
            .field("properties", &self.properties.len())
            .finish()
    }
}

impl TeraExpressionEvaluator {
    pub fn new(properties: HashMap<String, String>) -> Self {
        Self { properties }
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    fn substitute_placeholders(&self, expression: &str) -> ResolveResult<String> {
        let mut missing = None;
        let substituted = PLACEHOLDER.replace_all(expression, |caps: &Captures| {
            let key = &caps[1];
            match (self.properties.get(key), caps.get(2)) {
                (Some(value), _) => value.clone(),
                (None, Some(default)) => default.as_str().to_string(),
                (None, None) => {
                    missing.get_or_insert_with(|| key.to_string());
                    String::new()
                }
            }
        });

        match missing {
            Some(placeholder) => Err(ExpressionError::UnresolvablePlaceholder {
                placeholder,
                expression: expression.to_string(),
            }
            .into()),
            None => Ok(substituted.into_owned()),
        }
    }
}

impl ExpressionEvaluator for TeraExpressionEvaluator {
    fn evaluate(&self, expression: &str) -> ResolveResult<String> {
        let text = self.substitute_placeholders(expression)?;

        let mut context = Context::new();
        context.insert("properties", &self.properties);

        let mut rendered = String::with_capacity(text.len());
        let mut last = 0;
        for block in EXPRESSION.captures_iter(&text) {
            let (Some(whole), Some(body)) = (block.get(0), block.get(1)) else {
                continue;
            };
            rendered.push_str(&text[last..whole.start()]);
            let value = Tera::one_off(&format!("{{{{ {} }}}}", body.as_str()), &context, false)
                .map_err(|e| malformed(expression, &e))?;
            rendered.push_str(&value);
            last = whole.end();
        }
        rendered.push_str(&text[last..]);

        if rendered.contains("#{") {
            return Err(ExpressionError::Malformed {
                expression: expression.to_string(),
                message: "unterminated expression block".to_string(),
            }
            .into());
        }

        Ok(rendered)
    }
}

fn malformed(expression: &str, error: &tera::Error) -> crate::core::error::ResolveError {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message = format!("{}: {}", message, cause);
        source = cause.source();
    }
    ExpressionError::Malformed {
        expression: expression.to_string(),
        message,
    }
    .into()
}
