//! URL path templates
//!
//! Templates are sequences of `/`-separated segments: literals, `{name}` or
//! `{name:regex}` placeholders, `*` (any one segment) and a trailing `**`
//! (any remainder).

use crate::core::error::{ConfigError, ResolveResult};
use regex::Regex;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Variable { name: String, pattern: Option<Regex> },
    Wildcard,
    Remainder,
}

/// A parsed endpoint path template
#[derive(Debug, Clone)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    pub fn parse(template: &str) -> ResolveResult<Self> {
        let segments = split(template)
            .map(|segment| parse_segment(template, segment))
            .collect::<ResolveResult<Vec<_>>>()?;
        Ok(Self {
            raw: template.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Names of the placeholders, in template order
    pub fn variable_names(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Variable { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn declares(&self, name: &str) -> bool {
        self.variable_names().contains(&name)
    }

    /// Match `path` positionally and extract placeholder values
    ///
    /// Matching is prefix tolerant: placeholders past the end of `path` are
    /// simply absent, and so is a placeholder whose pattern rejects its
    /// segment. Returns `None` only when a literal segment disagrees with the
    /// path, or when the path is longer than the template.
    pub fn extract(&self, path: &str) -> Option<HashMap<String, String>> {
        let actual: Vec<&str> = split(path).collect();
        let mut variables = HashMap::new();

        for (index, segment) in self.segments.iter().enumerate() {
            let Some(value) = actual.get(index) else {
                break;
            };
            match segment {
                Segment::Literal(literal) if literal.as_str() != *value => return None,
                Segment::Literal(_) | Segment::Wildcard => {}
                Segment::Remainder => return Some(variables),
                Segment::Variable { name, pattern } => {
                    if pattern.as_ref().is_none_or(|p| p.is_match(value)) {
                        variables.insert(name.clone(), value.to_string());
                    }
                }
            }
        }

        if actual.len() > self.segments.len() {
            return None;
        }
        Some(variables)
    }

    /// Whether `path` matches every segment of the template, with nothing left
    /// over except under a trailing `**`
    pub fn matches_whole(&self, path: &str) -> bool {
        let actual: Vec<&str> = split(path).collect();
        for (index, segment) in self.segments.iter().enumerate() {
            let matched = match (segment, actual.get(index)) {
                (Segment::Remainder, _) => return true,
                (_, None) => return false,
                (Segment::Literal(literal), Some(value)) => literal.as_str() == *value,
                (Segment::Wildcard, Some(_)) => true,
                (Segment::Variable { pattern, .. }, Some(value)) => {
                    pattern.as_ref().is_none_or(|p| p.is_match(value))
                }
            };
            if !matched {
                return false;
            }
        }
        actual.len() == self.segments.len()
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

fn parse_segment(template: &str, segment: &str) -> ResolveResult<Segment> {
    match segment {
        "*" => return Ok(Segment::Wildcard),
        "**" => return Ok(Segment::Remainder),
        _ => {}
    }

    let Some(inner) = segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) else {
        return Ok(Segment::Literal(segment.to_string()));
    };

    let (name, pattern) = match inner.split_once(':') {
        Some((name, pattern)) => {
            let regex = Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| {
                ConfigError::InvalidTemplate {
                    template: template.to_string(),
                    message: e.to_string(),
                }
            })?;
            (name, Some(regex))
        }
        None => (inner, None),
    };

    if name.is_empty() {
        return Err(ConfigError::InvalidTemplate {
            template: template.to_string(),
            message: "placeholder without a name".to_string(),
        }
        .into());
    }

    Ok(Segment::Variable {
        name: name.to_string(),
        pattern,
    })
}
