//! Conversion of raw request strings into typed field values

use super::error::{ConversionError, ResolveResult};
use super::field::{DATE_FORMAT, DATE_TIME_FORMAT, FieldValue, TIME_FORMAT, ValueType};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// What to do when a raw value cannot be converted to the attribute type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OnTypeMismatch {
    /// Fail the resolution with the rejected values
    Exception,
    /// Drop rejected values; a leaf left without arguments matches nothing
    #[default]
    EmptyResult,
}

impl fmt::Display for OnTypeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OnTypeMismatch::Exception => write!(f, "EXCEPTION"),
            OnTypeMismatch::EmptyResult => write!(f, "EMPTY_RESULT"),
        }
    }
}

/// Converter for types without a built-in rule
///
/// # Example
/// ```rust,ignore
/// struct MoneyConverter;
///
/// impl FallbackConverter for MoneyConverter {
///     fn can_convert(&self, target: &str) -> bool {
///         target == "Money"
///     }
///
///     fn convert(&self, raw: &str, _target: &str) -> anyhow::Result<FieldValue> {
///         Ok(FieldValue::Decimal(raw.trim_end_matches("EUR").parse()?))
///     }
/// }
/// ```
pub trait FallbackConverter: Send + Sync {
    /// Whether raw strings can be converted to `target`
    fn can_convert(&self, target: &str) -> bool;

    /// Convert a raw string to `target`
    fn convert(&self, raw: &str, target: &str) -> anyhow::Result<FieldValue>;
}

/// Result of a multi-value conversion under `EMPTY_RESULT`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Converted {
    /// Accepted values, in input order
    pub values: Vec<FieldValue>,
    /// Rejected raw values, in input order
    pub rejected: Vec<String>,
}

impl Converted {
    /// Whether every input value was rejected
    pub fn all_rejected(&self) -> bool {
        self.values.is_empty() && !self.rejected.is_empty()
    }
}

/// Converts raw strings to typed values under a type-mismatch policy
#[derive(Clone, Default)]
pub struct Converter {
    policy: OnTypeMismatch,
    formats: Vec<String>,
    fallback: Option<Arc<dyn FallbackConverter>>,
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("policy", &self.policy)
            .field("formats", &self.formats)
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

/// Outcome of converting one value
enum Outcome {
    Accepted(FieldValue),
    Rejected,
}

impl Converter {
    /// Create a converter with the given policy
    pub fn new(policy: OnTypeMismatch) -> Self {
        Self {
            policy,
            formats: Vec::new(),
            fallback: None,
        }
    }

    /// Custom date/time formats (chrono strftime syntax), tried in order
    pub fn with_formats(mut self, formats: Vec<String>) -> Self {
        self.formats = formats;
        self
    }

    /// Converter used for [`ValueType::Other`]
    pub fn with_fallback(mut self, fallback: Option<Arc<dyn FallbackConverter>>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn policy(&self) -> OnTypeMismatch {
        self.policy
    }

    /// Convert a single raw value
    ///
    /// Returns `Ok(None)` when the value is rejected under `EMPTY_RESULT`.
    pub fn convert(&self, raw: &str, target: &ValueType) -> ResolveResult<Option<FieldValue>> {
        let converted = self.convert_all(&[raw.to_string()], target)?;
        Ok(converted.values.into_iter().next())
    }

    /// Convert several raw values, preserving order and duplicates
    ///
    /// Under `EXCEPTION` every rejected value is collected before failing, so the
    /// error names all of them.
    pub fn convert_all(&self, raws: &[String], target: &ValueType) -> ResolveResult<Converted> {
        let mut converted = Converted::default();
        for raw in raws {
            match self.convert_one(raw, target)? {
                Outcome::Accepted(value) => converted.values.push(value),
                Outcome::Rejected => converted.rejected.push(raw.clone()),
            }
        }

        if !converted.rejected.is_empty() && self.policy == OnTypeMismatch::Exception {
            return Err(ConversionError::ValuesRejected {
                values: converted.rejected,
                target: target.name(),
            }
            .into());
        }
        Ok(converted)
    }

    fn convert_one(&self, raw: &str, target: &ValueType) -> ResolveResult<Outcome> {
        let value = match target {
            ValueType::String => Some(FieldValue::String(raw.to_string())),
            ValueType::Boolean => match raw {
                "true" => Some(FieldValue::Boolean(true)),
                "false" => Some(FieldValue::Boolean(false)),
                _ => None,
            },
            ValueType::Short => raw
                .parse::<i16>()
                .ok()
                .map(|v| FieldValue::Integer(v.into())),
            ValueType::Integer => raw
                .parse::<i32>()
                .ok()
                .map(|v| FieldValue::Integer(v.into())),
            ValueType::Long => raw.parse::<i64>().ok().map(FieldValue::Integer),
            ValueType::Float | ValueType::Double => {
                raw.parse::<f64>().ok().map(FieldValue::Float)
            }
            ValueType::Decimal => BigDecimal::from_str(raw).ok().map(FieldValue::Decimal),
            ValueType::BigInteger => BigInt::from_str(raw).ok().map(FieldValue::BigInteger),
            ValueType::Uuid => Uuid::parse_str(raw).ok().map(FieldValue::Uuid),
            ValueType::Enum(constants) => constants
                .iter()
                .any(|c| c == raw)
                .then(|| FieldValue::Enum(raw.to_string())),
            ValueType::Date => self
                .parse_with(raw, DATE_FORMAT, |s, f| NaiveDate::parse_from_str(s, f).ok())
                .map(FieldValue::Date),
            ValueType::Time => self
                .parse_with(raw, TIME_FORMAT, |s, f| NaiveTime::parse_from_str(s, f).ok())
                .map(FieldValue::Time),
            ValueType::DateTime => self
                .parse_with(raw, DATE_TIME_FORMAT, |s, f| {
                    NaiveDateTime::parse_from_str(s, f).ok()
                })
                .map(FieldValue::LocalDateTime),
            ValueType::OffsetDateTime | ValueType::ZonedDateTime | ValueType::Timestamp => {
                self.parse_offset(raw).map(FieldValue::DateTime)
            }
            ValueType::Instant => self
                .parse_offset(raw)
                .map(|dt| FieldValue::Instant(dt.with_timezone(&Utc))),
            ValueType::Other(name) => return self.convert_fallback(raw, name),
        };

        Ok(match value {
            Some(value) => Outcome::Accepted(value),
            None => Outcome::Rejected,
        })
    }

    fn convert_fallback(&self, raw: &str, target: &str) -> ResolveResult<Outcome> {
        let Some(fallback) = self.fallback.as_ref().filter(|f| f.can_convert(target)) else {
            return Ok(Outcome::Rejected);
        };

        match fallback.convert(raw, target) {
            Ok(value) => Ok(Outcome::Accepted(value)),
            Err(e) if self.policy == OnTypeMismatch::Exception => Err(ConversionError::Fallback {
                value: raw.to_string(),
                target: target.to_string(),
                message: e.to_string(),
            }
            .into()),
            Err(_) => Ok(Outcome::Rejected),
        }
    }

    /// Parse with the configured formats, or `default` when none are configured
    fn parse_with<T>(&self, raw: &str, default: &str, parse: impl Fn(&str, &str) -> Option<T>) -> Option<T> {
        if self.formats.is_empty() {
            return parse(raw, default);
        }
        self.formats.iter().find_map(|format| parse(raw, format))
    }

    fn parse_offset(&self, raw: &str) -> Option<DateTime<chrono::FixedOffset>> {
        if self.formats.is_empty() {
            return DateTime::parse_from_rfc3339(raw).ok();
        }
        self.formats
            .iter()
            .find_map(|format| DateTime::parse_from_str(raw, format).ok())
    }
}
