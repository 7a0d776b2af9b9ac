//! Field value types

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use uuid::Uuid;

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";
pub(crate) const TIME_FORMAT: &str = "%H:%M:%S";
pub(crate) const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Type of an entity attribute, used as the conversion target for raw values
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    String,
    Boolean,
    Short,
    Integer,
    Long,
    Float,
    Double,
    Decimal,
    BigInteger,
    Uuid,
    Date,
    Time,
    DateTime,
    OffsetDateTime,
    ZonedDateTime,
    Instant,
    Timestamp,
    /// Enumeration with its constant names
    Enum(Vec<String>),
    /// Any other type, handled by a fallback converter
    Other(String),
}

impl ValueType {
    /// Human-readable name used in error messages
    pub fn name(&self) -> String {
        match self {
            ValueType::Enum(constants) => format!("Enum{:?}", constants),
            ValueType::Other(name) => name.clone(),
            other => format!("{:?}", other),
        }
    }
}

/// A polymorphic field value that can hold different types
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Float(f64),
    Decimal(BigDecimal),
    BigInteger(BigInt),
    Boolean(bool),
    Uuid(Uuid),
    Date(NaiveDate),
    Time(NaiveTime),
    LocalDateTime(NaiveDateTime),
    DateTime(DateTime<FixedOffset>),
    Instant(DateTime<Utc>),
    Enum(String),
    Null,
}

impl FieldValue {
    /// Get the value as a string if possible
    pub fn as_string(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) | FieldValue::Enum(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as an integer if possible
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the value as a boolean if possible
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the value as a UUID if possible
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            FieldValue::Uuid(u) => Some(*u),
            _ => None,
        }
    }

    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Compare this value with a JSON value read from a record
    ///
    /// The JSON value is interpreted with this value's type; `None` means the
    /// two are not comparable.
    pub fn compare_json(&self, other: &Value) -> Option<Ordering> {
        match self {
            FieldValue::String(s) | FieldValue::Enum(s) => {
                other.as_str().map(|o| o.cmp(s.as_str()).reverse())
            }
            FieldValue::Integer(i) => match other {
                Value::Number(n) => match n.as_i64() {
                    Some(o) => Some(i.cmp(&o)),
                    None => n.as_f64().and_then(|o| (*i as f64).partial_cmp(&o)),
                },
                Value::String(s) => s.parse::<i64>().ok().map(|o| i.cmp(&o)),
                _ => None,
            },
            FieldValue::Float(f) => match other {
                Value::Number(n) => n.as_f64().and_then(|o| f.partial_cmp(&o)),
                Value::String(s) => s.parse::<f64>().ok().and_then(|o| f.partial_cmp(&o)),
                _ => None,
            },
            FieldValue::Decimal(d) => json_decimal(other).map(|o| d.cmp(&o)),
            FieldValue::BigInteger(i) => {
                json_decimal(other).map(|o| BigDecimal::new(i.clone(), 0).cmp(&o))
            }
            FieldValue::Boolean(b) => other.as_bool().map(|o| b.cmp(&o)),
            FieldValue::Uuid(u) => other
                .as_str()
                .and_then(|s| Uuid::parse_str(s).ok())
                .map(|o| u.cmp(&o)),
            FieldValue::Date(d) => other
                .as_str()
                .and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok())
                .map(|o| d.cmp(&o)),
            FieldValue::Time(t) => other
                .as_str()
                .and_then(|s| NaiveTime::parse_from_str(s, TIME_FORMAT).ok())
                .map(|o| t.cmp(&o)),
            FieldValue::LocalDateTime(dt) => other
                .as_str()
                .and_then(|s| NaiveDateTime::parse_from_str(s, DATE_TIME_FORMAT).ok())
                .map(|o| dt.cmp(&o)),
            FieldValue::DateTime(dt) => other
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|o| dt.cmp(&o)),
            FieldValue::Instant(dt) => other
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|o| dt.cmp(&o.with_timezone(&Utc))),
            FieldValue::Null => other.is_null().then_some(Ordering::Equal),
        }
    }
}

fn json_decimal(value: &Value) -> Option<BigDecimal> {
    match value {
        Value::Number(n) => BigDecimal::from_str(&n.to_string()).ok(),
        Value::String(s) => BigDecimal::from_str(s).ok(),
        _ => None,
    }
}

// Floats compare bitwise so that equality stays reflexive and agrees with Hash.
impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldValue::String(a), FieldValue::String(b)) => a == b,
            (FieldValue::Integer(a), FieldValue::Integer(b)) => a == b,
            (FieldValue::Float(a), FieldValue::Float(b)) => a.to_bits() == b.to_bits(),
            (FieldValue::Decimal(a), FieldValue::Decimal(b)) => a == b,
            (FieldValue::BigInteger(a), FieldValue::BigInteger(b)) => a == b,
            (FieldValue::Boolean(a), FieldValue::Boolean(b)) => a == b,
            (FieldValue::Uuid(a), FieldValue::Uuid(b)) => a == b,
            (FieldValue::Date(a), FieldValue::Date(b)) => a == b,
            (FieldValue::Time(a), FieldValue::Time(b)) => a == b,
            (FieldValue::LocalDateTime(a), FieldValue::LocalDateTime(b)) => a == b,
            (FieldValue::DateTime(a), FieldValue::DateTime(b)) => a == b,
            (FieldValue::Instant(a), FieldValue::Instant(b)) => a == b,
            (FieldValue::Enum(a), FieldValue::Enum(b)) => a == b,
            (FieldValue::Null, FieldValue::Null) => true,
            _ => false,
        }
    }
}

impl Eq for FieldValue {}

impl Hash for FieldValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            FieldValue::String(s) | FieldValue::Enum(s) => s.hash(state),
            FieldValue::Integer(i) => i.hash(state),
            FieldValue::Float(f) => f.to_bits().hash(state),
            // 10.5 == 10.50
            FieldValue::Decimal(d) => d.normalized().hash(state),
            FieldValue::BigInteger(i) => i.hash(state),
            FieldValue::Boolean(b) => b.hash(state),
            FieldValue::Uuid(u) => u.hash(state),
            FieldValue::Date(d) => d.hash(state),
            FieldValue::Time(t) => t.hash(state),
            FieldValue::LocalDateTime(dt) => dt.hash(state),
            FieldValue::DateTime(dt) => dt.hash(state),
            FieldValue::Instant(dt) => dt.hash(state),
            FieldValue::Null => {}
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(s) | FieldValue::Enum(s) => write!(f, "{}", s),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Decimal(d) => write!(f, "{}", d),
            FieldValue::BigInteger(i) => write!(f, "{}", i),
            FieldValue::Boolean(b) => write!(f, "{}", b),
            FieldValue::Uuid(u) => write!(f, "{}", u),
            FieldValue::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            FieldValue::Time(t) => write!(f, "{}", t.format(TIME_FORMAT)),
            FieldValue::LocalDateTime(dt) => write!(f, "{}", dt.format(DATE_TIME_FORMAT)),
            FieldValue::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            FieldValue::Instant(dt) => write!(f, "{}", dt.to_rfc3339()),
            FieldValue::Null => write!(f, "null"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}
