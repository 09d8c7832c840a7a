//! Typed cell values
#![allow(clippy::must_use_candidate)] // Small accessors are clear at call sites without #[must_use].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A coerced cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Free text
    Text(String),

    /// 64-bit signed integer
    Integer(i64),

    /// Floating point decimal
    Decimal(f64),

    /// Calendar date
    Date(NaiveDate),

    /// Boolean flag
    Boolean(bool),

    /// Missing value
    Null,
}

/// Hashable identity of a value, used for duplicate detection and set membership.
///
/// Integers and integral decimals share a key so that `1` and `1.0` collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueKey {
    Text(String),
    Number(String),
    Date(NaiveDate),
    Boolean(bool),
    Null,
}

impl Value {
    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the value (integers widen to `f64`)
    #[allow(clippy::cast_precision_loss)] // i64 -> f64 widening matches decimal arithmetic.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// Text view of the value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean view of the value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Whether the value is an integer or decimal
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Decimal(_))
    }

    /// Name of the value's type, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Integer(_) => "integer",
            Value::Decimal(_) => "decimal",
            Value::Date(_) => "date",
            Value::Boolean(_) => "boolean",
            Value::Null => "null",
        }
    }

    /// Hashable key for this value
    pub fn key(&self) -> ValueKey {
        match self {
            Value::Text(s) => ValueKey::Text(s.clone()),
            Value::Integer(i) => ValueKey::Number(i.to_string()),
            Value::Decimal(d) => ValueKey::Number(format_decimal(*d)),
            Value::Date(d) => ValueKey::Date(*d),
            Value::Boolean(b) => ValueKey::Boolean(*b),
            Value::Null => ValueKey::Null,
        }
    }

    /// Compare two values.
    ///
    /// Numbers compare across integer/decimal, text compares lexically,
    /// dates compare chronologically and may be compared against ISO text.
    /// Null and mismatched types are unordered.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Text(b)) => parse_iso_date(b).map(|b| a.cmp(&b)),
            (Value::Text(a), Value::Date(b)) => parse_iso_date(a).map(|a| a.cmp(b)),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (a, b) if a.is_numeric() && b.is_numeric() => {
                a.as_f64()?.partial_cmp(&b.as_f64()?)
            }
            _ => None,
        }
    }

    /// Equality used by rule expressions: numeric across types, never equal to null
    pub fn loose_eq(&self, other: &Value) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Decimal(d) => write!(f, "{}", format_decimal(*d)),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Null => Ok(()),
        }
    }
}

fn format_decimal(d: f64) -> String {
    if d.fract() == 0.0 && d.abs() < 1e15 {
        format!("{d:.0}")
    } else {
        d.to_string()
    }
}

fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_comparison_across_types() {
        assert_eq!(
            Value::Integer(2).compare(&Value::Decimal(2.5)),
            Some(Ordering::Less)
        );
        assert!(Value::Integer(3).loose_eq(&Value::Decimal(3.0)));
        assert!(!Value::Integer(3).loose_eq(&Value::Text("3".to_string())));
    }

    #[test]
    fn test_null_is_unordered() {
        assert_eq!(Value::Null.compare(&Value::Null), None);
        assert!(!Value::Null.loose_eq(&Value::Null));
    }

    #[test]
    fn test_date_compares_with_iso_text() {
        let date = Value::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(
            date.compare(&Value::Text("2024-01-31".to_string())),
            Some(Ordering::Greater)
        );
        assert_eq!(date.compare(&Value::Text("not a date".to_string())), None);
    }

    #[test]
    fn test_integral_decimal_shares_key_with_integer() {
        assert_eq!(Value::Decimal(7.0).key(), Value::Integer(7).key());
        assert_ne!(Value::Decimal(7.5).key(), Value::Integer(7).key());
        assert_ne!(Value::Text("7".to_string()).key(), Value::Integer(7).key());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Decimal(10.0).to_string(), "10");
        assert_eq!(Value::Decimal(10.25).to_string(), "10.25");
        assert_eq!(
            Value::Date(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()).to_string(),
            "2024-01-05"
        );
        assert_eq!(Value::Null.to_string(), "");
    }
}
