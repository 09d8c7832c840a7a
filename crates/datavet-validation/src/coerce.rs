//! Type coercion
//!
//! One conversion per [`FieldType`]: raw cell text in, typed [`Value`] out.

use chrono::NaiveDate;
use datavet_ir::Value;
use datavet_schema::{FieldSpec, FieldType};
use thiserror::Error;

/// Date format used when a date field declares none
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

const TRUTHY: &[&str] = &["true", "t", "yes", "y", "si", "sí", "1"];
const FALSY: &[&str] = &["false", "f", "no", "n", "0"];

/// A cell that could not be converted to its field's type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoercionError {
    #[error("Field '{field}' is required but empty")]
    Missing { field: String },

    #[error("Field '{field}' is not a valid {expected}: '{value}'")]
    Invalid {
        field: String,
        expected: &'static str,
        value: String,
    },

    #[error("Field '{field}' date '{value}' does not match any format ({formats})")]
    UnparseableDate {
        field: String,
        value: String,
        formats: String,
    },

    #[error("Field '{field}' date '{value}' is ambiguous: {candidates}")]
    AmbiguousDate {
        field: String,
        value: String,
        candidates: String,
    },

    #[error("Field '{field}' value '{value}' is not one of: {options}")]
    NotAnOption {
        field: String,
        value: String,
        options: String,
    },
}

impl CoercionError {
    /// The offending raw value, if any
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Missing { .. } => None,
            Self::Invalid { value, .. }
            | Self::UnparseableDate { value, .. }
            | Self::AmbiguousDate { value, .. }
            | Self::NotAnOption { value, .. } => Some(value),
        }
    }
}

/// Whether a cell counts as missing
#[must_use]
pub fn is_missing(raw: &str) -> bool {
    raw.trim().is_empty()
}

/// Convert a raw cell to the field's type
///
/// Missing cells are an error on required fields; otherwise the field's
/// default is converted in their place, or the value stays null.
///
/// # Errors
///
/// Returns a [`CoercionError`] describing why the cell does not fit the field.
pub fn coerce(raw: &str, field: &FieldSpec) -> Result<Value, CoercionError> {
    if is_missing(raw) {
        if field.required {
            return Err(CoercionError::Missing {
                field: field.name.clone(),
            });
        }
        return match &field.default {
            Some(default) if !is_missing(default) => convert(default, field),
            _ => Ok(Value::Null),
        };
    }
    convert(raw, field)
}

fn convert(raw: &str, field: &FieldSpec) -> Result<Value, CoercionError> {
    let invalid = |expected| CoercionError::Invalid {
        field: field.name.clone(),
        expected,
        value: raw.to_string(),
    };

    match field.field_type {
        FieldType::Text => Ok(Value::Text(raw.to_string())),
        FieldType::Integer => parse_integer(raw.trim())
            .map(Value::Integer)
            .ok_or_else(|| invalid("integer")),
        FieldType::Decimal => parse_decimal(raw.trim())
            .map(Value::Decimal)
            .ok_or_else(|| invalid("decimal")),
        FieldType::Boolean => parse_boolean(raw.trim())
            .map(Value::Boolean)
            .ok_or_else(|| invalid("boolean")),
        FieldType::Date => parse_date(raw.trim(), field).map(Value::Date),
        FieldType::Enum => {
            if field.options.iter().any(|o| o == raw) {
                Ok(Value::Text(raw.to_string()))
            } else {
                Err(CoercionError::NotAnOption {
                    field: field.name.clone(),
                    value: raw.to_string(),
                    options: field.options.join(", "),
                })
            }
        }
    }
}

/// Optional sign followed by ASCII digits
#[must_use]
pub fn parse_integer(text: &str) -> Option<i64> {
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.strip_prefix('+').unwrap_or(text).parse().ok()
}

/// Optional sign, digits with at most one `.`, optional exponent
///
/// Thousands separators, `inf` and `nan` are rejected.
#[must_use]
pub fn parse_decimal(text: &str) -> Option<f64> {
    let body = text.strip_prefix(['+', '-']).unwrap_or(text);
    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(pos) => (&body[..pos], Some(&body[pos + 1..])),
        None => (body, None),
    };

    let mut digits = 0;
    let mut dots = 0;
    for b in mantissa.bytes() {
        match b {
            b'0'..=b'9' => digits += 1,
            b'.' => dots += 1,
            _ => return None,
        }
    }
    if digits == 0 || dots > 1 {
        return None;
    }
    if let Some(exponent) = exponent {
        let exp_digits = exponent.strip_prefix(['+', '-']).unwrap_or(exponent);
        if exp_digits.is_empty() || !exp_digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
    }

    text.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Case-insensitive truthy/falsy tokens
#[must_use]
pub fn parse_boolean(text: &str) -> Option<bool> {
    let lower = text.to_lowercase();
    if TRUTHY.contains(&lower.as_str()) {
        Some(true)
    } else if FALSY.contains(&lower.as_str()) {
        Some(false)
    } else {
        None
    }
}

fn parse_date(text: &str, field: &FieldSpec) -> Result<NaiveDate, CoercionError> {
    let formats: Vec<&str> = if field.formats.is_empty() {
        vec![DEFAULT_DATE_FORMAT]
    } else {
        field.formats.iter().map(String::as_str).collect()
    };

    let mut matches: Vec<(NaiveDate, &str)> = Vec::new();
    for &format in &formats {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            if !matches.iter().any(|(d, _)| *d == date) {
                matches.push((date, format));
            }
        }
    }

    match matches.as_slice() {
        [] => Err(CoercionError::UnparseableDate {
            field: field.name.clone(),
            value: text.to_string(),
            formats: formats.join(", "),
        }),
        [(date, _)] => Ok(*date),
        several => Err(CoercionError::AmbiguousDate {
            field: field.name.clone(),
            value: text.to_string(),
            candidates: several
                .iter()
                .map(|(date, format)| format!("{} ({})", date.format("%Y-%m-%d"), format))
                .collect::<Vec<_>>()
                .join(" or "),
        }),
    }
}
