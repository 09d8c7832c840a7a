//! Field constraints checked after coercion

use datavet_ir::Value;
use datavet_schema::FieldSpec;
use regex::Regex;

/// Declarative limits on one field's values
#[derive(Debug, Clone, Default)]
pub struct Constraint {
    field: String,
    /// Minimum length in characters
    pub min_length: Option<usize>,
    /// Maximum length in characters
    pub max_length: Option<usize>,
    /// Minimum numeric value
    pub min_value: Option<f64>,
    /// Maximum numeric value
    pub max_value: Option<f64>,
    pattern: Option<(String, Regex)>,
}

/// A value outside its field's limits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Which limit was broken (`min_length`, `pattern`, ...)
    pub constraint: &'static str,
    pub message: String,
}

impl Constraint {
    /// Create an empty constraint for a field
    #[must_use]
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ..Self::default()
        }
    }

    /// Build the constraint declared on a field
    ///
    /// # Errors
    ///
    /// Returns the regex error when the field's pattern does not compile.
    pub fn from_field(spec: &FieldSpec) -> Result<Self, regex::Error> {
        let mut constraint = Self::new(&spec.name);
        constraint.min_length = spec.min_length;
        constraint.max_length = spec.max_length;
        constraint.min_value = spec.min_value;
        constraint.max_value = spec.max_value;
        if let Some(pattern) = &spec.pattern {
            constraint = constraint.pattern(pattern)?;
        }
        Ok(constraint)
    }

    #[must_use]
    pub fn min_length(mut self, len: usize) -> Self {
        self.min_length = Some(len);
        self
    }

    #[must_use]
    pub fn max_length(mut self, len: usize) -> Self {
        self.max_length = Some(len);
        self
    }

    #[must_use]
    pub fn range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_value = min;
        self.max_value = max;
        self
    }

    /// Require the whole value to match a regex
    ///
    /// # Errors
    ///
    /// Returns the regex error when the pattern does not compile.
    pub fn pattern(mut self, pattern: &str) -> Result<Self, regex::Error> {
        let anchored = Regex::new(&format!("^(?:{pattern})$"))?;
        self.pattern = Some((pattern.to_string(), anchored));
        Ok(self)
    }

    /// Whether the constraint checks anything
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min_length.is_none()
            && self.max_length.is_none()
            && self.min_value.is_none()
            && self.max_value.is_none()
            && self.pattern.is_none()
    }

    /// Check a coerced value; `raw` is the cell text it came from
    ///
    /// Null values satisfy every constraint.
    #[must_use]
    pub fn check(&self, raw: &str, value: &Value) -> Vec<Violation> {
        let mut violations = Vec::new();
        if value.is_null() {
            return violations;
        }

        let text = value.as_str().unwrap_or_else(|| raw.trim());
        let len = text.chars().count();
        if let Some(min) = self.min_length {
            if len < min {
                violations.push(self.violation(
                    "min_length",
                    format!("is shorter than {min} character(s) (length {len})"),
                ));
            }
        }
        if let Some(max) = self.max_length {
            if len > max {
                violations.push(self.violation(
                    "max_length",
                    format!("is longer than {max} character(s) (length {len})"),
                ));
            }
        }

        if let Some(number) = value.as_f64() {
            if let Some(min) = self.min_value {
                if number < min {
                    violations.push(self.violation("min_value", format!("is below the minimum {min}")));
                }
            }
            if let Some(max) = self.max_value {
                if number > max {
                    violations.push(self.violation("max_value", format!("is above the maximum {max}")));
                }
            }
        }

        if let Some((pattern, regex)) = &self.pattern {
            if !regex.is_match(text) {
                violations.push(
                    self.violation("pattern", format!("does not match pattern '{pattern}'")),
                );
            }
        }
        violations
    }

    fn violation(&self, constraint: &'static str, what: String) -> Violation {
        Violation {
            constraint,
            message: format!("Field '{}' {}", self.field, what),
        }
    }
}
