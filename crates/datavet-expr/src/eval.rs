//! Expression evaluator
//!
//! Evaluation is vectorised: a reference resolves to a scalar or a column
//! depending on the [`Scope`], scalars broadcast against columns, and two
//! columns combine element-wise when their lengths agree.

use crate::ast::{BinaryOp, Expr, Function, UnaryOp};
use crate::scope::{MaskedScope, Scope};
use crate::{Error, Result};
use datavet_ir::{Value, ValueKey};
use regex::Regex;
use std::borrow::Cow;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::trace;

/// Intermediate evaluation result
#[derive(Debug, Clone, PartialEq)]
pub enum Datum<'a> {
    Scalar(Value),
    Column(Cow<'a, [Value]>),
}

impl Datum<'_> {
    /// Values as a slice; a scalar is a one-element slice
    #[must_use]
    pub fn values(&self) -> &[Value] {
        match self {
            Datum::Scalar(v) => std::slice::from_ref(v),
            Datum::Column(c) => c,
        }
    }
}

/// Outcome of checking a boolean rule
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Verdict {
    /// Whether every element evaluated to `true`
    pub passed: bool,

    /// Positions of the failing elements of a column result
    pub failed_rows: Vec<usize>,

    /// Length of a column result; `None` for a scalar
    pub length: Option<usize>,
}

/// Evaluates expressions, caching compiled regexes across calls
#[derive(Debug, Default)]
pub struct Evaluator {
    regex_cache: RefCell<HashMap<String, Regex>>,
}

impl Evaluator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate an expression to a rule verdict
    ///
    /// # Errors
    ///
    /// Any evaluation fault, including a result that is not boolean.
    pub fn check(&self, expr: &Expr, scope: &dyn Scope) -> Result<Verdict> {
        match self.evaluate(expr, scope)? {
            Datum::Scalar(Value::Boolean(b)) => Ok(Verdict {
                passed: b,
                failed_rows: Vec::new(),
                length: None,
            }),
            Datum::Scalar(Value::Null) => Ok(Verdict {
                passed: false,
                failed_rows: Vec::new(),
                length: None,
            }),
            Datum::Scalar(other) => Err(Error::NonBoolean(other.type_name().to_string())),
            Datum::Column(values) => {
                let mut failed_rows = Vec::new();
                for (index, value) in values.iter().enumerate() {
                    match value {
                        Value::Boolean(true) => {}
                        Value::Boolean(false) | Value::Null => failed_rows.push(index),
                        other => {
                            return Err(Error::NonBoolean(format!(
                                "column of {}",
                                other.type_name()
                            )));
                        }
                    }
                }
                Ok(Verdict {
                    passed: failed_rows.is_empty(),
                    failed_rows,
                    length: Some(values.len()),
                })
            }
        }
    }

    /// Evaluate an expression to a scalar or column
    ///
    /// # Errors
    ///
    /// Unknown references, type or length mismatches, invalid regexes,
    /// division by zero and integer overflow.
    pub fn evaluate<'s>(&self, expr: &Expr, scope: &'s dyn Scope) -> Result<Datum<'s>> {
        match expr {
            Expr::Literal(value) => Ok(Datum::Scalar(value.clone())),
            Expr::List(_) => Err(Error::type_mismatch("list", "list", "scalar context")),
            Expr::Column(column) => scope.lookup(column),
            Expr::Unary { op, expr } => {
                let operand = self.evaluate(expr, scope)?;
                match op {
                    UnaryOp::Not => map(operand, |v| Ok(Value::Boolean(!truthy(v, "not")?))),
                    UnaryOp::Neg => map(operand, negate),
                }
            }
            Expr::Binary {
                op: op @ (BinaryOp::And | BinaryOp::Or),
                left,
                right,
            } => self.logical(*op, left, right, scope),
            Expr::Binary { op, left, right } => {
                let left = self.evaluate(left, scope)?;
                let right = self.evaluate(right, scope)?;
                let op = *op;
                zip_with(left, right, |a, b| apply_binary(op, a, b))
            }
            Expr::In {
                expr,
                set,
                negated,
            } => {
                let subject = self.evaluate(expr, scope)?;
                let set = self.value_set(set, scope)?;
                membership(subject, &set, *negated)
            }
            Expr::IsNull { expr, negated } => {
                let operand = self.evaluate(expr, scope)?;
                let negated = *negated;
                map(operand, |v| Ok(Value::Boolean(v.is_null() != negated)))
            }
            Expr::Matches { expr, pattern } => {
                let subject = self.evaluate(expr, scope)?;
                let pattern = match self.evaluate(pattern, scope)? {
                    Datum::Scalar(Value::Text(p)) => p,
                    other => {
                        let found = other.values().first().map_or("empty", Value::type_name);
                        return Err(Error::type_mismatch("matches", "text", found));
                    }
                };
                let regex = self.regex(&pattern)?;
                map(subject, |v| match v {
                    Value::Text(s) => Ok(Value::Boolean(regex.is_match(s))),
                    Value::Null => Ok(Value::Boolean(false)),
                    other => Err(Error::type_mismatch("matches", other.type_name(), "text")),
                })
            }
            Expr::Call { function, args } => self.call(*function, args, scope),
        }
    }

    /// Short-circuiting `and`/`or`
    ///
    /// The right operand is only evaluated where the left one leaves the
    /// result open.
    fn logical<'s>(
        &self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        scope: &'s dyn Scope,
    ) -> Result<Datum<'s>> {
        let settles = op == BinaryOp::Or;
        let name = op.symbol();
        let left = match self.evaluate(left, scope)? {
            Datum::Scalar(value) => {
                if truthy(&value, name)? == settles {
                    return Ok(Datum::Scalar(Value::Boolean(settles)));
                }
                return map(self.evaluate(right, scope)?, |v| {
                    Ok(Value::Boolean(truthy(v, name)?))
                });
            }
            Datum::Column(values) => values,
        };

        let mut open = Vec::new();
        for (index, value) in left.iter().enumerate() {
            if truthy(value, name)? != settles {
                open.push(index);
            }
        }
        let mut result = vec![Value::Boolean(settles); left.len()];
        if open.is_empty() {
            return Ok(Datum::Column(Cow::Owned(result)));
        }

        let masked = MaskedScope::new(scope, &open, left.len());
        match self.evaluate(right, &masked)? {
            Datum::Scalar(value) => {
                let b = truthy(&value, name)?;
                for &index in &open {
                    result[index] = Value::Boolean(b);
                }
            }
            Datum::Column(values) => {
                if values.len() != open.len() {
                    return Err(Error::LengthMismatch {
                        left: left.len(),
                        right: values.len(),
                    });
                }
                for (&index, value) in open.iter().zip(values.iter()) {
                    result[index] = Value::Boolean(truthy(value, name)?);
                }
            }
        }
        Ok(Datum::Column(Cow::Owned(result)))
    }

    fn regex(&self, pattern: &str) -> Result<Regex> {
        if let Some(regex) = self.regex_cache.borrow().get(pattern) {
            return Ok(regex.clone());
        }
        let regex = Regex::new(pattern).map_err(|e| Error::InvalidRegex {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        trace!("Compiled rule pattern: {}", pattern);
        self.regex_cache
            .borrow_mut()
            .insert(pattern.to_string(), regex.clone());
        Ok(regex)
    }

    /// Values an aggregate or membership test ranges over.
    ///
    /// A bare column reference always means the whole column, even in row scope.
    fn range<'s>(&self, expr: &Expr, scope: &'s dyn Scope) -> Result<Cow<'s, [Value]>> {
        let scope = scope.unmasked();
        match expr {
            Expr::Column(column) => scope.column(column).map(Cow::Borrowed),
            Expr::List(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    match self.evaluate(item, scope)? {
                        Datum::Scalar(v) => values.push(v),
                        Datum::Column(c) => values.extend(c.iter().cloned()),
                    }
                }
                Ok(Cow::Owned(values))
            }
            other => match self.evaluate(other, scope)? {
                Datum::Scalar(v) => Ok(Cow::Owned(vec![v])),
                Datum::Column(c) => Ok(c),
            },
        }
    }

    fn value_set(&self, expr: &Expr, scope: &dyn Scope) -> Result<HashSet<ValueKey>> {
        Ok(self
            .range(expr, scope)?
            .iter()
            .filter(|v| !v.is_null())
            .map(Value::key)
            .collect())
    }

    fn call<'s>(&self, function: Function, args: &[Expr], scope: &'s dyn Scope) -> Result<Datum<'s>> {
        let (min, max) = function.arity();
        if args.len() < min || args.len() > max {
            return Err(Error::Arity {
                function: function.name().to_string(),
                expected: if min == max {
                    min.to_string()
                } else {
                    format!("{min}-{max}")
                },
                found: args.len(),
            });
        }

        if function == Function::Count && args.is_empty() {
            let rows = scope.row_count()?;
            return Ok(Datum::Scalar(Value::Integer(to_i64(rows))));
        }

        if function.is_aggregate() {
            let values = self.range(&args[0], scope)?;
            return aggregate(function, &values).map(Datum::Scalar);
        }

        match function {
            Function::IsIn => {
                let subject = self.evaluate(&args[0], scope)?;
                let set = self.value_set(&args[1], scope)?;
                membership(subject, &set, false)
            }
            Function::Len => map(self.evaluate(&args[0], scope)?, |v| match v {
                Value::Null => Ok(Value::Null),
                Value::Text(s) => Ok(Value::Integer(to_i64(s.chars().count()))),
                other => Ok(Value::Integer(to_i64(other.to_string().chars().count()))),
            }),
            Function::Lower | Function::Upper => {
                let upper = function == Function::Upper;
                map(self.evaluate(&args[0], scope)?, |v| match v {
                    Value::Null => Ok(Value::Null),
                    Value::Text(s) if upper => Ok(Value::Text(s.to_uppercase())),
                    Value::Text(s) => Ok(Value::Text(s.to_lowercase())),
                    other => Err(Error::type_mismatch(function.name(), other.type_name(), "text")),
                })
            }
            Function::Coalesce => {
                let first = self.evaluate(&args[0], scope)?;
                let fallback = self.evaluate(&args[1], scope)?;
                zip_with(first, fallback, |a, b| {
                    Ok(if a.is_null() { b.clone() } else { a.clone() })
                })
            }
            other => Err(Error::type_mismatch(other.name(), "column", "scalar function")),
        }
    }
}

fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Apply a function to every element
fn map<'s>(datum: Datum<'s>, f: impl Fn(&Value) -> Result<Value>) -> Result<Datum<'s>> {
    match datum {
        Datum::Scalar(v) => f(&v).map(Datum::Scalar),
        Datum::Column(values) => values
            .iter()
            .map(f)
            .collect::<Result<Vec<_>>>()
            .map(|v| Datum::Column(Cow::Owned(v))),
    }
}

/// Combine two operands element-wise, broadcasting scalars
fn zip_with<'s>(
    left: Datum<'s>,
    right: Datum<'s>,
    f: impl Fn(&Value, &Value) -> Result<Value>,
) -> Result<Datum<'s>> {
    match (left, right) {
        (Datum::Scalar(a), Datum::Scalar(b)) => f(&a, &b).map(Datum::Scalar),
        (Datum::Column(a), Datum::Scalar(b)) => map(Datum::Column(a), |x| f(x, &b)),
        (Datum::Scalar(a), Datum::Column(b)) => map(Datum::Column(b), |x| f(&a, x)),
        (Datum::Column(a), Datum::Column(b)) => {
            if a.len() != b.len() {
                return Err(Error::LengthMismatch {
                    left: a.len(),
                    right: b.len(),
                });
            }
            a.iter()
                .zip(b.iter())
                .map(|(x, y)| f(x, y))
                .collect::<Result<Vec<_>>>()
                .map(|v| Datum::Column(Cow::Owned(v)))
        }
    }
}

fn membership<'s>(subject: Datum<'s>, set: &HashSet<ValueKey>, negated: bool) -> Result<Datum<'s>> {
    map(subject, |v| {
        if v.is_null() {
            return Ok(Value::Boolean(false));
        }
        Ok(Value::Boolean(set.contains(&v.key()) != negated))
    })
}

/// Null counts as false in logical context
fn truthy(value: &Value, op: &str) -> Result<bool> {
    match value {
        Value::Boolean(b) => Ok(*b),
        Value::Null => Ok(false),
        other => Err(Error::type_mismatch(op, other.type_name(), "boolean")),
    }
}

fn negate(value: &Value) -> Result<Value> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Integer(i) => i
            .checked_neg()
            .map(Value::Integer)
            .ok_or_else(|| Error::Overflow("-".to_string())),
        Value::Decimal(d) => Ok(Value::Decimal(-d)),
        other => Err(Error::type_mismatch("-", other.type_name(), "number")),
    }
}

fn apply_binary(op: BinaryOp, a: &Value, b: &Value) -> Result<Value> {
    match op {
        BinaryOp::And => Ok(Value::Boolean(truthy(a, "and")? && truthy(b, "and")?)),
        BinaryOp::Or => Ok(Value::Boolean(truthy(a, "or")? || truthy(b, "or")?)),
        op if op.is_comparison() => compare(op, a, b).map(Value::Boolean),
        op => arithmetic(op, a, b),
    }
}

fn compare(op: BinaryOp, a: &Value, b: &Value) -> Result<bool> {
    if a.is_null() || b.is_null() {
        return Ok(false);
    }
    let ordering = a
        .compare(b)
        .ok_or_else(|| Error::type_mismatch(op.symbol(), a.type_name(), b.type_name()))?;
    Ok(match op {
        BinaryOp::Eq => ordering == Ordering::Equal,
        BinaryOp::Ne => ordering != Ordering::Equal,
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::Le => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::Ge => ordering != Ordering::Less,
        _ => false,
    })
}

#[allow(clippy::cast_precision_loss)] // i64 -> f64 widening matches decimal arithmetic.
fn arithmetic(op: BinaryOp, a: &Value, b: &Value) -> Result<Value> {
    if a.is_null() || b.is_null() {
        return Ok(Value::Null);
    }
    let symbol = op.symbol();
    match (a, b) {
        (Value::Text(x), Value::Text(y)) if op == BinaryOp::Add => Ok(Value::Text(format!("{x}{y}"))),
        (Value::Integer(x), Value::Integer(y)) => {
            let result = match op {
                BinaryOp::Add => x.checked_add(*y),
                BinaryOp::Sub => x.checked_sub(*y),
                BinaryOp::Mul => x.checked_mul(*y),
                BinaryOp::Div => {
                    if *y == 0 {
                        return Err(Error::DivisionByZero);
                    }
                    return Ok(Value::Decimal(*x as f64 / *y as f64));
                }
                BinaryOp::Rem => {
                    if *y == 0 {
                        return Err(Error::DivisionByZero);
                    }
                    x.checked_rem(*y)
                }
                _ => None,
            };
            result
                .map(Value::Integer)
                .ok_or_else(|| Error::Overflow(symbol.to_string()))
        }
        (x, y) if x.is_numeric() && y.is_numeric() => {
            let (Some(x), Some(y)) = (x.as_f64(), y.as_f64()) else {
                return Err(Error::type_mismatch(symbol, a.type_name(), b.type_name()));
            };
            let result = match op {
                BinaryOp::Add => x + y,
                BinaryOp::Sub => x - y,
                BinaryOp::Mul => x * y,
                BinaryOp::Div | BinaryOp::Rem if y == 0.0 => return Err(Error::DivisionByZero),
                BinaryOp::Div => x / y,
                BinaryOp::Rem => x % y,
                _ => return Err(Error::type_mismatch(symbol, a.type_name(), b.type_name())),
            };
            if result.is_finite() {
                Ok(Value::Decimal(result))
            } else {
                Err(Error::Overflow(symbol.to_string()))
            }
        }
        _ => Err(Error::type_mismatch(symbol, a.type_name(), b.type_name())),
    }
}

#[allow(clippy::cast_precision_loss)]
fn aggregate(function: Function, values: &[Value]) -> Result<Value> {
    let present = values.iter().filter(|v| !v.is_null());
    match function {
        Function::Count => Ok(Value::Integer(to_i64(present.count()))),
        Function::Sum => {
            let mut int_sum: Option<i64> = Some(0);
            let mut float_sum = 0.0;
            for value in present {
                match value {
                    Value::Integer(i) => {
                        int_sum = int_sum.and_then(|s| s.checked_add(*i));
                        float_sum += *i as f64;
                    }
                    Value::Decimal(d) => {
                        int_sum = None;
                        float_sum += d;
                    }
                    other => return Err(Error::type_mismatch("sum", other.type_name(), "number")),
                }
            }
            Ok(int_sum.map_or(Value::Decimal(float_sum), Value::Integer))
        }
        Function::Mean => {
            let mut total = 0.0;
            let mut n = 0_u32;
            for value in present {
                let x = value
                    .as_f64()
                    .ok_or_else(|| Error::type_mismatch("mean", value.type_name(), "number"))?;
                total += x;
                n += 1;
            }
            Ok(if n == 0 {
                Value::Null
            } else {
                Value::Decimal(total / f64::from(n))
            })
        }
        Function::Min | Function::Max => {
            let want = if function == Function::Min {
                Ordering::Less
            } else {
                Ordering::Greater
            };
            let mut best: Option<&Value> = None;
            for value in present {
                best = match best {
                    None => Some(value),
                    Some(current) => {
                        let ordering = value.compare(current).ok_or_else(|| {
                            Error::type_mismatch(function.name(), value.type_name(), current.type_name())
                        })?;
                        Some(if ordering == want { value } else { current })
                    }
                };
            }
            Ok(best.cloned().unwrap_or(Value::Null))
        }
        Function::All | Function::Any => {
            let mut all = true;
            let mut any = false;
            for value in values {
                let b = truthy(value, function.name())?;
                all &= b;
                any |= b;
            }
            Ok(Value::Boolean(if function == Function::All { all } else { any }))
        }
        other => Err(Error::type_mismatch(other.name(), "column", "aggregate")),
    }
}
