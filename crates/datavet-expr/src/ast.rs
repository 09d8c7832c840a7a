//! Expression tree

use datavet_ir::Value;
use std::fmt;

/// Reference to a column, optionally qualified by dataset
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub dataset: Option<String>,
    pub name: String,
}

impl ColumnRef {
    /// Unqualified reference
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            dataset: None,
            name: name.into(),
        }
    }

    /// Dataset-qualified reference
    pub fn qualified(dataset: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            dataset: Some(dataset.into()),
            name: name.into(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.dataset {
            Some(dataset) => write!(f, "{dataset}.{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A parsed rule expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),

    /// `[a, b, c]`
    List(Vec<Expr>),

    Column(ColumnRef),

    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },

    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// `x in [..]`, `x not in other.column`
    In {
        expr: Box<Expr>,
        set: Box<Expr>,
        negated: bool,
    },

    /// `x is null`, `x is not null`
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },

    /// `x matches 'regex'`
    Matches {
        expr: Box<Expr>,
        pattern: Box<Expr>,
    },

    Call {
        function: Function,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    /// Operator symbol, used in error messages
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        }
    }

    /// Whether the operator compares two values
    #[must_use]
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

/// Closed set of callable functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Sum,
    Count,
    Min,
    Max,
    Mean,
    IsIn,
    Len,
    Lower,
    Upper,
    Coalesce,
    All,
    Any,
}

impl Function {
    /// Look a function up by name (case-insensitive)
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let function = match name.to_ascii_lowercase().as_str() {
            "sum" => Function::Sum,
            "count" => Function::Count,
            "min" => Function::Min,
            "max" => Function::Max,
            "mean" | "avg" => Function::Mean,
            "isin" => Function::IsIn,
            "len" | "length" => Function::Len,
            "lower" => Function::Lower,
            "upper" => Function::Upper,
            "coalesce" => Function::Coalesce,
            "all" => Function::All,
            "any" => Function::Any,
            _ => return None,
        };
        Some(function)
    }

    /// Canonical name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Function::Sum => "sum",
            Function::Count => "count",
            Function::Min => "min",
            Function::Max => "max",
            Function::Mean => "mean",
            Function::IsIn => "isin",
            Function::Len => "len",
            Function::Lower => "lower",
            Function::Upper => "upper",
            Function::Coalesce => "coalesce",
            Function::All => "all",
            Function::Any => "any",
        }
    }

    /// Accepted argument counts (inclusive)
    #[must_use]
    pub fn arity(self) -> (usize, usize) {
        match self {
            Function::Count => (0, 1),
            Function::IsIn | Function::Coalesce => (2, 2),
            _ => (1, 1),
        }
    }

    /// Whether the function reduces a whole column to one value
    #[must_use]
    pub fn is_aggregate(self) -> bool {
        matches!(
            self,
            Function::Sum
                | Function::Count
                | Function::Min
                | Function::Max
                | Function::Mean
                | Function::All
                | Function::Any
        )
    }
}

impl Expr {
    /// Every column referenced anywhere in the expression, in source order
    #[must_use]
    pub fn references(&self) -> Vec<&ColumnRef> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a ColumnRef>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Column(column) => out.push(column),
            Expr::List(items) | Expr::Call { args: items, .. } => {
                for item in items {
                    item.collect_references(out);
                }
            }
            Expr::Unary { expr, .. } | Expr::IsNull { expr, .. } => expr.collect_references(out),
            Expr::Binary { left, right, .. } => {
                left.collect_references(out);
                right.collect_references(out);
            }
            Expr::In { expr, set, .. } => {
                expr.collect_references(out);
                set.collect_references(out);
            }
            Expr::Matches { expr, pattern } => {
                expr.collect_references(out);
                pattern.collect_references(out);
            }
        }
    }

    /// Shorthand for a column node
    pub fn column(name: impl Into<String>) -> Self {
        Expr::Column(ColumnRef::new(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_lookup() {
        assert_eq!(Function::from_name("SUM"), Some(Function::Sum));
        assert_eq!(Function::from_name("avg"), Some(Function::Mean));
        assert_eq!(Function::from_name("eval"), None);
        assert_eq!(Function::Count.arity(), (0, 1));
        assert!(Function::Max.is_aggregate());
        assert!(!Function::IsIn.is_aggregate());
    }

    #[test]
    fn test_references_in_source_order() {
        let expr = Expr::Binary {
            op: BinaryOp::And,
            left: Box::new(Expr::column("a")),
            right: Box::new(Expr::Call {
                function: Function::IsIn,
                args: vec![
                    Expr::Column(ColumnRef::qualified("x", "b")),
                    Expr::Column(ColumnRef::qualified("y", "c")),
                ],
            }),
        };
        let names: Vec<String> = expr.references().iter().map(ToString::to_string).collect();
        assert_eq!(names, vec!["a", "x.b", "y.c"]);
    }
}
