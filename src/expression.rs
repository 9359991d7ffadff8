//! Filter predicates and their compilation into parameterised SQL.
//!
//! A [`Where`] is a small tree of comparisons joined by `and`/`or`.
//! [`Expression`] walks it once, in order, emitting SQL text in which every
//! bound value is replaced by a placeholder `:argN` and collecting the values
//! in the same order, so that `arguments()[i]` always binds `:argI`.

use std::fmt;
use std::ops;

use crate::value::Value;

/// Comparison operators recognised at the end of a shorthand left side,
/// longest first so that `<=` is not read as `=`.
const OPERATORS: [&str; 7] = ["<>", "!=", "<=", ">=", "=", "<", ">"];

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Raw column text, emitted as is.
    Column(String),
    /// A value bound through a placeholder.
    Value(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Where {
    /// A bare column name or raw SQL fragment.
    Column(String),
    Compare {
        left: Operand,
        op: String,
        right: Operand,
    },
    And(Box<Where>, Box<Where>),
    Or(Box<Where>, Box<Where>),
}

impl Where {
    /// Compares a column with a bound value. The left side may carry the
    /// operator, e.g. `"key = "`, `" key="` or `"length >"`; surrounding
    /// whitespace is ignored and `=` is assumed when no operator is given.
    pub fn new<V: Into<Value>>(left: &str, value: V) -> Where {
        let (column, op) = split_operator(left);
        Where::Compare {
            left: Operand::Column(column),
            op,
            right: Operand::Value(value.into()),
        }
    }

    /// Compares a column with a bound value using an explicit operator.
    pub fn with_op<V: Into<Value>>(column: &str, op: &str, value: V) -> Where {
        Where::Compare {
            left: Operand::Column(column.trim().to_string()),
            op: op.trim().to_string(),
            right: Operand::Value(value.into()),
        }
    }

    /// Starts a comparison on `name`.
    pub fn column(name: &str) -> ColumnRef {
        ColumnRef(name.trim().to_string())
    }

    pub fn and(self, other: Where) -> Where {
        Where::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Where) -> Where {
        Where::Or(Box::new(self), Box::new(other))
    }

    /// The left operand, for comparisons.
    pub fn left(&self) -> Option<&Operand> {
        match self {
            Where::Compare { left, .. } => Some(left),
            _ => None,
        }
    }

    pub fn op(&self) -> Option<&str> {
        match self {
            Where::Compare { op, .. } => Some(op),
            _ => None,
        }
    }

    pub fn right(&self) -> Option<&Operand> {
        match self {
            Where::Compare { right, .. } => Some(right),
            _ => None,
        }
    }
}

fn split_operator(left: &str) -> (String, String) {
    let trimmed = left.trim();
    let lowered = trimmed.to_ascii_lowercase();
    if lowered.ends_with(" like") {
        let column = trimmed[..trimmed.len() - 4].trim();
        return (column.to_string(), "like".to_string());
    }
    for op in OPERATORS {
        if let Some(column) = trimmed.strip_suffix(op) {
            return (column.trim().to_string(), op.to_string());
        }
    }
    (trimmed.to_string(), "=".to_string())
}

impl ops::BitAnd for Where {
    type Output = Where;
    fn bitand(self, other: Where) -> Where {
        self.and(other)
    }
}

impl ops::BitOr for Where {
    type Output = Where;
    fn bitor(self, other: Where) -> Where {
        self.or(other)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Operand::Column(text) => write!(f, "{}", text),
            Operand::Value(value) => write!(f, "{}", value),
        }
    }
}

/// Readable form with values inlined, e.g. `( price <= 10 ) and ( qty > 100 )`.
/// Use [`Expression`] for the parameterised form.
impl fmt::Display for Where {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Where::Column(text) => write!(f, "{}", text),
            Where::Compare { left, op, right } => write!(f, "{} {} {}", left, op, right),
            Where::And(l, r) => write!(f, "( {} ) and ( {} )", l, r),
            Where::Or(l, r) => write!(f, "( {} ) or ( {} )", l, r),
        }
    }
}

// ------------- ColumnRef -------------
/// Left side of a comparison under construction.
#[derive(Debug, Clone)]
pub struct ColumnRef(String);

impl ColumnRef {
    pub fn name(&self) -> &str {
        &self.0
    }
    pub fn compare<V: Into<Value>>(self, op: &str, value: V) -> Where {
        Where::Compare {
            left: Operand::Column(self.0),
            op: op.to_string(),
            right: Operand::Value(value.into()),
        }
    }
    pub fn eq<V: Into<Value>>(self, value: V) -> Where {
        self.compare("=", value)
    }
    pub fn ne<V: Into<Value>>(self, value: V) -> Where {
        self.compare("<>", value)
    }
    pub fn lt<V: Into<Value>>(self, value: V) -> Where {
        self.compare("<", value)
    }
    pub fn le<V: Into<Value>>(self, value: V) -> Where {
        self.compare("<=", value)
    }
    pub fn gt<V: Into<Value>>(self, value: V) -> Where {
        self.compare(">", value)
    }
    pub fn ge<V: Into<Value>>(self, value: V) -> Where {
        self.compare(">=", value)
    }
    /// Column to column equality.
    pub fn equal(self, other: &str) -> Where {
        Where::Compare {
            left: Operand::Column(self.0),
            op: "=".to_string(),
            right: Operand::Column(other.trim().to_string()),
        }
    }
    pub fn not_equal(self, other: &str) -> Where {
        Where::Compare {
            left: Operand::Column(self.0),
            op: "<>".to_string(),
            right: Operand::Column(other.trim().to_string()),
        }
    }
}

impl From<ColumnRef> for Where {
    fn from(column: ColumnRef) -> Where {
        Where::Column(column.0)
    }
}

// ------------- Expression -------------
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expression {
    string: String,
    arguments: Vec<Value>,
}

impl Expression {
    pub fn new(filter: &Where) -> Self {
        let mut expression = Expression::default();
        expression.string = expression.compile(filter);
        expression
    }

    fn compile(&mut self, node: &Where) -> String {
        match node {
            Where::Column(text) => text.clone(),
            Where::Compare { left, op, right } => {
                let left = self.operand(left);
                let right = self.operand(right);
                format!("{} {} {}", left, op, right)
            }
            Where::And(l, r) => {
                let l = self.compile(l);
                let r = self.compile(r);
                format!("({}) and ({})", l, r)
            }
            Where::Or(l, r) => {
                let l = self.compile(l);
                let r = self.compile(r);
                format!("({}) or ({})", l, r)
            }
        }
    }

    fn operand(&mut self, operand: &Operand) -> String {
        match operand {
            Operand::Column(text) => text.clone(),
            Operand::Value(value) => {
                let placeholder = format!(":{}", placeholder_name(self.arguments.len()));
                self.arguments.push(value.clone());
                placeholder
            }
        }
    }

    pub fn string(&self) -> &str {
        &self.string
    }
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }
    pub fn is_empty(&self) -> bool {
        self.string.is_empty()
    }
    /// Arguments paired with their placeholder names (without the colon).
    pub fn bindings(&self) -> Vec<(String, Value)> {
        self.arguments
            .iter()
            .enumerate()
            .map(|(i, v)| (placeholder_name(i), v.clone()))
            .collect()
    }
}

pub fn placeholder_name(index: usize) -> String {
    format!("arg{}", index)
}

impl From<Where> for Expression {
    fn from(filter: Where) -> Self {
        Expression::new(&filter)
    }
}
