use std::cmp::Ordering;
use std::fmt;

use crate::error::{VarqlError, VarqlResult};
use crate::value::Value;

/// An operator table: a closed set of symbols with a fixed priority order.
///
/// When an operand scans its text for a splitting symbol, the first entry of
/// [`Symbol::ORDER`] whose padded form (`" SYM "`) occurs anywhere wins,
/// regardless of where it occurs.
pub trait Symbol: Copy + fmt::Debug + fmt::Display + 'static {
    /// Declared order; doubles as tie-break priority.
    const ORDER: &'static [Self];

    fn symbol(self) -> &'static str;

    /// Find the winning symbol in `text`, with the byte offset of its padded form.
    fn find(text: &str) -> Option<(Self, usize)> {
        Self::ORDER.iter().find_map(|op| {
            let padded = format!(" {} ", op.symbol());
            text.find(&padded).map(|pos| (*op, pos))
        })
    }

    /// Strip a symbol that starts `text` and is followed by whitespace.
    fn strip_leading(text: &str) -> Option<(Self, &str)> {
        Self::ORDER.iter().find_map(|op| {
            let rest = text.strip_prefix(op.symbol())?;
            rest.starts_with(char::is_whitespace).then_some((*op, rest))
        })
    }
}

/// A binary operator linking two operands of a chain by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link<P> {
    pub op: P,
    pub left: usize,
    pub right: usize,
}

impl<P> Link<P> {
    /// Link the operand at `left` with the one parsed right after it.
    pub fn new(op: P, left: usize) -> Self {
        Self {
            op,
            left,
            right: left + 1,
        }
    }
}

/// Operator table for clauses whose operands are never linked (SELECT).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoOperator {}

impl Symbol for NoOperator {
    const ORDER: &'static [Self] = &[];

    fn symbol(self) -> &'static str {
        match self {}
    }
}

impl fmt::Display for NoOperator {
    fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

/// Per-record comparison inside a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
    Contains,
    NotContains,
}

impl Symbol for Comparison {
    const ORDER: &'static [Self] = &[
        Comparison::Eq,
        Comparison::Ne,
        Comparison::Gt,
        Comparison::Lt,
        Comparison::Gte,
        Comparison::Lte,
        Comparison::Contains,
        Comparison::NotContains,
    ];

    fn symbol(self) -> &'static str {
        match self {
            Comparison::Eq => "==",
            Comparison::Ne => "!=",
            Comparison::Gt => ">",
            Comparison::Lt => "<",
            Comparison::Gte => ">=",
            Comparison::Lte => "<=",
            Comparison::Contains => "CONTAINS",
            Comparison::NotContains => "NOT_CONTAINS",
        }
    }
}

impl Comparison {
    /// Compare two values. Type mismatches are `false`, never an error.
    pub fn apply(self, left: &Value, right: &Value) -> bool {
        match self {
            Comparison::Eq => loose_eq(left, right),
            Comparison::Ne => !loose_eq(left, right),
            Comparison::Gt => compatible_cmp(left, right) == Some(Ordering::Greater),
            Comparison::Lt => compatible_cmp(left, right) == Some(Ordering::Less),
            Comparison::Gte => matches!(
                compatible_cmp(left, right),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Comparison::Lte => matches!(
                compatible_cmp(left, right),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Comparison::Contains => contains(left, right).unwrap_or(false),
            Comparison::NotContains => contains(left, right).map(|c| !c).unwrap_or(false),
        }
    }
}

/// Equality with numeric widening (`4 == 4.0`, `true == 1`).
fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
        (Value::Bool(a), Value::Int(b)) | (Value::Int(b), Value::Bool(a)) => *a as i64 == *b,
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| loose_eq(x, y))
        }
        (Value::Map(a), Value::Map(b)) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b)
                    .all(|((ka, va), (kb, vb))| ka == kb && loose_eq(va, vb))
        }
        _ => left == right,
    }
}

/// Ordering between values of compatible runtime types, `None` otherwise.
///
/// Types are compatible when they are the same kind, or bool and int.
/// Int and float are distinct kinds.
fn compatible_cmp(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Int(b)) => Some((*a as i64).cmp(b)),
        (Value::Int(a), Value::Bool(b)) => Some(a.cmp(&(*b as i64))),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
        (Value::List(a), Value::List(b)) => {
            for (x, y) in a.iter().zip(b) {
                if !loose_eq(x, y) {
                    return compatible_cmp(x, y);
                }
            }
            Some(a.len().cmp(&b.len()))
        }
        _ => None,
    }
}

/// Case-insensitive substring test on text forms; `None` unless the left
/// side is a string or list.
fn contains(left: &Value, right: &Value) -> Option<bool> {
    match left {
        Value::String(_) | Value::List(_) => {
            let haystack = left.to_text().to_lowercase();
            let needle = right.to_text().to_lowercase();
            Some(haystack.contains(&needle))
        }
        _ => None,
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Combines condition masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logical {
    And,
    Or,
}

impl Symbol for Logical {
    const ORDER: &'static [Self] = &[Logical::And, Logical::Or];

    fn symbol(self) -> &'static str {
        match self {
            Logical::And => "AND",
            Logical::Or => "OR",
        }
    }
}

impl Logical {
    pub fn apply(self, left: bool, right: bool) -> bool {
        match self {
            Logical::And => left && right,
            Logical::Or => left || right,
        }
    }

    /// Element-wise application over two masks of equal length.
    pub fn apply_masks(self, left: &[bool], right: &[bool]) -> VarqlResult<Vec<bool>> {
        if left.len() != right.len() {
            return Err(VarqlError::MaskLength {
                left: left.len(),
                right: right.len(),
            });
        }
        Ok(left
            .iter()
            .zip(right)
            .map(|(a, b)| self.apply(*a, *b))
            .collect())
    }
}

impl fmt::Display for Logical {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Combines source values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combination {
    Add,
    Sub,
    Mul,
    Div,
}

impl Symbol for Combination {
    const ORDER: &'static [Self] = &[
        Combination::Add,
        Combination::Sub,
        Combination::Mul,
        Combination::Div,
    ];

    fn symbol(self) -> &'static str {
        match self {
            Combination::Add => "+",
            Combination::Sub => "-",
            Combination::Mul => "*",
            Combination::Div => "/",
        }
    }
}

impl Combination {
    /// Combine two values.
    ///
    /// `+` adds numbers, concatenates lists, and otherwise joins the text
    /// forms with a single space. `-`, `*` and `/` need numbers; `/` always
    /// yields a float. Booleans take part in arithmetic as `0` and `1`.
    pub fn apply(self, left: Value, right: Value) -> VarqlResult<Value> {
        let symbol = self.symbol();
        let (left, right) = if is_arithmetic(&left) && is_arithmetic(&right) {
            (bool_as_int(left), bool_as_int(right))
        } else {
            (left, right)
        };
        match (self, left, right) {
            (Combination::Add, Value::List(mut a), Value::List(b)) => {
                a.extend(b);
                Ok(Value::List(a))
            }
            (Combination::Add, left, right) if !(left.is_numeric() && right.is_numeric()) => {
                Ok(Value::String(format!("{} {}", left, right)))
            }
            (Combination::Div, left, right) => {
                let (a, b) = numeric_pair(symbol, &left, &right)?;
                if b == 0.0 {
                    return Err(VarqlError::operator(symbol, "division by zero"));
                }
                Ok(Value::Float(a / b))
            }
            (op, Value::Int(a), Value::Int(b)) => {
                let result = match op {
                    Combination::Add => a.checked_add(b),
                    Combination::Sub => a.checked_sub(b),
                    _ => a.checked_mul(b),
                };
                result
                    .map(Value::Int)
                    .ok_or_else(|| VarqlError::operator(symbol, "integer overflow"))
            }
            (op, left, right) => {
                let (a, b) = numeric_pair(symbol, &left, &right)?;
                Ok(Value::Float(match op {
                    Combination::Add => a + b,
                    Combination::Sub => a - b,
                    _ => a * b,
                }))
            }
        }
    }
}

/// Numbers and booleans; booleans count as 0 and 1.
fn is_arithmetic(value: &Value) -> bool {
    matches!(value, Value::Int(_) | Value::Float(_) | Value::Bool(_))
}

fn bool_as_int(value: Value) -> Value {
    match value {
        Value::Bool(b) => Value::Int(b as i64),
        other => other,
    }
}

fn numeric_pair(symbol: &'static str, left: &Value, right: &Value) -> VarqlResult<(f64, f64)> {
    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(VarqlError::operator(
            symbol,
            format!("unsupported operand types {} and {}", left.kind(), right.kind()),
        )),
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}
