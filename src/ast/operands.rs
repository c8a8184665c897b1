use std::borrow::Cow;
use std::fmt;

use crate::ast::operators::Comparison;
use crate::context::Context;
use crate::error::{VarqlError, VarqlResult};
use crate::literal::coerce_value;
use crate::path::{self, Rows};
use crate::value::Value;

/// A registered source plus a dotted path into it (FROM).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub name: String,
    /// Empty when the whole root is selected.
    pub path: String,
}

impl Source {
    /// Resolve into rows against the context.
    pub fn resolve(&self, ctx: &Context) -> VarqlResult<Rows> {
        let root = ctx.get(&self.name)?;
        path::resolve_rows(root, &self.path).map_err(|err| match err {
            VarqlError::PathNotFound { segment, .. } => {
                VarqlError::path_not_found(self.to_string(), segment)
            }
            other => other,
        })
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.name, self.path)
        }
    }
}

/// A projected field (SELECT).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    /// `*`
    Wildcard,
    Path(String),
}

impl Field {
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Field::Wildcard)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Wildcard => write!(f, "*"),
            Field::Path(path) => write!(f, "{}", path),
        }
    }
}

/// One side of a condition.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionArgument {
    /// An already coerced literal
    Literal(Value),
    /// A path into the record under test, written with an optional
    /// leading alias segment (`movie.rating`).
    Path { alias: Option<String>, path: String },
}

impl ConditionArgument {
    /// The argument's value for one record.
    pub fn value_for<'a>(&'a self, record: &Value) -> VarqlResult<Cow<'a, Value>> {
        match self {
            ConditionArgument::Literal(value) => Ok(Cow::Borrowed(value)),
            ConditionArgument::Path { path, .. } => {
                let found = path::resolve(record, path)?;
                Ok(Cow::Owned(coerce_value(found)))
            }
        }
    }
}

impl fmt::Display for ConditionArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionArgument::Literal(Value::String(s)) => {
                write!(f, "'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
            }
            ConditionArgument::Literal(Value::Timestamp(ts)) => {
                write!(f, "{}", ts.format("%Y-%m-%dT%H:%M:%S%.f"))
            }
            ConditionArgument::Literal(value) => write!(f, "{}", value),
            ConditionArgument::Path {
                alias: Some(alias),
                path,
            } => write!(f, "{}.{}", alias, path),
            ConditionArgument::Path { alias: None, path } => write!(f, "{}", path),
        }
    }
}

/// `attribute OP value`, evaluated per record (WHERE).
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub attribute: ConditionArgument,
    pub op: Comparison,
    pub value: ConditionArgument,
}

impl Condition {
    /// Evaluate against one record.
    pub fn evaluate(&self, record: &Value) -> VarqlResult<bool> {
        let left = self.attribute.value_for(record)?;
        let right = self.value.value_for(record)?;
        Ok(self.op.apply(&left, &right))
    }

    /// One mask entry per record.
    pub fn mask(&self, rows: &[Value]) -> VarqlResult<Vec<bool>> {
        rows.iter().map(|row| self.evaluate(row)).collect()
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.attribute, self.op, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn movie() -> Value {
        json!({"status": "active", "rating": "4.5", "meta": {"year": 2023}}).into()
    }

    fn path(p: &str) -> ConditionArgument {
        ConditionArgument::Path {
            alias: None,
            path: p.to_string(),
        }
    }

    #[test]
    fn test_condition_evaluate() {
        let cond = Condition {
            attribute: path("status"),
            op: Comparison::Eq,
            value: ConditionArgument::Literal("active".into()),
        };
        assert!(cond.evaluate(&movie()).unwrap());
    }

    #[test]
    fn test_record_strings_are_coerced() {
        let cond = Condition {
            attribute: path("rating"),
            op: Comparison::Gt,
            value: ConditionArgument::Literal(Value::Float(4.0)),
        };
        assert!(cond.evaluate(&movie()).unwrap());
    }

    #[test]
    fn test_missing_path_is_fatal() {
        let cond = Condition {
            attribute: path("meta.month"),
            op: Comparison::Eq,
            value: ConditionArgument::Literal(1.into()),
        };
        assert!(cond.evaluate(&movie()).is_err());
    }

    #[test]
    fn test_display() {
        let cond = Condition {
            attribute: path("status"),
            op: Comparison::Ne,
            value: ConditionArgument::Path {
                alias: Some("m".into()),
                path: "previous".into(),
            },
        };
        assert_eq!(cond.to_string(), "status != m.previous");
        let source = Source {
            name: "state".into(),
            path: String::new(),
        };
        assert_eq!(source.to_string(), "state");
    }
}
