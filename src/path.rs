//! Dotted path resolution.

use crate::error::{VarqlError, VarqlResult};
use crate::value::Value;

/// Rows a source resolved to.
#[derive(Debug, Clone, PartialEq)]
pub struct Rows {
    pub rows: Vec<Value>,
    /// The resolved value was not a sequence and was wrapped into one row.
    pub scalar: bool,
}

impl Rows {
    /// The value this source contributes to a combination operator:
    /// the bare value for a wrapped scalar, the whole list otherwise.
    pub fn into_value(self) -> Value {
        if self.scalar {
            self.rows.into_iter().next().unwrap_or(Value::Null)
        } else {
            Value::List(self.rows)
        }
    }
}

/// Follow `path` from `root`. An empty path returns `root`.
pub fn resolve<'a>(root: &'a Value, path: &str) -> VarqlResult<&'a Value> {
    if path.is_empty() {
        return Ok(root);
    }
    path.split('.').try_fold(root, |current, segment| {
        current
            .child(segment)
            .ok_or_else(|| VarqlError::path_not_found(path, segment))
    })
}

/// Follow `path` with list semantics.
///
/// A list of lists is flattened one level, a list is returned as is, and
/// any other value becomes a single scalar row.
pub fn resolve_rows(root: &Value, path: &str) -> VarqlResult<Rows> {
    let value = resolve(root, path)?;
    let rows = match value {
        Value::List(items) if items.iter().all(|item| matches!(item, Value::List(_))) => Rows {
            rows: items
                .iter()
                .filter_map(Value::as_list)
                .flat_map(|inner| inner.iter().cloned())
                .collect(),
            scalar: false,
        },
        Value::List(items) => Rows {
            rows: items.clone(),
            scalar: false,
        },
        other => Rows {
            rows: vec![other.clone()],
            scalar: true,
        },
    };
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn state() -> Value {
        json!({
            "user": {"profile": {"firstname": "John"}},
            "shelves": [["a", "b"], ["c"]],
            "mixed": [["a"], "b"],
            "movies": [{"title": "Alien"}],
        })
        .into()
    }

    #[test]
    fn test_resolve_nested() {
        let state = state();
        assert_eq!(
            resolve(&state, "user.profile.firstname").unwrap(),
            &Value::from("John")
        );
        assert_eq!(resolve(&state, "movies.0.title").unwrap(), &Value::from("Alien"));
        assert_eq!(resolve(&state, "").unwrap(), &state);
    }

    #[test]
    fn test_resolve_missing_segment() {
        let err = resolve(&state(), "user.settings.theme").unwrap_err();
        match err {
            VarqlError::PathNotFound { path, segment } => {
                assert_eq!(path, "user.settings.theme");
                assert_eq!(segment, "settings");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_rows_flatten_one_level() {
        let rows = resolve_rows(&state(), "shelves").unwrap();
        assert_eq!(rows.rows, vec!["a".into(), "b".into(), "c".into()] as Vec<Value>);
        assert!(!rows.scalar);
    }

    #[test]
    fn test_rows_mixed_list_not_flattened() {
        let rows = resolve_rows(&state(), "mixed").unwrap();
        assert_eq!(rows.rows.len(), 2);
    }

    #[test]
    fn test_rows_wrap_scalar() {
        let rows = resolve_rows(&state(), "user.profile.firstname").unwrap();
        assert_eq!(rows.rows, vec![Value::from("John")]);
        assert!(rows.scalar);
        assert_eq!(rows.into_value(), Value::from("John"));
    }
}
