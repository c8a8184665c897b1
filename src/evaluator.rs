//! Expression evaluation.
//!
//! Sources are resolved and combined into one working value, conditions turn
//! into one boolean mask per condition, masks are folded into one, and the
//! surviving records are projected onto the selected fields.

use std::collections::BTreeMap;

use tracing::debug;

use crate::ast::{Chain, Condition, Expression, Field, Logical};
use crate::context::Context;
use crate::error::VarqlResult;
use crate::path::{self, Rows};
use crate::value::Value;

impl Expression {
    /// Evaluate against the sources registered in `ctx`.
    ///
    /// Returns a scalar when the sources combine into one, otherwise a
    /// [`Value::List`] of (projected) records. Repeated calls against the
    /// same context return the same result.
    pub fn evaluate(&self, ctx: &Context) -> VarqlResult<Value> {
        debug!(expression = %self, "evaluating");

        let Rows { mut rows, mut scalar } = self.working_rows(ctx)?;

        if let Some(conditions) = &self.conditions {
            let mask = filter_mask(conditions, &rows)?;
            rows = rows
                .into_iter()
                .zip(mask)
                .filter_map(|(row, keep)| keep.then_some(row))
                .collect();
            scalar = false;
            debug!(kept = rows.len(), "filtered");
        }

        let rows = if self.is_wildcard() {
            rows
        } else {
            rows.iter()
                .map(|row| project(&self.fields, row))
                .collect::<VarqlResult<Vec<_>>>()?
        };

        if scalar {
            Ok(rows.into_iter().next().unwrap_or(Value::Null))
        } else {
            Ok(Value::List(rows))
        }
    }

    /// Resolve every source and fold the combination operators.
    fn working_rows(&self, ctx: &Context) -> VarqlResult<Rows> {
        let resolved = self
            .sources
            .operands()
            .iter()
            .map(|source| source.resolve(ctx))
            .collect::<VarqlResult<Vec<_>>>()?;

        self.sources.fold("FROM", resolved, |op, left, right| {
            let combined = op.apply(left.into_value(), right.into_value())?;
            Ok(match combined {
                Value::List(rows) => Rows {
                    rows,
                    scalar: false,
                },
                other => Rows {
                    rows: vec![other],
                    scalar: true,
                },
            })
        })
    }
}

/// One mask per condition, folded through the logical operators.
fn filter_mask(conditions: &Chain<Condition, Logical>, rows: &[Value]) -> VarqlResult<Vec<bool>> {
    let masks = conditions
        .operands()
        .iter()
        .map(|condition| condition.mask(rows))
        .collect::<VarqlResult<Vec<_>>>()?;

    conditions.fold("WHERE", masks, |op, left, right| op.apply_masks(&left, &right))
}

/// Keep only the named fields of one record, keyed by their path text.
fn project(fields: &[Field], record: &Value) -> VarqlResult<Value> {
    let mut projected = BTreeMap::new();
    for field in fields {
        if let Field::Path(field_path) = field {
            let value = path::resolve(record, field_path)?;
            projected.insert(field_path.clone(), value.clone());
        }
    }
    Ok(Value::Map(projected))
}
