//! varql parser.
//!
//! Parses query text into an [`Expression`].
//!
//! # Syntax Overview
//!
//! ```text
//! SELECT title, meta.year FROM state.movies WHERE status == active AND rating > 4.0
//! ──────────┬──────────── ─────────┬─────── ────────────────┬─────────────────────
//!           │                      │                        │
//!           │                      │                        └── Conditions (Logical chain)
//!           │                      └── Sources (Combination chain)
//!           └── Fields (projection, optional)
//! ```
//!
//! Operators are padded with spaces (`a + b`, `x == 1`) and chains fold
//! strictly left to right.

pub mod chain;
pub mod clauses;


use tracing::debug;

use crate::ast::*;
use crate::error::{VarqlError, VarqlResult};
use chain::parse_chain;

/// Parse a complete query string.
///
/// No source registry is needed here; see [`crate::Context::compile`] to
/// also check source names.
pub fn parse(input: &str) -> VarqlResult<Expression> {
    let input = input.trim();
    let clauses = clauses::split(input);

    let fields = parse_chain::<Field, NoOperator>(&clauses.select)?.into_operands();
    if fields.len() != clauses.select.len() {
        return Err(VarqlError::empty_chain(
            "SELECT",
            format!("invalid field in '{}'", clauses.select.join(", ")),
        ));
    }

    if clauses.from.is_empty() {
        return Err(VarqlError::empty_chain("FROM", "missing FROM clause"));
    }
    let sources = parse_chain::<Source, Combination>(&clauses.from)?;
    if sources.is_empty() {
        return Err(VarqlError::empty_chain(
            "FROM",
            format!("no source in '{}'", clauses.from.join(", ")),
        ));
    }

    let conditions = if clauses.where_.is_empty() {
        None
    } else {
        let chain = parse_chain::<Condition, Logical>(&clauses.where_)?;
        if chain.is_empty() {
            return Err(VarqlError::empty_chain(
                "WHERE",
                format!("no condition in '{}'", clauses.where_.join(", ")),
            ));
        }
        Some(chain)
    };

    let expression = Expression {
        fields,
        sources,
        conditions,
    };
    debug!(%expression, "parsed expression");
    Ok(expression)
}
