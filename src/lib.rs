//! # varql: queries over prompt variables
//!
//! varql evaluates small `SELECT … FROM … WHERE …` expressions against
//! nested runtime data registered under source names.
//!
//! ## Quick Example
//!
//! ```
//! use varql::prelude::*;
//! use serde_json::json;
//!
//! let ctx = Context::builder()
//!     .source("state", json!({
//!         "movies": [
//!             {"title": "Movie 1", "status": "active", "rating": 4.5},
//!             {"title": "Movie 2", "status": "canceled", "rating": 3.8},
//!         ]
//!     }))
//!     .build();
//!
//! let titles = ctx.query("SELECT title FROM state.movies WHERE status == active").unwrap();
//! assert_eq!(titles.to_json(), json!([{"title": "Movie 1"}]));
//! ```
//!
//! ## Operators
//!
//! Listed in priority order; when several occur in one token, the first
//! listed wins regardless of position.
//!
//! | Clause | Symbols                                     |
//! |--------|---------------------------------------------|
//! | FROM   | `+` `-` `*` `/`                             |
//! | WHERE  | `==` `!=` `>` `<` `>=` `<=` `CONTAINS` `NOT_CONTAINS` |
//! | WHERE  | `AND` `OR`                                  |

pub mod ast;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod literal;
pub mod parser;
pub mod path;
pub mod template;
pub mod value;

pub use context::Context;

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::config::{Config, OutputFormat};
    pub use crate::context::{Context, ContextBuilder};
    pub use crate::engine::SqlLoader;
    pub use crate::error::*;
    pub use crate::parser::parse;
    pub use crate::template::{QuerySet, Template};
    pub use crate::value::{Record, RecordAccess, Value};
}

/// Parse a query string into an expression.
///
/// # Example
///
/// ```
/// use varql::parse;
///
/// let expr = parse("SELECT title FROM state.movies WHERE rating > 4.0").unwrap();
/// assert_eq!(expr.sources.operands()[0].name, "state");
/// ```
pub fn parse(input: &str) -> Result<ast::Expression, error::VarqlError> {
    parser::parse(input)
}

/// Parse and evaluate a query against a context.
pub fn query(ctx: &Context, input: &str) -> Result<value::Value, error::VarqlError> {
    ctx.query(input)
}
