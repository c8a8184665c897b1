//! Parsed expression tree.

pub mod expression;
pub mod operands;
pub mod operators;

pub use expression::{Chain, Expression};
pub use operands::{Condition, ConditionArgument, Field, Source};
pub use operators::{Combination, Comparison, Link, Logical, NoOperator, Symbol};
