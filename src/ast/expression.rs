use std::collections::BTreeMap;
use std::fmt;

use tracing::{trace, warn};

use crate::ast::operands::{Condition, Field, Source};
use crate::ast::operators::{Combination, Link, Logical, Symbol};
use crate::error::{VarqlError, VarqlResult};

/// Operands in parse order plus the operators linking neighbours by index.
#[derive(Debug, Clone, PartialEq)]
pub struct Chain<O, P> {
    operands: Vec<O>,
    links: Vec<Link<P>>,
}

impl<O, P: Symbol> Chain<O, P> {
    pub fn new() -> Self {
        Self {
            operands: Vec::new(),
            links: Vec::new(),
        }
    }

    pub fn operands(&self) -> &[O] {
        &self.operands
    }

    pub fn links(&self) -> &[Link<P>] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.operands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operands.is_empty()
    }

    pub fn into_operands(self) -> Vec<O> {
        self.operands
    }

    /// Append an operand, returning its index.
    pub(crate) fn push_operand(&mut self, operand: O) -> usize {
        self.operands.push(operand);
        self.operands.len() - 1
    }

    pub(crate) fn push_link(&mut self, link: Link<P>) {
        self.links.push(link);
    }

    /// Fold one value per operand through the links, left to right.
    ///
    /// Each link replaces its `right` entry with `apply(left, right)` and
    /// drops its `left` entry. The surviving entry with the lowest index is
    /// the result; operands that no link reached are ignored.
    pub fn fold<V>(
        &self,
        clause: &'static str,
        values: Vec<V>,
        mut apply: impl FnMut(P, V, V) -> VarqlResult<V>,
    ) -> VarqlResult<V> {
        let mut working: BTreeMap<usize, V> = values.into_iter().enumerate().collect();

        for link in &self.links {
            let (Some(left), Some(right)) =
                (working.remove(&link.left), working.remove(&link.right))
            else {
                return Err(VarqlError::empty_chain(
                    clause,
                    format!("operator '{}' has no operands at {}..{}", link.op, link.left, link.right),
                ));
            };
            trace!(clause, op = %link.op, left = link.left, right = link.right, "fold");
            working.insert(link.right, apply(link.op, left, right)?);
        }

        if working.len() > 1 {
            warn!(
                clause,
                ignored = working.len() - 1,
                "unlinked operands ignored; only the first is used"
            );
        }
        working
            .into_values()
            .next()
            .ok_or_else(|| VarqlError::empty_chain(clause, "no operands"))
    }
}

impl<O, P: Symbol> Default for Chain<O, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: fmt::Display, P: Symbol> fmt::Display for Chain<O, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, operand) in self.operands.iter().enumerate() {
            if i > 0 {
                match self.links.iter().find(|link| link.right == i) {
                    Some(link) => write!(f, " {} ", link.op)?,
                    None => write!(f, ", ")?,
                }
            }
            write!(f, "{}", operand)?;
        }
        Ok(())
    }
}

/// A parsed `SELECT … FROM … WHERE …` expression.
///
/// Immutable once parsed; see [`Expression::evaluate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    /// Empty when there is no SELECT clause.
    pub fields: Vec<Field>,
    pub sources: Chain<Source, Combination>,
    /// `None` when there is no WHERE clause.
    pub conditions: Option<Chain<Condition, Logical>>,
}

impl Expression {
    /// No SELECT clause, or a `*` among the fields.
    pub fn is_wildcard(&self) -> bool {
        self.fields.is_empty() || self.fields.iter().any(Field::is_wildcard)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.fields.is_empty() {
            write!(f, "SELECT ")?;
            for (i, field) in self.fields.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", field)?;
            }
            write!(f, " ")?;
        }
        write!(f, "FROM {}", self.sources)?;
        if let Some(conditions) = &self.conditions {
            write!(f, " WHERE {}", conditions)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(n: usize, links: &[usize]) -> Chain<usize, Combination> {
        let mut chain = Chain::new();
        for i in 0..n {
            chain.push_operand(i);
        }
        for left in links {
            chain.push_link(Link::new(Combination::Add, *left));
        }
        chain
    }

    #[test]
    fn test_fold_leaves_one_operand() {
        let chain = chain(3, &[0, 1]);
        let total = chain
            .fold("FROM", vec![1, 2, 3], |_, l, r| Ok(l * 10 + r))
            .unwrap();
        assert_eq!(total, 123);
    }

    #[test]
    fn test_fold_uses_first_unlinked_operand() {
        let chain = chain(3, &[1]);
        let first = chain.fold("FROM", vec![7, 1, 2], |_, l, r| Ok(l + r)).unwrap();
        assert_eq!(first, 7);
    }

    #[test]
    fn test_fold_empty_chain() {
        let chain = chain(0, &[]);
        assert!(matches!(
            chain.fold("WHERE", Vec::<i32>::new(), |_, l, _| Ok(l)),
            Err(VarqlError::EmptyChain { clause: "WHERE", .. })
        ));
    }

    #[test]
    fn test_display_separates_unlinked_operands() {
        assert_eq!(chain(3, &[0]).to_string(), "0 + 1, 2");
    }
}
