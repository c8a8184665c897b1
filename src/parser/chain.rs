//! Chain parsing: operands and index-linked operators, one clause at a time.
//!
//! Each clause token is scanned left to right. An operand is peeled off
//! first; if text remains, an operator must start it, and the next operand
//! follows. A token that stops yielding operands simply ends its chain.

use nom::{
    bytes::complete::{take_while, take_while1},
    character::complete::char,
    combinator::{all_consuming, recognize},
    multi::{many0, separated_list1},
    sequence::{pair, preceded},
    IResult,
};
use tracing::{debug, warn};

use crate::ast::*;
use crate::error::{VarqlError, VarqlResult};
use crate::literal;
use crate::value::Value;

/// Something a clause chain is made of.
pub trait ChainOperand: Sized + std::fmt::Display {
    /// Clause name used in logs and errors.
    const CLAUSE: &'static str;

    /// Construct one operand from the start of `text`, returning it with the
    /// unconsumed remainder. `None` means the text is not an operand.
    fn parse_operand(text: &str) -> Option<(Self, &str)>;
}

/// Parse every token of a clause into one chain.
pub fn parse_chain<O: ChainOperand, P: Symbol>(tokens: &[&str]) -> VarqlResult<Chain<O, P>> {
    let mut chain = Chain::new();

    for token in tokens {
        let mut text = token.trim();
        let mut pending: Option<(P, usize)> = None;

        loop {
            let Some((operand, rest)) = O::parse_operand(text) else {
                match pending {
                    Some((op, _)) => warn!(clause = O::CLAUSE, %op, text, "operator without right operand discarded"),
                    None => debug!(clause = O::CLAUSE, text, "not an operand"),
                }
                break;
            };

            let index = chain.push_operand(operand);
            if let Some((op, left)) = pending.take() {
                chain.push_link(Link::new(op, left));
            }

            let rest = rest.trim();
            if rest.is_empty() {
                break;
            }
            let Some((op, after)) = P::strip_leading(rest) else {
                debug!(clause = O::CLAUSE, rest, "no operator, rest of token ignored");
                break;
            };

            let after = after.trim();
            if after.len() >= text.len() {
                return Err(VarqlError::empty_chain(
                    O::CLAUSE,
                    format!("no progress parsing '{}'", text),
                ));
            }
            pending = Some((op, index));
            text = after;
        }
    }

    debug!(clause = O::CLAUSE, chain = %chain, "parsed");
    Ok(chain)
}

/// `[A-Za-z_][A-Za-z0-9_]*`
fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)
}

/// One path segment: anything but dots and whitespace.
fn segment(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c != '.' && !c.is_whitespace())(input)
}

/// `name(.segment)*`, covering the whole input.
fn source_path(input: &str) -> IResult<&str, (&str, Vec<&str>)> {
    all_consuming(pair(identifier, many0(preceded(char('.'), segment))))(input)
}

/// `segment(.segment)*`, covering the whole input.
fn field_path(input: &str) -> IResult<&str, &str> {
    all_consuming(recognize(separated_list1(char('.'), segment)))(input)
}

impl ChainOperand for Source {
    const CLAUSE: &'static str = "FROM";

    fn parse_operand(text: &str) -> Option<(Self, &str)> {
        let (source_text, rest) = match Combination::find(text) {
            Some((_, pos)) => (text[..pos].trim(), &text[pos..]),
            None => (text, ""),
        };
        let (_, (name, segments)) = source_path(source_text).ok()?;
        let source = Source {
            name: name.to_string(),
            path: segments.join("."),
        };
        Some((source, rest))
    }
}

impl ChainOperand for Field {
    const CLAUSE: &'static str = "SELECT";

    fn parse_operand(text: &str) -> Option<(Self, &str)> {
        if text == "*" {
            return Some((Field::Wildcard, ""));
        }
        let (_, path) = field_path(text).ok()?;
        Some((Field::Path(path.to_string()), ""))
    }
}

impl ChainOperand for Condition {
    const CLAUSE: &'static str = "WHERE";

    fn parse_operand(text: &str) -> Option<(Self, &str)> {
        let (op, pos) = Comparison::find(text)?;
        let attribute = text[..pos].trim();
        let raw_value = &text[pos + op.symbol().len() + 2..];

        let (value, rest) = match Logical::find(raw_value) {
            Some((_, at)) => (raw_value[..at].trim(), &raw_value[at..]),
            None => (raw_value.trim(), ""),
        };

        let condition = Condition {
            attribute: attribute_argument(attribute),
            op,
            value: value_argument(value),
        };
        Some((condition, rest))
    }
}

/// Left side: a path unless the token is a literal. A dotted path drops its
/// leading alias segment.
fn attribute_argument(token: &str) -> ConditionArgument {
    if let Some(literal) = typed_literal(token) {
        return ConditionArgument::Literal(literal);
    }
    match token.split_once('.') {
        Some((alias, path)) if !path.is_empty() => ConditionArgument::Path {
            alias: Some(alias.to_string()),
            path: path.to_string(),
        },
        _ => ConditionArgument::Path {
            alias: None,
            path: token.to_string(),
        },
    }
}

/// Right side: a literal unless the token is a bare word containing a dot
/// with something after it.
fn value_argument(token: &str) -> ConditionArgument {
    if let Some(literal) = typed_literal(token) {
        return ConditionArgument::Literal(literal);
    }
    match token.split_once('.') {
        Some((alias, path)) if !path.is_empty() => ConditionArgument::Path {
            alias: Some(alias.to_string()),
            path: path.to_string(),
        },
        _ => ConditionArgument::Literal(literal::coerce(token)),
    }
}

/// A structured literal or timestamp; bare words are `None`.
fn typed_literal(token: &str) -> Option<Value> {
    literal::parse_literal_token(token)
        .or_else(|| literal::parse_timestamp(token).map(Value::Timestamp))
}
