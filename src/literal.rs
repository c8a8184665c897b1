//! Literal coercion.
//!
//! A raw token becomes a typed [`Value`] by trying, in order:
//!
//! 1. a structured literal (number, boolean, null, quoted string, list or
//!    mapping), which must cover the whole token;
//! 2. an ISO-8601 timestamp;
//! 3. the trimmed token itself, as a string.
//!
//! None of the steps fail loudly; a failing step falls through to the next.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, digit1, multispace0, one_of},
    combinator::{all_consuming, map, opt, recognize, value},
    error::{Error, ErrorKind},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, separated_pair, tuple},
    IResult,
};

use crate::value::Value;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Coerce a raw token into a typed value.
pub fn coerce(token: &str) -> Value {
    let token = token.trim();
    if let Some(literal) = parse_literal_token(token) {
        return literal;
    }
    if let Some(ts) = parse_timestamp(token) {
        return Value::Timestamp(ts);
    }
    Value::String(token.to_string())
}

/// Coerce a value read out of a record: strings go through [`coerce`],
/// everything else is returned unchanged.
pub fn coerce_value(value: &Value) -> Value {
    match value {
        Value::String(s) => coerce(s),
        other => other.clone(),
    }
}

/// Parse a complete structured literal, or `None`.
pub fn parse_literal_token(token: &str) -> Option<Value> {
    all_consuming(parse_literal)(token.trim())
        .ok()
        .map(|(_, literal)| literal)
}

/// Parse an ISO-8601 date or date-time.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.naive_utc());
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Parse one literal, skipping leading whitespace.
fn parse_literal(input: &str) -> IResult<&str, Value> {
    preceded(
        multispace0,
        alt((
            map(parse_quoted, Value::String),
            parse_list,
            parse_map,
            parse_keyword,
            parse_number,
        )),
    )(input)
}

/// Parse `true`/`false`/`null` (and their capitalized spellings).
fn parse_keyword(input: &str) -> IResult<&str, Value> {
    alt((
        value(Value::Bool(true), alt((tag("true"), tag("True")))),
        value(Value::Bool(false), alt((tag("false"), tag("False")))),
        value(Value::Null, alt((tag("null"), tag("None")))),
    ))(input)
}

/// Digits with optional `_` separators.
fn digits(input: &str) -> IResult<&str, &str> {
    recognize(pair(digit1, many0(pair(char('_'), digit1))))(input)
}

/// Parse an integer or float.
fn parse_number(input: &str) -> IResult<&str, Value> {
    let (rest, text) = recognize(tuple((
        opt(one_of("+-")),
        alt((
            recognize(pair(digits, opt(pair(char('.'), opt(digits))))),
            recognize(pair(char('.'), digits)),
        )),
        opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
    )))(input)?;

    let cleaned = text.replace('_', "");
    let is_float = cleaned.contains(['.', 'e', 'E']);
    if !is_float {
        if let Ok(n) = cleaned.parse::<i64>() {
            return Ok((rest, Value::Int(n)));
        }
    }
    match cleaned.parse::<f64>() {
        Ok(n) => Ok((rest, Value::Float(n))),
        Err(_) => Err(nom::Err::Error(Error::new(input, ErrorKind::Float))),
    }
}

/// Parse a single- or double-quoted string with backslash escapes.
fn parse_quoted(input: &str) -> IResult<&str, String> {
    let quote = match input.chars().next() {
        Some(q @ ('\'' | '"')) => q,
        _ => return Err(nom::Err::Error(Error::new(input, ErrorKind::Char))),
    };

    let mut out = String::new();
    let mut chars = input.char_indices().skip(1);
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, other)) => out.push(other),
                None => break,
            },
            c if c == quote => return Ok((&input[i + 1..], out)),
            c => out.push(c),
        }
    }
    Err(nom::Err::Error(Error::new(input, ErrorKind::Char)))
}

/// Parse `[a, b, ...]`; a trailing comma is allowed.
fn parse_list(input: &str) -> IResult<&str, Value> {
    let (input, _) = char('[')(input)?;
    let (input, items) = separated_list0(ws(char(',')), parse_literal)(input)?;
    let (input, _) = opt(ws(char(',')))(input)?;
    let (input, _) = preceded(multispace0, char(']'))(input)?;
    Ok((input, Value::List(items)))
}

/// Parse `{key: value, ...}`. Non-string keys use their text form.
fn parse_map(input: &str) -> IResult<&str, Value> {
    let (input, _) = char('{')(input)?;
    let (input, entries) = separated_list0(
        ws(char(',')),
        separated_pair(parse_literal, ws(char(':')), parse_literal),
    )(input)?;
    let (input, _) = opt(ws(char(',')))(input)?;
    let (input, _) = preceded(multispace0, char('}'))(input)?;

    let map: BTreeMap<String, Value> = entries
        .into_iter()
        .map(|(key, value)| {
            let key = match key {
                Value::String(s) => s,
                other => other.to_text(),
            };
            (key, value)
        })
        .collect();
    Ok((input, Value::Map(map)))
}

fn ws<'a, O>(
    inner: impl FnMut(&'a str) -> IResult<&'a str, O>,
) -> impl FnMut(&'a str) -> IResult<&'a str, O> {
    delimited(multispace0, inner, multispace0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_coercion_order() {
        assert_eq!(coerce("4.5"), Value::Float(4.5));
        assert_eq!(coerce("2023-10-15"), Value::Timestamp(date(2023, 10, 15)));
        assert_eq!(coerce("active"), Value::String("active".into()));
    }

    #[test]
    fn test_scalar_literals() {
        assert_eq!(coerce("42"), Value::Int(42));
        assert_eq!(coerce("-7"), Value::Int(-7));
        assert_eq!(coerce("1_000"), Value::Int(1000));
        assert_eq!(coerce(".5"), Value::Float(0.5));
        assert_eq!(coerce("1e3"), Value::Float(1000.0));
        assert_eq!(coerce("true"), Value::Bool(true));
        assert_eq!(coerce("False"), Value::Bool(false));
        assert_eq!(coerce("null"), Value::Null);
        assert_eq!(coerce("  None "), Value::Null);
    }

    #[test]
    fn test_integer_overflow_becomes_float() {
        assert_eq!(coerce("99999999999999999999"), Value::Float(1e20));
    }

    #[test]
    fn test_quoted_strings_stay_strings() {
        assert_eq!(coerce("'2023-10-15'"), Value::String("2023-10-15".into()));
        assert_eq!(coerce("\"a \\\"b\\\"\""), Value::String("a \"b\"".into()));
        assert_eq!(coerce("''"), Value::String(String::new()));
    }

    #[test]
    fn test_structured_literals() {
        assert_eq!(
            coerce("[1, 'two', [3.0], ]"),
            Value::List(vec![
                Value::Int(1),
                Value::String("two".into()),
                Value::List(vec![Value::Float(3.0)]),
            ])
        );

        let mut expected = BTreeMap::new();
        expected.insert("a".to_string(), Value::Int(1));
        expected.insert("2".to_string(), Value::Bool(true));
        assert_eq!(coerce("{'a': 1, 2: true}"), Value::Map(expected));
    }

    #[test]
    fn test_bare_words_fall_back_to_string() {
        assert_eq!(coerce("[a, b]"), Value::String("[a, b]".into()));
        assert_eq!(coerce("4abc"), Value::String("4abc".into()));
        assert_eq!(coerce("trueish"), Value::String("trueish".into()));
        assert_eq!(coerce(""), Value::String(String::new()));
    }

    #[test]
    fn test_timestamps() {
        let expected = NaiveDate::from_ymd_opt(2023, 10, 15)
            .unwrap()
            .and_hms_opt(10, 20, 30)
            .unwrap();
        assert_eq!(coerce("2023-10-15T10:20:30"), Value::Timestamp(expected));
        assert_eq!(coerce("2023-10-15 10:20:30"), Value::Timestamp(expected));
        assert_eq!(coerce("2023-10-15T12:20:30+02:00"), Value::Timestamp(expected));
        assert_eq!(coerce("2023-13-45"), Value::String("2023-13-45".into()));
    }

    #[test]
    fn test_coerce_value_only_touches_strings() {
        assert_eq!(coerce_value(&Value::from("3")), Value::Int(3));
        let list = Value::List(vec![Value::from("3")]);
        assert_eq!(coerce_value(&list), list);
    }
}
