//! Batches of expressions and prompt templates.
//!
//! [`QuerySet`] compiles a fixed set of expression strings once and evaluates
//! all of them on demand. [`Template`] finds expression placeholders in a
//! prompt template:
//!
//! ```text
//! Recommend one of {FROM state.movies WHERE status == active} to {name}.
//!                  └──────────── expression placeholder ────┘    └─ plain, left as is
//! ```
//!
//! Expression placeholders can be rewritten to opaque keys (for template
//! engines that reject spaces in variable names) or substituted directly.

use std::collections::BTreeMap;
use std::ops::Range;

use tracing::debug;
use uuid::Uuid;

use crate::ast::Expression;
use crate::context::Context;
use crate::error::VarqlResult;
use crate::parser::parse;
use crate::value::Value;

/// Expressions compiled once, keyed by their raw text.
#[derive(Debug, Clone, Default)]
pub struct QuerySet {
    queries: Vec<(String, Expression)>,
}

impl QuerySet {
    /// Parse every query. Duplicate texts are kept once.
    pub fn parse<I, S>(queries: I) -> VarqlResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = QuerySet::default();
        for query in queries {
            let raw = query.as_ref().trim();
            if set.queries.iter().any(|(existing, _)| existing == raw) {
                continue;
            }
            set.queries.push((raw.to_string(), parse(raw)?));
        }
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Expression)> {
        self.queries.iter().map(|(raw, expr)| (raw.as_str(), expr))
    }

    /// Evaluate every query; the first failure aborts.
    pub fn evaluate(&self, ctx: &Context) -> VarqlResult<BTreeMap<String, Value>> {
        self.queries
            .iter()
            .map(|(raw, expr)| Ok((raw.clone(), expr.evaluate(ctx)?)))
            .collect()
    }
}

/// An expression placeholder found in a template.
#[derive(Debug, Clone)]
pub struct Variable {
    pub key: String,
    pub raw: String,
    pub expression: Expression,
}

/// A prompt template with expression placeholders.
#[derive(Debug, Clone)]
pub struct Template {
    text: String,
    variables: Vec<Variable>,
    plain: Vec<String>,
}

impl Template {
    /// Scan `text` for `{…}` placeholders and compile those that start with
    /// `SELECT` or `FROM`. `{{` and `}}` are literal braces.
    pub fn parse(text: &str) -> VarqlResult<Self> {
        let mut variables: Vec<Variable> = Vec::new();
        let mut plain: Vec<String> = Vec::new();

        for span in placeholders(text) {
            let raw = inner(text, &span);
            let body = raw.trim();
            if is_expression(body) {
                if variables.iter().any(|v| v.raw == raw) {
                    continue;
                }
                let variable = Variable {
                    key: Uuid::new_v4().to_string(),
                    raw: raw.to_string(),
                    expression: parse(body)?,
                };
                debug!(key = %variable.key, raw, "template variable");
                variables.push(variable);
            } else if !plain.iter().any(|p| p == body) {
                plain.push(body.to_string());
            }
        }

        Ok(Template {
            text: text.to_string(),
            variables,
            plain,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Expression placeholders in order of first appearance.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Placeholders that are not expressions.
    pub fn plain_variables(&self) -> &[String] {
        &self.plain
    }

    /// All variable names a template engine needs: plain names, then keys.
    pub fn input_variables(&self) -> Vec<&str> {
        self.plain
            .iter()
            .map(String::as_str)
            .chain(self.variables.iter().map(|v| v.key.as_str()))
            .collect()
    }

    /// The template with every expression placeholder replaced by `{key}`.
    /// Escaped braces stay escaped for the template engine.
    pub fn keyed_text(&self) -> String {
        let keys: Vec<String> = self
            .variables
            .iter()
            .map(|v| format!("{{{}}}", v.key))
            .collect();
        self.substitute(&keys, false)
    }

    /// Evaluate every expression placeholder, keyed by its key.
    pub fn values(&self, ctx: &Context) -> VarqlResult<BTreeMap<String, Value>> {
        self.variables
            .iter()
            .map(|v| Ok((v.key.clone(), v.expression.evaluate(ctx)?)))
            .collect()
    }

    /// The template with every expression placeholder replaced by the text
    /// form of its result. Plain placeholders stay untouched; `{{` and `}}`
    /// become single braces.
    pub fn render(&self, ctx: &Context) -> VarqlResult<String> {
        let results = self
            .variables
            .iter()
            .map(|v| Ok(v.expression.evaluate(ctx)?.to_text()))
            .collect::<VarqlResult<Vec<_>>>()?;
        Ok(self.substitute(&results, true))
    }

    /// Rebuild the text in one pass, so replacement text is never scanned
    /// again. `replacements` is parallel to `variables`.
    fn substitute(&self, replacements: &[String], unescape: bool) -> String {
        let text = self.text.as_str();
        let mut out = String::with_capacity(text.len());
        let literal = |out: &mut String, segment: &str| {
            if unescape {
                out.push_str(&segment.replace("{{", "{").replace("}}", "}"));
            } else {
                out.push_str(segment);
            }
        };

        let mut cursor = 0;
        for span in placeholders(text) {
            literal(&mut out, &text[cursor..span.start]);
            let raw = inner(text, &span);
            match self.variables.iter().position(|v| v.raw == raw) {
                Some(i) => out.push_str(&replacements[i]),
                None => out.push_str(&text[span.clone()]),
            }
            cursor = span.end;
        }
        literal(&mut out, &text[cursor..]);
        out
    }
}

fn is_expression(body: &str) -> bool {
    body.starts_with("SELECT ") || body.starts_with("FROM ")
}

/// Byte ranges of top-level `{…}` pairs, braces included, skipping
/// `{{`/`}}` escapes.
fn placeholders(text: &str) -> Vec<Range<usize>> {
    let mut found = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '{' if depth == 0 && chars.peek().is_some_and(|&(_, next)| next == '{') => {
                chars.next();
            }
            '}' if depth == 0 && chars.peek().is_some_and(|&(_, next)| next == '}') => {
                chars.next();
            }
            '{' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    found.push(start..i + 1);
                }
            }
            _ => {}
        }
    }
    found
}

fn inner<'a>(text: &'a str, span: &Range<usize>) -> &'a str {
    &text[span.start + 1..span.end - 1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn ctx() -> Context {
        Context::builder()
            .source(
                "state",
                json!({
                    "user": {"name": "Ada"},
                    "items": [{"n": 1, "label": "one"}, {"n": 2, "label": "two"}],
                }),
            )
            .build()
    }

    #[test]
    fn test_placeholder_scan() {
        let text = "a {x} b {FROM s WHERE m == {'k': 1}} {{literal}} c";
        let found: Vec<&str> = placeholders(text)
            .iter()
            .map(|span| inner(text, span))
            .collect();
        assert_eq!(found, vec!["x", "FROM s WHERE m == {'k': 1}"]);
        assert!(placeholders("no braces }").is_empty());
    }

    #[test]
    fn test_template_split() {
        let template =
            Template::parse("Hi {FROM state.user.name}, {task}. Again {FROM state.user.name}.")
                .unwrap();
        assert_eq!(template.variables().len(), 1);
        assert_eq!(template.plain_variables(), &["task".to_string()]);
        let inputs = template.input_variables();
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[0], "task");
    }

    #[test]
    fn test_keyed_text() {
        let template = Template::parse("User: {FROM state.user.name} ({role})").unwrap();
        let key = template.variables()[0].key.clone();
        assert_eq!(template.keyed_text(), format!("User: {{{}}} ({{role}})", key));

        let values = template.values(&ctx()).unwrap();
        assert_eq!(values.get(&key), Some(&Value::from("Ada")));
    }

    #[test]
    fn test_render() {
        let template =
            Template::parse("{FROM state.user.name} picks {SELECT label FROM state.items WHERE n > 1}; {other}")
                .unwrap();
        assert_eq!(
            template.render(&ctx()).unwrap(),
            "Ada picks [{'label': 'two'}]; {other}"
        );
    }

    #[test]
    fn test_render_does_not_rescan_results() {
        // The first result spells out the second placeholder; it must be
        // emitted as is, not replaced again.
        let ctx = Context::builder()
            .source("state", json!({"text": "{FROM state.name}", "name": "Ada"}))
            .build();
        let template = Template::parse("{FROM state.text} / {FROM state.name}").unwrap();
        assert_eq!(template.render(&ctx).unwrap(), "{FROM state.name} / Ada");
    }

    #[test]
    fn test_render_unescapes_braces() {
        let template = Template::parse("{{x}} is {FROM state.user.name} {y} }}").unwrap();
        assert_eq!(template.render(&ctx()).unwrap(), "{x} is Ada {y} }");

        let key = template.variables()[0].key.clone();
        assert_eq!(
            template.keyed_text(),
            format!("{{{{x}}}} is {{{}}} {{y}} }}}}", key)
        );
    }

    #[test]
    fn test_bad_expression_fails_parse() {
        assert!(Template::parse("{FROM 42}").is_err());
    }

    #[test]
    fn test_query_set() {
        let set = QuerySet::parse([
            "FROM state.user.name",
            "SELECT n FROM state.items WHERE label == one",
            "FROM state.user.name",
        ])
        .unwrap();
        assert_eq!(set.len(), 2);

        let values = set.evaluate(&ctx()).unwrap();
        assert_eq!(values["FROM state.user.name"], Value::from("Ada"));
        assert_eq!(
            values["SELECT n FROM state.items WHERE label == one"].to_json(),
            json!([{"n": 1}])
        );
        assert_eq!(set.evaluate(&ctx()).unwrap(), values);
    }
}
