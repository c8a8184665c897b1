//! Evaluation context: the registry of named data sources.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::ast::Expression;
use crate::error::{VarqlError, VarqlResult};
use crate::value::Value;

/// An immutable mapping from source name to root value.
///
/// Cloning is cheap; independent contexts can be used from different
/// threads at the same time.
#[derive(Debug, Clone, Default)]
pub struct Context {
    sources: Arc<BTreeMap<String, Value>>,
}

impl Context {
    /// Create a new context builder.
    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    /// Look up a registered source.
    pub fn get(&self, name: &str) -> VarqlResult<&Value> {
        self.sources
            .get(name)
            .ok_or_else(|| VarqlError::UnknownSource(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    /// Parse `input` and check that every source it names is registered.
    pub fn compile(&self, input: &str) -> VarqlResult<Expression> {
        let expression = crate::parser::parse(input)?;
        for source in expression.sources.operands() {
            if !self.contains(&source.name) {
                return Err(VarqlError::UnknownSource(source.name.clone()));
            }
        }
        Ok(expression)
    }

    /// Parse and evaluate in one step.
    pub fn query(&self, input: &str) -> VarqlResult<Value> {
        self.compile(input)?.evaluate(self)
    }
}

/// Builder for [`Context`].
#[derive(Debug, Default)]
pub struct ContextBuilder {
    sources: BTreeMap<String, Value>,
}

impl ContextBuilder {
    /// Register a source; a later registration under the same name wins.
    pub fn source(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.sources.insert(name.into(), value.into());
        self
    }

    /// Register every source of another context.
    pub fn extend(mut self, other: &Context) -> Self {
        for (name, value) in other.sources.iter() {
            self.sources.insert(name.clone(), value.clone());
        }
        self
    }

    /// Build the context.
    pub fn build(self) -> Context {
        Context {
            sources: Arc::new(self.sources),
        }
    }
}
