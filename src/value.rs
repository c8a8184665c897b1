//! Runtime values and record access.
//!
//! Everything a query touches is a [`Value`]: registered sources, the rows a
//! source resolves to, literals written in conditions and the final result.
//! Records come in two shapes that share the [`RecordAccess`] capability:
//! mapping-like [`Value::Map`] and structured [`Value::Record`].

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::VarqlResult;
use crate::literal;

/// A dynamically typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Date and time without offset (offset-aware inputs are normalized to UTC)
    Timestamp(NaiveDateTime),
    List(Vec<Value>),
    /// Mapping-like record
    Map(BTreeMap<String, Value>),
    /// Structured record with a type name and ordered fields
    Record(Record),
}

/// A structured record: a named type with ordered fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    type_name: String,
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    /// Add (or replace) a field.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }
}

/// Field access shared by every record shape.
pub trait RecordAccess {
    /// Look up a field by name.
    fn field(&self, name: &str) -> Option<&Value>;

    /// Field names in iteration order.
    fn field_names(&self) -> Vec<&str>;
}

impl RecordAccess for BTreeMap<String, Value> {
    fn field(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }

    fn field_names(&self) -> Vec<&str> {
        self.keys().map(String::as_str).collect()
    }
}

impl RecordAccess for Record {
    fn field(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(n, _)| n.as_str()).collect()
    }
}

impl Value {
    /// Short name of the runtime type, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Timestamp(_) => "timestamp",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
        }
    }

    /// The record accessor for this value, chosen by its tag.
    pub fn as_record(&self) -> Option<&dyn RecordAccess> {
        match self {
            Value::Map(map) => Some(map),
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    /// One path step: a record field, or a list index.
    pub fn child(&self, segment: &str) -> Option<&Value> {
        if let Some(record) = self.as_record() {
            return record.field(segment);
        }
        match self {
            Value::List(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Text form: strings unquoted, nested strings quoted.
    pub fn to_text(&self) -> String {
        self.to_string()
    }

    /// Convert to JSON. Non-finite floats become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Build a value from anything serde can serialize.
    pub fn from_serialize<T: Serialize>(value: &T) -> VarqlResult<Value> {
        Ok(serde_json::to_value(value)?.into())
    }

    fn write_nested(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "'{}'", s),
            other => write!(f, "{}", other),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e16 {
                    write!(f, "{:.1}", n)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::String(s) => write!(f, "{}", s),
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.f")),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    item.write_nested(f)?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "'{}': ", key)?;
                    value.write_nested(f)?;
                }
                write!(f, "}}")
            }
            Value::Record(record) => {
                write!(f, "{}(", record.type_name)?;
                for (i, (name, value)) in record.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}=", name)?;
                    value.write_nested(f)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Float(n) => serializer.serialize_f64(*n),
            Value::String(s) => serializer.serialize_str(s),
            Value::Timestamp(ts) => {
                serializer.collect_str(&ts.format("%Y-%m-%dT%H:%M:%S%.f"))
            }
            Value::List(items) => serializer.collect_seq(items),
            Value::Map(map) => serializer.collect_map(map),
            Value::Record(record) => {
                let mut out = serializer.serialize_map(Some(record.fields.len()))?;
                for (name, value) in &record.fields {
                    out.serialize_entry(name, value)?;
                }
                out.end()
            }
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
            ),
        }
    }
}

impl From<toml::Value> for Value {
    fn from(toml: toml::Value) -> Self {
        match toml {
            toml::Value::String(s) => Value::String(s),
            toml::Value::Integer(n) => Value::Int(n),
            toml::Value::Float(n) => Value::Float(n),
            toml::Value::Boolean(b) => Value::Bool(b),
            toml::Value::Datetime(dt) => {
                let text = dt.to_string();
                match literal::parse_timestamp(&text) {
                    Some(ts) => Value::Timestamp(ts),
                    None => Value::String(text),
                }
            }
            toml::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            toml::Value::Table(table) => Value::Map(
                table.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(ts: NaiveDateTime) -> Self {
        Value::Timestamp(ts)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Record(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_text_form() {
        let list = Value::List(vec!["action".into(), "drama".into()]);
        assert_eq!(list.to_text(), "['action', 'drama']");
        assert_eq!(Value::Float(4.0).to_text(), "4.0");
        assert_eq!(Value::String("John".into()).to_text(), "John");
    }

    #[test]
    fn test_record_access_by_tag() {
        let record = Value::Record(Record::new("Movie").with("title", "Alien"));
        let map: Value = json!({"title": "Alien"}).into();

        assert_eq!(record.child("title"), Some(&Value::from("Alien")));
        assert_eq!(map.child("title"), Some(&Value::from("Alien")));
        assert_eq!(record.child("year"), None);
        assert!(Value::Int(3).as_record().is_none());
    }

    #[test]
    fn test_list_index_child() {
        let list: Value = json!(["a", "b"]).into();
        assert_eq!(list.child("1"), Some(&Value::from("b")));
        assert_eq!(list.child("2"), None);
        assert_eq!(list.child("x"), None);
    }

    #[test]
    fn test_record_with_replaces_field() {
        let record = Record::new("User").with("name", "a").with("name", "b");
        assert_eq!(record.field_names(), vec!["name"]);
        assert_eq!(record.field("name"), Some(&Value::from("b")));
    }

    #[test]
    fn test_json_conversion() {
        let value: Value = json!({"n": 1, "f": 2.5, "tags": ["x"], "none": null}).into();
        assert_eq!(
            value.to_json(),
            json!({"n": 1, "f": 2.5, "tags": ["x"], "none": null})
        );
    }

    #[test]
    fn test_record_serializes_as_object() {
        let record = Value::Record(Record::new("User").with("id", 7));
        assert_eq!(record.to_json(), json!({"id": 7}));
    }
}
