//! Dynamic values produced by mapping.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::types::Container;

/// A mapped value
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Absent value; database nulls are normalised to this
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    DateTime(NaiveDateTime),
    Uuid(Uuid),
    Text(String),
    Object(ObjectValue),
    Collection(CollectionValue),
    Array(Vec<Value>),
    Tuple(Vec<Value>),
}

/// Discriminant of a [`Value`], used as the source type of a conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Float,
    Decimal,
    DateTime,
    Uuid,
    Text,
    Object,
    Collection,
    Array,
    Tuple,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Decimal => "decimal",
            ValueKind::DateTime => "datetime",
            ValueKind::Uuid => "uuid",
            ValueKind::Text => "text",
            ValueKind::Object => "object",
            ValueKind::Collection => "collection",
            ValueKind::Array => "array",
            ValueKind::Tuple => "tuple",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Decimal(_) => ValueKind::Decimal,
            Value::DateTime(_) => ValueKind::DateTime,
            Value::Uuid(_) => ValueKind::Uuid,
            Value::Text(_) => ValueKind::Text,
            Value::Object(_) => ValueKind::Object,
            Value::Collection(_) => ValueKind::Collection,
            Value::Array(_) => ValueKind::Array,
            Value::Tuple(_) => ValueKind::Tuple,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectValue> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&CollectionValue> {
        match self {
            Value::Collection(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[Value]> {
        match self {
            Value::Tuple(slots) => Some(slots),
            _ => None,
        }
    }

    /// Elements of any sequence-like value: collections, arrays and
    /// custom objects that carry elements
    pub fn elements(&self) -> Option<&[Value]> {
        match self {
            Value::Collection(c) => Some(c.items()),
            Value::Array(items) => Some(items),
            Value::Object(o) => Some(o.items()),
            _ => None,
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

// ============================================================================
// OBJECTS
// ============================================================================

/// An instance of a record type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectValue {
    type_name: String,
    fields: BTreeMap<String, Value>,
    /// Elements, for records that also implement a collection contract
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    items: Vec<Value>,
}

impl ObjectValue {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: BTreeMap::new(),
            items: Vec::new(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn push_item(&mut self, item: Value) {
        self.items.push(item);
    }
}

// ============================================================================
// COLLECTIONS
// ============================================================================

/// Adding to a read-only container
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot add elements to a read-only collection")]
pub struct ReadOnlyCollectionError;

/// A populated concrete container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionValue {
    container: Container,
    items: Vec<Value>,
}

impl CollectionValue {
    pub fn new(container: Container) -> Self {
        Self {
            container,
            items: Vec::new(),
        }
    }

    /// Wrap the elements of `list` in a read-only container
    pub fn wrap_read_only(list: CollectionValue) -> Self {
        Self {
            container: Container::ReadOnly,
            items: list.items,
        }
    }

    pub fn container(&self) -> Container {
        self.container
    }

    pub fn push(&mut self, item: Value) -> Result<(), ReadOnlyCollectionError> {
        if self.container.is_read_only() {
            return Err(ReadOnlyCollectionError);
        }
        self.items.push(item);
        Ok(())
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Value> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
