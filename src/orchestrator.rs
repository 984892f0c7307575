//! The mapping host the engine delegates to.
//!
//! The engine decides *which* rows and columns feed *which* destination; an
//! [`Orchestrator`] does everything that touches values: constructing
//! destination instances, converting column values to member types, and
//! listing the members that may be assigned.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDateTime;
use record_types::{
    CollectionValue, Container, GenericDef, MemberDesc, ObjectValue, ScalarKind, TypeKind, TypeRef,
    Value, ValueKind,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::MapError;

/// Collaborator that owns construction and value conversion
pub trait Orchestrator: Send + Sync {
    /// Default-construct an instance of `ty`
    fn construct(&self, ty: &TypeRef) -> Result<Value, MapError>;

    /// Convert `source` into a value of `destination`. `existing` is the
    /// member's current value; `source_kind` is [`ValueKind::Null`] when the
    /// column held a database null.
    fn map_value(
        &self,
        source: Value,
        existing: Option<&Value>,
        source_kind: ValueKind,
        destination: &TypeRef,
    ) -> Result<Value, MapError>;

    /// Members of `ty` that mapping may assign, in declaration order
    fn writable_members<'a>(&self, ty: &'a TypeRef) -> Vec<&'a MemberDesc>;
}

type Constructor = Arc<dyn Fn() -> Value + Send + Sync>;

/// Orchestrator for the value model in `record_types`.
///
/// Records are constructed with every member at its default, growable
/// containers and arrays start empty. Contracts, read-only wrappers and
/// tuples have no default constructor. Custom constructors registered by
/// type name take precedence.
#[derive(Clone, Default)]
pub struct StandardOrchestrator {
    constructors: HashMap<String, Constructor>,
}

impl StandardOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `constructor` to build instances of the type named `type_name`
    pub fn with_constructor(
        mut self,
        type_name: impl Into<String>,
        constructor: impl Fn() -> Value + Send + Sync + 'static,
    ) -> Self {
        self.constructors
            .insert(type_name.into(), Arc::new(constructor));
        self
    }
}

impl std::fmt::Debug for StandardOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&String> = self.constructors.keys().collect();
        f.debug_struct("StandardOrchestrator")
            .field("constructors", &names)
            .finish()
    }
}

impl Orchestrator for StandardOrchestrator {
    fn construct(&self, ty: &TypeRef) -> Result<Value, MapError> {
        if let Some(constructor) = self.constructors.get(ty.name()) {
            return Ok(constructor());
        }
        match ty.kind() {
            TypeKind::Record(_) => {
                let mut object = ObjectValue::new(ty.name());
                for member in record_members(ty) {
                    object.set(member.name(), default_value(member.ty()));
                }
                Ok(Value::Object(object))
            }
            TypeKind::Array(_) => Ok(Value::Array(Vec::new())),
            TypeKind::Scalar { .. } | TypeKind::Text => Ok(default_value(ty)),
            TypeKind::Generic { definition, .. } => match definition {
                GenericDef::Container(container @ (Container::List | Container::Collection)) => {
                    Ok(Value::Collection(CollectionValue::new(*container)))
                }
                GenericDef::Container(Container::ReadOnly) => Err(MapError::construction(
                    ty.name(),
                    "read-only collections are built by wrapping a list",
                )),
                GenericDef::Contract(_) => Err(MapError::construction(
                    ty.name(),
                    "collection contracts are abstract",
                )),
                GenericDef::Tuple(_) => Err(MapError::construction(
                    ty.name(),
                    "tuples are built positionally from their slots",
                )),
            },
        }
    }

    fn map_value(
        &self,
        source: Value,
        existing: Option<&Value>,
        source_kind: ValueKind,
        destination: &TypeRef,
    ) -> Result<Value, MapError> {
        match destination.kind() {
            TypeKind::Scalar { kind, nullable } => {
                convert_scalar(source, source_kind, *kind, *nullable, destination)
            }
            TypeKind::Text => convert_text(source, source_kind),
            _ => match source {
                Value::Null => Ok(existing.cloned().unwrap_or(Value::Null)),
                value if accepts_structured(destination, &value) => Ok(value),
                value => Err(MapError::conversion(
                    source_kind,
                    destination.name(),
                    format!(
                        "a {} value cannot populate a structured member",
                        value.kind()
                    ),
                )),
            },
        }
    }

    fn writable_members<'a>(&self, ty: &'a TypeRef) -> Vec<&'a MemberDesc> {
        record_members(ty)
            .into_iter()
            .filter(|m| m.is_writable())
            .collect()
    }
}

/// Members of `ty` and its record ancestors, base members first
pub fn record_members<'a>(ty: &'a TypeRef) -> Vec<&'a MemberDesc> {
    let mut chain: Vec<&'a TypeRef> = std::iter::successors(Some(ty), |t: &&'a TypeRef| {
        let t: &'a TypeRef = *t;
        t.base()
    })
    .collect();
    chain.reverse();
    chain
        .into_iter()
        .flat_map(|t: &'a TypeRef| t.members())
        .collect()
}

/// Value a member holds before anything is assigned to it
pub fn default_value(ty: &TypeRef) -> Value {
    match ty.kind() {
        TypeKind::Scalar {
            kind,
            nullable: false,
        } => default_scalar(*kind),
        _ => Value::Null,
    }
}

fn default_scalar(kind: ScalarKind) -> Value {
    match kind {
        ScalarKind::Bool => Value::Bool(false),
        ScalarKind::Int32 | ScalarKind::Int64 => Value::Int(0),
        ScalarKind::Float64 => Value::Float(0.0),
        ScalarKind::Decimal => Value::Decimal(Decimal::ZERO),
        ScalarKind::DateTime => Value::DateTime(NaiveDateTime::default()),
        ScalarKind::Uuid => Value::Uuid(Uuid::nil()),
    }
}

fn accepts_structured(destination: &TypeRef, value: &Value) -> bool {
    match (destination.kind(), value) {
        (TypeKind::Record(_), Value::Object(object)) => object.type_name() == destination.name(),
        (TypeKind::Array(_), Value::Array(_)) => true,
        (TypeKind::Generic { definition, .. }, Value::Tuple(_)) => definition.is_tuple(),
        (TypeKind::Generic { definition, .. }, Value::Collection(_)) => !definition.is_tuple(),
        _ => false,
    }
}

fn parse_text<T: FromStr>(text: &str, from: ValueKind, to: ScalarKind) -> Result<T, MapError>
where
    T::Err: std::fmt::Display,
{
    text.trim()
        .parse::<T>()
        .map_err(|e| MapError::conversion(from, to.as_str(), e.to_string()))
}

fn out_of_range(from: ValueKind, to: ScalarKind) -> MapError {
    MapError::conversion(from, to.as_str(), "value out of range")
}

fn convert_scalar(
    source: Value,
    from: ValueKind,
    kind: ScalarKind,
    nullable: bool,
    destination: &TypeRef,
) -> Result<Value, MapError> {
    let converted = match (kind, source) {
        (_, Value::Null) if nullable => Value::Null,
        (_, Value::Null) => default_scalar(kind),

        (ScalarKind::Bool, Value::Bool(b)) => Value::Bool(b),
        (ScalarKind::Bool, Value::Int(i)) => Value::Bool(i != 0),
        (ScalarKind::Bool, Value::Text(s)) => Value::Bool(parse_text(&s, from, kind)?),

        (ScalarKind::Int32, Value::Int(i)) => {
            let narrowed = i32::try_from(i).map_err(|_| out_of_range(from, kind))?;
            Value::Int(narrowed as i64)
        }
        (ScalarKind::Int32, Value::Decimal(d)) => {
            Value::Int(d.to_i32().ok_or_else(|| out_of_range(from, kind))? as i64)
        }
        (ScalarKind::Int32, Value::Text(s)) => {
            Value::Int(parse_text::<i32>(&s, from, kind)? as i64)
        }

        (ScalarKind::Int64, Value::Int(i)) => Value::Int(i),
        (ScalarKind::Int64, Value::Decimal(d)) => {
            Value::Int(d.to_i64().ok_or_else(|| out_of_range(from, kind))?)
        }
        (ScalarKind::Int64, Value::Text(s)) => Value::Int(parse_text(&s, from, kind)?),

        (ScalarKind::Int32 | ScalarKind::Int64, Value::Bool(b)) => Value::Int(i64::from(b)),

        (ScalarKind::Float64, Value::Float(f)) => Value::Float(f),
        (ScalarKind::Float64, Value::Int(i)) => Value::Float(i as f64),
        (ScalarKind::Float64, Value::Decimal(d)) => {
            Value::Float(d.to_f64().ok_or_else(|| out_of_range(from, kind))?)
        }
        (ScalarKind::Float64, Value::Text(s)) => Value::Float(parse_text(&s, from, kind)?),

        (ScalarKind::Decimal, Value::Decimal(d)) => Value::Decimal(d),
        (ScalarKind::Decimal, Value::Int(i)) => Value::Decimal(Decimal::from(i)),
        (ScalarKind::Decimal, Value::Float(f)) => {
            let decimal = Decimal::try_from(f)
                .map_err(|e| MapError::conversion(from, kind.as_str(), e.to_string()))?;
            Value::Decimal(decimal)
        }
        (ScalarKind::Decimal, Value::Text(s)) => Value::Decimal(parse_text(&s, from, kind)?),

        (ScalarKind::DateTime, Value::DateTime(d)) => Value::DateTime(d),
        (ScalarKind::DateTime, Value::Text(s)) => Value::DateTime(parse_text(&s, from, kind)?),

        (ScalarKind::Uuid, Value::Uuid(u)) => Value::Uuid(u),
        (ScalarKind::Uuid, Value::Text(s)) => Value::Uuid(parse_text(&s, from, kind)?),

        (_, other) => {
            return Err(MapError::conversion(
                other.kind(),
                destination.name(),
                "no conversion between these kinds",
            ));
        }
    };
    Ok(converted)
}

fn convert_text(source: Value, from: ValueKind) -> Result<Value, MapError> {
    let text = match source {
        Value::Null => return Ok(Value::Null),
        Value::Text(s) => s,
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Decimal(d) => d.to_string(),
        Value::DateTime(d) => d.to_string(),
        Value::Uuid(u) => u.to_string(),
        _ => {
            return Err(MapError::conversion(
                from,
                "String",
                "structured values have no text form",
            ));
        }
    };
    Ok(Value::Text(text))
}
