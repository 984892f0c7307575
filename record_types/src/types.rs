//! Destination type descriptors.
//!
//! A [`TypeDesc`] describes the shape of a mapping destination: a scalar, a
//! text value, an array, one of the generic collection contracts or
//! containers, a fixed-arity tuple, or a user record with named members.
//! Descriptors are immutable and shared as [`TypeRef`]. The canonical name of
//! a descriptor is its identity: two descriptors with the same name are the
//! same destination type as far as every cache is concerned.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::value::Value;

/// Shared handle to a type descriptor
pub type TypeRef = Arc<TypeDesc>;

/// Largest tuple arity a destination may declare
pub const MAX_TUPLE_ARITY: usize = 8;

// ============================================================================
// SCALARS
// ============================================================================

/// Scalar storage kinds understood by the value model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    Bool,
    Int32,
    Int64,
    Float64,
    Decimal,
    DateTime,
    Uuid,
}

impl ScalarKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::Int32 => "i32",
            ScalarKind::Int64 => "i64",
            ScalarKind::Float64 => "f64",
            ScalarKind::Decimal => "Decimal",
            ScalarKind::DateTime => "NaiveDateTime",
            ScalarKind::Uuid => "Uuid",
        }
    }
}

// ============================================================================
// GENERIC DEFINITIONS
// ============================================================================

/// Collection contracts a destination can be declared as.
///
/// Contracts are abstract: they are never constructed directly, a concrete
/// [`Container`] is chosen for them when mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Contract {
    /// General forward-only sequence
    Sequence,
    /// Mutable, indexable list
    List,
    /// Indexable list that cannot be modified
    ReadOnlyList,
    /// Sized collection that cannot be modified
    ReadOnlyCollection,
    /// Mutable collection
    Collection,
}

impl Contract {
    pub const ALL: [Contract; 5] = [
        Contract::Sequence,
        Contract::List,
        Contract::ReadOnlyList,
        Contract::ReadOnlyCollection,
        Contract::Collection,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Contract::Sequence => "Sequence",
            Contract::List => "List",
            Contract::ReadOnlyList => "ReadOnlyList",
            Contract::ReadOnlyCollection => "ReadOnlyCollection",
            Contract::Collection => "Collection",
        }
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self, Contract::ReadOnlyList | Contract::ReadOnlyCollection)
    }
}

/// Concrete collection containers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Container {
    /// Growable list
    List,
    /// Growable collection
    Collection,
    /// Read-only wrapper around a list
    ReadOnly,
}

impl Container {
    pub fn as_str(&self) -> &'static str {
        match self {
            Container::List => "List",
            Container::Collection => "Collection",
            Container::ReadOnly => "ReadOnlyCollection",
        }
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self, Container::ReadOnly)
    }
}

/// The unparameterised definition behind a generic destination type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenericDef {
    Contract(Contract),
    Container(Container),
    Tuple(u8),
}

impl GenericDef {
    pub fn is_contract(&self) -> bool {
        matches!(self, GenericDef::Contract(_))
    }

    pub fn is_tuple(&self) -> bool {
        matches!(self, GenericDef::Tuple(_))
    }

    pub fn is_read_only(&self) -> bool {
        match self {
            GenericDef::Contract(c) => c.is_read_only(),
            GenericDef::Container(c) => c.is_read_only(),
            GenericDef::Tuple(_) => false,
        }
    }
}

impl fmt::Display for GenericDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenericDef::Contract(c) => write!(f, "dyn {}<>", c.as_str()),
            GenericDef::Container(c) => write!(f, "{}<>", c.as_str()),
            GenericDef::Tuple(arity) => write!(f, "tuple/{}", arity),
        }
    }
}

/// Errors raised while building type descriptors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeDescError {
    #[error("tuple arity must be between 1 and {MAX_TUPLE_ARITY}, got {0}")]
    TupleArity(usize),
}

// ============================================================================
// TYPE DESCRIPTORS
// ============================================================================

/// Structure of a destination type
#[derive(Debug)]
pub enum TypeKind {
    Scalar {
        kind: ScalarKind,
        nullable: bool,
    },
    Text,
    Array(TypeRef),
    Generic {
        definition: GenericDef,
        args: Vec<TypeRef>,
    },
    Record(RecordDesc),
}

/// A destination type
#[derive(Debug)]
pub struct TypeDesc {
    name: String,
    kind: TypeKind,
}

impl TypeDesc {
    pub fn scalar(kind: ScalarKind) -> TypeRef {
        Arc::new(Self {
            name: kind.as_str().to_string(),
            kind: TypeKind::Scalar {
                kind,
                nullable: false,
            },
        })
    }

    pub fn nullable(kind: ScalarKind) -> TypeRef {
        Arc::new(Self {
            name: format!("Option<{}>", kind.as_str()),
            kind: TypeKind::Scalar {
                kind,
                nullable: true,
            },
        })
    }

    pub fn text() -> TypeRef {
        Arc::new(Self {
            name: "String".to_string(),
            kind: TypeKind::Text,
        })
    }

    pub fn array(element: TypeRef) -> TypeRef {
        Arc::new(Self {
            name: format!("[{}]", element.name),
            kind: TypeKind::Array(element),
        })
    }

    /// A collection contract over `element`, e.g. `dyn List<Order>`
    pub fn contract(contract: Contract, element: TypeRef) -> TypeRef {
        Arc::new(Self {
            name: format!("dyn {}<{}>", contract.as_str(), element.name),
            kind: TypeKind::Generic {
                definition: GenericDef::Contract(contract),
                args: vec![element],
            },
        })
    }

    /// A concrete container over `element`, e.g. `List<Order>`
    pub fn container(container: Container, element: TypeRef) -> TypeRef {
        Arc::new(Self {
            name: format!("{}<{}>", container.as_str(), element.name),
            kind: TypeKind::Generic {
                definition: GenericDef::Container(container),
                args: vec![element],
            },
        })
    }

    pub fn tuple(slots: Vec<TypeRef>) -> Result<TypeRef, TypeDescError> {
        if slots.is_empty() || slots.len() > MAX_TUPLE_ARITY {
            return Err(TypeDescError::TupleArity(slots.len()));
        }
        let names: Vec<&str> = slots.iter().map(|s| s.name.as_str()).collect();
        Ok(Arc::new(Self {
            name: format!("({})", names.join(", ")),
            kind: TypeKind::Generic {
                definition: GenericDef::Tuple(slots.len() as u8),
                args: slots,
            },
        }))
    }

    /// Start describing a user record type
    pub fn record(name: impl Into<String>) -> RecordBuilder {
        RecordBuilder {
            name: name.into(),
            desc: RecordDesc::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, TypeKind::Text)
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, TypeKind::Array(_))
    }

    pub fn array_element(&self) -> Option<&TypeRef> {
        match &self.kind {
            TypeKind::Array(element) => Some(element),
            _ => None,
        }
    }

    pub fn generic_definition(&self) -> Option<GenericDef> {
        match &self.kind {
            TypeKind::Generic { definition, .. } => Some(*definition),
            _ => None,
        }
    }

    /// Generic arguments; empty for non-generic types
    pub fn generic_args(&self) -> &[TypeRef] {
        match &self.kind {
            TypeKind::Generic { args, .. } => args,
            _ => &[],
        }
    }

    /// True for abstract collection contracts
    pub fn is_contract(&self) -> bool {
        self.generic_definition()
            .map(|d| d.is_contract())
            .unwrap_or(false)
    }

    pub fn as_record(&self) -> Option<&RecordDesc> {
        match &self.kind {
            TypeKind::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Direct ancestor; only records have one
    pub fn base(&self) -> Option<&TypeRef> {
        self.as_record().and_then(|r| r.base.as_ref())
    }

    /// Contracts declared directly on this type
    pub fn implements(&self) -> &[TypeRef] {
        self.as_record()
            .map(|r| r.implements.as_slice())
            .unwrap_or(&[])
    }

    pub fn members(&self) -> &[MemberDesc] {
        self.as_record()
            .map(|r| r.members.as_slice())
            .unwrap_or(&[])
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// ============================================================================
// RECORDS AND MEMBERS
// ============================================================================

/// Structure of a user record type
#[derive(Debug, Default)]
pub struct RecordDesc {
    base: Option<TypeRef>,
    implements: Vec<TypeRef>,
    members: Vec<MemberDesc>,
}

impl RecordDesc {
    pub fn base(&self) -> Option<&TypeRef> {
        self.base.as_ref()
    }

    pub fn implements(&self) -> &[TypeRef] {
        &self.implements
    }

    pub fn members(&self) -> &[MemberDesc] {
        &self.members
    }
}

/// Builder for [`TypeDesc::record`]
#[derive(Debug)]
pub struct RecordBuilder {
    name: String,
    desc: RecordDesc,
}

impl RecordBuilder {
    /// Add a writable member read from the column of the same name
    pub fn member(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.desc.members.push(MemberDesc::new(name, ty));
        self
    }

    /// Add a writable member read from an explicitly named column
    pub fn member_with_column(
        mut self,
        name: impl Into<String>,
        ty: TypeRef,
        column: impl Into<String>,
    ) -> Self {
        self.desc
            .members
            .push(MemberDesc::new(name, ty).with_column(column));
        self
    }

    /// Add a member that mapping never assigns
    pub fn read_only_member(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.desc
            .members
            .push(MemberDesc::new(name, ty).read_only());
        self
    }

    pub fn extends(mut self, base: TypeRef) -> Self {
        self.desc.base = Some(base);
        self
    }

    pub fn implements(mut self, contract: TypeRef) -> Self {
        self.desc.implements.push(contract);
        self
    }

    pub fn build(self) -> TypeRef {
        Arc::new(TypeDesc {
            name: self.name,
            kind: TypeKind::Record(self.desc),
        })
    }
}

/// A named member of a record type
#[derive(Debug, Clone)]
pub struct MemberDesc {
    name: String,
    ty: TypeRef,
    column: Option<String>,
    writable: bool,
}

impl MemberDesc {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            column: None,
            writable: true,
        }
    }

    /// Override the column this member reads from
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    pub fn column_override(&self) -> Option<&str> {
        self.column.as_deref()
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Current value of this member on `target`, if `target` is an object
    pub fn read<'a>(&self, target: &'a Value) -> Option<&'a Value> {
        match target {
            Value::Object(object) => object.get(&self.name),
            _ => None,
        }
    }

    /// Assign this member on `target`; returns false if `target` is not an object
    pub fn write(&self, target: &mut Value, value: Value) -> bool {
        match target {
            Value::Object(object) => {
                object.set(self.name.clone(), value);
                true
            }
            _ => false,
        }
    }
}
