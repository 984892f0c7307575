//! Record Types - Level 1 Foundation Types
//!
//! Pure data structures shared by the mapping engine and by every
//! orchestrator that plugs into it.
//!
//! ## Contents
//!
//! - Destination type descriptors: scalars, text, arrays, collection
//!   contracts and containers, tuples, user records with members
//! - Dynamic values produced by mapping
//!
//! ## Rules
//!
//! 1. **NO MAPPING LOGIC** - classification and binding live in `record_mapper`
//! 2. **NO WORKSPACE DEPENDENCIES** - this crate sits at the bottom of the graph
//! 3. **THREAD SAFE** - every type is `Send + Sync`

pub mod types;
pub mod value;

pub use types::{
    Container, Contract, GenericDef, MemberDesc, RecordBuilder, RecordDesc, ScalarKind, TypeDesc,
    TypeDescError, TypeKind, TypeRef, MAX_TUPLE_ARITY,
};
pub use value::{CollectionValue, ObjectValue, ReadOnlyCollectionError, Value, ValueKind};
