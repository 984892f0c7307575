//! Type shape classification.
//!
//! [`ShapeClassifier`] inspects a destination type once and caches the
//! answer to every structural question the engine asks about it: tuple or
//! collection, declared as a collection itself, read-only, generic
//! arguments, concrete backing type and element type.
//!
//! Rules:
//!
//! - Text is never a collection or a tuple.
//! - A type is a tuple if it or an ancestor is a tuple definition.
//! - A type is a collection if it is an array, or it, an ancestor, or a
//!   contract it implements is a collection contract or container.
//! - A type is *declared* as a collection only if its own definition is an
//!   array or a collection contract/container. Records never are: a record
//!   that also implements a contract is mapped as a custom container.
//! - A type is read-only if its own definition is a read-only contract or
//!   the read-only container.
//! - The element type is the argument of the first mutable list/collection
//!   definition found on the type, its ancestors, or their contracts.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use record_types::{Container, Contract, GenericDef, TypeKind, TypeRef};
use tracing::{debug, trace};

use crate::error::MapError;
use crate::registry::ConcreteCollectionRegistry;

const ENUMERABLE_DEFS: [GenericDef; 8] = [
    GenericDef::Contract(Contract::Sequence),
    GenericDef::Contract(Contract::List),
    GenericDef::Contract(Contract::ReadOnlyList),
    GenericDef::Contract(Contract::ReadOnlyCollection),
    GenericDef::Contract(Contract::Collection),
    GenericDef::Container(Container::List),
    GenericDef::Container(Container::Collection),
    GenericDef::Container(Container::ReadOnly),
];

const MUTABLE_COLLECTION_DEFS: [GenericDef; 4] = [
    GenericDef::Contract(Contract::List),
    GenericDef::Contract(Contract::Collection),
    GenericDef::Container(Container::List),
    GenericDef::Container(Container::Collection),
];

/// Closed set of destination shapes the engine dispatches on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    /// Scalars and text
    Scalar,
    /// Records mapped member by member
    Object,
    /// Fixed-size arrays
    Array,
    /// Mutable collections, including custom records that implement one
    Sequence,
    /// Read-only collection contracts and wrappers
    ReadOnlySequence,
    /// Fixed-arity tuples
    Tuple,
}

/// Cached classification of one destination type
#[derive(Debug)]
pub struct TypeShape {
    ty: TypeRef,
    kind: ShapeKind,
    is_tuple: bool,
    is_collection: bool,
    is_declared_as_collection: bool,
    is_read_only: bool,
    generic_arguments: Vec<Arc<TypeShape>>,
    concrete_type: OnceLock<TypeRef>,
    element_type: OnceLock<Option<TypeRef>>,
}

impl TypeShape {
    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    pub fn is_tuple(&self) -> bool {
        self.is_tuple
    }

    pub fn is_collection(&self) -> bool {
        self.is_collection
    }

    pub fn is_declared_as_collection(&self) -> bool {
        self.is_declared_as_collection
    }

    pub fn is_read_only(&self) -> bool {
        self.is_read_only
    }

    /// Tuple slots, or the single element of an array or generic collection
    pub fn generic_arguments(&self) -> &[Arc<TypeShape>] {
        &self.generic_arguments
    }

    /// Type to instantiate for this destination. Resolved once: contracts
    /// go through `registry`, every other type backs itself.
    pub fn concrete_type(
        &self,
        registry: &ConcreteCollectionRegistry,
    ) -> Result<TypeRef, MapError> {
        if let Some(concrete) = self.concrete_type.get() {
            return Ok(concrete.clone());
        }
        let resolved = match (self.ty.generic_definition(), self.ty.generic_args().first()) {
            (Some(GenericDef::Contract(contract)), Some(element)) => {
                registry.resolve(contract, element)?
            }
            _ => self.ty.clone(),
        };
        Ok(self.concrete_type.get_or_init(|| resolved).clone())
    }

    /// Element type of a mutable list/collection found on this type or its
    /// ancestry; `None` if there is none
    pub fn find_element_type(&self) -> Option<&TypeRef> {
        self.element_type
            .get_or_init(|| find_generic(&self.ty, &MUTABLE_COLLECTION_DEFS, true))
            .as_ref()
    }
}

// ============================================================================
// CLASSIFICATION RULES
// ============================================================================

fn ancestry<'a>(ty: &'a TypeRef, check_base: bool) -> impl Iterator<Item = &'a TypeRef> + 'a {
    std::iter::successors(Some(ty), move |t: &&'a TypeRef| {
        let t: &'a TypeRef = *t;
        t.base().filter(|_| check_base)
    })
}

fn is_tuple_type(ty: &TypeRef) -> bool {
    ancestry(ty, true).any(|t| t.generic_definition().is_some_and(|d| d.is_tuple()))
}

/// First argument of a matching generic definition on `ty`, its contracts,
/// and (with `check_base`) its ancestors and their contracts
fn find_generic(ty: &TypeRef, defs: &[GenericDef], check_base: bool) -> Option<TypeRef> {
    if ty.is_text() {
        return None;
    }
    let matches = |t: &TypeRef| t.generic_definition().is_some_and(|d| defs.contains(&d));
    for candidate in ancestry(ty, check_base) {
        if matches(candidate) {
            return candidate.generic_args().first().cloned();
        }
        if let Some(contract) = candidate.implements().iter().find(|c| matches(*c)) {
            return contract.generic_args().first().cloned();
        }
    }
    None
}

fn is_collection_type(ty: &TypeRef) -> bool {
    if ty.is_text() {
        return false;
    }
    ty.is_array() || find_generic(ty, &ENUMERABLE_DEFS, true).is_some()
}

fn is_declared_collection_type(ty: &TypeRef) -> bool {
    ty.is_array()
        || ty
            .generic_definition()
            .is_some_and(|d| ENUMERABLE_DEFS.contains(&d))
}

fn is_read_only_type(ty: &TypeRef) -> bool {
    ty.generic_definition().is_some_and(|d| d.is_read_only())
}

/// Shallow layout comparison: generic definition, arity and member names
fn same_layout(a: &TypeRef, b: &TypeRef) -> bool {
    if Arc::ptr_eq(a, b) {
        return true;
    }
    let names = |t: &TypeRef| -> Vec<String> {
        t.members().iter().map(|m| m.name().to_owned()).collect()
    };
    a.generic_definition() == b.generic_definition()
        && a.generic_args().len() == b.generic_args().len()
        && names(a) == names(b)
}

// ============================================================================
// CLASSIFIER
// ============================================================================

/// Classifies destination types and caches the result per type name.
///
/// Entries are computed outside the lock and inserted first-writer-wins, so
/// concurrent callers racing on the same type all observe one shape.
///
/// The type name is the identity. A second descriptor that reuses a cached
/// name is answered with the first descriptor's shape, members included; a
/// `debug` event is emitted when the two layouts differ.
#[derive(Debug, Default)]
pub struct ShapeClassifier {
    registry: ConcreteCollectionRegistry,
    shapes: RwLock<HashMap<String, Arc<TypeShape>>>,
}

impl ShapeClassifier {
    pub fn new(registry: ConcreteCollectionRegistry) -> Self {
        Self {
            registry,
            shapes: RwLock::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &ConcreteCollectionRegistry {
        &self.registry
    }

    pub fn classify(&self, ty: &TypeRef) -> Arc<TypeShape> {
        if let Some(shape) = self
            .shapes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(ty.name())
        {
            if !same_layout(shape.ty(), ty) {
                debug!(
                    destination = %ty,
                    "name already classified with a different layout, reusing cached shape"
                );
            }
            return shape.clone();
        }

        let computed = Arc::new(self.compute(ty));
        let mut shapes = self.shapes.write().unwrap_or_else(PoisonError::into_inner);
        shapes
            .entry(ty.name().to_string())
            .or_insert(computed)
            .clone()
    }

    /// Resolve the concrete backing type of `shape` through this
    /// classifier's registry
    pub fn concrete_type(&self, shape: &TypeShape) -> Result<TypeRef, MapError> {
        shape.concrete_type(&self.registry)
    }

    /// Number of cached classifications
    pub fn cached(&self) -> usize {
        self.shapes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn compute(&self, ty: &TypeRef) -> TypeShape {
        let is_tuple = !ty.is_text() && is_tuple_type(ty);
        let is_collection = is_collection_type(ty);
        let is_read_only = is_read_only_type(ty);

        let kind = if is_tuple {
            ShapeKind::Tuple
        } else if ty.is_array() {
            ShapeKind::Array
        } else if is_collection && is_read_only {
            ShapeKind::ReadOnlySequence
        } else if is_collection {
            ShapeKind::Sequence
        } else {
            match ty.kind() {
                TypeKind::Scalar { .. } | TypeKind::Text => ShapeKind::Scalar,
                _ => ShapeKind::Object,
            }
        };

        let generic_arguments = match ty.array_element() {
            Some(element) => vec![self.classify(element)],
            None => ty.generic_args().iter().map(|a| self.classify(a)).collect(),
        };

        trace!(destination = %ty, ?kind, "classified destination type");

        TypeShape {
            ty: ty.clone(),
            kind,
            is_tuple,
            is_collection,
            is_declared_as_collection: is_declared_collection_type(ty),
            is_read_only,
            generic_arguments,
            concrete_type: OnceLock::new(),
            element_type: OnceLock::new(),
        }
    }
}
