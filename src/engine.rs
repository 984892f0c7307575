//! The mapping engine.
//!
//! [`MappingEngine::map`] classifies the destination type and dispatches on
//! its [`ShapeKind`]:
//!
//! | Shape                          | Strategy                                   |
//! |--------------------------------|--------------------------------------------|
//! | `Tuple`                        | one result set per slot, in order          |
//! | `Array`                        | list of every row, copied into an array    |
//! | `Sequence`, `ReadOnlySequence` | every row of the current result set        |
//! | `Scalar`, `Object`             | first row, or the empty fallback           |
//!
//! The stream only ever moves forward. Values are constructed and converted
//! by the [`Orchestrator`]; the engine decides which rows and columns feed
//! which destination.

use std::sync::Arc;

use record_types::{TypeRef, Value};
use tracing::{debug, instrument, trace};

use crate::binder::MemberBinder;
use crate::config::{EmptyResultPolicy, MapperConfig};
use crate::error::{MapError, StreamError};
use crate::materialize::CollectionMaterializer;
use crate::orchestrator::{Orchestrator, StandardOrchestrator};
use crate::registry::ConcreteCollectionRegistry;
use crate::shape::{ShapeClassifier, ShapeKind, TypeShape};
use crate::stream::{ColumnRead, FieldNameSet, RecordStream};

/// Maps record streams onto destination types.
///
/// Clones share the orchestrator and both caches, so an engine can be
/// cloned onto worker threads without re-classifying types.
pub struct MappingEngine<O> {
    orchestrator: Arc<O>,
    classifier: Arc<ShapeClassifier>,
    binder: Arc<MemberBinder>,
    empty_result_policy: EmptyResultPolicy,
}

impl<O> Clone for MappingEngine<O> {
    fn clone(&self) -> Self {
        Self {
            orchestrator: Arc::clone(&self.orchestrator),
            classifier: Arc::clone(&self.classifier),
            binder: Arc::clone(&self.binder),
            empty_result_policy: self.empty_result_policy,
        }
    }
}

impl Default for MappingEngine<StandardOrchestrator> {
    fn default() -> Self {
        Self::new(StandardOrchestrator::new())
    }
}

impl<O: Orchestrator> MappingEngine<O> {
    pub fn new(orchestrator: O) -> Self {
        Self::with_config(orchestrator, MapperConfig::default())
    }

    pub fn with_config(orchestrator: O, config: MapperConfig) -> Self {
        debug!(
            policy = ?config.empty_result_policy,
            overrides = config.registry.len(),
            "building mapping engine"
        );
        Self {
            orchestrator: Arc::new(orchestrator),
            classifier: Arc::new(ShapeClassifier::new(config.build_registry())),
            binder: Arc::new(MemberBinder::new()),
            empty_result_policy: config.empty_result_policy,
        }
    }

    /// Engine over an explicitly built registry, with the default policy
    pub fn with_registry(orchestrator: O, registry: ConcreteCollectionRegistry) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            classifier: Arc::new(ShapeClassifier::new(registry)),
            binder: Arc::new(MemberBinder::new()),
            empty_result_policy: EmptyResultPolicy::default(),
        }
    }

    pub fn orchestrator(&self) -> &O {
        &self.orchestrator
    }

    pub fn classifier(&self) -> &ShapeClassifier {
        &self.classifier
    }

    pub fn binder(&self) -> &MemberBinder {
        &self.binder
    }

    pub fn empty_result_policy(&self) -> EmptyResultPolicy {
        self.empty_result_policy
    }

    /// Map `stream` onto `destination`, filling `existing` where the
    /// strategy supports it.
    ///
    /// Classification and member bindings are cached by type name for the
    /// lifetime of the engine. Distinct descriptors must carry distinct
    /// names: a descriptor whose name was already seen is mapped with the
    /// members of the first one.
    #[instrument(level = "debug", skip_all, fields(destination = %destination))]
    pub fn map<S: RecordStream>(
        &self,
        stream: &mut S,
        destination: &TypeRef,
        existing: Option<Value>,
    ) -> Result<Value, MapError> {
        let shape = self.classifier.classify(destination);
        self.map_shape(stream, &shape, existing)
    }

    fn map_shape(
        &self,
        stream: &mut dyn RecordStream,
        shape: &TypeShape,
        existing: Option<Value>,
    ) -> Result<Value, MapError> {
        debug!(destination = %shape.ty(), kind = ?shape.kind(), "selected strategy");
        match shape.kind() {
            ShapeKind::Tuple => self.map_tuple(stream, shape),
            ShapeKind::Array | ShapeKind::Sequence | ShapeKind::ReadOnlySequence => {
                self.map_collection(stream, shape, existing)
            }
            ShapeKind::Scalar | ShapeKind::Object => {
                if stream.advance_row()? {
                    self.map_object(stream, shape.ty(), existing, None)
                } else {
                    self.empty_fallback(shape.ty(), existing)
                }
            }
        }
    }

    // ========================================================================
    // TUPLES
    // ========================================================================

    fn map_tuple(
        &self,
        stream: &mut dyn RecordStream,
        shape: &TypeShape,
    ) -> Result<Value, MapError> {
        if !shape
            .ty()
            .generic_definition()
            .is_some_and(|d| d.is_tuple())
        {
            return Err(MapError::Configuration(format!(
                "{} derives from a tuple but has no positional constructor",
                shape.ty()
            )));
        }

        let slots = shape.generic_arguments();
        let mut values = Vec::with_capacity(slots.len());
        let mut result_set_available = true;

        for (index, slot) in slots.iter().enumerate() {
            let value = if !result_set_available {
                self.empty_slot(slot)?
            } else if slot.is_collection() {
                self.map_collection(stream, slot, None)?
            } else if stream.advance_row()? {
                self.map_object(stream, slot.ty(), None, None)?
            } else {
                self.empty_fallback(slot.ty(), None)?
            };
            values.push(value);

            if result_set_available {
                result_set_available = stream.advance_result_set()?;
                debug!(
                    slot = index,
                    result_set_available,
                    "advanced past tuple slot"
                );
            }
        }

        Ok(Value::Tuple(values))
    }

    /// Value for a slot with no result set left to read from
    fn empty_slot(&self, slot: &TypeShape) -> Result<Value, MapError> {
        if slot.is_collection() {
            self.map_collection(&mut Exhausted, slot, None)
        } else {
            self.empty_fallback(slot.ty(), None)
        }
    }

    // ========================================================================
    // COLLECTIONS
    // ========================================================================

    fn map_collection(
        &self,
        stream: &mut dyn RecordStream,
        shape: &TypeShape,
        existing: Option<Value>,
    ) -> Result<Value, MapError> {
        let materializer = CollectionMaterializer::new(self.orchestrator.as_ref());

        if shape.ty().is_array() {
            let element = element_shape(shape)?.ty();
            return materializer.materialize_array(stream, element, self.element_mapper(element));
        }

        if shape.is_declared_as_collection() {
            let element = element_shape(shape)?.ty();
            let concrete = self.classifier.concrete_type(shape)?;
            if concrete
                .generic_definition()
                .is_some_and(|d| d.is_read_only())
            {
                return materializer.materialize_read_only(
                    stream,
                    element,
                    self.element_mapper(element),
                );
            }
            return materializer.materialize(
                stream,
                &concrete,
                existing,
                self.element_mapper(element),
            );
        }

        match shape.find_element_type() {
            Some(element) => {
                materializer.materialize(stream, shape.ty(), existing, self.element_mapper(element))
            }
            None => {
                debug!(destination = %shape.ty(), "no element type, returning default instance");
                match existing {
                    Some(value) => Ok(value),
                    None => self.orchestrator.construct(shape.ty()),
                }
            }
        }
    }

    fn element_mapper<'s>(
        &'s self,
        element: &'s TypeRef,
    ) -> impl FnMut(&mut dyn RecordStream, &FieldNameSet) -> Result<Value, MapError> + 's {
        move |stream, fields| self.map_object(stream, element, None, Some(fields))
    }

    // ========================================================================
    // OBJECTS
    // ========================================================================

    /// Map the current row onto `ty`. Members whose column is absent from
    /// `fields` or cannot be read keep their current value.
    fn map_object(
        &self,
        stream: &mut dyn RecordStream,
        ty: &TypeRef,
        existing: Option<Value>,
        fields: Option<&FieldNameSet>,
    ) -> Result<Value, MapError> {
        let mut destination = match existing {
            Some(value) => value,
            None => self.orchestrator.construct(ty)?,
        };

        let captured;
        let fields = match fields {
            Some(fields) => fields,
            None => {
                captured = FieldNameSet::capture(&*stream);
                &captured
            }
        };

        for member in self.orchestrator.writable_members(ty) {
            let column = self.binder.resolve_column_name(ty, member);
            if !fields.contains(&column) {
                continue;
            }

            let source = match stream.value_by_name(&column) {
                ColumnRead::Value(value) => value,
                ColumnRead::DbNull => Value::Null,
                ColumnRead::Missing => {
                    trace!(destination = %ty, column = &*column, "column missing from row");
                    continue;
                }
                ColumnRead::Unreadable(reason) => {
                    debug!(
                        destination = %ty,
                        member = member.name(),
                        column = &*column,
                        %reason,
                        "column could not be read, member skipped"
                    );
                    continue;
                }
            };

            let source_kind = source.kind();
            let mapped = self.orchestrator.map_value(
                source,
                member.read(&destination),
                source_kind,
                member.ty(),
            )?;
            if !member.write(&mut destination, mapped) {
                return Err(MapError::MemberWrite {
                    type_name: ty.name().to_string(),
                    member: member.name().to_string(),
                });
            }
        }

        Ok(destination)
    }

    fn empty_fallback(&self, ty: &TypeRef, existing: Option<Value>) -> Result<Value, MapError> {
        if let Some(value) = existing {
            return Ok(value);
        }
        match self.empty_result_policy {
            EmptyResultPolicy::ConstructDefault => self.orchestrator.construct(ty),
            EmptyResultPolicy::ReturnAbsent => Ok(Value::Null),
        }
    }
}

fn element_shape(shape: &TypeShape) -> Result<&TypeShape, MapError> {
    shape
        .generic_arguments()
        .first()
        .map(Arc::as_ref)
        .ok_or_else(|| {
            MapError::Configuration(format!("{} has no element type", shape.ty()))
        })
}

/// A stream past its last result set
struct Exhausted;

impl RecordStream for Exhausted {
    fn advance_row(&mut self) -> Result<bool, StreamError> {
        Ok(false)
    }

    fn advance_result_set(&mut self) -> Result<bool, StreamError> {
        Ok(false)
    }

    fn column_count(&self) -> usize {
        0
    }

    fn column_name(&self, _ordinal: usize) -> Option<&str> {
        None
    }

    fn value_by_name(&self, _name: &str) -> ColumnRead {
        ColumnRead::Missing
    }
}
