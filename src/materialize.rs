//! Collection materialization.
//!
//! Builds populated containers from the rows of the current result set. The
//! per-row element mapping is supplied by the caller; the materializer owns
//! the row loop, the shared field-name set and the final container shape.

use record_types::{CollectionValue, Container, TypeRef, Value};
use tracing::debug;

use crate::error::MapError;
use crate::orchestrator::Orchestrator;
use crate::stream::{FieldNameSet, RecordStream};

pub struct CollectionMaterializer<'a, O: ?Sized> {
    orchestrator: &'a O,
}

impl<'a, O: Orchestrator + ?Sized> CollectionMaterializer<'a, O> {
    pub fn new(orchestrator: &'a O) -> Self {
        Self { orchestrator }
    }

    /// Fill a container of `container_ty` with one element per remaining
    /// row. `existing` is filled in place when supplied; otherwise the
    /// orchestrator constructs an empty container first.
    pub fn materialize<F>(
        &self,
        stream: &mut dyn RecordStream,
        container_ty: &TypeRef,
        existing: Option<Value>,
        map_element: F,
    ) -> Result<Value, MapError>
    where
        F: FnMut(&mut dyn RecordStream, &FieldNameSet) -> Result<Value, MapError>,
    {
        let mut container = match existing {
            Some(value) => value,
            None => self.orchestrator.construct(container_ty)?,
        };
        let rows = fill(stream, map_element, |element| {
            push_element(&mut container, container_ty, element)
        })?;
        debug!(container = %container_ty, rows, "materialized collection");
        Ok(container)
    }

    /// Standard growable list of the remaining rows
    pub fn materialize_list<F>(
        &self,
        stream: &mut dyn RecordStream,
        element: &TypeRef,
        map_element: F,
    ) -> Result<CollectionValue, MapError>
    where
        F: FnMut(&mut dyn RecordStream, &FieldNameSet) -> Result<Value, MapError>,
    {
        let mut list = CollectionValue::new(Container::List);
        let rows = fill(stream, map_element, |item| {
            list.push(item)
                .map_err(|e| MapError::Configuration(e.to_string()))
        })?;
        debug!(element = %element, rows, "materialized list");
        Ok(list)
    }

    /// Fixed-size array sized to the row count
    pub fn materialize_array<F>(
        &self,
        stream: &mut dyn RecordStream,
        element: &TypeRef,
        map_element: F,
    ) -> Result<Value, MapError>
    where
        F: FnMut(&mut dyn RecordStream, &FieldNameSet) -> Result<Value, MapError>,
    {
        let list = self.materialize_list(stream, element, map_element)?;
        let mut array = Vec::with_capacity(list.len());
        array.extend(list.into_items());
        Ok(Value::Array(array))
    }

    /// Read-only wrapper around a list of the remaining rows
    pub fn materialize_read_only<F>(
        &self,
        stream: &mut dyn RecordStream,
        element: &TypeRef,
        map_element: F,
    ) -> Result<Value, MapError>
    where
        F: FnMut(&mut dyn RecordStream, &FieldNameSet) -> Result<Value, MapError>,
    {
        let list = self.materialize_list(stream, element, map_element)?;
        Ok(Value::Collection(CollectionValue::wrap_read_only(list)))
    }
}

/// Drive the row loop: capture the field names once, then map and sink one
/// element per row until the result set is exhausted
fn fill<F, P>(
    stream: &mut dyn RecordStream,
    mut map_element: F,
    mut sink: P,
) -> Result<usize, MapError>
where
    F: FnMut(&mut dyn RecordStream, &FieldNameSet) -> Result<Value, MapError>,
    P: FnMut(Value) -> Result<(), MapError>,
{
    let fields = FieldNameSet::capture(&*stream);
    let mut rows = 0;
    while stream.advance_row()? {
        sink(map_element(&mut *stream, &fields)?)?;
        rows += 1;
    }
    Ok(rows)
}

fn push_element(
    container: &mut Value,
    container_ty: &TypeRef,
    element: Value,
) -> Result<(), MapError> {
    match container {
        Value::Collection(collection) => collection
            .push(element)
            .map_err(|e| MapError::Configuration(format!("{container_ty}: {e}"))),
        Value::Object(object) => {
            object.push_item(element);
            Ok(())
        }
        Value::Array(items) => {
            items.push(element);
            Ok(())
        }
        other => Err(MapError::construction(
            container_ty.name(),
            format!("constructed a {} value, expected a container", other.kind()),
        )),
    }
}
