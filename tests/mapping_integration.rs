//! End-to-end mapping of in-memory record streams
//!
//! Covers every destination shape against the `FirstTable` fixture, the
//! tuple result-set walk, null and missing-column handling, configuration
//! and shared caches across threads.

mod helpers;

use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use record_mapper::{
    ColumnRead, ConcreteCollectionRegistry, EmptyResultPolicy, MapError, MapperConfig,
    MappingEngine, MemoryRecordStream, Orchestrator, RecordStream, ResultSet, StandardOrchestrator,
    StreamError,
};
use record_types::{
    Container, Contract, MemberDesc, ScalarKind, TypeDesc, TypeRef, Value, ValueKind,
};
use rust_decimal::Decimal;

use helpers::{
    assert_matches_row, field, first_table, first_table_columns, first_table_rows, init_tracing,
    three_rows,
};

fn person() -> TypeRef {
    TypeDesc::record("Person")
        .member("Id", TypeDesc::scalar(ScalarKind::Int32))
        .member("Name", TypeDesc::text())
        .build()
}

fn people(rows: &[(i32, &str)]) -> ResultSet {
    rows.iter().fold(
        ResultSet::new()
            .column("Id", ScalarKind::Int32)
            .text_column("Name"),
        |set, (id, name)| set.row(vec![Some(Value::from(*id)), Some(Value::from(*name))]),
    )
}

// ============================================================================
// OBJECTS
// ============================================================================

#[test]
fn object_mapping_reads_first_row() {
    init_tracing();
    let rows = three_rows();
    let mut stream = MemoryRecordStream::new(vec![first_table_rows(&rows[..2])]);

    let value = MappingEngine::default()
        .map(&mut stream, &first_table(), None)
        .unwrap();

    assert_matches_row(&value, &rows[0]);
    assert_eq!(value.as_object().unwrap().type_name(), "FirstTable");
}

#[test]
fn single_row_maps_to_object() {
    let mut stream = MemoryRecordStream::new(vec![people(&[(1, "A")])]);
    let value = MappingEngine::default()
        .map(&mut stream, &person(), None)
        .unwrap();
    assert_eq!(field(&value, "Id").as_i64(), Some(1));
    assert_eq!(field(&value, "Name").as_text(), Some("A"));
}

#[test]
fn column_declared_after_rows_maps_as_null() {
    let set = ResultSet::new()
        .column("Id", ScalarKind::Int32)
        .row(vec![Some(Value::from(6))])
        .text_column("Name");
    let mut stream = MemoryRecordStream::new(vec![set]);

    let value = MappingEngine::default()
        .map(&mut stream, &person(), None)
        .unwrap();
    assert_eq!(field(&value, "Id").as_i64(), Some(6));
    assert!(field(&value, "Name").is_null());
}

#[test]
fn extra_columns_are_ignored() {
    let set = ResultSet::new()
        .column("Id", ScalarKind::Int32)
        .text_column("Name")
        .column("Audit", ScalarKind::Int64)
        .row(vec![
            Some(Value::from(4)),
            Some(Value::from("D")),
            Some(Value::from(77i64)),
        ]);
    let mut stream = MemoryRecordStream::new(vec![set]);

    let value = MappingEngine::default()
        .map(&mut stream, &person(), None)
        .unwrap();
    assert_eq!(field(&value, "Id"), &Value::Int(4));
    assert!(value.as_object().unwrap().get("Audit").is_none());
}

#[test]
fn empty_result_set_yields_default_instance() {
    let mut stream = MemoryRecordStream::new(vec![people(&[])]);
    let value = MappingEngine::default()
        .map(&mut stream, &person(), None)
        .unwrap();
    assert_eq!(field(&value, "Id"), &Value::Int(0));
    assert_eq!(field(&value, "Name"), &Value::Null);
}

#[test]
fn missing_column_keeps_existing_member_value() {
    let engine = MappingEngine::default();
    let ty = person();
    let mut existing = engine.orchestrator().construct(&ty).unwrap();
    assert!(ty.members()[1].write(&mut existing, Value::from("before")));

    let set = ResultSet::new()
        .column("Id", ScalarKind::Int32)
        .row(vec![Some(Value::from(8))]);
    let mut stream = MemoryRecordStream::new(vec![set]);
    let value = engine.map(&mut stream, &ty, Some(existing)).unwrap();

    assert_eq!(field(&value, "Id"), &Value::Int(8));
    assert_eq!(field(&value, "Name"), &Value::from("before"));
}

#[test]
fn unreadable_column_is_skipped() {
    // Id is declared as text but holds an integer, so reading it fails
    let set = ResultSet::new()
        .text_column("Id")
        .text_column("Name")
        .row(vec![Some(Value::from(12)), Some(Value::from("L"))]);
    let mut stream = MemoryRecordStream::new(vec![set]);

    let value = MappingEngine::default()
        .map(&mut stream, &person(), None)
        .unwrap();
    assert_eq!(field(&value, "Id"), &Value::Int(0));
    assert_eq!(field(&value, "Name"), &Value::from("L"));
}

#[test]
fn column_override_binds_member_to_other_column() {
    let invoice = TypeDesc::record("Invoice")
        .member("Id", TypeDesc::scalar(ScalarKind::Int32))
        .member_with_column(
            "Total",
            TypeDesc::scalar(ScalarKind::Decimal),
            "invoice_total",
        )
        .build();
    let set = ResultSet::new()
        .column("Id", ScalarKind::Int32)
        .column("Total", ScalarKind::Decimal)
        .column("invoice_total", ScalarKind::Decimal)
        .row(vec![
            Some(Value::from(1)),
            Some(Value::from(Decimal::ONE)),
            Some(Value::from(Decimal::new(1999, 2))),
        ]);
    let mut stream = MemoryRecordStream::new(vec![set]);

    let value = MappingEngine::default()
        .map(&mut stream, &invoice, None)
        .unwrap();
    let total = field(&value, "Total").as_decimal();
    assert_eq!(total, Some(Decimal::new(1999, 2)));
}

#[test]
fn column_names_are_case_sensitive() {
    let set = ResultSet::new()
        .column("id", ScalarKind::Int32)
        .text_column("NAME")
        .row(vec![Some(Value::from(1)), Some(Value::from("x"))]);
    let mut stream = MemoryRecordStream::new(vec![set]);
    let value = MappingEngine::default()
        .map(&mut stream, &person(), None)
        .unwrap();
    assert_eq!(field(&value, "Id"), &Value::Int(0));
    assert_eq!(field(&value, "Name"), &Value::Null);
}

#[test]
fn conversion_failure_aborts_the_call() {
    let set = ResultSet::new()
        .text_column("Id")
        .row(vec![Some(Value::from("7"))])
        .row(vec![Some(Value::from("seven"))]);
    let mut stream = MemoryRecordStream::new(vec![set]);

    let err = MappingEngine::default()
        .map(
            &mut stream,
            &TypeDesc::contract(Contract::List, person()),
            None,
        )
        .unwrap_err();
    match err {
        MapError::Conversion { from, .. } => assert_eq!(from, ValueKind::Text),
        other => panic!("expected a conversion error, got {other:?}"),
    }
}

// ============================================================================
// NULLS
// ============================================================================

/// Records every value handed to the orchestrator for conversion
#[derive(Default)]
struct RecordingOrchestrator {
    inner: StandardOrchestrator,
    seen: Mutex<Vec<(String, Value, ValueKind)>>,
}

impl Orchestrator for RecordingOrchestrator {
    fn construct(&self, ty: &TypeRef) -> Result<Value, MapError> {
        self.inner.construct(ty)
    }

    fn map_value(
        &self,
        source: Value,
        existing: Option<&Value>,
        source_kind: ValueKind,
        destination: &TypeRef,
    ) -> Result<Value, MapError> {
        let call = (destination.name().to_string(), source.clone(), source_kind);
        self.seen.lock().unwrap().push(call);
        self.inner
            .map_value(source, existing, source_kind, destination)
    }

    fn writable_members<'a>(&self, ty: &'a TypeRef) -> Vec<&'a MemberDesc> {
        self.inner.writable_members(ty)
    }
}

#[test]
fn database_nulls_reach_the_orchestrator_as_null() {
    let engine = MappingEngine::new(RecordingOrchestrator::default());
    let mut cells = vec![None; 7];
    cells[0] = Some(Value::from(1));
    let mut stream = MemoryRecordStream::new(vec![first_table_columns().row(cells)]);

    let value = engine.map(&mut stream, &first_table(), None).unwrap();

    let seen = engine.orchestrator().seen.lock().unwrap();
    assert_eq!(seen.len(), 7);
    for (destination, source, kind) in seen.iter().skip(1) {
        assert_eq!(source, &Value::Null, "{destination}");
        assert_eq!(*kind, ValueKind::Null, "{destination}");
    }
    assert_eq!(field(&value, "DecimalColumn"), &Value::from(Decimal::ZERO));
    assert_eq!(field(&value, "NullableDecimalColumn"), &Value::Null);
    assert_eq!(field(&value, "StringColumn"), &Value::Null);
}

// ============================================================================
// COLLECTIONS
// ============================================================================

fn collection_destinations() -> Vec<(TypeRef, Option<Container>)> {
    let mut destinations: Vec<(TypeRef, Option<Container>)> = vec![
        (
            TypeDesc::contract(Contract::Sequence, first_table()),
            Some(Container::List),
        ),
        (
            TypeDesc::contract(Contract::List, first_table()),
            Some(Container::List),
        ),
        (
            TypeDesc::contract(Contract::ReadOnlyList, first_table()),
            Some(Container::ReadOnly),
        ),
        (
            TypeDesc::contract(Contract::ReadOnlyCollection, first_table()),
            Some(Container::ReadOnly),
        ),
        (
            TypeDesc::contract(Contract::Collection, first_table()),
            Some(Container::Collection),
        ),
        (TypeDesc::array(first_table()), None),
    ];
    for container in [Container::List, Container::Collection, Container::ReadOnly] {
        let ty = TypeDesc::container(container, first_table());
        destinations.push((ty, Some(container)));
    }
    destinations
}

#[test]
fn every_collection_shape_preserves_rows_in_order() {
    init_tracing();
    let rows = three_rows();
    let engine = MappingEngine::default();

    for (destination, container) in collection_destinations() {
        let mut stream = MemoryRecordStream::new(vec![first_table_rows(&rows)]);
        let value = engine.map(&mut stream, &destination, None).unwrap();

        if let Some(container) = container {
            let actual = value.as_collection().unwrap().container();
            assert_eq!(actual, container, "{destination}");
        } else {
            assert!(matches!(value, Value::Array(_)), "{destination}");
        }
        let elements = value.elements().unwrap();
        assert_eq!(elements.len(), rows.len(), "{destination}");
        for (element, row) in elements.iter().zip(&rows) {
            assert_matches_row(element, row);
        }
    }
}

#[test]
fn list_of_three_rows() {
    let mut stream = MemoryRecordStream::new(vec![people(&[(1, "A"), (2, "B"), (3, "C")])]);
    let value = MappingEngine::default()
        .map(
            &mut stream,
            &TypeDesc::container(Container::List, person()),
            None,
        )
        .unwrap();
    let names: Vec<&Value> = value
        .elements()
        .unwrap()
        .iter()
        .map(|p| field(p, "Name"))
        .collect();
    assert_eq!(
        names,
        vec![&Value::from("A"), &Value::from("B"), &Value::from("C")]
    );
}

#[test]
fn empty_result_set_yields_empty_collection() {
    let mut stream = MemoryRecordStream::new(vec![people(&[])]);
    let value = MappingEngine::default()
        .map(
            &mut stream,
            &TypeDesc::contract(Contract::ReadOnlyList, person()),
            None,
        )
        .unwrap();
    assert!(value.as_collection().unwrap().is_empty());
}

#[test]
fn record_deriving_from_a_list_collects_rows_as_items() {
    let batch = TypeDesc::record("PersonBatch")
        .member("Label", TypeDesc::text())
        .extends(TypeDesc::container(Container::List, person()))
        .build();
    let mut stream = MemoryRecordStream::new(vec![people(&[(1, "A"), (2, "B")])]);

    let value = MappingEngine::default()
        .map(&mut stream, &batch, None)
        .unwrap();
    let object = value.as_object().unwrap();
    assert_eq!(object.type_name(), "PersonBatch");
    assert_eq!(object.items().len(), 2);
    assert_eq!(field(&object.items()[1], "Id"), &Value::Int(2));
    assert_eq!(object.get("Label"), Some(&Value::Null));
}

#[test]
fn record_without_element_type_falls_back_to_default() {
    let feed = TypeDesc::record("PersonFeed")
        .member("Cursor", TypeDesc::text())
        .implements(TypeDesc::contract(Contract::Sequence, person()))
        .build();
    let mut stream = MemoryRecordStream::new(vec![people(&[(1, "A")])]);

    let value = MappingEngine::default()
        .map(&mut stream, &feed, None)
        .unwrap();
    let object = value.as_object().unwrap();
    assert_eq!(object.type_name(), "PersonFeed");
    assert!(object.items().is_empty());
}

#[test]
fn registry_override_changes_backing_container() {
    let yaml = "registry:\n  - contract: sequence\n    container: read_only\n";
    let config = MapperConfig::from_yaml_str(yaml).unwrap();
    let engine = MappingEngine::with_config(StandardOrchestrator::new(), config);
    let mut stream = MemoryRecordStream::new(vec![people(&[(1, "A")])]);

    let value = engine
        .map(
            &mut stream,
            &TypeDesc::contract(Contract::Sequence, person()),
            None,
        )
        .unwrap();
    assert_eq!(
        value.as_collection().unwrap().container(),
        Container::ReadOnly
    );
}

#[test]
fn missing_registry_entry_is_a_configuration_error() {
    let engine = MappingEngine::with_registry(
        StandardOrchestrator::new(),
        ConcreteCollectionRegistry::empty().with_entry(Contract::List, Container::List),
    );
    let mut stream = MemoryRecordStream::new(vec![people(&[(1, "A")])]);

    let err = engine
        .map(
            &mut stream,
            &TypeDesc::contract(Contract::Collection, person()),
            None,
        )
        .unwrap_err();
    assert!(err.is_configuration(), "{err}");
}

// ============================================================================
// TUPLES
// ============================================================================

#[test]
fn tuple_of_list_and_object() {
    init_tracing();
    let rows = three_rows();
    let ty = TypeDesc::tuple(vec![
        TypeDesc::contract(Contract::List, first_table()),
        first_table(),
    ])
    .unwrap();
    let mut stream = MemoryRecordStream::new(vec![
        first_table_rows(&rows),
        first_table_rows(&rows[2..]),
    ]);

    let value = MappingEngine::default()
        .map(&mut stream, &ty, None)
        .unwrap();
    let slots = value.as_tuple().unwrap();

    assert_eq!(slots.len(), 2);
    let list = slots[0].elements().unwrap();
    assert_eq!(list.len(), 3);
    for (element, row) in list.iter().zip(&rows) {
        assert_matches_row(element, row);
    }
    assert_matches_row(&slots[1], &rows[2]);
}

#[test]
fn tuple_leaves_extra_result_sets_unread() {
    let ty = TypeDesc::tuple(vec![person()]).unwrap();
    let mut stream = MemoryRecordStream::new(vec![
        people(&[(1, "A")]),
        people(&[(2, "B")]),
        people(&[(3, "C")]),
    ]);

    let value = MappingEngine::default()
        .map(&mut stream, &ty, None)
        .unwrap();
    assert_eq!(field(&value.as_tuple().unwrap()[0], "Id"), &Value::Int(1));
    assert_eq!(stream.result_set_index(), 1);
}

#[test]
fn tuple_object_slot_reads_one_row_and_moves_on() {
    let list = TypeDesc::contract(Contract::List, person());
    let ty = TypeDesc::tuple(vec![person(), list]).unwrap();
    let mut stream = MemoryRecordStream::new(vec![
        people(&[(1, "A"), (2, "B"), (3, "C")]),
        people(&[(10, "J"), (11, "K")]),
    ]);

    let value = MappingEngine::default()
        .map(&mut stream, &ty, None)
        .unwrap();
    let slots = value.as_tuple().unwrap();
    assert_eq!(field(&slots[0], "Id").as_i64(), Some(1));

    let list = slots[1].elements().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(field(&list[0], "Id").as_i64(), Some(10));
    assert_eq!(field(&list[1], "Id").as_i64(), Some(11));
    assert_eq!(stream.result_set_index(), 2);
}

#[test]
fn tuple_object_slot_without_rows_gets_default() {
    let ty = TypeDesc::tuple(vec![person(), TypeDesc::array(person())]).unwrap();
    let mut stream = MemoryRecordStream::new(vec![people(&[]), people(&[(1, "A"), (2, "B")])]);

    let value = MappingEngine::default()
        .map(&mut stream, &ty, None)
        .unwrap();
    let slots = value.as_tuple().unwrap();
    assert_eq!(field(&slots[0], "Id"), &Value::Int(0));
    assert_eq!(slots[1].elements().unwrap().len(), 2);
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[test]
fn return_absent_policy_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mapper.yaml");
    std::fs::write(&path, "empty_result_policy: return_absent\n").unwrap();

    let config = MapperConfig::load(&path).unwrap();
    let engine = MappingEngine::with_config(StandardOrchestrator::new(), config);
    assert_eq!(
        engine.empty_result_policy(),
        EmptyResultPolicy::ReturnAbsent
    );

    let mut stream = MemoryRecordStream::new(vec![people(&[])]);
    assert_eq!(
        engine.map(&mut stream, &person(), None).unwrap(),
        Value::Null
    );

    // collections are unaffected by the policy
    let mut stream = MemoryRecordStream::new(vec![people(&[])]);
    let list = engine
        .map(
            &mut stream,
            &TypeDesc::contract(Contract::List, person()),
            None,
        )
        .unwrap();
    assert!(list.as_collection().unwrap().is_empty());
}

// ============================================================================
// STREAM FAILURES
// ============================================================================

/// Serves one row, then fails on the next advance
struct FailingStream {
    rows_served: usize,
}

impl RecordStream for FailingStream {
    fn advance_row(&mut self) -> Result<bool, StreamError> {
        if self.rows_served == 0 {
            self.rows_served += 1;
            Ok(true)
        } else {
            Err(StreamError::new("connection reset"))
        }
    }

    fn advance_result_set(&mut self) -> Result<bool, StreamError> {
        Ok(false)
    }

    fn column_count(&self) -> usize {
        1
    }

    fn column_name(&self, ordinal: usize) -> Option<&str> {
        (ordinal == 0).then_some("Id")
    }

    fn value_by_name(&self, name: &str) -> ColumnRead {
        if name == "Id" {
            ColumnRead::Value(Value::Int(1))
        } else {
            ColumnRead::Missing
        }
    }
}

#[test]
fn stream_failure_propagates() {
    let mut stream = FailingStream { rows_served: 0 };
    let err = MappingEngine::default()
        .map(
            &mut stream,
            &TypeDesc::contract(Contract::Sequence, person()),
            None,
        )
        .unwrap_err();
    assert!(matches!(err, MapError::Stream(_)));
    assert_eq!(err.to_string(), "record stream failure: connection reset");
}

// ============================================================================
// SHARED CACHES
// ============================================================================

#[test]
fn concurrent_classification_converges() {
    let engine = MappingEngine::default();
    let destination = TypeDesc::contract(Contract::ReadOnlyList, first_table());

    let shapes: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = engine.clone();
                let destination = destination.clone();
                scope.spawn(move || engine.classifier().classify(&destination))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for shape in &shapes {
        assert!(Arc::ptr_eq(shape, &shapes[0]));
    }
    let concrete = engine.classifier().concrete_type(&shapes[0]).unwrap();
    assert_eq!(concrete.name(), "ReadOnlyCollection<FirstTable>");
}

#[test]
fn concurrent_mapping_gives_identical_results() {
    let rows = three_rows();
    let engine = MappingEngine::default();
    let destination = TypeDesc::contract(Contract::Collection, first_table());

    let results: Vec<Value> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let engine = engine.clone();
                let destination = destination.clone();
                let rows = &rows;
                scope.spawn(move || {
                    let mut stream = MemoryRecordStream::new(vec![first_table_rows(rows)]);
                    engine.map(&mut stream, &destination, None).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for result in &results[1..] {
        assert_eq!(result, &results[0]);
    }
    assert_eq!(engine.binder().bound_types(), 1);
}
