//! Record Mapper - record streams into typed object graphs
//!
//! Maps a forward-only, multi-result-set record stream onto destination
//! types described with `record_types`: single objects, collections of any
//! supported contract or container, arrays, and tuples of those.
//!
//! ## Components
//!
//! - [`shape`] - classifies destination types once and caches the answer
//! - [`binder`] - resolves the column each member reads from
//! - [`materialize`] - builds containers from the rows of a result set
//! - [`engine`] - selects a strategy per destination and drives the stream
//!
//! Value construction and conversion are delegated to an [`Orchestrator`];
//! [`StandardOrchestrator`] covers the `record_types` value model.
//!
//! ## Example
//!
//! ```
//! use record_mapper::{MappingEngine, MemoryRecordStream, ResultSet};
//! use record_types::{ScalarKind, TypeDesc, Value};
//!
//! let order = TypeDesc::record("Order")
//!     .member("Id", TypeDesc::scalar(ScalarKind::Int32))
//!     .member("Name", TypeDesc::text())
//!     .build();
//!
//! let mut stream = MemoryRecordStream::new(vec![ResultSet::new()
//!     .column("Id", ScalarKind::Int32)
//!     .text_column("Name")
//!     .row(vec![Some(Value::from(1)), Some(Value::from("A"))])]);
//!
//! let engine = MappingEngine::default();
//! let value = engine.map(&mut stream, &order, None).unwrap();
//! assert_eq!(value.as_object().unwrap().get("Name"), Some(&Value::from("A")));
//! ```

pub mod binder;
pub mod config;
pub mod engine;
pub mod error;
pub mod materialize;
pub mod memory;
pub mod orchestrator;
pub mod registry;
pub mod shape;
pub mod stream;

pub use binder::MemberBinder;
pub use config::{EmptyResultPolicy, MapperConfig};
pub use engine::MappingEngine;
pub use error::{MapError, StreamError};
pub use materialize::CollectionMaterializer;
pub use memory::{ColumnType, MemoryRecordStream, ResultSet};
pub use orchestrator::{Orchestrator, StandardOrchestrator};
pub use registry::{ConcreteCollectionRegistry, RegistryEntry};
pub use shape::{ShapeClassifier, ShapeKind, TypeShape};
pub use stream::{ColumnRead, FieldNameSet, RecordStream};
