//! In-memory record stream.
//!
//! [`MemoryRecordStream`] serves result sets assembled with [`ResultSet`].
//! It behaves like a database reader: positioned on the first result set,
//! before its first row, and strictly forward-only.

use record_types::{ScalarKind, Value};

use crate::error::StreamError;
use crate::stream::{ColumnRead, RecordStream};

/// Declared storage type of an in-memory column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Scalar(ScalarKind),
    Text,
}

impl ColumnType {
    fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (ColumnType::Text, Value::Text(_)) => true,
            (ColumnType::Scalar(ScalarKind::Bool), Value::Bool(_)) => true,
            (ColumnType::Scalar(ScalarKind::Int32 | ScalarKind::Int64), Value::Int(_)) => true,
            (ColumnType::Scalar(ScalarKind::Float64), Value::Float(_)) => true,
            (ColumnType::Scalar(ScalarKind::Decimal), Value::Decimal(_)) => true,
            (ColumnType::Scalar(ScalarKind::DateTime), Value::DateTime(_)) => true,
            (ColumnType::Scalar(ScalarKind::Uuid), Value::Uuid(_)) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
struct MemoryColumn {
    name: String,
    ty: ColumnType,
}

/// One result set: a column schema and its rows
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    columns: Vec<MemoryColumn>,
    rows: Vec<Vec<Option<Value>>>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column(self, name: impl Into<String>, kind: ScalarKind) -> Self {
        self.push_column(name.into(), ColumnType::Scalar(kind))
    }

    pub fn text_column(self, name: impl Into<String>) -> Self {
        self.push_column(name.into(), ColumnType::Text)
    }

    /// Rows added before the column hold a null in it
    fn push_column(mut self, name: String, ty: ColumnType) -> Self {
        self.columns.push(MemoryColumn { name, ty });
        for row in &mut self.rows {
            row.push(None);
        }
        self
    }

    /// Append a row. `None` cells hold the database null; missing trailing
    /// cells are null as well.
    pub fn row(mut self, cells: Vec<Option<Value>>) -> Self {
        let mut cells = cells;
        cells.resize(self.columns.len(), None);
        self.rows.push(cells);
        self
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.columns.iter().find(|c| c.name == name).map(|c| c.ty)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Forward-only reader over a list of [`ResultSet`]s
#[derive(Debug, Clone)]
pub struct MemoryRecordStream {
    sets: Vec<ResultSet>,
    set_index: usize,
    /// `None` before the first row of the current set
    row_index: Option<usize>,
}

impl MemoryRecordStream {
    pub fn new(sets: Vec<ResultSet>) -> Self {
        Self {
            sets,
            set_index: 0,
            row_index: None,
        }
    }

    /// Index of the current result set; equals the set count once exhausted
    pub fn result_set_index(&self) -> usize {
        self.set_index
    }

    fn current_set(&self) -> Option<&ResultSet> {
        self.sets.get(self.set_index)
    }

    fn current_row(&self) -> Option<&[Option<Value>]> {
        let set = self.current_set()?;
        set.rows.get(self.row_index?).map(Vec::as_slice)
    }
}

impl RecordStream for MemoryRecordStream {
    fn advance_row(&mut self) -> Result<bool, StreamError> {
        let Some(set) = self.sets.get(self.set_index) else {
            return Ok(false);
        };
        let next = self.row_index.map_or(0, |i| i + 1);
        if next < set.rows.len() {
            self.row_index = Some(next);
            Ok(true)
        } else {
            self.row_index = Some(set.rows.len());
            Ok(false)
        }
    }

    fn advance_result_set(&mut self) -> Result<bool, StreamError> {
        if self.set_index < self.sets.len() {
            self.set_index += 1;
        }
        self.row_index = None;
        Ok(self.set_index < self.sets.len())
    }

    fn column_count(&self) -> usize {
        self.current_set().map_or(0, |s| s.columns.len())
    }

    fn column_name(&self, ordinal: usize) -> Option<&str> {
        self.current_set()?
            .columns
            .get(ordinal)
            .map(|c| c.name.as_str())
    }

    fn value_by_name(&self, name: &str) -> ColumnRead {
        let Some(set) = self.current_set() else {
            return ColumnRead::Missing;
        };
        let Some(ordinal) = set.columns.iter().position(|c| c.name == name) else {
            return ColumnRead::Missing;
        };
        let Some(row) = self.current_row() else {
            return ColumnRead::Unreadable("no current row".to_string());
        };
        match row.get(ordinal) {
            None | Some(None) => ColumnRead::DbNull,
            Some(Some(value)) if set.columns[ordinal].ty.accepts(value) => {
                ColumnRead::Value(value.clone())
            }
            Some(Some(value)) => ColumnRead::Unreadable(format!(
                "stored {} does not match the type of column {}",
                value.kind(),
                name
            )),
        }
    }
}
