//! Record stream abstraction.
//!
//! A record stream is a forward-only cursor over one or more result sets.
//! It never rewinds; the mapping engine only ever moves it forward.

use std::collections::HashSet;

use record_types::Value;

use crate::error::StreamError;

/// Outcome of reading one column of the current row
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnRead {
    /// The column holds a value
    Value(Value),
    /// The column holds the database null sentinel
    DbNull,
    /// The current result set has no column with that name
    Missing,
    /// The column exists but its value could not be retrieved
    Unreadable(String),
}

/// Forward-only cursor over ordered result sets
pub trait RecordStream {
    /// Move to the next row of the current result set
    fn advance_row(&mut self) -> Result<bool, StreamError>;

    /// Move to the next result set, positioned before its first row
    fn advance_result_set(&mut self) -> Result<bool, StreamError>;

    /// Column count of the current result set
    fn column_count(&self) -> usize;

    fn column_name(&self, ordinal: usize) -> Option<&str>;

    /// Read a column of the current row by exact, case-sensitive name
    fn value_by_name(&self, name: &str) -> ColumnRead;
}

impl<S: RecordStream + ?Sized> RecordStream for &mut S {
    fn advance_row(&mut self) -> Result<bool, StreamError> {
        (**self).advance_row()
    }

    fn advance_result_set(&mut self) -> Result<bool, StreamError> {
        (**self).advance_result_set()
    }

    fn column_count(&self) -> usize {
        (**self).column_count()
    }

    fn column_name(&self, ordinal: usize) -> Option<&str> {
        (**self).column_name(ordinal)
    }

    fn value_by_name(&self, name: &str) -> ColumnRead {
        (**self).value_by_name(name)
    }
}

/// Column names of the current result set, captured once per result set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldNameSet {
    names: HashSet<String>,
}

impl FieldNameSet {
    pub fn capture<S: RecordStream + ?Sized>(stream: &S) -> Self {
        let names = (0..stream.column_count())
            .filter_map(|ordinal| stream.column_name(ordinal))
            .map(str::to_string)
            .collect();
        Self { names }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
