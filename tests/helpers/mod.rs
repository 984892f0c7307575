//! Shared fixtures for the mapping integration tests
//!
//! `first_table()` describes the destination record and `first_table_rows()`
//! builds a result set in the same column layout.

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use record_mapper::ResultSet;
use record_types::{ScalarKind, TypeDesc, TypeRef, Value};
use rust_decimal::Decimal;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

pub fn first_table() -> TypeRef {
    TypeDesc::record("FirstTable")
        .member("Id", TypeDesc::scalar(ScalarKind::Int32))
        .member("StringColumn", TypeDesc::text())
        .member("DecimalColumn", TypeDesc::scalar(ScalarKind::Decimal))
        .member("DateTimeColumn", TypeDesc::scalar(ScalarKind::DateTime))
        .member("NullableIntColumn", TypeDesc::nullable(ScalarKind::Int32))
        .member(
            "NullableDecimalColumn",
            TypeDesc::nullable(ScalarKind::Decimal),
        )
        .member(
            "NullableDateTimeColumn",
            TypeDesc::nullable(ScalarKind::DateTime),
        )
        .build()
}

pub fn first_table_columns() -> ResultSet {
    ResultSet::new()
        .column("Id", ScalarKind::Int32)
        .text_column("StringColumn")
        .column("DecimalColumn", ScalarKind::Decimal)
        .column("DateTimeColumn", ScalarKind::DateTime)
        .column("NullableIntColumn", ScalarKind::Int32)
        .column("NullableDecimalColumn", ScalarKind::Decimal)
        .column("NullableDateTimeColumn", ScalarKind::DateTime)
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("valid fixture date")
}

/// One fixture row: id, text, decimal, date, then the nullable columns
pub struct Row {
    pub id: i32,
    pub text: &'static str,
    pub decimal: Decimal,
    pub date: NaiveDateTime,
    pub nullable_int: Option<i32>,
    pub nullable_decimal: Option<Decimal>,
    pub nullable_date: Option<NaiveDateTime>,
}

impl Row {
    pub fn cells(&self) -> Vec<Option<Value>> {
        vec![
            Some(Value::from(self.id)),
            Some(Value::from(self.text)),
            Some(Value::from(self.decimal)),
            Some(Value::from(self.date)),
            self.nullable_int.map(Value::from),
            self.nullable_decimal.map(Value::from),
            self.nullable_date.map(Value::from),
        ]
    }
}

pub fn three_rows() -> Vec<Row> {
    vec![
        Row {
            id: 1,
            text: "First Line",
            decimal: Decimal::new(66645, 2),
            date: date(2017, 1, 1),
            nullable_int: Some(999),
            nullable_decimal: None,
            nullable_date: None,
        },
        Row {
            id: 2,
            text: "Second Line",
            decimal: Decimal::MAX,
            date: date(9999, 12, 31),
            nullable_int: Some(i32::MAX),
            nullable_decimal: None,
            nullable_date: None,
        },
        Row {
            id: 3,
            text: "Third Line",
            decimal: Decimal::new(5, 2),
            date: date(1, 1, 1),
            nullable_int: None,
            nullable_decimal: Some(Decimal::new(-45050, 2)),
            nullable_date: Some(date(2017, 1, 1)),
        },
    ]
}

pub fn first_table_rows(rows: &[Row]) -> ResultSet {
    rows.iter()
        .fold(first_table_columns(), |set, row| set.row(row.cells()))
}

/// Field `name` of an object value
pub fn field<'a>(value: &'a Value, name: &str) -> &'a Value {
    value
        .as_object()
        .unwrap_or_else(|| panic!("expected an object, got {value:?}"))
        .get(name)
        .unwrap_or_else(|| panic!("object has no field {name}"))
}

/// Assert that `value` holds exactly the columns of `row`
pub fn assert_matches_row(value: &Value, row: &Row) {
    let expect = |v: Option<Value>| v.unwrap_or(Value::Null);
    pretty_assertions::assert_eq!(field(value, "Id"), &Value::from(row.id));
    pretty_assertions::assert_eq!(field(value, "StringColumn"), &Value::from(row.text));
    pretty_assertions::assert_eq!(field(value, "DecimalColumn"), &Value::from(row.decimal));
    pretty_assertions::assert_eq!(field(value, "DateTimeColumn"), &Value::from(row.date));
    pretty_assertions::assert_eq!(
        field(value, "NullableIntColumn"),
        &expect(row.nullable_int.map(Value::from))
    );
    pretty_assertions::assert_eq!(
        field(value, "NullableDecimalColumn"),
        &expect(row.nullable_decimal.map(Value::from))
    );
    pretty_assertions::assert_eq!(
        field(value, "NullableDateTimeColumn"),
        &expect(row.nullable_date.map(Value::from))
    );
}
