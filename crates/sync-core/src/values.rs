//! Raw row values as returned by a source query.
//!
//! A [`RawRow`] is an opaque column-name to value mapping. It is never
//! persisted; the transformer reads the columns named by a table config and
//! ignores the rest.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// A single column value from a source row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowValue {
    /// SQL NULL
    Null,

    /// Boolean value
    Bool(bool),

    /// Any integer column (int2/int4/int8)
    Int(i64),

    /// Any floating point or NUMERIC column
    Float(f64),

    /// Text value
    Text(String),

    /// Timestamp, normalized to UTC
    Timestamp(DateTime<Utc>),

    /// A column type the poller does not interpret
    Unsupported(String),
}

impl RowValue {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Numeric view of the value. Only integer and float values are numeric;
    /// text that happens to look like a number is not.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) if f.is_finite() => Some(*f),
            _ => None,
        }
    }

    /// Try to get this value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get this value as a timestamp.
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Short type name used in validation messages.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Timestamp(_) => "timestamp",
            Self::Unsupported(name) => name,
        }
    }
}

impl From<i64> for RowValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for RowValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for RowValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for RowValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<DateTime<Utc>> for RowValue {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Timestamp(v)
    }
}

/// One row from a source table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    columns: HashMap<String, RowValue>,
}

impl RawRow {
    pub fn new(columns: HashMap<String, RowValue>) -> Self {
        Self { columns }
    }

    /// Start building a row column by column.
    pub fn builder() -> RawRowBuilder {
        RawRowBuilder {
            columns: HashMap::new(),
        }
    }

    /// Get a column value by name. Missing columns and NULL are distinct.
    pub fn get(&self, column: &str) -> Option<&RowValue> {
        self.columns.get(column)
    }

    pub fn insert(&mut self, column: impl Into<String>, value: RowValue) {
        self.columns.insert(column.into(), value);
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Builder for [`RawRow`].
pub struct RawRowBuilder {
    columns: HashMap<String, RowValue>,
}

impl RawRowBuilder {
    /// Add a column to the row.
    pub fn column(mut self, name: impl Into<String>, value: impl Into<RowValue>) -> Self {
        self.columns.insert(name.into(), value.into());
        self
    }

    /// Add a NULL column to the row.
    pub fn null(mut self, name: impl Into<String>) -> Self {
        self.columns.insert(name.into(), RowValue::Null);
        self
    }

    pub fn build(self) -> RawRow {
        RawRow {
            columns: self.columns,
        }
    }
}
