//! In-memory columnar table used across the pipeline.
//!
//! A [`Table`] is an ordered list of named, equally long [`Column`]s. Every
//! cell is optional so that nulls produced by warm-up windows or guarded
//! ratios survive a round trip through Parquet unchanged.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised when a table is assembled or accessed inconsistently.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    /// A column was requested that the table does not contain.
    #[error("missing column: {0}")]
    MissingColumn(String),

    /// A column exists but holds a different type than requested.
    #[error("column {name} has type {actual}, expected {expected}")]
    TypeMismatch {
        /// Column name.
        name: String,
        /// Requested type.
        expected: ColumnType,
        /// Stored type.
        actual: ColumnType,
    },

    /// A column's length disagrees with the table height.
    #[error("column {name} has {actual} rows, table has {expected}")]
    LengthMismatch {
        /// Column name.
        name: String,
        /// Table height.
        expected: usize,
        /// Column length.
        actual: usize,
    },

    /// The same column name was added twice.
    #[error("duplicate column: {0}")]
    DuplicateColumn(String),

    /// Tables being stacked do not share a schema.
    #[error("schema mismatch while stacking tables: {0}")]
    SchemaMismatch(String),
}

/// Logical type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Float,
    Bool,
    Text,
    Date,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Text => "text",
            Self::Date => "date",
        };
        f.write_str(name)
    }
}

/// A single nullable column.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Float(Vec<Option<f64>>),
    Bool(Vec<Option<bool>>),
    Text(Vec<Option<String>>),
    Date(Vec<Option<NaiveDate>>),
}

impl Column {
    /// Builds a float column from non-null values.
    #[must_use]
    pub fn from_f64s(values: &[f64]) -> Self {
        Self::Float(values.iter().copied().map(Some).collect())
    }

    /// Builds a text column where every row holds the same value.
    #[must_use]
    pub fn repeat_text(value: &str, len: usize) -> Self {
        Self::Text(vec![Some(value.to_string()); len])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Float(v) => v.len(),
            Self::Bool(v) => v.len(),
            Self::Text(v) => v.len(),
            Self::Date(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub const fn column_type(&self) -> ColumnType {
        match self {
            Self::Float(_) => ColumnType::Float,
            Self::Bool(_) => ColumnType::Bool,
            Self::Text(_) => ColumnType::Text,
            Self::Date(_) => ColumnType::Date,
        }
    }

    /// Number of null cells.
    #[must_use]
    pub fn null_count(&self) -> usize {
        match self {
            Self::Float(v) => v.iter().filter(|x| x.is_none()).count(),
            Self::Bool(v) => v.iter().filter(|x| x.is_none()).count(),
            Self::Text(v) => v.iter().filter(|x| x.is_none()).count(),
            Self::Date(v) => v.iter().filter(|x| x.is_none()).count(),
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<&[Option<f64>]> {
        match self {
            Self::Float(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&[Option<bool>]> {
        match self {
            Self::Bool(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&[Option<String>]> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_date(&self) -> Option<&[Option<NaiveDate>]> {
        match self {
            Self::Date(v) => Some(v),
            _ => None,
        }
    }

    /// Gathers the given row positions into a new column.
    ///
    /// # Panics
    /// Panics if an index is out of bounds.
    #[must_use]
    pub fn take(&self, indices: &[usize]) -> Self {
        match self {
            Self::Float(v) => Self::Float(indices.iter().map(|&i| v[i]).collect()),
            Self::Bool(v) => Self::Bool(indices.iter().map(|&i| v[i]).collect()),
            Self::Text(v) => Self::Text(indices.iter().map(|&i| v[i].clone()).collect()),
            Self::Date(v) => Self::Date(indices.iter().map(|&i| v[i]).collect()),
        }
    }

    fn append(&mut self, other: &Self) -> bool {
        match (self, other) {
            (Self::Float(a), Self::Float(b)) => a.extend_from_slice(b),
            (Self::Bool(a), Self::Bool(b)) => a.extend_from_slice(b),
            (Self::Text(a), Self::Text(b)) => a.extend_from_slice(b),
            (Self::Date(a), Self::Date(b)) => a.extend_from_slice(b),
            _ => return false,
        }
        true
    }

    /// Renders one cell for text output; nulls render as an empty string.
    #[must_use]
    pub fn cell_to_string(&self, row: usize) -> String {
        match self {
            Self::Float(v) => v[row].map(|x| x.to_string()).unwrap_or_default(),
            Self::Bool(v) => v[row].map(|x| x.to_string()).unwrap_or_default(),
            Self::Text(v) => v[row].clone().unwrap_or_default(),
            Self::Date(v) => v[row]
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        }
    }
}

/// Ordered collection of named columns sharing one height.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    names: Vec<String>,
    columns: Vec<Column>,
    height: usize,
}

impl Table {
    /// Creates an empty table with zero columns and zero rows.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table from `(name, column)` pairs.
    ///
    /// # Errors
    /// Returns an error on duplicate names or unequal column lengths.
    pub fn from_columns(columns: Vec<(String, Column)>) -> Result<Self, TableError> {
        let mut table = Self::new();
        for (name, column) in columns {
            table.push_column(name, column)?;
        }
        Ok(table)
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.height == 0
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.position(name).map(|i| &self.columns[i])
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.position(name).map(move |i| &mut self.columns[i])
    }

    /// Iterates over `(name, column)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.columns.iter())
    }

    /// Appends a column. The first column fixes the table height.
    ///
    /// # Errors
    /// Returns an error if the name already exists or the length differs from the height.
    pub fn push_column(&mut self, name: impl Into<String>, column: Column) -> Result<(), TableError> {
        let name = name.into();
        if self.has_column(&name) {
            return Err(TableError::DuplicateColumn(name));
        }
        if self.columns.is_empty() {
            self.height = column.len();
        } else if column.len() != self.height {
            return Err(TableError::LengthMismatch {
                name,
                expected: self.height,
                actual: column.len(),
            });
        }
        self.names.push(name);
        self.columns.push(column);
        Ok(())
    }

    /// Returns the column, or an error naming it if absent.
    ///
    /// # Errors
    /// Returns [`TableError::MissingColumn`] when the column does not exist.
    pub fn require(&self, name: &str) -> Result<&Column, TableError> {
        self.column(name)
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    /// Typed accessor for a float column.
    ///
    /// # Errors
    /// Returns an error if the column is missing or not a float column.
    pub fn floats(&self, name: &str) -> Result<&[Option<f64>], TableError> {
        let column = self.require(name)?;
        column.as_float().ok_or_else(|| mismatch(name, ColumnType::Float, column))
    }

    /// Typed accessor for a bool column.
    ///
    /// # Errors
    /// Returns an error if the column is missing or not a bool column.
    pub fn bools(&self, name: &str) -> Result<&[Option<bool>], TableError> {
        let column = self.require(name)?;
        column.as_bool().ok_or_else(|| mismatch(name, ColumnType::Bool, column))
    }

    /// Typed accessor for a text column.
    ///
    /// # Errors
    /// Returns an error if the column is missing or not a text column.
    pub fn texts(&self, name: &str) -> Result<&[Option<String>], TableError> {
        let column = self.require(name)?;
        column.as_text().ok_or_else(|| mismatch(name, ColumnType::Text, column))
    }

    /// Typed accessor for a date column.
    ///
    /// # Errors
    /// Returns an error if the column is missing or not a date column.
    pub fn dates(&self, name: &str) -> Result<&[Option<NaiveDate>], TableError> {
        let column = self.require(name)?;
        column.as_date().ok_or_else(|| mismatch(name, ColumnType::Date, column))
    }

    /// Gathers the given rows (in the given order) into a new table.
    #[must_use]
    pub fn take(&self, indices: &[usize]) -> Self {
        Self {
            names: self.names.clone(),
            columns: self.columns.iter().map(|c| c.take(indices)).collect(),
            height: indices.len(),
        }
    }

    /// Concatenates tables vertically. All tables must share names, order and types.
    ///
    /// # Errors
    /// Returns [`TableError::SchemaMismatch`] if the schemas differ.
    pub fn vstack(tables: Vec<Self>) -> Result<Self, TableError> {
        let mut iter = tables.into_iter();
        let Some(mut out) = iter.next() else {
            return Ok(Self::new());
        };
        for table in iter {
            if table.names != out.names {
                return Err(TableError::SchemaMismatch(
                    "column names or order differ".to_string(),
                ));
            }
            for ((name, dst), src) in out.names.iter().zip(out.columns.iter_mut()).zip(&table.columns) {
                if !dst.append(src) {
                    return Err(TableError::SchemaMismatch(format!(
                        "column {name} is {} in one table and {} in another",
                        dst.column_type(),
                        src.column_type()
                    )));
                }
            }
            out.height += table.height;
        }
        Ok(out)
    }
}

fn mismatch(name: &str, expected: ColumnType, column: &Column) -> TableError {
    TableError::TypeMismatch {
        name: name.to_string(),
        expected,
        actual: column.column_type(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_columns(vec![
            (
                "market_key".to_string(),
                Column::Text(vec![Some("GOLD".into()), Some("WTI".into())]),
            ),
            ("nc_long".to_string(), Column::Float(vec![Some(1.0), None])),
        ])
        .unwrap()
    }

    #[test]
    fn push_column_rejects_wrong_length() {
        let mut table = sample();
        let err = table
            .push_column("bad", Column::Float(vec![Some(1.0)]))
            .unwrap_err();
        assert_eq!(
            err,
            TableError::LengthMismatch {
                name: "bad".to_string(),
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn push_column_rejects_duplicates() {
        let mut table = sample();
        let err = table
            .push_column("nc_long", Column::Float(vec![None, None]))
            .unwrap_err();
        assert_eq!(err, TableError::DuplicateColumn("nc_long".to_string()));
    }

    #[test]
    fn typed_accessors_check_type() {
        let table = sample();
        assert_eq!(table.floats("nc_long").unwrap(), &[Some(1.0), None]);
        assert!(matches!(
            table.floats("market_key"),
            Err(TableError::TypeMismatch { .. })
        ));
        assert_eq!(
            table.floats("missing"),
            Err(TableError::MissingColumn("missing".to_string()))
        );
    }

    #[test]
    fn take_reorders_rows() {
        let table = sample().take(&[1, 0]);
        assert_eq!(table.height(), 2);
        assert_eq!(table.floats("nc_long").unwrap(), &[None, Some(1.0)]);
    }

    #[test]
    fn vstack_appends_rows() {
        let stacked = Table::vstack(vec![sample(), sample()]).unwrap();
        assert_eq!(stacked.height(), 4);
        assert_eq!(stacked.width(), 2);
        assert_eq!(stacked.column("nc_long").unwrap().null_count(), 2);
    }

    #[test]
    fn vstack_rejects_different_schema() {
        let other = Table::from_columns(vec![(
            "market_key".to_string(),
            Column::Text(vec![Some("GOLD".into())]),
        )])
        .unwrap();
        assert!(matches!(
            Table::vstack(vec![sample(), other]),
            Err(TableError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn cell_to_string_renders_nulls_empty() {
        let column = Column::Float(vec![Some(1.5), None]);
        assert_eq!(column.cell_to_string(0), "1.5");
        assert_eq!(column.cell_to_string(1), "");
    }
}
