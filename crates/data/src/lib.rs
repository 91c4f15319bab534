//! Data storage and table primitives for the positioning pipeline.
//!
//! This crate provides:
//! - A nullable columnar [`Table`] shared by every stage
//! - The canonical weekly record model
//! - Parquet and CSV storage utilities

pub mod csv_storage;
pub mod models;
pub mod parquet_storage;
pub mod table;

// Re-export commonly used types
pub use csv_storage::CsvStorage;
pub use models::{columns, CanonicalRecord};
pub use parquet_storage::ParquetStorage;
pub use table::{Column, ColumnType, Table, TableError};
