use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, ArrayRef, BooleanArray, Date32Array, Float64Array, StringArray,
};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, NaiveDate};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::table::{Column, Table};

/// Days between 0001-01-01 (CE day 1) and the Unix epoch, as used by Arrow `Date32`.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

pub struct ParquetStorage;

impl ParquetStorage {
    /// Writes a table to a Parquet file.
    ///
    /// Float columns are stored as `Float64`, bools as `Boolean`, text as
    /// `Utf8` and dates as `Date32`. Every field is nullable.
    ///
    /// # Errors
    /// Returns an error if the table has no columns, the file cannot be created,
    /// or writing to the Parquet file fails.
    pub fn write_table(path: impl AsRef<Path>, table: &Table) -> Result<()> {
        let path = path.as_ref();
        if table.width() == 0 {
            bail!("refusing to write a table without columns to {}", path.display());
        }

        let mut fields = Vec::with_capacity(table.width());
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(table.width());
        for (name, column) in table.iter() {
            let (data_type, array) = to_arrow(column);
            fields.push(Field::new(name, data_type, true));
            arrays.push(array);
        }

        let schema = Arc::new(Schema::new(fields));
        let batch = RecordBatch::try_new(schema.clone(), arrays)?;

        let file = File::create(path)
            .with_context(|| format!("Failed to create Parquet file: {}", path.display()))?;
        let props = WriterProperties::builder()
            .set_compression(parquet::basic::Compression::SNAPPY)
            .build();
        let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;

        writer.write(&batch)?;
        writer.close()?;

        debug!(
            path = %path.display(),
            rows = table.height(),
            columns = table.width(),
            "wrote parquet table"
        );
        Ok(())
    }

    /// Reads a Parquet file into a table.
    ///
    /// Any numeric Arrow type (integers, floats, decimals) is widened to a
    /// float column; dictionary and large strings become text; timestamps and
    /// `Date64` are truncated to calendar dates.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or decoded, or if a
    /// column has a type with no table counterpart.
    pub fn read_table(path: impl AsRef<Path>) -> Result<Table> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open Parquet file: {}", path.display()))?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .with_context(|| format!("Failed to read Parquet metadata: {}", path.display()))?
            .build()?;

        let mut parts = Vec::new();
        for batch in reader {
            let batch = batch?;
            let schema = batch.schema();
            let mut columns = Vec::with_capacity(batch.num_columns());
            for (field, array) in schema.fields().iter().zip(batch.columns()) {
                let column = from_arrow(field.name(), array)?;
                columns.push((field.name().clone(), column));
            }
            parts.push(Table::from_columns(columns)?);
        }

        let table = Table::vstack(parts)?;
        debug!(
            path = %path.display(),
            rows = table.height(),
            columns = table.width(),
            "read parquet table"
        );
        Ok(table)
    }
}

fn to_arrow(column: &Column) -> (DataType, ArrayRef) {
    match column {
        Column::Float(values) => (
            DataType::Float64,
            Arc::new(Float64Array::from(values.clone())) as ArrayRef,
        ),
        Column::Bool(values) => (
            DataType::Boolean,
            Arc::new(BooleanArray::from(values.clone())) as ArrayRef,
        ),
        Column::Text(values) => (
            DataType::Utf8,
            Arc::new(StringArray::from(values.clone())) as ArrayRef,
        ),
        Column::Date(values) => {
            let days: Vec<Option<i32>> = values
                .iter()
                .map(|d| d.map(|d| d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE))
                .collect();
            (DataType::Date32, Arc::new(Date32Array::from(days)) as ArrayRef)
        }
    }
}

fn from_arrow(name: &str, array: &ArrayRef) -> Result<Column> {
    let data_type = array.data_type();

    if data_type.is_numeric() {
        let floats = cast(array, &DataType::Float64)?;
        let floats = downcast::<Float64Array>(name, &floats)?;
        // Writers such as pandas encode missing floats as NaN.
        return Ok(Column::Float(
            floats.iter().map(|v| v.filter(|x| !x.is_nan())).collect(),
        ));
    }

    match data_type {
        DataType::Boolean => {
            let bools = downcast::<BooleanArray>(name, array)?;
            Ok(Column::Bool(bools.iter().collect()))
        }
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View | DataType::Dictionary(_, _) => {
            let strings = cast(array, &DataType::Utf8)?;
            let strings = downcast::<StringArray>(name, &strings)?;
            Ok(Column::Text(
                strings.iter().map(|s| s.map(str::to_string)).collect(),
            ))
        }
        DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _) => {
            let days = cast(array, &DataType::Date32)?;
            let days = downcast::<Date32Array>(name, &days)?;
            Ok(Column::Date(
                days.iter()
                    .map(|d| d.and_then(|d| NaiveDate::from_num_days_from_ce_opt(d + UNIX_EPOCH_DAYS_FROM_CE)))
                    .collect(),
            ))
        }
        other => bail!("column {name} has unsupported Parquet type {other}"),
    }
}

fn downcast<'a, T: 'static>(name: &str, array: &'a ArrayRef) -> Result<&'a T> {
    array
        .as_any()
        .downcast_ref::<T>()
        .with_context(|| format!("column {name} could not be decoded"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Table {
        Table::from_columns(vec![
            (
                "market_key".to_string(),
                Column::Text(vec![Some("GOLD".into()), Some("GOLD".into()), None]),
            ),
            (
                "report_date".to_string(),
                Column::Date(vec![
                    NaiveDate::from_ymd_opt(1986, 1, 15),
                    NaiveDate::from_ymd_opt(2024, 12, 31),
                    None,
                ]),
            ),
            (
                "nc_long".to_string(),
                Column::Float(vec![Some(1.5), None, Some(-3.0)]),
            ),
            (
                "nc_net_flip_1w".to_string(),
                Column::Bool(vec![Some(false), Some(true), None]),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn write_then_read_preserves_types_and_nulls() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metrics.parquet");
        let table = sample();

        ParquetStorage::write_table(&path, &table).unwrap();
        let loaded = ParquetStorage::read_table(&path).unwrap();

        assert_eq!(loaded, table);
    }

    #[test]
    fn integer_columns_are_widened_to_float() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ints.parquet");

        let schema = Arc::new(Schema::new(vec![Field::new(
            "open_interest_all",
            DataType::Int64,
            true,
        )]));
        let array: ArrayRef = Arc::new(arrow::array::Int64Array::from(vec![Some(10), None]));
        let batch = RecordBatch::try_new(schema.clone(), vec![array]).unwrap();
        let mut writer = ArrowWriter::try_new(File::create(&path).unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let loaded = ParquetStorage::read_table(&path).unwrap();
        assert_eq!(
            loaded.floats("open_interest_all").unwrap(),
            &[Some(10.0), None]
        );
    }

    #[test]
    fn write_rejects_empty_schema() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.parquet");
        assert!(ParquetStorage::write_table(&path, &Table::new()).is_err());
    }

    #[test]
    fn read_missing_file_fails_with_path() {
        let err = ParquetStorage::read_table("/nonexistent/metrics.parquet").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/metrics.parquet"));
    }
}
