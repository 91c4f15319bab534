use anyhow::{Context, Result};
use csv::Writer;
use std::fs::File;
use std::path::Path;

use crate::table::Table;

pub struct CsvStorage;

impl CsvStorage {
    /// Writes a table to a CSV file with a header row.
    ///
    /// Nulls are written as empty fields and dates as `YYYY-MM-DD`, which is
    /// what spreadsheet users of the metrics export expect.
    ///
    /// # Errors
    /// Returns error if file cannot be created or writing fails
    pub fn write_table(path: impl AsRef<Path>, table: &Table) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
        let mut writer = Writer::from_writer(file);

        writer.write_record(table.column_names())?;

        let columns: Vec<_> = table.iter().map(|(_, column)| column).collect();
        for row in 0..table.height() {
            writer.write_record(columns.iter().map(|c| c.cell_to_string(row)))?;
        }

        writer.flush()?;
        Ok(())
    }
}
