//! Delimited-text table store: one `<table>.csv` file per table, header line
//! first, whole-file rewrite on every write.

use std::path::{Path, PathBuf};

use ::csv::{ReaderBuilder, WriterBuilder};
use tracing::{debug, info};

use crate::{
    error::{Error, Result},
    sql::{schema::Table, types::Value},
    storage::TableStore,
};

/// CSV store configuration
#[derive(Debug, Clone)]
pub struct CsvConfig {
    /// Directory holding the table files
    pub dir: PathBuf,
    /// Field delimiter
    pub delimiter: u8,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            delimiter: b',',
        }
    }
}

impl CsvConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Default::default()
        }
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
}

/// Table store backed by delimited text files
#[derive(Debug, Clone, Default)]
pub struct CsvStore {
    config: CsvConfig,
}

impl CsvStore {
    pub fn new(config: CsvConfig) -> Self {
        Self { config }
    }

    /// Path of the file backing a table
    pub fn path(&self, table_name: &str) -> PathBuf {
        self.config.dir.join(format!("{}.csv", table_name))
    }
}

fn io_error(path: &Path, err: ::csv::Error) -> Error {
    Error::Io(format!("{}: {}", path.display(), err))
}

impl TableStore for CsvStore {
    fn read(&self, table_name: &str) -> Result<Table> {
        let path = self.path(table_name);
        let mut reader = ReaderBuilder::new()
            .delimiter(self.config.delimiter)
            .from_path(&path)
            .map_err(|e| io_error(&path, e))?;

        let columns = reader
            .headers()
            .map_err(|e| io_error(&path, e))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let mut table = Table::new(table_name, columns);

        for record in reader.records() {
            let record = record.map_err(|e| io_error(&path, e))?;
            let row = table
                .columns
                .iter()
                .zip(record.iter())
                .map(|(c, v)| (c.clone(), Value::String(v.to_string())))
                .collect();
            table.rows.push(row);
        }

        debug!(table = table_name, rows = table.rows.len(), "read table");
        Ok(table)
    }

    fn write(&mut self, table: &Table) -> Result<()> {
        let path = self.path(&table.name);
        // Headers are written by hand, rows go through serde
        let mut writer = WriterBuilder::new()
            .delimiter(self.config.delimiter)
            .has_headers(false)
            .from_path(&path)
            .map_err(|e| io_error(&path, e))?;

        if !table.columns.is_empty() {
            writer
                .write_record(&table.columns)
                .map_err(|e| io_error(&path, e))?;
            for row in &table.rows {
                writer
                    .serialize(table.record(row))
                    .map_err(|e| io_error(&path, e))?;
            }
        }
        writer.flush()?;

        info!(table = %table.name, rows = table.rows.len(), "table written");
        Ok(())
    }
}
