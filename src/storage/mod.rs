use crate::{error::Result, sql::schema::Table};

pub mod csv;
pub mod memory;

/// Table store interface (whole-table operations)
///
/// Every query reads a full snapshot of a table and mutations replace the
/// whole table; there is no partial or append write.
pub trait TableStore {
    /// Reads the header and every row of a table
    fn read(&self, table_name: &str) -> Result<Table>;
    /// Replaces the stored table with the given one
    fn write(&mut self, table: &Table) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::{TableStore, csv::{CsvConfig, CsvStore}, memory::MemoryStore};
    use crate::{error::Result, sql::{schema::Table, types::Value}};

    fn test_overwrite(mut store: impl TableStore) -> Result<()> {
        let mut table = Table::from_records("t", &["a", "b"], &[&["1", "x"], &["2", "y"]]);
        store.write(&table)?;
        assert_eq!(store.read("t")?.rows.len(), 2);

        table.rows.remove(0);
        store.write(&table)?;
        let read = store.read("t")?;
        assert_eq!(read.columns, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(read.rows.len(), 1);
        assert_eq!(read.rows[0].get("b"), Some(&Value::from("y")));

        assert!(store.read("missing").is_err());
        Ok(())
    }

    #[test]
    fn test_memory() -> Result<()> {
        test_overwrite(MemoryStore::new())
    }

    #[test]
    fn test_csv() -> Result<()> {
        let dir = tempfile::tempdir()?;
        test_overwrite(CsvStore::new(CsvConfig::new(dir.path())))
    }
}
