use std::collections::BTreeMap;

use crate::{error::{Error, Result}, sql::schema::Table, storage::TableStore};

/// In-memory table store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: BTreeMap<String, Table>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self { tables: BTreeMap::new() }
    }

    /// Creates a store preloaded with the given tables
    pub fn with_tables(tables: impl IntoIterator<Item = Table>) -> Self {
        Self {
            tables: tables.into_iter().map(|t| (t.name.clone(), t)).collect(),
        }
    }
}

impl TableStore for MemoryStore {
    fn read(&self, table_name: &str) -> Result<Table> {
        self.tables
            .get(table_name)
            .cloned()
            .ok_or(Error::Internal(format!("table {} does not exist", table_name)))
    }

    fn write(&mut self, table: &Table) -> Result<()> {
        self.tables.insert(table.name.clone(), table.clone());
        Ok(())
    }
}
