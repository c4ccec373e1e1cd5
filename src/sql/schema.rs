use crate::sql::types::{Row, Value};

/// A named table: header columns plus fully materialized rows
///
/// The header is the table's schema and stays meaningful when there are no rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Builds a table from a header and rows given as cell text, in header order
    pub fn from_records(name: impl Into<String>, columns: &[&str], records: &[&[&str]]) -> Self {
        let mut table = Self::new(name, columns.iter().map(|c| c.to_string()).collect());
        for record in records {
            table.rows.push(
                columns
                    .iter()
                    .zip(record.iter())
                    .map(|(c, v)| (c.to_string(), Value::from(*v)))
                    .collect(),
            );
        }
        table
    }

    pub fn has_column(&self, col_name: &str) -> bool {
        self.columns.iter().any(|c| c == col_name)
    }

    /// Returns a row's values in header order, NULL for absent columns
    pub fn record<'a>(&self, row: &'a Row) -> Vec<&'a Value> {
        const NULL: &Value = &Value::Null;
        self.columns
            .iter()
            .map(|c| row.get(c).unwrap_or(NULL))
            .collect()
    }

    /// A row with every header column set to NULL
    pub fn null_row(&self) -> Row {
        self.columns
            .iter()
            .map(|c| (c.clone(), Value::Null))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::Table;
    use crate::{error::Result, sql::types::Value};

    #[test]
    fn test_table_columns() -> Result<()> {
        let table = Table::from_records(
            "student",
            &["id", "name"],
            &[&["1", "Alice"], &["2", "Bob"]],
        );
        assert_eq!(table.rows.len(), 2);
        assert!(table.has_column("name"));
        assert!(!table.has_column("age"));

        let mut row = table.rows[0].clone();
        row.remove("name");
        assert_eq!(table.record(&row), vec![&Value::from("1"), &Value::Null]);
        assert!(table.null_row().values().all(|v| v.is_null()));
        Ok(())
    }
}
