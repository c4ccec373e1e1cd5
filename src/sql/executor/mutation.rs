use tracing::debug;

use crate::{
    error::{Error, Result},
    sql::{
        executor::{
            Executor, ResultSet,
            filter::{Predicate, matches_all},
        },
        parser::ast::Condition,
        schema::Table,
        types::{Row, Value},
    },
    storage::TableStore,
};

/// INSERT executor
pub struct Insert {
    table_name: String,
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Insert {
    pub fn new(table_name: String, columns: Vec<String>, values: Vec<Value>) -> Box<Self> {
        Box::new(Self {
            table_name,
            columns,
            values,
        })
    }
}

// tbl:      a      b      c
// insert into tbl (c, a) values (1, 2);
// row:      2    NULL     1
fn make_row(table: &Table, columns: &[String], values: &[Value]) -> Result<Row> {
    if columns.len() != values.len() {
        return Err(Error::Internal("columns and values num mismatch".into()));
    }
    let mut row = table.null_row();
    for (column, value) in columns.iter().zip(values) {
        if !table.has_column(column) {
            return Err(Error::Field(format!(
                "column {} not found in table {}",
                column, table.name
            )));
        }
        row.insert(column.clone(), value.clone());
    }
    Ok(row)
}

impl<S: TableStore> Executor<S> for Insert {
    fn execute(self: Box<Self>, store: &mut S) -> Result<ResultSet> {
        let mut table = store.read(&self.table_name)?;
        // a table file without a header takes the insert's columns
        if table.columns.is_empty() {
            table.columns = self.columns.clone();
        }
        let row = make_row(&table, &self.columns, &self.values)?;
        debug!(table = %table.name, ?row, "insert row");
        table.rows.push(row);
        store.write(&table)?;
        Ok(ResultSet::Insert { count: 1 })
    }
}

/// DELETE executor - rewrites the table without the matching rows
pub struct Delete {
    table_name: String,
    conditions: Vec<Condition>,
}

impl Delete {
    pub fn new(table_name: String, conditions: Vec<Condition>) -> Box<Self> {
        Box::new(Self {
            table_name,
            conditions,
        })
    }
}

impl<S: TableStore> Executor<S> for Delete {
    fn execute(self: Box<Self>, store: &mut S) -> Result<ResultSet> {
        let mut table = store.read(&self.table_name)?;
        let total = table.rows.len();

        if self.conditions.is_empty() {
            table.rows.clear();
        } else {
            let predicates = self
                .conditions
                .iter()
                .map(Predicate::new)
                .collect::<Result<Vec<_>>>()?;
            let mut kept = Vec::with_capacity(total);
            for row in table.rows {
                if !matches_all(&predicates, &row)? {
                    kept.push(row);
                }
            }
            table.rows = kept;
        }

        let count = total - table.rows.len();
        debug!(table = %table.name, count, "delete rows");
        store.write(&table)?;
        Ok(ResultSet::Delete { count })
    }
}
