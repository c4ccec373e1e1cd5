use std::{cmp::Ordering, collections::HashSet};

use tracing::debug;

use crate::{
    error::{Error, Result},
    sql::{
        executor::{Executor, ResultSet},
        parser::ast::{Expression, OrderDirection},
        types::{Row, Value, lookup, must_lookup},
    },
    storage::TableStore,
};

/// Table scan executor - reads a whole table from the store
pub struct Scan {
    table_name: String,
}

impl Scan {
    pub fn new(table_name: String) -> Box<Self> {
        Box::new(Self { table_name })
    }
}

impl<S: TableStore> Executor<S> for Scan {
    fn execute(self: Box<Self>, store: &mut S) -> Result<ResultSet> {
        let table = store.read(&self.table_name)?;
        debug!(table = %table.name, rows = table.rows.len(), "scan");
        Ok(ResultSet::Scan {
            columns: table.columns,
            rows: table.rows,
        })
    }
}

/// Sorts rows by several keys. The sort is stable, values are coerced and
/// compared with a total order, and DESC reverses only its own key.
pub fn order_rows(rows: Vec<Row>, order_by: &[(String, OrderDirection)]) -> Result<Vec<Row>> {
    // Keys are resolved up front so a missing field fails before sorting
    let mut keyed = rows
        .into_iter()
        .map(|row| {
            let keys = order_by
                .iter()
                .map(|(field, _)| must_lookup(&row, field).map(Value::coerce))
                .collect::<Result<Vec<_>>>()?;
            Ok((keys, row))
        })
        .collect::<Result<Vec<_>>>()?;

    keyed.sort_by(|(a, _), (b, _)| {
        for (i, (_, direction)) in order_by.iter().enumerate() {
            match a[i].sort_cmp(&b[i]) {
                Ordering::Equal => {}
                o if *direction == OrderDirection::Asc => return o,
                o => return o.reverse(),
            }
        }
        Ordering::Equal
    });
    Ok(keyed.into_iter().map(|(_, row)| row).collect())
}

/// Maps an ORDER BY aggregate onto the select-list label it names; the
/// function name matches case-insensitively, the argument exactly.
fn resolve_order_field(columns: &[String], field: String) -> String {
    if columns.contains(&field) {
        return field;
    }
    let label = match field.split_once('(') {
        Some((name, arg)) => columns
            .iter()
            .find(|c| {
                c.split_once('(')
                    .is_some_and(|(n, a)| n.eq_ignore_ascii_case(name) && a == arg)
            })
            .cloned(),
        None => None,
    };
    label.unwrap_or(field)
}

/// ORDER BY executor - sorts rows by specified columns
pub struct Order<S: TableStore> {
    source: Box<dyn Executor<S>>,
    order_by: Vec<(String, OrderDirection)>,
}

impl<S: TableStore> Order<S> {
    pub fn new(
        source: Box<dyn Executor<S>>,
        order_by: Vec<(String, OrderDirection)>,
    ) -> Box<Self> {
        Box::new(Self { source, order_by })
    }
}

impl<S: TableStore> Executor<S> for Order<S> {
    fn execute(self: Box<Self>, store: &mut S) -> Result<ResultSet> {
        match self.source.execute(store)? {
            ResultSet::Scan { columns, rows } => {
                let order_by: Vec<_> = self
                    .order_by
                    .into_iter()
                    .map(|(field, dir)| (resolve_order_field(&columns, field), dir))
                    .collect();
                let rows = order_rows(rows, &order_by)?;
                debug!(keys = order_by.len(), rows = rows.len(), "order");
                Ok(ResultSet::Scan { columns, rows })
            }
            _ => Err(Error::Internal("Unexpected result set".into())),
        }
    }
}

/// LIMIT executor - restricts the number of rows returned
pub struct Limit<S: TableStore> {
    source: Box<dyn Executor<S>>,
    limit: usize,
}

impl<S: TableStore> Limit<S> {
    pub fn new(source: Box<dyn Executor<S>>, limit: usize) -> Box<Self> {
        Box::new(Self { source, limit })
    }
}

impl<S: TableStore> Executor<S> for Limit<S> {
    fn execute(self: Box<Self>, store: &mut S) -> Result<ResultSet> {
        match self.source.execute(store)? {
            ResultSet::Scan { columns, mut rows } => {
                rows.truncate(self.limit);
                Ok(ResultSet::Scan { columns, rows })
            }
            _ => Err(Error::Internal("Unexpected result set".into())),
        }
    }
}

/// Values a row shows for the given select list, `*` meaning every value
fn projected_values(row: &Row, exprs: &[Expression]) -> Vec<Value> {
    let mut values = Vec::new();
    for expr in exprs {
        match expr {
            Expression::All => values.extend(row.values().cloned()),
            expr => values.push(lookup(row, &expr.label()).cloned().unwrap_or(Value::Null)),
        }
    }
    values
}

/// Drops rows whose projected values repeat an earlier row, keeping first occurrences
pub fn distinct_rows(rows: Vec<Row>, exprs: &[Expression]) -> Vec<Row> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|row| {
            // Debug text keeps Integer(1) and String("1") apart
            let key: Vec<String> = projected_values(row, exprs)
                .iter()
                .map(|v| format!("{:?}", v))
                .collect();
            seen.insert(key)
        })
        .collect()
}

/// DISTINCT executor
pub struct Distinct<S: TableStore> {
    source: Box<dyn Executor<S>>,
    exprs: Vec<Expression>,
}

impl<S: TableStore> Distinct<S> {
    pub fn new(source: Box<dyn Executor<S>>, exprs: Vec<Expression>) -> Box<Self> {
        Box::new(Self { source, exprs })
    }
}

impl<S: TableStore> Executor<S> for Distinct<S> {
    fn execute(self: Box<Self>, store: &mut S) -> Result<ResultSet> {
        match self.source.execute(store)? {
            ResultSet::Scan { columns, rows } => {
                let total = rows.len();
                let rows = distinct_rows(rows, &self.exprs);
                debug!(rows_in = total, rows_out = rows.len(), "distinct");
                Ok(ResultSet::Scan { columns, rows })
            }
            _ => Err(Error::Internal("Unexpected result set".into())),
        }
    }
}

/// Output labels of a select list, `*` expanded to the columns in scope
pub fn output_columns(columns: &[String], exprs: &[Expression]) -> Vec<String> {
    let mut labels = Vec::new();
    for expr in exprs {
        match expr {
            Expression::All => labels.extend(columns.iter().cloned()),
            expr => labels.push(expr.label()),
        }
    }
    labels
}

/// Keeps exactly the selected fields of a row, keyed as written
pub fn project_row(row: &Row, labels: &[String]) -> Result<Row> {
    labels
        .iter()
        .map(|label| Ok((label.clone(), must_lookup(row, label)?.clone())))
        .collect()
}

/// Projection executor
pub struct Projection<S: TableStore> {
    source: Box<dyn Executor<S>>,
    exprs: Vec<Expression>,
}

impl<S: TableStore> Projection<S> {
    pub fn new(source: Box<dyn Executor<S>>, exprs: Vec<Expression>) -> Box<Self> {
        Box::new(Self { source, exprs })
    }
}

impl<S: TableStore> Executor<S> for Projection<S> {
    fn execute(self: Box<Self>, store: &mut S) -> Result<ResultSet> {
        match self.source.execute(store)? {
            ResultSet::Scan { columns, rows } => {
                let labels = output_columns(&columns, &self.exprs);
                let rows = rows
                    .iter()
                    .map(|row| project_row(row, &labels))
                    .collect::<Result<Vec<_>>>()?;
                Ok(ResultSet::Scan {
                    columns: labels,
                    rows,
                })
            }
            _ => Err(Error::Internal("Unexpected result set".into())),
        }
    }
}
