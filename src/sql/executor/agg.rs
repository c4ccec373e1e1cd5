use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::{
    error::{Error, Result},
    sql::{
        executor::{Executor, ResultSet},
        parser::ast::Expression,
        types::{Row, Value, must_lookup},
    },
    storage::TableStore,
};

/// Running state of one group, keyed by operand field
#[derive(Debug, Default, Clone)]
pub struct GroupAccumulator {
    pub count: i64,
    pub sums: HashMap<String, f64>,
    /// Numeric contributions per field, the AVG divisor
    pub counts: HashMap<String, i64>,
    pub mins: HashMap<String, f64>,
    pub maxes: HashMap<String, f64>,
}

impl GroupAccumulator {
    /// Folds one row in. Each operand field is read once per row even when
    /// several aggregates share it; NULL and empty cells are skipped.
    pub fn update(&mut self, row: &Row, aggs: &[AggregateExpr]) -> Result<()> {
        self.count += 1;
        let mut seen = HashSet::new();
        for agg in aggs {
            if agg.arg == "*" {
                if agg.calculator.numeric() {
                    return Err(Error::Internal(format!("can not calc column {}", agg.arg)));
                }
                continue;
            }
            let value = must_lookup(row, &agg.arg)?;
            if !agg.calculator.numeric() || !seen.insert(agg.arg.as_str()) {
                continue;
            }
            if value.is_null() || matches!(value, Value::String(s) if s.trim().is_empty()) {
                continue;
            }
            let Some(n) = value.coerce().as_f64() else {
                return Err(Error::Internal(format!("can not calc column {}", agg.arg)));
            };

            *self.sums.entry(agg.arg.clone()).or_insert(0.0) += n;
            *self.counts.entry(agg.arg.clone()).or_insert(0) += 1;
            let min = self.mins.entry(agg.arg.clone()).or_insert(n);
            *min = min.min(n);
            let max = self.maxes.entry(agg.arg.clone()).or_insert(n);
            *max = max.max(n);
        }
        Ok(())
    }
}

/// Trait for aggregate function calculations
pub trait Calculator {
    fn calc(&self, field: &str, acc: &GroupAccumulator) -> Value;

    /// Whether the operand must be numeric
    fn numeric(&self) -> bool {
        true
    }
}

impl dyn Calculator {
    /// Runtime dispatch to appropriate calculator based on function name
    pub fn build(func_name: &str) -> Result<Box<dyn Calculator>> {
        Ok(match func_name.to_uppercase().as_ref() {
            "COUNT" => Count::new(),
            "SUM" => Sum::new(),
            "AVG" => Avg::new(),
            "MIN" => Min::new(),
            "MAX" => Max::new(),
            _ => {
                return Err(Error::Internal(format!(
                    "unknown aggregate function {}",
                    func_name
                )));
            }
        })
    }
}

/// COUNT - rows in the group
pub struct Count;

impl Count {
    fn new() -> Box<Self> {
        Box::new(Self {})
    }
}

impl Calculator for Count {
    fn calc(&self, _field: &str, acc: &GroupAccumulator) -> Value {
        Value::Integer(acc.count)
    }

    fn numeric(&self) -> bool {
        false
    }
}

/// SUM - 0 when nothing numeric was seen
pub struct Sum;

impl Sum {
    fn new() -> Box<Self> {
        Box::new(Self {})
    }
}

impl Calculator for Sum {
    fn calc(&self, field: &str, acc: &GroupAccumulator) -> Value {
        acc.sums
            .get(field)
            .map_or(Value::Integer(0), |s| Value::from_f64(*s))
    }
}

/// AVG - divides the sum by the count of numeric cells, not the row count
pub struct Avg;

impl Avg {
    fn new() -> Box<Self> {
        Box::new(Self {})
    }
}

impl Calculator for Avg {
    fn calc(&self, field: &str, acc: &GroupAccumulator) -> Value {
        match (acc.sums.get(field), acc.counts.get(field)) {
            (Some(sum), Some(&count)) if count > 0 => Value::from_f64(sum / count as f64),
            _ => Value::Null,
        }
    }
}

/// MIN
pub struct Min;

impl Min {
    fn new() -> Box<Self> {
        Box::new(Self {})
    }
}

impl Calculator for Min {
    fn calc(&self, field: &str, acc: &GroupAccumulator) -> Value {
        acc.mins.get(field).map_or(Value::Null, |v| Value::from_f64(*v))
    }
}

/// MAX
pub struct Max;

impl Max {
    fn new() -> Box<Self> {
        Box::new(Self {})
    }
}

impl Calculator for Max {
    fn calc(&self, field: &str, acc: &GroupAccumulator) -> Value {
        acc.maxes.get(field).map_or(Value::Null, |v| Value::from_f64(*v))
    }
}

/// An aggregate of the select list, labeled by its expression text
pub struct AggregateExpr {
    pub label: String,
    pub arg: String,
    pub calculator: Box<dyn Calculator>,
}

impl AggregateExpr {
    /// Collects the aggregates of a select list, plain fields are skipped
    pub fn from_exprs(exprs: &[Expression]) -> Result<Vec<Self>> {
        let mut aggs = Vec::new();
        for expr in exprs {
            if let Expression::Function(name, arg) = expr {
                aggs.push(Self {
                    label: expr.label(),
                    arg: arg.clone(),
                    calculator: <dyn Calculator>::build(name)?,
                });
            }
        }
        Ok(aggs)
    }

    fn calc(&self, acc: &GroupAccumulator) -> Value {
        self.calculator.calc(&self.arg, acc)
    }
}

fn bare(field: &str) -> &str {
    field.rsplit('.').next().unwrap_or(field)
}

/// Groups rows by the ordered values of `group_fields` and computes the
/// aggregates per group. Groups come out in first-seen order, each row
/// holding the group field values and one column per aggregate.
pub fn group_by(rows: Vec<Row>, group_fields: &[String], exprs: &[Expression]) -> Result<Vec<Row>> {
    let aggs = AggregateExpr::from_exprs(exprs)?;
    let mut index: HashMap<Vec<String>, usize> = HashMap::new();
    let mut groups: Vec<(Vec<Value>, GroupAccumulator)> = Vec::new();

    for row in &rows {
        let values = group_fields
            .iter()
            .map(|f| must_lookup(row, f).cloned())
            .collect::<Result<Vec<_>>>()?;
        let key = values.iter().map(|v| format!("{:?}", v)).collect();
        let pos = *index.entry(key).or_insert_with(|| {
            groups.push((values, GroupAccumulator::default()));
            groups.len() - 1
        });
        groups[pos].1.update(row, &aggs)?;
    }

    let mut output = Vec::with_capacity(groups.len());
    for (values, acc) in groups {
        let mut row: Row = group_fields.iter().cloned().zip(values.iter().cloned()).collect();
        // selected columns may name a group field with or without its qualifier
        for expr in exprs {
            if let Expression::Field(name) = expr {
                if let Some(i) = group_fields
                    .iter()
                    .position(|g| g == name || bare(g) == bare(name))
                {
                    row.insert(name.clone(), values[i].clone());
                }
            }
        }
        for agg in &aggs {
            row.insert(agg.label.clone(), agg.calc(&acc));
        }
        output.push(row);
    }
    Ok(output)
}

/// Computes the aggregates over the whole row set as a single group
pub fn ungrouped_aggregate(rows: &[Row], exprs: &[Expression]) -> Result<Row> {
    let aggs = AggregateExpr::from_exprs(exprs)?;
    let mut acc = GroupAccumulator::default();
    for row in rows {
        acc.update(row, &aggs)?;
    }
    Ok(aggs
        .iter()
        .map(|agg| (agg.label.clone(), agg.calc(&acc)))
        .collect())
}

/// Aggregate executor - one output row of aggregate columns
pub struct Aggregate<S: TableStore> {
    source: Box<dyn Executor<S>>,
    exprs: Vec<Expression>,
}

impl<S: TableStore> Aggregate<S> {
    pub fn new(source: Box<dyn Executor<S>>, exprs: Vec<Expression>) -> Box<Self> {
        Box::new(Self { source, exprs })
    }
}

impl<S: TableStore> Executor<S> for Aggregate<S> {
    fn execute(self: Box<Self>, store: &mut S) -> Result<ResultSet> {
        if let ResultSet::Scan { rows, .. } = self.source.execute(store)? {
            let row = ungrouped_aggregate(&rows, &self.exprs)?;
            debug!(rows_in = rows.len(), "aggregate");
            return Ok(ResultSet::Scan {
                columns: self
                    .exprs
                    .iter()
                    .filter(|e| e.is_aggregate())
                    .map(|e| e.label())
                    .collect(),
                rows: vec![row],
            });
        }
        Err(Error::Internal("Unexpected result set".into()))
    }
}

/// GROUP BY executor
pub struct GroupBy<S: TableStore> {
    source: Box<dyn Executor<S>>,
    group_by: Vec<String>,
    exprs: Vec<Expression>,
}

impl<S: TableStore> GroupBy<S> {
    pub fn new(
        source: Box<dyn Executor<S>>,
        group_by: Vec<String>,
        exprs: Vec<Expression>,
    ) -> Box<Self> {
        Box::new(Self {
            source,
            group_by,
            exprs,
        })
    }
}

impl<S: TableStore> Executor<S> for GroupBy<S> {
    fn execute(self: Box<Self>, store: &mut S) -> Result<ResultSet> {
        if let ResultSet::Scan { rows, .. } = self.source.execute(store)? {
            let total = rows.len();
            let rows = group_by(rows, &self.group_by, &self.exprs)?;
            debug!(rows_in = total, groups = rows.len(), "group by");

            let mut columns = self.group_by.clone();
            for expr in &self.exprs {
                let label = expr.label();
                if !columns.contains(&label) {
                    columns.push(label);
                }
            }
            return Ok(ResultSet::Scan { columns, rows });
        }
        Err(Error::Internal("Unexpected result set".into()))
    }
}
