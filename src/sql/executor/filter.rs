use std::cmp::Ordering;

use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::{
    error::{Error, Result},
    sql::{
        executor::{Executor, ResultSet},
        parser::ast::{Condition, Operator},
        types::{Row, Value, must_lookup},
    },
    storage::TableStore,
};

/// A condition prepared for repeated evaluation: the literal is coerced and
/// LIKE patterns are compiled once.
pub struct Predicate {
    field: String,
    operator: Operator,
    literal: Value,
    pattern: Option<Regex>,
}

impl Predicate {
    pub fn new(condition: &Condition) -> Result<Self> {
        let pattern = match condition.operator {
            Operator::Like => Some(like_regex(&condition.value)?),
            _ => None,
        };
        Ok(Self {
            field: condition.field.clone(),
            operator: condition.operator,
            literal: Value::from_literal(&condition.value),
            pattern,
        })
    }

    /// Tests one row; a field missing from the row is an error
    pub fn evaluate(&self, row: &Row) -> Result<bool> {
        let value = must_lookup(row, &self.field)?;
        if let Some(pattern) = &self.pattern {
            return Ok(!value.is_null() && pattern.is_match(&value.to_string()));
        }
        Ok(compare(&value.coerce(), self.operator, &self.literal))
    }
}

/// Tests one row against one condition
pub fn evaluate(row: &Row, condition: &Condition) -> Result<bool> {
    Predicate::new(condition)?.evaluate(row)
}

/// True when every predicate holds
pub fn matches_all(predicates: &[Predicate], row: &Row) -> Result<bool> {
    for predicate in predicates {
        if !predicate.evaluate(row)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Anchored, case-insensitive regex for a LIKE pattern: `%` is any sequence,
/// `_` any single character, everything else literal.
fn like_regex(pattern: &str) -> Result<Regex> {
    let mut expr = String::from("^");
    for c in pattern.chars() {
        match c {
            '%' => expr.push_str(".*"),
            '_' => expr.push('.'),
            c => expr.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    expr.push('$');
    Ok(RegexBuilder::new(&expr)
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()?)
}

/// Compares coerced values. NULL equals only NULL and has no order; a
/// number and a string are never equal and never ordered.
fn compare(left: &Value, operator: Operator, right: &Value) -> bool {
    if left.is_null() || right.is_null() {
        let both = left.is_null() && right.is_null();
        return match operator {
            Operator::Equal => both,
            Operator::NotEqual => !both,
            _ => false,
        };
    }
    let ordering = left.partial_cmp(right);
    match operator {
        Operator::Equal => ordering == Some(Ordering::Equal),
        Operator::NotEqual => ordering != Some(Ordering::Equal),
        Operator::GreaterThan => ordering == Some(Ordering::Greater),
        Operator::LessThan => ordering == Some(Ordering::Less),
        Operator::GreaterThanOrEqual => {
            matches!(ordering, Some(Ordering::Greater | Ordering::Equal))
        }
        Operator::LessThanOrEqual => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        Operator::Like => false,
    }
}

/// WHERE executor - keeps rows where every condition holds
pub struct Filter<S: TableStore> {
    source: Box<dyn Executor<S>>,
    conditions: Vec<Condition>,
}

impl<S: TableStore> Filter<S> {
    pub fn new(source: Box<dyn Executor<S>>, conditions: Vec<Condition>) -> Box<Self> {
        Box::new(Self { source, conditions })
    }
}

impl<S: TableStore> Executor<S> for Filter<S> {
    fn execute(self: Box<Self>, store: &mut S) -> Result<ResultSet> {
        match self.source.execute(store)? {
            ResultSet::Scan { columns, rows } => {
                let predicates = self
                    .conditions
                    .iter()
                    .map(Predicate::new)
                    .collect::<Result<Vec<_>>>()?;

                let total = rows.len();
                let mut kept = Vec::new();
                for row in rows {
                    if matches_all(&predicates, &row)? {
                        kept.push(row);
                    }
                }
                debug!(rows_in = total, rows_out = kept.len(), "filter");
                Ok(ResultSet::Scan { columns, rows: kept })
            }
            _ => Err(Error::Internal("Unexpected result set".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::evaluate;
    use crate::{
        error::{Error, Result},
        sql::{
            parser::ast::{Condition, Operator},
            types::{Row, Value},
        },
    };

    fn student() -> Row {
        let mut row = Row::new();
        row.insert("id".into(), Value::from("2"));
        row.insert("name".into(), Value::from("Bob"));
        row.insert("age".into(), Value::from("22"));
        row.insert("grade".into(), Value::Null);
        row
    }

    #[test]
    fn test_numeric_comparisons() -> Result<()> {
        let row = student();
        assert!(evaluate(&row, &Condition::new("age", Operator::GreaterThan, "20"))?);
        // 22 > 3 numerically, although "22" < "3" as text
        assert!(evaluate(&row, &Condition::new("age", Operator::GreaterThan, "3"))?);
        assert!(evaluate(&row, &Condition::new("age", Operator::Equal, "'22'"))?);
        assert!(evaluate(&row, &Condition::new("age", Operator::Equal, "22.0"))?);
        assert!(evaluate(&row, &Condition::new("age", Operator::LessThanOrEqual, "22"))?);
        assert!(!evaluate(&row, &Condition::new("age", Operator::LessThan, "22"))?);
        assert!(evaluate(&row, &Condition::new("id", Operator::NotEqual, "1"))?);
        Ok(())
    }

    #[test]
    fn test_string_and_mixed_comparisons() -> Result<()> {
        let row = student();
        assert!(evaluate(&row, &Condition::new("name", Operator::Equal, "Bob"))?);
        assert!(!evaluate(&row, &Condition::new("name", Operator::Equal, "bob"))?);
        assert!(evaluate(&row, &Condition::new("name", Operator::GreaterThan, "Alice"))?);
        assert!(!evaluate(&row, &Condition::new("name", Operator::GreaterThan, "5"))?);
        assert!(evaluate(&row, &Condition::new("name", Operator::NotEqual, "5"))?);
        assert!(!evaluate(&row, &Condition::new("grade", Operator::Equal, "A"))?);
        assert!(evaluate(&row, &Condition::new("grade", Operator::NotEqual, "A"))?);
        Ok(())
    }

    #[test]
    fn test_like() -> Result<()> {
        let row = student();
        assert!(evaluate(&row, &Condition::new("name", Operator::Like, "b%"))?);
        assert!(evaluate(&row, &Condition::new("name", Operator::Like, "_O_"))?);
        assert!(!evaluate(&row, &Condition::new("name", Operator::Like, "B_"))?);
        assert!(!evaluate(&row, &Condition::new("name", Operator::Like, "B.b"))?);
        assert!(!evaluate(&row, &Condition::new("grade", Operator::Like, "%"))?);
        Ok(())
    }

    #[test]
    fn test_missing_field() {
        let row = student();
        assert!(matches!(
            evaluate(&row, &Condition::new("score", Operator::Equal, "1")),
            Err(Error::Field(_))
        ));
    }
}
