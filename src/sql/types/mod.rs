use std::{cmp::Ordering, collections::BTreeMap, fmt::Display};

use serde::Serialize;

use crate::{
    error::{Error, Result},
    sql::parser::ast::Consts,
};

/// Runtime value of a table cell or computed column
///
/// Cells read from a table file are always `String`; numbers appear through
/// literal coercion and aggregate results.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    String(String),
}

impl Value {
    /// Coerces literal text: one surrounding pair of quotes is removed, then
    /// the text becomes a number if it parses fully as one, else a string.
    pub fn from_literal(text: &str) -> Self {
        let text = strip_quotes(text);
        parse_number(text).unwrap_or_else(|| Value::String(text.to_string()))
    }

    /// Value stored by INSERT: literals are kept as cell text, like file contents
    pub fn from_consts(consts: Consts) -> Self {
        match consts {
            Consts::Null => Value::Null,
            Consts::Number(n) => Value::String(n),
            Consts::String(s) => Value::String(s),
        }
    }

    /// Applies literal coercion to a value (only strings change)
    pub fn coerce(&self) -> Self {
        match self {
            Value::String(s) => Self::from_literal(s),
            v => v.clone(),
        }
    }

    /// Builds a numeric value, keeping whole numbers as integers
    pub fn from_f64(v: f64) -> Self {
        if v.is_finite() && v.fract() == 0.0 && v.abs() < 9_007_199_254_740_992.0 {
            Value::Integer(v as i64)
        } else {
            Value::Float(v)
        }
    }

    /// Returns the numeric content of an already coerced value
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Total order used by ORDER BY: NULL < numbers < strings
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        fn rank(v: &Value) -> u8 {
            match v {
                Value::Null => 0,
                Value::Integer(_) | Value::Float(_) => 1,
                Value::String(_) => 2,
            }
        }
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Integer(a), Value::Float(b)) => (*a as f64).total_cmp(b),
            (Value::Float(a), Value::Integer(b)) => a.total_cmp(&(*b as f64)),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (a, b) => rank(a).cmp(&rank(b)),
        }
    }
}

fn strip_quotes(text: &str) -> &str {
    for quote in ['\'', '"'] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return &text[1..text.len() - 1];
        }
    }
    text
}

fn parse_number(text: &str) -> Option<Value> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(i) = text.parse::<i64>() {
        return Some(Value::Integer(i));
    }
    // f64 parsing also accepts "inf" and "NaN", which are not numbers here
    text.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(Value::Float)
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
        }
    }
}

/// Partial ordering for comparison predicates; numbers and strings do not mix
impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Null, _) => Some(Ordering::Less),
            (_, Value::Null) => Some(Ordering::Greater),
            (Value::Integer(a), Value::Integer(b)) => a.partial_cmp(b),
            (Value::Integer(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::String(a), Value::String(b)) => a.partial_cmp(b),
            (_, _) => None,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

/// A row maps column names to values
pub type Row = BTreeMap<String, Value>;

/// Looks a field up by its exact key, falling back to the bare column name
/// of a qualified `table.column` reference.
pub fn lookup<'a>(row: &'a Row, field: &str) -> Option<&'a Value> {
    row.get(field).or_else(|| {
        field
            .split_once('.')
            .and_then(|(_, column)| row.get(column))
    })
}

/// Like `lookup`, but a missing field is an error
pub fn must_lookup<'a>(row: &'a Row, field: &str) -> Result<&'a Value> {
    lookup(row, field).ok_or(Error::Field(format!("column {} not found", field)))
}
