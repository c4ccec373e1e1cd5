use std::fmt::Display;

use crate::error::{Error, Result};

/// Abstract Syntax Tree (AST) node definitions for SQL statements
#[derive(Debug, PartialEq)]
pub enum Statement {
    Select(SelectStatement),
    Insert(InsertStatement),
    Delete(DeleteStatement),
}

/// SELECT statement
#[derive(Debug, PartialEq, Default)]
pub struct SelectStatement {
    /// Projection expressions in select-list order
    pub fields: Vec<Expression>,
    pub table: String,
    pub join: Option<JoinSpec>,
    /// Conditions joined by AND (OR is read as AND as well)
    pub where_clause: Vec<Condition>,
    pub group_by: Option<Vec<String>>,
    /// An aggregate appears in the select list and there is no GROUP BY
    pub has_ungrouped_aggregate: bool,
    pub order_by: Option<Vec<(String, OrderDirection)>>,
    pub limit: Option<usize>,
    pub distinct: bool,
}

/// INSERT statement
#[derive(Debug, PartialEq)]
pub struct InsertStatement {
    pub table: String,
    pub columns: Vec<String>,
    pub values: Vec<Consts>,
}

/// DELETE statement
#[derive(Debug, PartialEq)]
pub struct DeleteStatement {
    pub table: String,
    pub where_clause: Vec<Condition>,
}

/// JOIN clause: `<kind> JOIN <table> ON <left> = <right>`
#[derive(Debug, Clone, PartialEq)]
pub struct JoinSpec {
    pub join_type: JoinType,
    pub table: String,
    /// Qualified `table.column` on the left of `=`
    pub left: String,
    /// Qualified `table.column` on the right of `=`
    pub right: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
}

/// Sort direction (ascending or descending)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

/// Select-list expressions
#[derive(Debug, PartialEq, Clone)]
pub enum Expression {
    /// `*`
    All,
    /// Column reference, bare or `table.column`
    Field(String),
    /// Aggregate function: Function(name as written, argument), argument may be `*`
    Function(String, String),
}

impl Expression {
    /// Output column label; aggregates are labeled by their expression text
    pub fn label(&self) -> String {
        match self {
            Expression::All => "*".to_string(),
            Expression::Field(name) => name.clone(),
            Expression::Function(name, arg) => format!("{}({})", name, arg),
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, Expression::Function(..))
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

/// Literal values in INSERT statements, kept as written minus quoting
#[derive(Debug, PartialEq, Clone)]
pub enum Consts {
    Null,
    Number(String),
    String(String),
}

/// Comparison operators of WHERE conditions
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operator {
    Equal,
    NotEqual,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    Like,
}

impl Operator {
    /// Parses an operator from its textual form
    pub fn from_str(op: &str) -> Result<Self> {
        Ok(match op.to_uppercase().as_ref() {
            "=" => Operator::Equal,
            "!=" | "<>" => Operator::NotEqual,
            ">" => Operator::GreaterThan,
            "<" => Operator::LessThan,
            ">=" => Operator::GreaterThanOrEqual,
            "<=" => Operator::LessThanOrEqual,
            "LIKE" => Operator::Like,
            _ => return Err(Error::Operator(op.to_string())),
        })
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Operator::Equal => "=",
            Operator::NotEqual => "!=",
            Operator::GreaterThan => ">",
            Operator::LessThan => "<",
            Operator::GreaterThanOrEqual => ">=",
            Operator::LessThanOrEqual => "<=",
            Operator::Like => "LIKE",
        })
    }
}

/// One comparison test against one field
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    /// Literal text with one layer of quoting removed
    pub value: String,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }
}
