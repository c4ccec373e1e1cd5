use crate::{
    error::Result,
    sql::{
        executor::{Executor, ResultSet},
        parser::ast::{self, Condition, Expression, JoinSpec, OrderDirection},
        plan::planner::Planner,
        types::Value,
    },
    storage::TableStore,
};

mod planner;

/// Execution plan node
#[derive(Debug, PartialEq)]
pub enum Node {
    /// Reads a whole table
    Scan { table_name: String },
    /// Joins the base table (left) with the JOIN table (right)
    Join {
        left: Box<Node>,
        right: Box<Node>,
        table_name: String,
        join: JoinSpec,
        /// Every field the rest of the query reads from a joined row
        fields: Vec<String>,
        /// `SELECT *`: every column of both tables
        all: bool,
    },
    Filter {
        source: Box<Node>,
        conditions: Vec<Condition>,
    },
    /// Aggregates without GROUP BY, a single output row
    Aggregate {
        source: Box<Node>,
        exprs: Vec<Expression>,
    },
    GroupBy {
        source: Box<Node>,
        group_by: Vec<String>,
        exprs: Vec<Expression>,
    },
    Order {
        source: Box<Node>,
        order_by: Vec<(String, OrderDirection)>,
    },
    Limit { source: Box<Node>, limit: usize },
    Distinct {
        source: Box<Node>,
        exprs: Vec<Expression>,
    },
    Projection {
        source: Box<Node>,
        exprs: Vec<Expression>,
    },
    Insert {
        table_name: String,
        columns: Vec<String>,
        values: Vec<Value>,
    },
    Delete {
        table_name: String,
        conditions: Vec<Condition>,
    },
}

/// Execution plan
#[derive(Debug, PartialEq)]
pub struct Plan(pub Node);

impl Plan {
    pub fn build(stmt: ast::Statement) -> Result<Self> {
        Planner::new().build(stmt)
    }

    pub fn execute<S: TableStore + 'static>(self, store: &mut S) -> Result<ResultSet> {
        <dyn Executor<S>>::build(self.0).execute(store)
    }
}
