use crate::{
    error::Result,
    sql::{
        executor::{
            agg::{Aggregate, GroupBy},
            filter::Filter,
            join::NestedLoopJoin,
            mutation::{Delete, Insert},
            query::{Distinct, Limit, Order, Projection, Scan},
        },
        plan::Node,
        types::Row,
    },
    storage::TableStore,
};

pub mod agg;
pub mod filter;
pub mod join;
mod mutation;
pub mod query;

/// SQL executor trait
pub trait Executor<S: TableStore> {
    fn execute(self: Box<Self>, store: &mut S) -> Result<ResultSet>;
}

/// Builds an executor from a plan node
///
/// The `'static` bound is required for trait object usage in recursive executor building.
impl<S: TableStore + 'static> dyn Executor<S> {
    pub fn build(node: Node) -> Box<dyn Executor<S>> {
        match node {
            Node::Scan { table_name } => Scan::new(table_name),
            Node::Join {
                left,
                right,
                table_name,
                join,
                fields,
                all,
            } => NestedLoopJoin::new(
                Self::build(*left),
                Self::build(*right),
                table_name,
                join,
                fields,
                all,
            ),
            Node::Filter { source, conditions } => Filter::new(Self::build(*source), conditions),
            Node::Aggregate { source, exprs } => Aggregate::new(Self::build(*source), exprs),
            Node::GroupBy {
                source,
                group_by,
                exprs,
            } => GroupBy::new(Self::build(*source), group_by, exprs),
            Node::Order { source, order_by } => Order::new(Self::build(*source), order_by),
            Node::Limit { source, limit } => Limit::new(Self::build(*source), limit),
            Node::Distinct { source, exprs } => Distinct::new(Self::build(*source), exprs),
            Node::Projection { source, exprs } => Projection::new(Self::build(*source), exprs),
            Node::Insert {
                table_name,
                columns,
                values,
            } => Insert::new(table_name, columns, values),
            Node::Delete {
                table_name,
                conditions,
            } => Delete::new(table_name, conditions),
        }
    }
}

/// Execution result set
#[derive(Debug, PartialEq)]
pub enum ResultSet {
    Scan { columns: Vec<String>, rows: Vec<Row> },
    Insert { count: usize },
    Delete { count: usize },
}

impl ResultSet {
    /// Status line for mutations, None for queries
    pub fn message(&self) -> Option<&'static str> {
        match self {
            ResultSet::Scan { .. } => None,
            ResultSet::Insert { .. } => Some("Row inserted successfully."),
            ResultSet::Delete { .. } => Some("Rows deleted successfully."),
        }
    }
}
