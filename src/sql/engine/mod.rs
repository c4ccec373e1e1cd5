use tracing::debug;

use crate::{
    error::{Error, Result},
    sql::{
        executor::ResultSet,
        parser::{
            Parser,
            ast::{DeleteStatement, InsertStatement, SelectStatement, Statement},
        },
        plan::Plan,
    },
    storage::TableStore,
};

/// SQL session executing statements against one table store
///
/// Failures come back as `Error::Execution` wrapping their cause.
pub struct Session<S: TableStore> {
    store: S,
}

impl<S: TableStore + 'static> Session<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Executes a SQL statement
    pub fn execute(&mut self, sql: &str) -> Result<ResultSet> {
        debug!(sql, "execute");
        self.run(|| Parser::new(sql).parse())
    }

    pub fn execute_select(&mut self, select: SelectStatement) -> Result<ResultSet> {
        self.run(|| Ok(Statement::Select(select)))
    }

    pub fn execute_insert(&mut self, insert: InsertStatement) -> Result<ResultSet> {
        self.run(|| Ok(Statement::Insert(insert)))
    }

    pub fn execute_delete(&mut self, delete: DeleteStatement) -> Result<ResultSet> {
        self.run(|| Ok(Statement::Delete(delete)))
    }

    fn run<F: FnOnce() -> Result<Statement>>(&mut self, stmt: F) -> Result<ResultSet> {
        let result = stmt()
            .and_then(Plan::build)
            .and_then(|plan| plan.execute(&mut self.store));
        match result {
            Ok(result) => {
                if let Some(message) = result.message() {
                    debug!(message, "statement done");
                }
                Ok(result)
            }
            Err(err) => Err(Error::into_execution(err)),
        }
    }
}
