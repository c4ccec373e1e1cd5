use crate::{
    error::{Error, Result},
    sql::{
        parser::ast::{self, Expression, SelectStatement},
        plan::{Node, Plan},
        types::Value,
    },
};

/// Query planner - converts AST into execution plan nodes
pub struct Planner;

impl Planner {
    pub fn new() -> Self {
        Self {}
    }

    /// Builds an execution plan from an AST statement
    pub fn build(&mut self, stmt: ast::Statement) -> Result<Plan> {
        Ok(Plan(self.build_statement(stmt)?))
    }

    pub fn build_statement(&self, stmt: ast::Statement) -> Result<Node> {
        Ok(match stmt {
            ast::Statement::Select(select) => self.build_select(select)?,
            ast::Statement::Insert(insert) => Node::Insert {
                table_name: insert.table,
                columns: insert.columns,
                values: insert.values.into_iter().map(Value::from_consts).collect(),
            },
            ast::Statement::Delete(delete) => Node::Delete {
                table_name: delete.table,
                conditions: delete.where_clause,
            },
        })
    }

    fn build_select(&self, select: SelectStatement) -> Result<Node> {
        if let Some(group_by) = &select.group_by {
            check_grouped_fields(&select.fields, group_by)?;
        }

        let mut node = Node::Scan {
            table_name: select.table.clone(),
        };

        if let Some(join) = &select.join {
            node = Node::Join {
                left: Box::new(node),
                right: Box::new(Node::Scan {
                    table_name: join.table.clone(),
                }),
                table_name: select.table.clone(),
                join: join.clone(),
                fields: referenced_fields(&select),
                all: select.fields.contains(&Expression::All),
            };
        }

        if !select.where_clause.is_empty() {
            node = Node::Filter {
                source: Box::new(node),
                conditions: select.where_clause,
            };
        }

        // ORDER BY, LIMIT and DISTINCT do not apply to a single aggregate row
        if select.has_ungrouped_aggregate {
            return Ok(Node::Aggregate {
                source: Box::new(node),
                exprs: select.fields,
            });
        }

        let grouped = select.group_by.is_some();
        if let Some(group_by) = select.group_by {
            node = Node::GroupBy {
                source: Box::new(node),
                group_by,
                exprs: select.fields.clone(),
            };
        }

        if let Some(order_by) = select.order_by {
            node = Node::Order {
                source: Box::new(node),
                order_by,
            };
        }

        if let Some(limit) = select.limit {
            node = Node::Limit {
                source: Box::new(node),
                limit,
            };
        }

        if select.distinct {
            node = Node::Distinct {
                source: Box::new(node),
                exprs: select.fields.clone(),
            };
        }

        // grouped rows already hold exactly the group and aggregate columns
        if !grouped {
            node = Node::Projection {
                source: Box::new(node),
                exprs: select.fields,
            };
        }

        Ok(node)
    }
}

fn bare(field: &str) -> &str {
    field.rsplit('.').next().unwrap_or(field)
}

/// Under GROUP BY only group fields and aggregates may be selected
fn check_grouped_fields(fields: &[Expression], group_by: &[String]) -> Result<()> {
    for field in fields {
        match field {
            Expression::All => {
                return Err(Error::Parse("[Planner] Cannot select * with GROUP BY".into()));
            }
            Expression::Field(name) => {
                if !group_by.iter().any(|g| g == name || bare(g) == bare(name)) {
                    return Err(Error::Parse(format!(
                        "[Planner] Column {} must appear in the GROUP BY clause",
                        name
                    )));
                }
            }
            Expression::Function(..) => {}
        }
    }
    Ok(())
}

/// Every field the query reads after the join, in first-mention order
fn referenced_fields(select: &SelectStatement) -> Vec<String> {
    let mut fields: Vec<String> = Vec::new();
    let mut add = |field: &str| {
        if !fields.iter().any(|f| f == field) {
            fields.push(field.to_string());
        }
    };

    for expr in &select.fields {
        match expr {
            Expression::All => {}
            Expression::Field(name) => add(name),
            Expression::Function(_, arg) if arg != "*" => add(arg),
            Expression::Function(..) => {}
        }
    }
    for condition in &select.where_clause {
        add(&condition.field);
    }
    for field in select.group_by.iter().flatten() {
        add(field);
    }
    // aggregate labels in ORDER BY are computed later, not read from the join
    for (field, _) in select.order_by.iter().flatten() {
        if !field.contains('(') {
            add(field);
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::referenced_fields;
    use crate::{
        error::{Error, Result},
        sql::{
            parser::{Parser, parse_select},
            plan::{Node, Plan},
        },
    };

    #[test]
    fn test_plan_select_shape() -> Result<()> {
        let sql = "SELECT DISTINCT name FROM student WHERE age > 20 ORDER BY name LIMIT 2";
        let stmt = Parser::new(sql).parse()?;
        let Plan(node) = Plan::build(stmt)?;
        let Node::Projection { source, .. } = node else {
            panic!("expected projection");
        };
        let Node::Distinct { source, .. } = *source else {
            panic!("expected distinct");
        };
        let Node::Limit { source, limit } = *source else {
            panic!("expected limit");
        };
        assert_eq!(limit, 2);
        assert!(matches!(*source, Node::Order { .. }));
        Ok(())
    }

    #[test]
    fn test_plan_ungrouped_aggregate() -> Result<()> {
        let stmt = Parser::new("SELECT COUNT(*) FROM student ORDER BY age LIMIT 1").parse()?;
        let Plan(node) = Plan::build(stmt)?;
        let Node::Aggregate { source, .. } = node else {
            panic!("expected aggregate");
        };
        assert!(matches!(*source, Node::Scan { .. }));
        Ok(())
    }

    #[test]
    fn test_plan_group_by_checks() -> Result<()> {
        for sql in [
            "SELECT name, COUNT(*) FROM student GROUP BY age",
            "SELECT * FROM student GROUP BY age",
        ] {
            let stmt = Parser::new(sql).parse()?;
            assert!(matches!(Plan::build(stmt), Err(Error::Parse(_))));
        }
        let stmt = Parser::new("SELECT student.age, COUNT(*) FROM student GROUP BY age").parse()?;
        assert!(matches!(Plan::build(stmt)?, Plan(Node::GroupBy { .. })));
        Ok(())
    }

    #[test]
    fn test_referenced_fields() -> Result<()> {
        let select = parse_select(
            "SELECT student.name, SUM(enrollment.credits) FROM student \
             INNER JOIN enrollment ON student.id = enrollment.student_id \
             WHERE student.age > 20 GROUP BY student.name ORDER BY SUM(enrollment.credits)",
        )?;
        assert_eq!(
            referenced_fields(&select),
            vec!["student.name", "enrollment.credits", "student.age"]
        );
        Ok(())
    }
}
