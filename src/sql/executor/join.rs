use tracing::debug;

use crate::{
    error::{Error, Result},
    sql::{
        executor::{Executor, ResultSet},
        parser::ast::{JoinSpec, JoinType},
        schema::Table,
        types::{Row, Value},
    },
    storage::TableStore,
};

/// Which input a join field is read from
#[derive(Debug, Clone, Copy, PartialEq)]
enum Side {
    Base,
    Other,
}

/// Field and key resolution for one join, computed from the table headers
struct JoinLayout<'a> {
    base: &'a Table,
    other: &'a Table,
    base_key: String,
    other_key: String,
    /// (output label, source side, source column)
    fields: Vec<(String, Side, String)>,
}

impl<'a> JoinLayout<'a> {
    fn new(base: &'a Table, other: &'a Table, spec: &JoinSpec, fields: &[String]) -> Result<Self> {
        let mut layout = Self {
            base,
            other,
            base_key: String::new(),
            other_key: String::new(),
            fields: Vec::new(),
        };

        // ON may name the two tables in either order
        let keys = (layout.resolve(&spec.left)?, layout.resolve(&spec.right)?);
        let (base_key, other_key) = match keys {
            ((Side::Base, l), (Side::Other, r)) => (l, r),
            ((Side::Other, l), (Side::Base, r)) => (r, l),
            _ => {
                return Err(Error::Field(format!(
                    "join condition {} = {} must reference both {} and {}",
                    spec.left, spec.right, base.name, other.name
                )));
            }
        };
        layout.base_key = base_key;
        layout.other_key = other_key;

        for field in fields {
            let (side, column) = layout.resolve(field)?;
            layout.fields.push((field.clone(), side, column));
        }
        Ok(layout)
    }

    /// Resolves `table.column` by its qualifier, a bare column base-first
    fn resolve(&self, field: &str) -> Result<(Side, String)> {
        let found = match field.split_once('.') {
            Some((table, column)) if table == self.base.name && self.base.has_column(column) => {
                Some((Side::Base, column))
            }
            Some((table, column)) if table == self.other.name && self.other.has_column(column) => {
                Some((Side::Other, column))
            }
            Some(_) => None,
            None if self.base.has_column(field) => Some((Side::Base, field)),
            None if self.other.has_column(field) => Some((Side::Other, field)),
            None => None,
        };
        found
            .map(|(side, column)| (side, column.to_string()))
            .ok_or(Error::Field(format!("column {} not found", field)))
    }

    /// Exact equality of the raw key values; NULL matches nothing
    fn matches(&self, base: &Row, other: &Row) -> bool {
        match (base.get(&self.base_key), other.get(&self.other_key)) {
            (Some(b), Some(o)) => !b.is_null() && b == o,
            _ => false,
        }
    }

    /// Row holding only the requested fields
    fn project(&self, base: Option<&Row>, other: Option<&Row>) -> Row {
        self.fields
            .iter()
            .map(|(label, side, column)| {
                let source = match side {
                    Side::Base => base,
                    Side::Other => other,
                };
                let value = source
                    .and_then(|row| row.get(column))
                    .cloned()
                    .unwrap_or(Value::Null);
                (label.clone(), value)
            })
            .collect()
    }

    /// Row holding every base column as `table.column` plus the requested fields
    fn outer_row(&self, base: &Row, other: Option<&Row>) -> Row {
        let mut row: Row = self
            .base
            .columns
            .iter()
            .map(|c| {
                let value = base.get(c).cloned().unwrap_or(Value::Null);
                (format!("{}.{}", self.base.name, c), value)
            })
            .collect();
        row.extend(self.project(Some(base), other));
        row
    }

    fn columns(&self, outer: bool) -> Vec<String> {
        let mut columns: Vec<String> = if outer {
            self.base
                .columns
                .iter()
                .map(|c| format!("{}.{}", self.base.name, c))
                .collect()
        } else {
            Vec::new()
        };
        for (label, _, _) in &self.fields {
            if !columns.contains(label) {
                columns.push(label.clone());
            }
        }
        columns
    }
}

/// Combines two tables under an equality condition.
///
/// INNER emits one row per matching pair with only the requested fields.
/// LEFT keeps every base row, RIGHT every other row; their rows carry all
/// base columns (prefixed with the base table name) plus the requested
/// fields, NULL on the unmatched side. RIGHT uses the first matching base
/// row, or an all-NULL row shaped from the base header.
pub fn join(base: &Table, other: &Table, spec: &JoinSpec, fields: &[String]) -> Result<Vec<Row>> {
    let layout = JoinLayout::new(base, other, spec, fields)?;
    Ok(join_rows(&layout, spec.join_type))
}

fn join_rows(layout: &JoinLayout, join_type: JoinType) -> Vec<Row> {
    let mut rows = Vec::new();
    match join_type {
        JoinType::Inner => {
            for b in &layout.base.rows {
                for o in layout.other.rows.iter().filter(|o| layout.matches(b, o)) {
                    rows.push(layout.project(Some(b), Some(o)));
                }
            }
        }
        JoinType::Left => {
            for b in &layout.base.rows {
                let mut matched = false;
                for o in layout.other.rows.iter().filter(|o| layout.matches(b, o)) {
                    rows.push(layout.outer_row(b, Some(o)));
                    matched = true;
                }
                if !matched {
                    rows.push(layout.outer_row(b, None));
                }
            }
        }
        JoinType::Right => {
            let placeholder = layout.base.null_row();
            for o in &layout.other.rows {
                let b = layout
                    .base
                    .rows
                    .iter()
                    .find(|b| layout.matches(b, o))
                    .unwrap_or(&placeholder);
                rows.push(layout.outer_row(b, Some(o)));
            }
        }
    }
    rows
}

/// Join executor - nested loop over two scanned tables
pub struct NestedLoopJoin<S: TableStore> {
    left: Box<dyn Executor<S>>,
    right: Box<dyn Executor<S>>,
    table_name: String,
    spec: JoinSpec,
    fields: Vec<String>,
    all: bool,
}

impl<S: TableStore> NestedLoopJoin<S> {
    pub fn new(
        left: Box<dyn Executor<S>>,
        right: Box<dyn Executor<S>>,
        table_name: String,
        spec: JoinSpec,
        fields: Vec<String>,
        all: bool,
    ) -> Box<Self> {
        Box::new(Self {
            left,
            right,
            table_name,
            spec,
            fields,
            all,
        })
    }
}

impl<S: TableStore> Executor<S> for NestedLoopJoin<S> {
    fn execute(self: Box<Self>, store: &mut S) -> Result<ResultSet> {
        let ResultSet::Scan { columns, rows } = self.left.execute(store)? else {
            return Err(Error::Internal("Unexpected result set".into()));
        };
        let base = Table {
            name: self.table_name,
            columns,
            rows,
        };
        let ResultSet::Scan { columns, rows } = self.right.execute(store)? else {
            return Err(Error::Internal("Unexpected result set".into()));
        };
        let other = Table {
            name: self.spec.table.clone(),
            columns,
            rows,
        };

        // SELECT * asks for every column of both tables
        let mut fields = Vec::new();
        if self.all {
            for table in [&base, &other] {
                fields.extend(table.columns.iter().map(|c| format!("{}.{}", table.name, c)));
            }
        }
        for field in self.fields {
            if !fields.contains(&field) {
                fields.push(field);
            }
        }

        let layout = JoinLayout::new(&base, &other, &self.spec, &fields)?;
        let rows = join_rows(&layout, self.spec.join_type);
        let columns = layout.columns(self.spec.join_type != JoinType::Inner);
        debug!(
            base = base.rows.len(),
            other = other.rows.len(),
            rows_out = rows.len(),
            "join"
        );
        Ok(ResultSet::Scan { columns, rows })
    }
}

#[cfg(test)]
mod tests {
    use super::join;
    use crate::{
        error::{Error, Result},
        sql::{
            parser::ast::{JoinSpec, JoinType},
            schema::Table,
            types::Value,
        },
    };

    fn student() -> Table {
        Table::from_records(
            "student",
            &["id", "name", "age"],
            &[&["1", "John", "30"], &["2", "Jane", "25"], &["3", "Bob", "22"]],
        )
    }

    fn enrollment() -> Table {
        Table::from_records(
            "enrollment",
            &["student_id", "course"],
            &[
                &["1", "Mathematics"],
                &["1", "Physics"],
                &["2", "Chemistry"],
                &["5", "Biology"],
            ],
        )
    }

    fn spec(join_type: JoinType) -> JoinSpec {
        JoinSpec {
            join_type,
            table: "enrollment".into(),
            left: "student.id".into(),
            right: "enrollment.student_id".into(),
        }
    }

    fn fields() -> Vec<String> {
        vec!["student.name".into(), "enrollment.course".into()]
    }

    #[test]
    fn test_inner_join() -> Result<()> {
        let rows = join(&student(), &enrollment(), &spec(JoinType::Inner), &fields())?;
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].len(), 2);
        assert_eq!(rows[0].get("student.name"), Some(&Value::from("John")));
        assert_eq!(rows[1].get("enrollment.course"), Some(&Value::from("Physics")));
        assert_eq!(rows[2].get("student.name"), Some(&Value::from("Jane")));
        Ok(())
    }

    #[test]
    fn test_inner_join_reversed_condition() -> Result<()> {
        let mut reversed = spec(JoinType::Inner);
        std::mem::swap(&mut reversed.left, &mut reversed.right);
        let rows = join(&student(), &enrollment(), &reversed, &fields())?;
        assert_eq!(rows.len(), 3);
        Ok(())
    }

    #[test]
    fn test_left_join() -> Result<()> {
        let rows = join(&student(), &enrollment(), &spec(JoinType::Left), &fields())?;
        assert_eq!(rows.len(), 4);
        let bob = &rows[3];
        assert_eq!(bob.get("student.name"), Some(&Value::from("Bob")));
        assert_eq!(bob.get("student.age"), Some(&Value::from("22")));
        assert_eq!(bob.get("enrollment.course"), Some(&Value::Null));
        Ok(())
    }

    #[test]
    fn test_right_join() -> Result<()> {
        let rows = join(&student(), &enrollment(), &spec(JoinType::Right), &fields())?;
        assert_eq!(rows.len(), 4);
        let biology = &rows[3];
        assert_eq!(biology.get("enrollment.course"), Some(&Value::from("Biology")));
        assert_eq!(biology.get("student.name"), Some(&Value::Null));
        assert_eq!(biology.get("student.id"), Some(&Value::Null));
        Ok(())
    }

    #[test]
    fn test_right_join_empty_base_uses_header() -> Result<()> {
        let empty = Table::new("student", vec!["id".into(), "name".into(), "age".into()]);
        let rows = join(&empty, &enrollment(), &spec(JoinType::Right), &fields())?;
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|r| r.get("student.age") == Some(&Value::Null)));
        Ok(())
    }

    #[test]
    fn test_unknown_field() {
        let err = join(
            &student(),
            &enrollment(),
            &spec(JoinType::Inner),
            &["enrollment.grade".to_string()],
        );
        assert!(matches!(err, Err(Error::Field(_))));

        let mut bad = spec(JoinType::Inner);
        bad.right = "courses.student_id".into();
        assert!(matches!(
            join(&student(), &enrollment(), &bad, &fields()),
            Err(Error::Field(_))
        ));
    }
}
