use crate::error::{Error, Result};
use crate::sql::parser::ast::{
    Condition, Consts, DeleteStatement, Expression, InsertStatement, JoinSpec, JoinType, Operator,
    OrderDirection, SelectStatement, Statement,
};
use crate::sql::parser::lexer::{Keyword, Lexer, Token};

pub mod ast;
mod lexer;

/// Aggregate functions accepted in a select list
const AGGREGATES: [&str; 5] = ["COUNT", "SUM", "AVG", "MIN", "MAX"];

/// SQL Parser - Converts statement text into a typed statement
///
/// SELECT clauses are stripped from the end of the token stream in a fixed
/// order (DISTINCT, LIMIT, ORDER BY, WHERE/GROUP BY, JOIN) before the base
/// `SELECT ... FROM` is read; each isolated clause is then parsed by a
/// small cursor.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given SQL input
    pub fn new(input: &'a str) -> Self {
        Parser { lexer: Lexer::new(input) }
    }

    /// Parses the input SQL statement; a trailing semicolon is optional
    pub fn parse(&mut self) -> Result<Statement> {
        let mut tokens = self.lexer.by_ref().collect::<Result<Vec<_>>>()?;
        if tokens.last() == Some(&Token::Semicolon) {
            tokens.pop();
        }
        match tokens.first() {
            Some(Token::Keyword(Keyword::Select)) => {
                parse_select_tokens(tokens).map(Statement::Select)
            }
            Some(Token::Keyword(Keyword::Insert)) => {
                parse_insert_tokens(&tokens).map(Statement::Insert)
            }
            Some(Token::Keyword(Keyword::Delete)) => {
                parse_delete_tokens(&tokens).map(Statement::Delete)
            }
            Some(t) => Err(Error::Parse(format!("[Parser] Unexpected token {}", t))),
            None => Err(Error::Parse("[Parser] Unexpected end of input".into())),
        }
    }
}

/// Parses a SELECT statement
pub fn parse_select(sql: &str) -> Result<SelectStatement> {
    match Parser::new(sql).parse()? {
        Statement::Select(select) => Ok(select),
        _ => Err(Error::Parse("[Parser] Expected a SELECT statement".into())),
    }
}

/// Parses an INSERT statement
pub fn parse_insert(sql: &str) -> Result<InsertStatement> {
    match Parser::new(sql).parse()? {
        Statement::Insert(insert) => Ok(insert),
        _ => Err(Error::Parse("[Parser] Expected an INSERT statement".into())),
    }
}

/// Parses a DELETE statement
pub fn parse_delete(sql: &str) -> Result<DeleteStatement> {
    match Parser::new(sql).parse()? {
        Statement::Delete(delete) => Ok(delete),
        _ => Err(Error::Parse("[Parser] Expected a DELETE statement".into())),
    }
}

fn parse_select_tokens(mut tokens: Vec<Token>) -> Result<SelectStatement> {
    let distinct = tokens.get(1) == Some(&Token::Keyword(Keyword::Distinct));
    if distinct {
        tokens.remove(1);
    }

    let mut limit = None;
    if let Some(i) = position_keyword(&tokens, Keyword::Limit) {
        limit = Some(match tokens.get(i + 1) {
            Some(Token::Number(n)) => n.parse::<usize>().map_err(|_| {
                Error::Parse(format!("[Parser] LIMIT expects a non-negative integer, got {}", n))
            })?,
            Some(t) => {
                return Err(Error::Parse(format!(
                    "[Parser] LIMIT expects a non-negative integer, got {}",
                    t
                )));
            }
            None => {
                return Err(Error::Parse(
                    "[Parser] LIMIT expects a non-negative integer".into(),
                ));
            }
        });
        tokens.drain(i..i + 2);
    }

    let mut order_by = None;
    if let Some(i) = position_pair(&tokens, &[Keyword::Order], Keyword::By) {
        order_by = Some(parse_order_by(&tokens[i + 2..])?);
        tokens.truncate(i);
    }

    // WHERE runs to the end of the statement, minus a trailing GROUP BY
    let (group_by, where_clause) = match position_keyword(&tokens, Keyword::Where) {
        Some(i) => {
            let mut tail = tokens.split_off(i + 1);
            tokens.truncate(i);
            let group_by = split_group_by(&mut tail)?;
            (group_by, parse_conditions(&tail)?)
        }
        None => (split_group_by(&mut tokens)?, Vec::new()),
    };

    let join_kinds = [Keyword::Inner, Keyword::Left, Keyword::Right];
    let join = match position_pair(&tokens, &join_kinds, Keyword::Join) {
        Some(i) => {
            let clause = tokens.split_off(i);
            Some(parse_join(&clause)?)
        }
        None => None,
    };
    if let Some(i) = position_keyword(&tokens, Keyword::Join) {
        let kind = if i > 0 { tokens[i - 1].to_string() } else { String::new() };
        return Err(Error::Parse(format!("[Parser] Unsupported join type {}", kind)));
    }

    let mut cursor = Cursor::new(&tokens);
    cursor.next_expect(Token::Keyword(Keyword::Select))?;
    let mut fields = Vec::new();
    loop {
        fields.push(cursor.parse_expression()?);
        if cursor.next_if_token(Token::Comma).is_none() {
            break;
        }
    }
    cursor.next_expect(Token::Keyword(Keyword::From))?;
    let table = cursor.next_ident()?;
    cursor.expect_end()?;

    let has_ungrouped_aggregate = group_by.is_none() && fields.iter().any(|f| f.is_aggregate());

    Ok(SelectStatement {
        fields,
        table,
        join,
        where_clause,
        group_by,
        has_ungrouped_aggregate,
        order_by,
        limit,
        distinct,
    })
}

/// Removes a trailing `GROUP BY <fields>` segment and returns its fields
fn split_group_by(tokens: &mut Vec<Token>) -> Result<Option<Vec<String>>> {
    let Some(i) = position_pair(tokens, &[Keyword::Group], Keyword::By) else {
        return Ok(None);
    };
    let mut fields = Vec::new();
    for segment in split_tokens(&tokens[i + 2..], |t| *t == Token::Comma) {
        let mut cursor = Cursor::new(segment);
        fields.push(cursor.next_column()?);
        cursor.expect_end()?;
    }
    tokens.truncate(i);
    Ok(Some(fields))
}

fn parse_order_by(tokens: &[Token]) -> Result<Vec<(String, OrderDirection)>> {
    let mut order_by = Vec::new();
    for segment in split_tokens(tokens, |t| *t == Token::Comma) {
        let mut cursor = Cursor::new(segment);
        let field = match cursor.parse_expression()? {
            Expression::All => {
                return Err(Error::Parse("[Parser] Cannot order by *".into()));
            }
            expr => expr.label(),
        };
        let direction = match cursor.peek() {
            Some(Token::Keyword(Keyword::Desc)) => OrderDirection::Desc,
            Some(Token::Keyword(Keyword::Asc)) | None => OrderDirection::Asc,
            Some(t) => return Err(Error::Parse(format!("[Parser] Unexpected token {}", t))),
        };
        cursor.next_if(|t| matches!(t, Token::Keyword(Keyword::Asc | Keyword::Desc)));
        cursor.expect_end()?;
        order_by.push((field, direction));
    }
    Ok(order_by)
}

/// Parses `cond ((AND|OR) cond)*`; both connectives act as AND
fn parse_conditions(tokens: &[Token]) -> Result<Vec<Condition>> {
    if tokens.is_empty() {
        return Err(Error::Parse("[Parser] WHERE clause expects a condition".into()));
    }
    split_tokens(tokens, |t| {
        matches!(t, Token::Keyword(Keyword::And) | Token::Keyword(Keyword::Or))
    })
    .into_iter()
    .map(parse_condition)
    .collect()
}

fn parse_condition(tokens: &[Token]) -> Result<Condition> {
    let parse = || -> Result<Condition> {
        let mut cursor = Cursor::new(tokens);
        let field = cursor.next_column()?;
        let operator = Operator::from_str(&cursor.next()?.to_string())?;
        let value = cursor.parse_literal()?;
        cursor.expect_end()?;
        Ok(Condition::new(field, operator, value))
    };
    parse().map_err(|err| match err {
        Error::Parse(_) => Error::Parse(format!(
            "[Parser] Invalid WHERE clause format: {}",
            tokens.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(" ")
        )),
        err => err,
    })
}

fn parse_join(tokens: &[Token]) -> Result<JoinSpec> {
    let mut cursor = Cursor::new(tokens);
    let join_type = match cursor.next()? {
        Token::Keyword(Keyword::Inner) => JoinType::Inner,
        Token::Keyword(Keyword::Left) => JoinType::Left,
        Token::Keyword(Keyword::Right) => JoinType::Right,
        t => return Err(Error::Parse(format!("[Parser] Unsupported join type {}", t))),
    };
    cursor.next_expect(Token::Keyword(Keyword::Join))?;
    let table = cursor.next_ident()?;
    cursor.next_expect(Token::Keyword(Keyword::On))?;
    let left = cursor.next_qualified()?;
    cursor.next_expect(Token::Equal)?;
    let right = cursor.next_qualified()?;
    cursor.expect_end()?;
    Ok(JoinSpec {
        join_type,
        table,
        left,
        right,
    })
}

fn parse_insert_tokens(tokens: &[Token]) -> Result<InsertStatement> {
    let mut cursor = Cursor::new(tokens);
    cursor.next_expect(Token::Keyword(Keyword::Insert))?;
    cursor.next_expect(Token::Keyword(Keyword::Into))?;
    let table = cursor.next_ident()?;

    cursor.next_expect(Token::OpenParen)?;
    let mut columns = Vec::new();
    loop {
        columns.push(cursor.next_ident()?);
        match cursor.next()? {
            Token::CloseParen => break,
            Token::Comma => {}
            token => return Err(Error::Parse(format!("[Parser] Unexpected token {}", token))),
        }
    }

    cursor.next_expect(Token::Keyword(Keyword::Values))?;
    cursor.next_expect(Token::OpenParen)?;
    let mut values = Vec::new();
    loop {
        values.push(cursor.parse_consts()?);
        match cursor.next()? {
            Token::CloseParen => break,
            Token::Comma => {}
            token => return Err(Error::Parse(format!("[Parser] Unexpected token {}", token))),
        }
    }
    cursor.expect_end()?;

    if columns.len() != values.len() {
        return Err(Error::Parse("[Parser] columns and values num mismatch".into()));
    }
    Ok(InsertStatement {
        table,
        columns,
        values,
    })
}

fn parse_delete_tokens(tokens: &[Token]) -> Result<DeleteStatement> {
    let mut cursor = Cursor::new(tokens);
    cursor.next_expect(Token::Keyword(Keyword::Delete))?;
    cursor.next_expect(Token::Keyword(Keyword::From))?;
    let table = cursor.next_ident()?;

    let where_clause = if cursor.next_if_token(Token::Keyword(Keyword::Where)).is_some() {
        parse_conditions(cursor.rest())?
    } else {
        cursor.expect_end()?;
        Vec::new()
    };
    Ok(DeleteStatement {
        table,
        where_clause,
    })
}

fn position_keyword(tokens: &[Token], keyword: Keyword) -> Option<usize> {
    tokens.iter().position(|t| *t == Token::Keyword(keyword))
}

/// Position of the first `<one of first> <second>` keyword pair
fn position_pair(tokens: &[Token], first: &[Keyword], second: Keyword) -> Option<usize> {
    tokens.windows(2).position(|w| match (&w[0], &w[1]) {
        (Token::Keyword(a), Token::Keyword(b)) => first.contains(a) && *b == second,
        _ => false,
    })
}

/// Splits tokens on separators outside parentheses
fn split_tokens<F: Fn(&Token) -> bool>(tokens: &[Token], is_separator: F) -> Vec<&[Token]> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::OpenParen => depth += 1,
            Token::CloseParen => depth = depth.saturating_sub(1),
            t if depth == 0 && is_separator(t) => {
                segments.push(&tokens[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(&tokens[start..]);
    segments
}

/// Sequential reader over one isolated clause
struct Cursor<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> Cursor<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Peeks at the next token
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    /// Consumes and returns the next token
    fn next(&mut self) -> Result<&'t Token> {
        let token = self
            .peek()
            .ok_or(Error::Parse("[Parser] Unexpected end of input".into()))?;
        self.pos += 1;
        Ok(token)
    }

    /// Tokens not consumed yet
    fn rest(&self) -> &'t [Token] {
        &self.tokens[self.pos..]
    }

    /// Fails if any token is left
    fn expect_end(&self) -> Result<()> {
        match self.peek() {
            Some(token) => Err(Error::Parse(format!("[Parser] Unexpected token {}", token))),
            None => Ok(()),
        }
    }

    /// Expects and consumes an identifier
    fn next_ident(&mut self) -> Result<String> {
        match self.next()? {
            Token::Ident(ident) => Ok(ident.clone()),
            token => Err(Error::Parse(format!(
                "[Parser] Expected ident, got token {}",
                token
            ))),
        }
    }

    /// Reads a column reference, bare or `table.column`
    fn next_column(&mut self) -> Result<String> {
        let first = self.next_ident()?;
        self.finish_column(first)
    }

    fn finish_column(&mut self, first: String) -> Result<String> {
        if self.next_if_token(Token::Period).is_some() {
            Ok(format!("{}.{}", first, self.next_ident()?))
        } else {
            Ok(first)
        }
    }

    /// Reads a `table.column` reference
    fn next_qualified(&mut self) -> Result<String> {
        let column = self.next_column()?;
        if !column.contains('.') {
            return Err(Error::Parse(format!(
                "[Parser] Expected qualified column table.column, got {}",
                column
            )));
        }
        Ok(column)
    }

    /// Expects a specific token, returns error if different
    fn next_expect(&mut self, expect: Token) -> Result<()> {
        let token = self.next()?;
        if *token != expect {
            return Err(Error::Parse(format!(
                "[Parser] Expected token {}, got {}",
                expect, token
            )));
        }
        Ok(())
    }

    /// Consumes next token if it satisfies the predicate
    fn next_if<F: Fn(&Token) -> bool>(&mut self, predicate: F) -> Option<&'t Token> {
        self.peek().filter(|t| predicate(t))?;
        self.next().ok()
    }

    /// Consumes next token if it matches the given token
    fn next_if_token(&mut self, token: Token) -> Option<&'t Token> {
        self.next_if(|t| *t == token)
    }

    /// Parses a select-list expression: `*`, a column, or `FUNC(column|*)`
    fn parse_expression(&mut self) -> Result<Expression> {
        match self.next()? {
            Token::Asterisk => Ok(Expression::All),
            Token::Ident(name) => {
                if self.next_if_token(Token::OpenParen).is_none() {
                    return Ok(Expression::Field(self.finish_column(name.clone())?));
                }
                if !AGGREGATES.contains(&name.to_uppercase().as_str()) {
                    return Err(Error::Parse(format!("[Parser] Unknown function {}", name)));
                }
                let arg = if self.next_if_token(Token::Asterisk).is_some() {
                    "*".to_string()
                } else {
                    self.next_column()?
                };
                self.next_expect(Token::CloseParen)?;
                Ok(Expression::Function(name.clone(), arg))
            }
            t => Err(Error::Parse(format!(
                "[Parser] Unexpected expression token {}",
                t
            ))),
        }
    }

    /// Parses a condition literal; quotes are already gone, bare words are kept
    fn parse_literal(&mut self) -> Result<String> {
        match self.next()? {
            Token::String(s) | Token::Number(s) | Token::Ident(s) => Ok(s.clone()),
            Token::Keyword(keyword) => Ok(keyword.to_str().to_string()),
            Token::Minus => match self.next()? {
                Token::Number(n) => Ok(format!("-{}", n)),
                t => Err(Error::Parse(format!("[Parser] Unexpected token {}", t))),
            },
            t => Err(Error::Parse(format!("[Parser] Unexpected literal token {}", t))),
        }
    }

    /// Parses an INSERT value
    fn parse_consts(&mut self) -> Result<Consts> {
        Ok(match self.next()? {
            Token::Number(n) => Consts::Number(n.clone()),
            Token::Minus => match self.next()? {
                Token::Number(n) => Consts::Number(format!("-{}", n)),
                t => return Err(Error::Parse(format!("[Parser] Unexpected token {}", t))),
            },
            Token::String(s) => Consts::String(s.clone()),
            Token::Keyword(Keyword::Null) => Consts::Null,
            t => {
                return Err(Error::Parse(format!(
                    "[Parser] Unexpected expression token {}",
                    t
                )));
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Parser, parse_delete, parse_insert, parse_select};
    use crate::{
        error::{Error, Result},
        sql::parser::ast::{
            Condition, Consts, Expression, JoinSpec, JoinType, Operator, OrderDirection,
            SelectStatement, Statement,
        },
    };

    #[test]
    fn test_parser_select_simple() -> Result<()> {
        let stmt = parse_select("SELECT id, name FROM student")?;
        assert_eq!(
            stmt,
            SelectStatement {
                fields: vec![
                    Expression::Field("id".into()),
                    Expression::Field("name".into())
                ],
                table: "student".into(),
                ..Default::default()
            }
        );

        let stmt2 = parse_select("select    *   from student;")?;
        assert_eq!(stmt2.fields, vec![Expression::All]);
        Ok(())
    }

    #[test]
    fn test_parser_select_where() -> Result<()> {
        let stmt =
            parse_select("SELECT name FROM student WHERE age > 20 AND name = 'John' OR id != -1")?;
        assert_eq!(
            stmt.where_clause,
            vec![
                Condition::new("age", Operator::GreaterThan, "20"),
                Condition::new("name", Operator::Equal, "John"),
                Condition::new("id", Operator::NotEqual, "-1"),
            ]
        );

        let like = parse_select("SELECT name FROM student WHERE name LIKE '%Jo_n%'")?;
        assert_eq!(
            like.where_clause,
            vec![Condition::new("name", Operator::Like, "%Jo_n%")]
        );
        Ok(())
    }

    #[test]
    fn test_parser_where_exponent_and_keyword_literals() -> Result<()> {
        let stmt = parse_select("SELECT name FROM student WHERE age > 2e1 AND grade = NULL")?;
        assert_eq!(
            stmt.where_clause,
            vec![
                Condition::new("age", Operator::GreaterThan, "2e1"),
                Condition::new("grade", Operator::Equal, "NULL"),
            ]
        );

        let stmt = parse_select("SELECT name FROM student WHERE side = Left")?;
        assert_eq!(
            stmt.where_clause,
            vec![Condition::new("side", Operator::Equal, "LEFT")]
        );
        Ok(())
    }

    #[test]
    fn test_parser_select_all_clauses() -> Result<()> {
        let stmt = parse_select(
            "SELECT DISTINCT student.name, COUNT(enrollment.course) FROM student \
             LEFT JOIN enrollment ON student.id = enrollment.student_id \
             WHERE student.age >= 18 GROUP BY student.name \
             ORDER BY COUNT(enrollment.course) DESC, student.name LIMIT 5",
        )?;
        assert!(stmt.distinct);
        assert_eq!(stmt.limit, Some(5));
        assert_eq!(
            stmt.order_by,
            Some(vec![
                ("COUNT(enrollment.course)".to_string(), OrderDirection::Desc),
                ("student.name".to_string(), OrderDirection::Asc),
            ])
        );
        assert_eq!(stmt.group_by, Some(vec!["student.name".to_string()]));
        assert_eq!(
            stmt.where_clause,
            vec![Condition::new("student.age", Operator::GreaterThanOrEqual, "18")]
        );
        assert_eq!(
            stmt.join,
            Some(JoinSpec {
                join_type: JoinType::Left,
                table: "enrollment".into(),
                left: "student.id".into(),
                right: "enrollment.student_id".into(),
            })
        );
        assert_eq!(stmt.table, "student");
        assert_eq!(
            stmt.fields,
            vec![
                Expression::Field("student.name".into()),
                Expression::Function("COUNT".into(), "enrollment.course".into()),
            ]
        );
        assert!(!stmt.has_ungrouped_aggregate);
        Ok(())
    }

    #[test]
    fn test_parser_group_by_without_where() -> Result<()> {
        let stmt = parse_select("SELECT age, COUNT(*) FROM student GROUP BY age")?;
        assert_eq!(stmt.group_by, Some(vec!["age".to_string()]));
        assert_eq!(stmt.table, "student");
        assert!(!stmt.has_ungrouped_aggregate);

        let joined = parse_select(
            "SELECT student.name, COUNT(*) FROM student INNER JOIN enrollment \
             ON student.id = enrollment.student_id GROUP BY student.name",
        )?;
        assert_eq!(joined.group_by, Some(vec!["student.name".to_string()]));
        assert!(joined.join.is_some());
        Ok(())
    }

    #[test]
    fn test_parser_ungrouped_aggregate() -> Result<()> {
        let stmt = parse_select("SELECT count(*), AVG(age) FROM student WHERE age > 20")?;
        assert!(stmt.has_ungrouped_aggregate);
        assert_eq!(stmt.fields[0].label(), "count(*)");
        assert_eq!(stmt.fields[1].label(), "AVG(age)");
        Ok(())
    }

    #[test]
    fn test_parser_select_errors() {
        assert!(matches!(parse_select("SELECT FROM student"), Err(Error::Parse(_))));
        assert!(matches!(parse_select("SELECT name student"), Err(Error::Parse(_))));
        assert!(matches!(parse_select("SELECT name FROM student WHERE"), Err(Error::Parse(_))));
        assert!(matches!(parse_select("SELECT name FROM student WHERE age"), Err(Error::Parse(_))));
        assert!(matches!(
            parse_select("SELECT name FROM student WHERE age + 3"),
            Err(Error::Operator(_))
        ));
        assert!(matches!(parse_select("SELECT name FROM student LIMIT x"), Err(Error::Parse(_))));
        assert!(matches!(parse_select("SELECT FOO(age) FROM student"), Err(Error::Parse(_))));
        assert!(matches!(
            parse_select("SELECT * FROM a FULL JOIN b ON a.id = b.id"),
            Err(Error::Parse(msg)) if msg.contains("Unsupported join type")
        ));
        assert!(matches!(
            parse_select("SELECT * FROM a INNER JOIN b ON id = b.id"),
            Err(Error::Parse(_))
        ));
        assert!(matches!(parse_select("DELETE FROM student"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_parser_insert() -> Result<()> {
        let stmt = parse_insert("INSERT INTO student (id, name, age) VALUES (3, 'Carol', -19.5)")?;
        assert_eq!(stmt.table, "student");
        assert_eq!(stmt.columns, vec!["id", "name", "age"]);
        assert_eq!(
            stmt.values,
            vec![
                Consts::Number("3".into()),
                Consts::String("Carol".into()),
                Consts::Number("-19.5".into()),
            ]
        );

        let null = parse_insert("insert into grades (student_id, grade) values (1, NULL);")?;
        assert_eq!(null.values[1], Consts::Null);

        assert!(parse_insert("INSERT INTO student (id, name) VALUES (1)").is_err());
        assert!(parse_insert("INSERT INTO student VALUES (1)").is_err());
        Ok(())
    }

    #[test]
    fn test_parser_delete() -> Result<()> {
        let stmt = parse_delete("DELETE FROM courses WHERE course_id = '2'")?;
        assert_eq!(stmt.table, "courses");
        assert_eq!(
            stmt.where_clause,
            vec![Condition::new("course_id", Operator::Equal, "2")]
        );

        let all = parse_delete("delete from courses")?;
        assert!(all.where_clause.is_empty());

        assert!(parse_delete("DELETE courses").is_err());
        Ok(())
    }

    #[test]
    fn test_parser_dispatch() -> Result<()> {
        assert!(matches!(
            Parser::new("SELECT a FROM t").parse()?,
            Statement::Select(_)
        ));
        assert!(matches!(
            Parser::new("DELETE FROM t").parse()?,
            Statement::Delete(_)
        ));
        assert!(Parser::new("UPDATE t").parse().is_err());
        assert!(Parser::new("").parse().is_err());
        Ok(())
    }
}
