//! SQL Lexer - Tokenizes statement text into a stream of tokens

use std::{fmt::Display, iter::Peekable, str::Chars};

use crate::error::{Error, Result};

/// Represents a single lexical token in the SQL input
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// SQL reserved keyword
    Keyword(Keyword),
    /// Identifier such as table name, column name or function name (case kept)
    Ident(String),
    /// String literal, quotes removed
    String(String),
    /// Numeric literal (integer or floating-point)
    Number(String),
    OpenParen,
    CloseParen,
    Comma,
    Semicolon,
    Period,
    Asterisk,
    Minus,
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    /// Any other single character, rejected by the parser where it appears
    Other(char),
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Keyword(keyword) => f.write_str(keyword.to_str()),
            Token::Ident(ident) => f.write_str(ident),
            Token::String(v) => write!(f, "'{}'", v),
            Token::Number(n) => f.write_str(n),
            Token::OpenParen => f.write_str("("),
            Token::CloseParen => f.write_str(")"),
            Token::Comma => f.write_str(","),
            Token::Semicolon => f.write_str(";"),
            Token::Period => f.write_str("."),
            Token::Asterisk => f.write_str("*"),
            Token::Minus => f.write_str("-"),
            Token::Equal => f.write_str("="),
            Token::NotEqual => f.write_str("!="),
            Token::GreaterThan => f.write_str(">"),
            Token::GreaterThanOrEqual => f.write_str(">="),
            Token::LessThan => f.write_str("<"),
            Token::LessThanOrEqual => f.write_str("<="),
            Token::Other(c) => write!(f, "{}", c),
        }
    }
}

/// SQL reserved keywords
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Keyword {
    Select,
    Distinct,
    From,
    Where,
    And,
    Or,
    Like,
    Inner,
    Left,
    Right,
    Join,
    On,
    Group,
    Order,
    By,
    Asc,
    Desc,
    Limit,
    Insert,
    Into,
    Values,
    Delete,
    Null,
}

impl Keyword {
    /// Attempts to parse a string as a keyword (case-insensitive)
    pub fn from_str(ident: &str) -> Option<Keyword> {
        Some(match ident.to_uppercase().as_ref() {
            "SELECT" => Keyword::Select,
            "DISTINCT" => Keyword::Distinct,
            "FROM" => Keyword::From,
            "WHERE" => Keyword::Where,
            "AND" => Keyword::And,
            "OR" => Keyword::Or,
            "LIKE" => Keyword::Like,
            "INNER" => Keyword::Inner,
            "LEFT" => Keyword::Left,
            "RIGHT" => Keyword::Right,
            "JOIN" => Keyword::Join,
            "ON" => Keyword::On,
            "GROUP" => Keyword::Group,
            "ORDER" => Keyword::Order,
            "BY" => Keyword::By,
            "ASC" => Keyword::Asc,
            "DESC" => Keyword::Desc,
            "LIMIT" => Keyword::Limit,
            "INSERT" => Keyword::Insert,
            "INTO" => Keyword::Into,
            "VALUES" => Keyword::Values,
            "DELETE" => Keyword::Delete,
            "NULL" => Keyword::Null,
            _ => return None,
        })
    }

    /// Returns the uppercase string representation of the keyword
    pub fn to_str(&self) -> &str {
        match self {
            Keyword::Select => "SELECT",
            Keyword::Distinct => "DISTINCT",
            Keyword::From => "FROM",
            Keyword::Where => "WHERE",
            Keyword::And => "AND",
            Keyword::Or => "OR",
            Keyword::Like => "LIKE",
            Keyword::Inner => "INNER",
            Keyword::Left => "LEFT",
            Keyword::Right => "RIGHT",
            Keyword::Join => "JOIN",
            Keyword::On => "ON",
            Keyword::Group => "GROUP",
            Keyword::Order => "ORDER",
            Keyword::By => "BY",
            Keyword::Asc => "ASC",
            Keyword::Desc => "DESC",
            Keyword::Limit => "LIMIT",
            Keyword::Insert => "INSERT",
            Keyword::Into => "INTO",
            Keyword::Values => "VALUES",
            Keyword::Delete => "DELETE",
            Keyword::Null => "NULL",
        }
    }
}

impl Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_str())
    }
}

/// SQL lexical analyzer (lexer/tokenizer)
pub struct Lexer<'a> {
    iter: Peekable<Chars<'a>>,
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        self.scan().transpose()
    }
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given SQL text
    pub fn new(sql_text: &'a str) -> Self {
        Self {
            iter: sql_text.chars().peekable(),
        }
    }

    /// Consumes the next character if it satisfies the predicate
    fn next_if<F: Fn(char) -> bool>(&mut self, predicate: F) -> Option<char> {
        self.iter.peek().filter(|&c| predicate(*c))?;
        self.iter.next()
    }

    /// Consumes consecutive characters while they satisfy the predicate
    fn next_while<F: Fn(char) -> bool>(&mut self, predicate: F) -> Option<String> {
        let mut value = String::new();
        while let Some(c) = self.next_if(&predicate) {
            value.push(c);
        }
        Some(value).filter(|v| !v.is_empty())
    }

    /// Removes whitespace from the input stream
    fn erase_whitespace(&mut self) {
        self.next_while(|c| c.is_whitespace());
    }

    /// Scans and returns the next token
    fn scan(&mut self) -> Result<Option<Token>> {
        self.erase_whitespace();
        match self.iter.peek() {
            Some(&q) if q == '\'' || q == '"' => self.scan_string(q),
            Some(c) if c.is_ascii_digit() => Ok(self.scan_number()),
            Some(c) if c.is_alphabetic() || *c == '_' => Ok(self.scan_ident()),
            Some(_) => self.scan_symbol(),
            None => Ok(None),
        }
    }

    /// Scans a quoted string; a doubled quote inside stands for one quote
    fn scan_string(&mut self, quote: char) -> Result<Option<Token>> {
        self.iter.next();
        let mut val = String::new();

        loop {
            match self.iter.next() {
                Some(c) if c == quote => {
                    if self.next_if(|n| n == quote).is_none() {
                        break;
                    }
                    val.push(quote);
                }
                Some(c) => val.push(c),
                None => return Err(Error::Parse("[Lexer] Unexpected end of string".into())),
            }
        }
        Ok(Some(Token::String(val)))
    }

    /// Scans a numeric literal (integer, floating-point or with an exponent)
    fn scan_number(&mut self) -> Option<Token> {
        let mut val = self.next_while(|c| c.is_ascii_digit())?;
        if let Some(sep) = self.next_if(|c| c == '.') {
            val.push(sep);
            while let Some(c) = self.next_if(|c| c.is_ascii_digit()) {
                val.push(c);
            }
        }
        if let Some(exp) = self.scan_exponent() {
            val.push_str(&exp);
        }
        Some(Token::Number(val))
    }

    /// Consumes `e[+-]digits` only when the whole suffix is present
    fn scan_exponent(&mut self) -> Option<String> {
        let mut ahead = self.iter.clone();
        let mut exp = String::from(ahead.next_if(|c| *c == 'e' || *c == 'E')?);
        if let Some(sign) = ahead.next_if(|c| *c == '+' || *c == '-') {
            exp.push(sign);
        }
        ahead.peek().filter(|c| c.is_ascii_digit())?;
        self.iter = ahead;
        while let Some(c) = self.next_if(|c| c.is_ascii_digit()) {
            exp.push(c);
        }
        Some(exp)
    }

    /// Scans an identifier or keyword
    fn scan_ident(&mut self) -> Option<Token> {
        let val = self.next_while(|c| c.is_alphanumeric() || c == '_')?;
        Some(Keyword::from_str(&val).map_or(Token::Ident(val), Token::Keyword))
    }

    /// Scans a symbol, including the two-character comparison operators
    fn scan_symbol(&mut self) -> Result<Option<Token>> {
        let Some(c) = self.iter.next() else {
            return Ok(None);
        };
        Ok(Some(match c {
            '*' => Token::Asterisk,
            '(' => Token::OpenParen,
            ')' => Token::CloseParen,
            ',' => Token::Comma,
            ';' => Token::Semicolon,
            '.' => Token::Period,
            '-' => Token::Minus,
            '=' => Token::Equal,
            '!' => match self.next_if(|n| n == '=') {
                Some(_) => Token::NotEqual,
                None => Token::Other('!'),
            },
            '>' => match self.next_if(|n| n == '=') {
                Some(_) => Token::GreaterThanOrEqual,
                None => Token::GreaterThan,
            },
            '<' => match self.next_if(|n| n == '=' || n == '>') {
                Some('=') => Token::LessThanOrEqual,
                Some(_) => Token::NotEqual,
                None => Token::LessThan,
            },
            c => Token::Other(c),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::Lexer;
    use crate::{
        error::Result,
        sql::parser::lexer::{Keyword, Token},
    };

    #[test]
    fn test_lexer_select() -> Result<()> {
        let sql = "select DISTINCT student.name, COUNT(*) from student where age >= 20;";
        let tokens = Lexer::new(sql).collect::<Result<Vec<_>>>()?;

        assert_eq!(
            tokens,
            vec![
                Token::Keyword(Keyword::Select),
                Token::Keyword(Keyword::Distinct),
                Token::Ident("student".to_string()),
                Token::Period,
                Token::Ident("name".to_string()),
                Token::Comma,
                Token::Ident("COUNT".to_string()),
                Token::OpenParen,
                Token::Asterisk,
                Token::CloseParen,
                Token::Keyword(Keyword::From),
                Token::Ident("student".to_string()),
                Token::Keyword(Keyword::Where),
                Token::Ident("age".to_string()),
                Token::GreaterThanOrEqual,
                Token::Number("20".to_string()),
                Token::Semicolon,
            ]
        );
        Ok(())
    }

    #[test]
    fn test_lexer_insert_into() -> Result<()> {
        let tokens = Lexer::new("INSERT INTO       student (id, name) values (4.5, 'O''Brien');")
            .collect::<Result<Vec<_>>>()?;

        assert_eq!(
            tokens,
            vec![
                Token::Keyword(Keyword::Insert),
                Token::Keyword(Keyword::Into),
                Token::Ident("student".to_string()),
                Token::OpenParen,
                Token::Ident("id".to_string()),
                Token::Comma,
                Token::Ident("name".to_string()),
                Token::CloseParen,
                Token::Keyword(Keyword::Values),
                Token::OpenParen,
                Token::Number("4.5".to_string()),
                Token::Comma,
                Token::String("O'Brien".to_string()),
                Token::CloseParen,
                Token::Semicolon,
            ]
        );
        Ok(())
    }

    #[test]
    fn test_lexer_operators() -> Result<()> {
        let tokens = Lexer::new("a != b <> c <= d < e > f ! \"x y\"")
            .collect::<Result<Vec<_>>>()?;
        let ops: Vec<_> = tokens
            .into_iter()
            .filter(|t| !matches!(t, Token::Ident(_)))
            .collect();
        assert_eq!(
            ops,
            vec![
                Token::NotEqual,
                Token::NotEqual,
                Token::LessThanOrEqual,
                Token::LessThan,
                Token::GreaterThan,
                Token::Other('!'),
                Token::String("x y".to_string()),
            ]
        );

        assert!(Lexer::new("name = 'open").collect::<Result<Vec<_>>>().is_err());
        Ok(())
    }

    #[test]
    fn test_lexer_exponent() -> Result<()> {
        let tokens = Lexer::new("2e1 1.5E-3 3e x2").collect::<Result<Vec<_>>>()?;
        assert_eq!(
            tokens,
            vec![
                Token::Number("2e1".to_string()),
                Token::Number("1.5E-3".to_string()),
                Token::Number("3".to_string()),
                Token::Ident("e".to_string()),
                Token::Ident("x2".to_string()),
            ]
        );
        Ok(())
    }
}
