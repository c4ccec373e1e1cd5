use thiserror::Error;

/// Custom Result type for csvdb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for csvdb
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Malformed statement text
    #[error("parse error: {0}")]
    Parse(String),
    /// Reference to a column absent from the row or table in scope
    #[error("invalid field: {0}")]
    Field(String),
    /// Unrecognized comparison operator
    #[error("unsupported operator: {0}")]
    Operator(String),
    /// Table store failure (file access, malformed CSV)
    #[error("io error: {0}")]
    Io(String),
    /// Internal error (non-numeric aggregate input, missing table, etc.)
    #[error("internal error: {0}")]
    Internal(String),
    /// Any of the above, raised while running a statement
    #[error("Error executing query: {0}")]
    Execution(Box<Error>),
}

impl Error {
    /// Wraps the error with query context, leaving already wrapped errors alone
    pub fn into_execution(self) -> Self {
        match self {
            Error::Execution(_) => self,
            err => Error::Execution(Box::new(err)),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::Io(value.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(value: csv::Error) -> Self {
        Error::Io(value.to_string())
    }
}

impl From<regex::Error> for Error {
    fn from(value: regex::Error) -> Self {
        Error::Parse(format!("invalid LIKE pattern: {}", value))
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn test_execution_wraps_once() {
        let err = Error::Field("age".into()).into_execution();
        assert_eq!(err.to_string(), "Error executing query: invalid field: age");

        let again = err.clone().into_execution();
        assert_eq!(again, err);
    }
}
