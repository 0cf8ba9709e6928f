//! Error types for mysqldef.

use thiserror::Error;

/// The main error type for mysqldef operations.
#[derive(Debug, Error)]
pub enum DefError {
    /// Malformed or unsupported DDL, either in the desired schema or in
    /// the DDL returned by the server.
    #[error("Parse error at line {line}: {message}\n  in: {statement}")]
    Parse {
        line: usize,
        statement: String,
        message: String,
    },

    /// The database could not be reached or refused the credentials.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The server rejected a planned statement.
    #[error("Execution error: {message}\n  in: {statement}")]
    Execution { statement: String, message: String },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DefError {
    /// Create a parse error for the statement starting at `line`.
    pub fn parse(line: usize, statement: impl AsRef<str>, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            statement: abbreviate(statement.as_ref()),
            message: message.into(),
        }
    }

    /// Create an execution error for a statement the server refused.
    pub fn execution(statement: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution {
            statement: statement.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for mysqldef operations.
pub type DefResult<T> = Result<T, DefError>;

/// Keep parse errors readable when the statement is a long CREATE TABLE.
fn abbreviate(statement: &str) -> String {
    const MAX: usize = 120;
    let flat: String = statement.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= MAX {
        flat
    } else {
        let head: String = flat.chars().take(MAX).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DefError::parse(3, "CREATE TABLE users (\n  id int,\n)", "trailing comma");
        assert_eq!(
            err.to_string(),
            "Parse error at line 3: trailing comma\n  in: CREATE TABLE users ( id int, )"
        );
    }

    #[test]
    fn test_long_statement_is_abbreviated() {
        let long = format!("CREATE TABLE t ({})", "a int, ".repeat(40));
        let err = DefError::parse(1, &long, "boom");
        match err {
            DefError::Parse { statement, .. } => {
                assert!(statement.ends_with("..."));
                assert_eq!(statement.chars().count(), 123);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
