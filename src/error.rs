//! Error types for query parsing and rewriting.

use thiserror::Error;

/// The main error type for all parsing, analysis and rewriting operations.
#[derive(Debug, Error)]
pub enum OqlError {
    /// The query text violates the grammar of the selected dialect.
    #[error("Syntax error at position {position}: expected {expected}, found '{found}'")]
    Syntax {
        position: usize,
        expected: String,
        found: String,
    },

    /// A sort property contains whitespace or parentheses without being
    /// marked as an unchecked expression.
    #[error(
        "Sort expression '{0}' must only contain property references or aliases used in the \
         select clause; mark the order as unsafe to sort by arbitrary expressions"
    )]
    UnsafeSortExpression(String),

    /// A malformed or inconsistently styled parameter placeholder.
    #[error("Invalid parameter placeholder: {0}")]
    Parameter(String),

    /// A rewrite pass needed an alias the query does not declare.
    #[error("No primary alias present; {0}")]
    MissingAlias(&'static str),

    /// A builder origin had no alias mapping at render time.
    #[error("Unresolved query origin '{0}' at render time")]
    UnresolvedOrigin(String),
}

impl OqlError {
    /// Create a syntax error at the given position.
    pub fn syntax(position: usize, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::Syntax {
            position,
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create a parameter placeholder error.
    pub fn parameter(message: impl Into<String>) -> Self {
        Self::Parameter(message.into())
    }
}

/// Result type alias for query operations.
pub type OqlResult<T> = Result<T, OqlError>;
