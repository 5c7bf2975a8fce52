//! Grammar-driven parser for the object-query dialects.
//!
//! The parser is a recursive descent over the token stream produced by
//! [`tokens::tokenize`]. It recovers the clause structure a rewrite pass
//! needs (projection, range declarations, joins, trailing `order by`) while
//! keeping everything else as balanced token runs, so untouched regions
//! re-render exactly.
//!
//! Reserved words are not reserved for identifiers: a path segment or alias
//! may be called `value`, `type`, `date`, `order` and so on; only a word in
//! clause-starting position terminates a clause.

pub mod ast;
pub mod tokens;

mod grammar;

#[cfg(test)]
mod tests;

use crate::error::OqlResult;
use crate::transform::Dialect;
use ast::ParsedQuery;

/// Parse a query using the extended dialect, the most permissive grammar.
pub fn parse(input: &str) -> OqlResult<ParsedQuery> {
    parse_dialect(input, Dialect::Extended)
}

/// Parse a query under a specific dialect grammar.
///
/// The strict dialect rejects leading `WITH` clauses and set operations;
/// the extended dialect accepts them. The portable dialect is not grammar
/// checked and must not be passed here; use
/// [`crate::transform::enhancer_for`] instead.
pub fn parse_dialect(input: &str, dialect: Dialect) -> OqlResult<ParsedQuery> {
    let tokens = tokens::tokenize(input)?;
    grammar::parse_query(&tokens, dialect)
}
