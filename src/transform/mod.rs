//! Dialect selection and the rewrite passes behind it.
//!
//! A [`QueryEnhancer`] bundles one analyzed query with the three rewrite
//! passes: count derivation, sort injection and constructor projection.
//! The strict and extended dialects share a grammar-backed implementation;
//! the portable dialect works on tolerant token patterns without a grammar,
//! so malformed-but-runnable SQL still gets sorted and counted.

mod count;
mod dto;
mod pattern;
mod sorting;

use serde::{Deserialize, Serialize};

use crate::analysis::{self, QueryInformation};
use crate::error::OqlResult;
use crate::parser::ast::{FromClause, ParsedQuery, SelectStatement, Statement};
use crate::parser::parse_dialect;
use crate::parser::tokens::Token;
use crate::render::QueryStream;
use crate::sort::Sort;

/// The accepted surface grammars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dialect {
    /// The conservative grammar: no `WITH` clauses, no set operations.
    Strict,
    /// The permissive grammar, accepting `WITH` and set operations.
    Extended,
    /// A portable SQL-like subset, analyzed by token patterns instead of a
    /// grammar.
    Portable,
}

/// One analyzed query plus the rewrite passes over it.
pub trait QueryEnhancer {
    /// The original query text.
    fn query(&self) -> &str;

    /// Structural metadata for the query.
    fn information(&self) -> &QueryInformation;

    /// Append or extend the `order by` clause per `sort`.
    fn apply_sorting(&self, sort: &Sort) -> OqlResult<String>;

    /// Derive the row-counting variant, optionally with an explicit count
    /// projection.
    fn derive_count_query(&self, projection: Option<&str>) -> OqlResult<String>;

    /// Rewrite a flat selection list into a `new Type(...)` constructor
    /// expression.
    fn rewrite_projection(&self, target_type: &str, parameter_names: &[&str])
        -> OqlResult<String>;

    /// Apply sorting, then hand the result to an external rewriter.
    fn apply_sorting_rewritten(
        &self,
        sort: &Sort,
        rewriter: &dyn QueryRewriter,
    ) -> OqlResult<String> {
        Ok(rewriter.rewrite(&self.apply_sorting(sort)?, sort))
    }
}

/// External collaborator invoked after the built-in passes.
pub trait QueryRewriter {
    fn rewrite(&self, query: &str, sort: &Sort) -> String;
}

/// Pick the enhancer implementation for a dialect.
pub fn enhancer_for(query: &str, dialect: Dialect) -> OqlResult<Box<dyn QueryEnhancer>> {
    match dialect {
        Dialect::Portable => Ok(Box::new(pattern::PatternQueryEnhancer::new(query)?)),
        Dialect::Strict | Dialect::Extended => {
            Ok(Box::new(ParsedQueryEnhancer::new(query, dialect)?))
        }
    }
}

/// Grammar-backed enhancer shared by the strict and extended dialects.
pub struct ParsedQueryEnhancer {
    query: String,
    parsed: ParsedQuery,
    info: QueryInformation,
}

impl ParsedQueryEnhancer {
    pub fn new(query: &str, dialect: Dialect) -> OqlResult<Self> {
        let parsed = parse_dialect(query, dialect)?;
        let info = analysis::analyze(&parsed);
        Ok(ParsedQueryEnhancer {
            query: query.to_string(),
            parsed,
            info,
        })
    }
}

impl QueryEnhancer for ParsedQueryEnhancer {
    fn query(&self) -> &str {
        &self.query
    }

    fn information(&self) -> &QueryInformation {
        &self.info
    }

    fn apply_sorting(&self, sort: &Sort) -> OqlResult<String> {
        sorting::apply(&self.parsed, &self.info, sort)
    }

    fn derive_count_query(&self, projection: Option<&str>) -> OqlResult<String> {
        count::derive(&self.parsed, &self.info, projection)
    }

    fn rewrite_projection(
        &self,
        target_type: &str,
        parameter_names: &[&str],
    ) -> OqlResult<String> {
        dto::rewrite(&self.parsed, &self.info, target_type, parameter_names)
    }
}

/// Re-assemble a parsed query into a stream, `order by` included.
pub(crate) fn statement_stream(parsed: &ParsedQuery) -> QueryStream {
    let mut stream = with_stream(parsed);
    match &parsed.statement {
        Statement::Select(select) => {
            stream.append(select_stream(select, true));
        }
        Statement::Update(raw) | Statement::Delete(raw) | Statement::Insert(raw) => {
            stream.append(QueryStream::tokens(&raw.tokens));
        }
    }
    stream
}

/// The `WITH` prefix of a query, or an empty stream.
pub(crate) fn with_stream(parsed: &ParsedQuery) -> QueryStream {
    match &parsed.with {
        Some(with) => QueryStream::tokens(&with.tokens),
        None => QueryStream::Empty,
    }
}

/// Re-assemble a select statement, optionally without its `order by`.
pub(crate) fn select_stream(select: &SelectStatement, include_order: bool) -> QueryStream {
    let mut stream = QueryStream::tokens(std::slice::from_ref(&select.select.select_token));
    if let Some(distinct) = &select.select.distinct {
        stream.append(QueryStream::tokens(std::slice::from_ref(distinct)));
    }
    for (index, item) in select.select.items.iter().enumerate() {
        if index > 0 {
            stream.append(QueryStream::glue(","));
        }
        stream.append(QueryStream::tokens_with_leading(&item.tokens, true));
        if let Some(alias_tokens) = &item.alias_tokens {
            stream.append(QueryStream::tokens_with_leading(alias_tokens, true));
        }
    }
    stream.append(tail_stream(select, include_order));
    stream
}

/// Everything after the selection list: from clause through set operations,
/// optionally the `order by`.
pub(crate) fn tail_stream(select: &SelectStatement, include_order: bool) -> QueryStream {
    let mut stream = QueryStream::Empty;
    if let Some(from) = &select.from {
        stream.append(QueryStream::tokens_with_leading(&from.tokens, true));
    }
    for run in [&select.where_clause, &select.group_by, &select.having]
        .into_iter()
        .flatten()
    {
        stream.append(QueryStream::tokens_with_leading(run, true));
    }
    for set_op in &select.set_ops {
        stream.append(QueryStream::tokens_with_leading(&set_op.operator, true));
        stream.append(QueryStream::tokens_with_leading(&set_op.body, true));
    }
    if include_order {
        if let Some(order_by) = &select.order_by {
            stream.append(QueryStream::tokens_with_leading(order_by, true));
        }
    }
    stream
}

/// The from-clause tokens with every `fetch` keyword removed.
pub(crate) fn from_without_fetch(from: &FromClause) -> Vec<Token> {
    from.tokens
        .iter()
        .enumerate()
        .filter(|(index, _)| !from.fetch_indices.contains(index))
        .map(|(_, token)| token.clone())
        .collect()
}
