//! Count-query derivation for grammar-parsed queries.

use crate::analysis::QueryInformation;
use crate::error::{OqlError, OqlResult};
use crate::parser::ast::{ParsedQuery, SelectItem, SelectStatement};
use crate::render::QueryStream;

use super::{from_without_fetch, tail_stream, with_stream};

/// Derive the row-counting variant of `parsed`.
///
/// The original `select` keyword token is kept so its casing survives;
/// `join fetch` degrades to `join` and any trailing `order by` is dropped.
/// A query already shaped `select count(...)` comes back as an equivalent
/// count query, never double-wrapped.
pub(super) fn derive(
    parsed: &ParsedQuery,
    info: &QueryInformation,
    projection: Option<&str>,
) -> OqlResult<String> {
    let Some(select) = parsed.as_select() else {
        return Err(OqlError::syntax(
            0,
            "select statement",
            "bulk statement",
        ));
    };

    let mut stream = with_stream(parsed);
    stream.append(QueryStream::tokens_with_leading(
        std::slice::from_ref(&select.select.select_token),
        parsed.with.is_some(),
    ));
    stream.append(count_projection(select, info, projection)?);
    stream.append(count_tail(select));
    Ok(stream.render())
}

fn count_projection(
    select: &SelectStatement,
    info: &QueryInformation,
    projection: Option<&str>,
) -> OqlResult<QueryStream> {
    if let Some(projection) = projection {
        return Ok(wrap_in_count(QueryStream::glue(projection.trim().to_string())));
    }

    let items = &select.select.items;
    let distinct = select.select.distinct.is_some();

    // Idempotence: a projection that already is a count expression is kept.
    if !distinct && items.len() == 1 && is_count_call(&items[0]) {
        return Ok(QueryStream::tokens_with_leading(&items[0].tokens, true));
    }

    if items.iter().any(|item| item.is_constructor) || (items.len() > 1 && distinct) {
        // Constructor and distinct multi-column projections count the rows
        // of the primary range declaration.
        let alias = primary_alias(info)?;
        let mut inner = QueryStream::Empty;
        if distinct {
            inner.append(QueryStream::glue("distinct"));
            inner.append(QueryStream::word(alias));
        } else {
            inner.append(QueryStream::glue(alias));
        }
        return Ok(wrap_in_count(inner));
    }

    if distinct {
        let mut inner = QueryStream::glue("distinct");
        inner.append(items_stream(items, true));
        return Ok(wrap_in_count(inner));
    }

    if items.len() == 1 {
        return Ok(wrap_in_count(items_stream(items, false)));
    }

    let alias = primary_alias(info)?;
    Ok(wrap_in_count(QueryStream::glue(alias)))
}

fn count_tail(select: &SelectStatement) -> QueryStream {
    let mut stream = QueryStream::Empty;
    if let Some(from) = &select.from {
        stream.append(QueryStream::tokens_with_leading(
            &from_without_fetch(from),
            true,
        ));
        let mut rest = select.clone();
        rest.from = None;
        stream.append(tail_stream(&rest, false));
    } else {
        stream.append(tail_stream(select, false));
    }
    stream
}

fn wrap_in_count(inner: QueryStream) -> QueryStream {
    let mut stream = QueryStream::word("count");
    stream.append(QueryStream::glue("("));
    stream.append(inner);
    stream.append(QueryStream::glue(")"));
    stream
}

fn is_count_call(item: &SelectItem) -> bool {
    item.tokens.first().is_some_and(|t| t.is_word("count"))
        && item.tokens.get(1).is_some_and(|t| t.is_punct("("))
}

/// The selection list without aliases. `spaced_first` controls whether the
/// first expression is space-separated from what precedes it.
fn items_stream(items: &[SelectItem], spaced_first: bool) -> QueryStream {
    let mut stream = QueryStream::Empty;
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            stream.append(QueryStream::glue(","));
        }
        stream.append(QueryStream::tokens_with_leading(
            &item.tokens,
            index > 0 || spaced_first,
        ));
    }
    stream
}

fn primary_alias(info: &QueryInformation) -> OqlResult<&str> {
    info.alias
        .as_deref()
        .ok_or(OqlError::MissingAlias(
            "the count projection needs an aliased range declaration",
        ))
}
