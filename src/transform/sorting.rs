//! Sort injection: appending or extending an `order by` clause.

use crate::analysis::QueryInformation;
use crate::error::{OqlError, OqlResult};
use crate::parser::ast::ParsedQuery;
use crate::render::QueryStream;
use crate::sort::{Order, Sort};

use super::{select_stream, statement_stream, with_stream};

/// Apply `sort` to a grammar-parsed query. An existing top-level `order by`
/// is preserved and extended; otherwise a new clause is appended after all
/// trailing clauses.
pub(super) fn apply(
    parsed: &ParsedQuery,
    info: &QueryInformation,
    sort: &Sort,
) -> OqlResult<String> {
    // Terms are validated before any rendering happens.
    let terms = order_terms(sort, info)?;
    if terms.is_empty() {
        return Ok(statement_stream(parsed).render());
    }

    let Some(select) = parsed.as_select() else {
        return Err(OqlError::syntax(0, "select statement", "bulk statement"));
    };

    let mut stream = with_stream(parsed);
    stream.append(select_stream(select, true));
    let mut first_is_new_clause = false;
    if select.order_by.is_none() {
        stream.append(QueryStream::word("order"));
        stream.append(QueryStream::word("by"));
        first_is_new_clause = true;
    }
    for (index, term) in terms.iter().enumerate() {
        if index > 0 || !first_is_new_clause {
            stream.append(QueryStream::glue(","));
        }
        stream.append(QueryStream::word(term.clone()));
    }
    Ok(stream.render())
}

/// Render every order of `sort` into its textual term, in order.
pub(super) fn order_terms(sort: &Sort, info: &QueryInformation) -> OqlResult<Vec<String>> {
    sort.iter().map(|order| order_term(order, info)).collect()
}

/// One `<reference> <direction>` term.
///
/// Reference resolution: a selection alias is used bare; a path whose first
/// segment is a join alias is used verbatim; function-call text is never
/// prefixed; everything else is qualified with the primary alias.
fn order_term(order: &Order, info: &QueryInformation) -> OqlResult<String> {
    let property = order.property.trim();

    if !order.unchecked
        && (property.contains(char::is_whitespace)
            || property.contains('(')
            || property.contains(')'))
    {
        return Err(OqlError::UnsafeSortExpression(property.to_string()));
    }

    let first_segment = property.split('.').next().unwrap_or(property);
    let reference = if info.function_aliases.contains(property) {
        property.to_string()
    } else if info.join_aliases.contains(first_segment) {
        property.to_string()
    } else if property.contains('(') {
        property.to_string()
    } else {
        match &info.alias {
            Some(alias) if first_segment != alias => format!("{alias}.{property}"),
            _ => property.to_string(),
        }
    };

    let reference = if order.ignore_case {
        format!("lower({reference})")
    } else {
        reference
    };

    Ok(format!("{reference} {}", order.direction.keyword()))
}
