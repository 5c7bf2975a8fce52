//! Constructor (DTO) projection rewriting.

use crate::analysis::QueryInformation;
use crate::error::OqlResult;
use crate::parser::ast::ParsedQuery;
use crate::render::{render_tokens, QueryStream};

use super::{statement_stream, tail_stream, with_stream};

/// Wrap a flat selection list in a `new <target_type>(...)` constructor.
///
/// No-op when the query already projects through a constructor, when the
/// select feeds a set operation, or when the statement is not a select at
/// all. A projection that is just the primary alias expands to one
/// `alias.<name>` argument per constructor parameter.
pub(super) fn rewrite(
    parsed: &ParsedQuery,
    info: &QueryInformation,
    target_type: &str,
    parameter_names: &[&str],
) -> OqlResult<String> {
    let unchanged = || Ok(statement_stream(parsed).render());

    let Some(select) = parsed.as_select() else {
        return unchanged();
    };
    if info.has_constructor_expression || !select.set_ops.is_empty() {
        return unchanged();
    }

    let items = &select.select.items;

    let mut stream = with_stream(parsed);
    stream.append(QueryStream::tokens_with_leading(
        std::slice::from_ref(&select.select.select_token),
        parsed.with.is_some(),
    ));
    if let Some(distinct) = &select.select.distinct {
        stream.append(QueryStream::tokens_with_leading(
            std::slice::from_ref(distinct),
            true,
        ));
    }
    stream.append(QueryStream::word("new"));
    stream.append(QueryStream::word(target_type));
    stream.append(QueryStream::glue("("));

    let alias_only_projection = items.len() == 1
        && info
            .alias
            .as_deref()
            .is_some_and(|alias| render_tokens(&items[0].tokens) == alias);

    if alias_only_projection {
        let alias = info.alias.as_deref().unwrap_or_default();
        for (index, name) in parameter_names.iter().enumerate() {
            if index > 0 {
                stream.append(QueryStream::glue(","));
                stream.append(QueryStream::word(format!("{alias}.{name}")));
            } else {
                stream.append(QueryStream::glue(format!("{alias}.{name}")));
            }
        }
    } else {
        for (index, item) in items.iter().enumerate() {
            if index > 0 {
                stream.append(QueryStream::glue(","));
            }
            stream.append(QueryStream::tokens_with_leading(&item.tokens, index > 0));
        }
    }

    stream.append(QueryStream::glue(")"));
    stream.append(tail_stream(select, true));
    Ok(stream.render())
}
