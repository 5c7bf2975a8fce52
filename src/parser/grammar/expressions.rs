//! Projection grammar: the select clause and its items.

use crate::error::OqlResult;
use crate::parser::ast::{SelectClause, SelectItem};
use crate::parser::tokens::{Token, TokenKind};

use super::{Cursor, CLAUSE_BOUNDARIES};

pub(super) fn parse_select_clause(cur: &mut Cursor<'_>) -> OqlResult<SelectClause> {
    let select_token = cur.expect_word("select")?;
    let distinct = cur.eat_word("distinct");

    let mut items = vec![parse_select_item(cur)?];
    while cur.peek().is_some_and(|t| t.is_punct(",")) {
        cur.bump();
        items.push(parse_select_item(cur)?);
    }

    Ok(SelectClause {
        select_token,
        distinct,
        items,
    })
}

fn parse_select_item(cur: &mut Cursor<'_>) -> OqlResult<SelectItem> {
    let run = collect_item_run(cur)?;
    if run.is_empty() {
        return Err(cur.error("select expression"));
    }

    let is_constructor = run[0].is_word("new");

    // Only an explicit `AS alias` is split off; a bare trailing word stays
    // part of the expression (`case ... end`, `a + b`).
    let has_alias = run.len() >= 3
        && run[run.len() - 2].is_word("as")
        && run[run.len() - 1].kind == TokenKind::Word;

    let (tokens, alias_tokens, alias) = if has_alias {
        let alias_token = run[run.len() - 1].clone();
        let as_token = run[run.len() - 2].clone();
        let expr = run[..run.len() - 2].to_vec();
        let alias = alias_token.text.clone();
        (expr, Some(vec![as_token, alias_token]), Some(alias))
    } else {
        (run, None, None)
    };

    Ok(SelectItem {
        tokens,
        alias_tokens,
        alias,
        is_constructor,
    })
}

/// A balanced run terminated by a top-level comma, the `FROM` keyword, a
/// clause boundary or a stray closing parenthesis.
fn collect_item_run(cur: &mut Cursor<'_>) -> OqlResult<Vec<Token>> {
    let mut run = Vec::new();
    let mut depth = 0usize;

    while let Some(token) = cur.peek() {
        if depth == 0 {
            if token.is_punct(",") || token.is_punct(")") {
                break;
            }
            if cur.at_boundary_word("from")
                || CLAUSE_BOUNDARIES.iter().any(|stop| cur.at_boundary_word(stop))
            {
                break;
            }
        }
        if token.is_punct("(") {
            depth += 1;
        } else if token.is_punct(")") {
            depth -= 1;
        }
        run.push(cur.bump());
    }

    if depth > 0 {
        return Err(cur.error("closing parenthesis"));
    }
    Ok(run)
}
