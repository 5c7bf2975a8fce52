//! Clause-level grammar: select statements, range declarations and joins,
//! `WITH` clauses and trailing set operations.

use crate::error::OqlResult;
use crate::parser::ast::{
    CommonTableExpression, FromClause, JoinDeclaration, JoinKind, SelectStatement, SetOperation,
    WithClause,
};
use crate::transform::Dialect;

use super::{expressions, Cursor};

pub(super) fn parse_with_clause(cur: &mut Cursor<'_>) -> OqlResult<WithClause> {
    let start = cur.pos();
    cur.expect_word("with")?;
    cur.eat_word("recursive");

    let mut items = Vec::new();
    loop {
        let name_token = match cur.peek() {
            Some(t) if t.kind == crate::parser::tokens::TokenKind::Word => cur.bump(),
            _ => return Err(cur.error("common table expression name")),
        };

        // Optional column list.
        if cur.peek().is_some_and(|t| t.is_punct("(")) {
            cur.collect_group()?;
        }

        cur.expect_word("as")?;
        if cur.eat_word("not").is_some() {
            cur.expect_word("materialized")?;
        } else {
            cur.eat_word("materialized");
        }

        let group = cur.collect_group()?;
        let body = group[1..group.len() - 1].to_vec();
        items.push(CommonTableExpression {
            name: name_token.text,
            body,
        });

        if cur.peek().is_some_and(|t| t.is_punct(",")) {
            cur.bump();
        } else {
            break;
        }
    }

    Ok(WithClause {
        tokens: cur.slice(start, cur.pos()).to_vec(),
        items,
    })
}

pub(super) fn parse_select_statement(
    cur: &mut Cursor<'_>,
    dialect: Dialect,
) -> OqlResult<SelectStatement> {
    let select = expressions::parse_select_clause(cur)?;

    let from = if cur.at_word("from") {
        Some(parse_from_clause(cur)?)
    } else {
        None
    };

    let where_clause = if cur.at_boundary_word("where") {
        let mut run = vec![cur.bump()];
        run.extend(cur.collect_run(&["group", "having", "order", "union", "except", "intersect"])?);
        Some(run)
    } else {
        None
    };

    let group_by = if cur.at_boundary_word("group") {
        let mut run = vec![cur.bump(), cur.bump()];
        run.extend(cur.collect_run(&["having", "order", "union", "except", "intersect"])?);
        Some(run)
    } else {
        None
    };

    let having = if cur.at_boundary_word("having") {
        let mut run = vec![cur.bump()];
        run.extend(cur.collect_run(&["order", "union", "except", "intersect"])?);
        Some(run)
    } else {
        None
    };

    let mut set_ops = Vec::new();
    while cur.at_boundary_word("union")
        || cur.at_boundary_word("except")
        || cur.at_boundary_word("intersect")
    {
        if dialect == Dialect::Strict {
            return Err(cur.error("end of query (the strict dialect has no set operations)"));
        }
        let mut operator = vec![cur.bump()];
        if cur.at_word("all") || cur.at_word("distinct") {
            operator.push(cur.bump());
        }
        let body = if cur.peek().is_some_and(|t| t.is_punct("(")) {
            cur.collect_group()?
        } else {
            if !cur.at_word("select") {
                return Err(cur.error("select body after set operator"));
            }
            cur.collect_run(&["union", "except", "intersect", "order"])?
        };
        set_ops.push(SetOperation { operator, body });
    }

    let order_by = if cur.at_boundary_word("order") {
        let mut run = vec![cur.bump(), cur.bump()];
        run.extend(cur.collect_run(&[])?);
        Some(run)
    } else {
        None
    };

    Ok(SelectStatement {
        select,
        from,
        where_clause,
        group_by,
        having,
        set_ops,
        order_by,
    })
}

fn is_join_start(cur: &Cursor<'_>) -> bool {
    if cur.prev().is_some_and(|t| t.is_punct(".")) {
        return false;
    }
    if cur.at_word("join") {
        return true;
    }
    if cur.at_word("inner") || cur.at_word("cross") {
        return cur.nth(1).is_some_and(|t| t.is_word("join"));
    }
    // `left`/`right`/`full` are also plain function names; only treat them
    // as joins when `join` (or `outer join`) actually follows.
    if cur.at_word("left") || cur.at_word("right") || cur.at_word("full") {
        return cur.nth(1).is_some_and(|t| t.is_word("join"))
            || (cur.nth(1).is_some_and(|t| t.is_word("outer"))
                && cur.nth(2).is_some_and(|t| t.is_word("join")));
    }
    false
}

fn parse_from_clause(cur: &mut Cursor<'_>) -> OqlResult<FromClause> {
    let start = cur.pos();
    cur.expect_word("from")?;

    let root_alias = parse_range_declaration(cur)?;

    // After the first declaration, a comma may introduce either another
    // range declaration or a further join declaration.
    let mut joins = Vec::new();
    let mut fetch_indices = Vec::new();
    loop {
        if cur.peek().is_some_and(|t| t.is_punct(",")) {
            cur.bump();
            if is_join_start(cur) {
                joins.push(parse_join_declaration(cur, start, &mut fetch_indices)?);
            } else {
                parse_range_declaration(cur)?;
            }
        } else if is_join_start(cur) {
            joins.push(parse_join_declaration(cur, start, &mut fetch_indices)?);
        } else {
            break;
        }
    }

    Ok(FromClause {
        tokens: cur.slice(start, cur.pos()).to_vec(),
        root_alias,
        joins,
        fetch_indices,
    })
}

/// One join declaration, already sighted by `is_join_start`. `from_start`
/// anchors fetch indices to the start of the from clause.
fn parse_join_declaration(
    cur: &mut Cursor<'_>,
    from_start: usize,
    fetch_indices: &mut Vec<usize>,
) -> OqlResult<JoinDeclaration> {
    let kind = if cur.eat_word("inner").is_some() {
        JoinKind::Inner
    } else if cur.eat_word("left").is_some() {
        cur.eat_word("outer");
        JoinKind::Left
    } else if cur.eat_word("right").is_some() {
        cur.eat_word("outer");
        JoinKind::Right
    } else if cur.eat_word("full").is_some() {
        cur.eat_word("outer");
        JoinKind::Full
    } else if cur.eat_word("cross").is_some() {
        JoinKind::Cross
    } else {
        JoinKind::Inner
    };
    cur.expect_word("join")?;

    let fetch = if cur.at_word("fetch") {
        fetch_indices.push(cur.pos() - from_start);
        cur.bump();
        true
    } else {
        false
    };

    let mut path = cur.collect_path("join target")?;
    // `treat(u as Admin)` and other function-shaped targets.
    if cur.peek().is_some_and(|t| t.is_punct("(")) {
        path.extend(cur.collect_group()?);
    }
    let alias = cur.eat_alias()?;

    if cur.eat_word("on").is_some() {
        cur.collect_run(&[
            "where", "group", "having", "order", "union", "except", "intersect", "join", "left",
            "right", "full", "inner", "cross",
        ])?;
    }

    Ok(JoinDeclaration {
        kind,
        fetch,
        path,
        alias,
    })
}

/// One range declaration: an entity path (or parenthesized sub-select) with
/// an optional alias. Returns the alias.
fn parse_range_declaration(cur: &mut Cursor<'_>) -> OqlResult<Option<String>> {
    if cur.peek().is_some_and(|t| t.is_punct("(")) {
        cur.collect_group()?;
    } else {
        cur.collect_path("entity name")?;
        // Derived-table shapes like `function(...)`.
        if cur.peek().is_some_and(|t| t.is_punct("(")) {
            cur.collect_group()?;
        }
    }
    cur.eat_alias()
}
