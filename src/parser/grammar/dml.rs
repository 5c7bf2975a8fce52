//! Loose grammar for bulk statements. Rewrite passes never restructure
//! these, so only the range alias is recovered; the rest stays a token run.

use crate::error::OqlResult;
use crate::parser::ast::RawStatement;

use super::Cursor;

pub(super) fn parse_update(cur: &mut Cursor<'_>) -> OqlResult<RawStatement> {
    let start = cur.pos();
    cur.expect_word("update")?;
    cur.collect_path("entity name")?;
    let alias = cur.eat_alias()?;
    cur.collect_run(&[])?;
    Ok(RawStatement {
        tokens: cur.slice(start, cur.pos()).to_vec(),
        alias,
    })
}

pub(super) fn parse_delete(cur: &mut Cursor<'_>) -> OqlResult<RawStatement> {
    let start = cur.pos();
    cur.expect_word("delete")?;
    cur.eat_word("from");
    cur.collect_path("entity name")?;
    let alias = cur.eat_alias()?;
    cur.collect_run(&[])?;
    Ok(RawStatement {
        tokens: cur.slice(start, cur.pos()).to_vec(),
        alias,
    })
}

pub(super) fn parse_insert(cur: &mut Cursor<'_>) -> OqlResult<RawStatement> {
    let start = cur.pos();
    cur.bump();
    cur.collect_run(&[])?;
    Ok(RawStatement {
        tokens: cur.slice(start, cur.pos()).to_vec(),
        alias: None,
    })
}
