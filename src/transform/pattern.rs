//! The portable dialect: tolerant token-pattern analysis without a grammar.
//!
//! Portable queries are not parsed into a tree; the enhancer scans the
//! token stream for the handful of landmarks the rewrite passes need
//! (top-level `select`/`from`/`order by`, join declarations, the primary
//! alias). Sorting appends to the original text byte-for-byte; count
//! derivation falls back to `count(1)` when no alias exists.

use std::collections::BTreeSet;

use crate::analysis::{QueryInformation, StatementKind};
use crate::error::OqlResult;
use crate::parser::tokens::{tokenize, Token, TokenKind};
use crate::render::QueryStream;
use crate::sort::Sort;

use super::{sorting, QueryEnhancer};

const ALIAS_STOP_WORDS: &[&str] = &[
    "where", "group", "having", "order", "union", "except", "intersect", "join", "left", "right",
    "full", "inner", "outer", "cross", "on", "fetch", "set", "limit", "offset",
];

pub(super) struct PatternQueryEnhancer {
    query: String,
    tokens: Vec<Token>,
    info: QueryInformation,
}

impl PatternQueryEnhancer {
    pub(super) fn new(query: &str) -> OqlResult<Self> {
        let tokens = tokenize(query)?;
        let info = analyze(&tokens);
        Ok(PatternQueryEnhancer {
            query: query.to_string(),
            tokens,
            info,
        })
    }

    /// Index range of the selection list: past `select [distinct]`, up to
    /// the top-level `from`.
    fn projection_span(&self) -> Option<(usize, usize)> {
        let select = top_level_position(&self.tokens, 0, "select")?;
        let from = top_level_position(&self.tokens, select + 1, "from")?;
        let mut start = select + 1;
        if self.tokens.get(start).is_some_and(|t| t.is_word("distinct")) {
            start += 1;
        }
        Some((start, from))
    }

    fn is_distinct(&self) -> bool {
        top_level_position(&self.tokens, 0, "select")
            .and_then(|i| self.tokens.get(i + 1))
            .is_some_and(|t| t.is_word("distinct"))
    }

    /// Byte offset where a trailing top-level `order by` starts, if any.
    fn order_by_offset(&self) -> Option<usize> {
        let index = top_level_order_by(&self.tokens)?;
        Some(self.tokens[index].position)
    }
}

impl QueryEnhancer for PatternQueryEnhancer {
    fn query(&self) -> &str {
        &self.query
    }

    fn information(&self) -> &QueryInformation {
        &self.info
    }

    fn apply_sorting(&self, sort: &Sort) -> OqlResult<String> {
        let terms = sorting::order_terms(sort, &self.info)?;
        if terms.is_empty() {
            return Ok(self.query.clone());
        }
        // The original text is preserved byte-for-byte; terms are appended.
        if top_level_order_by(&self.tokens).is_some() {
            Ok(format!("{}, {}", self.query.trim_end(), terms.join(", ")))
        } else {
            Ok(format!(
                "{} order by {}",
                self.query.trim_end(),
                terms.join(", ")
            ))
        }
    }

    fn derive_count_query(&self, projection: Option<&str>) -> OqlResult<String> {
        let Some((start, from)) = self.projection_span() else {
            // No recognizable select/from shape; count the whole thing.
            return Ok(format!("select count(1) from ({}) x", self.query.trim()));
        };

        let variant = match projection {
            Some(explicit) => explicit.trim().to_string(),
            None => {
                let items = &self.tokens[start..from];
                if self.is_distinct() {
                    match &self.info.alias {
                        Some(alias) => format!("distinct {alias}"),
                        None => format!("distinct {}", render_span(items)),
                    }
                } else if top_level_comma(items) || self.info.has_constructor_expression {
                    self.info.alias.clone().unwrap_or_else(|| "1".to_string())
                } else if is_count_call(items) {
                    // Already a count query.
                    return Ok(self.query.trim().to_string());
                } else {
                    render_span(items)
                }
            }
        };

        let mut stream = QueryStream::word("select");
        stream.append(QueryStream::word("count"));
        stream.append(QueryStream::glue("("));
        stream.append(QueryStream::glue(variant));
        stream.append(QueryStream::glue(")"));
        stream.append(tail_without_fetch_and_order(&self.tokens[from..]));
        Ok(stream.render())
    }

    fn rewrite_projection(
        &self,
        target_type: &str,
        _parameter_names: &[&str],
    ) -> OqlResult<String> {
        let Some((start, from)) = self.projection_span() else {
            return Ok(self.query.clone());
        };
        if self.info.has_constructor_expression {
            return Ok(self.query.clone());
        }
        // Splice the constructor around the original projection text.
        let head = &self.query[..self.tokens[start].position];
        let projection = render_span(&self.tokens[start..from]);
        let tail = &self.query[self.tokens[from].position..];
        Ok(format!("{head}new {target_type}({projection}) {tail}"))
    }
}

/// Derive query information from token patterns alone.
fn analyze(tokens: &[Token]) -> QueryInformation {
    let statement = match tokens.first() {
        Some(t) if t.is_word("update") => StatementKind::Update,
        Some(t) if t.is_word("delete") => StatementKind::Delete,
        Some(t) if t.is_word("insert") || t.is_word("merge") => StatementKind::Insert,
        _ => StatementKind::Select,
    };

    let select = top_level_position(tokens, 0, "select");
    let from = select.and_then(|s| top_level_position(tokens, s + 1, "from"));

    let mut projection = String::new();
    let mut function_aliases = BTreeSet::new();
    let mut has_constructor = false;
    if let (Some(select), Some(from)) = (select, from) {
        let mut start = select + 1;
        if tokens.get(start).is_some_and(|t| t.is_word("distinct")) {
            start += 1;
        }
        let items = &tokens[start..from];
        projection = render_span(items);
        has_constructor = items.iter().any(|t| t.is_word("new"));

        let mut depth = 0usize;
        for (i, token) in items.iter().enumerate() {
            if token.is_punct("(") {
                depth += 1;
            } else if token.is_punct(")") {
                depth = depth.saturating_sub(1);
            } else if depth == 0 && token.is_word("as") {
                if let Some(alias) = items.get(i + 1).filter(|t| t.kind == TokenKind::Word) {
                    function_aliases.insert(alias.text.clone());
                }
            }
        }
    }

    let alias = from.and_then(|f| alias_after(tokens, f));
    let join_aliases = join_aliases(tokens);

    QueryInformation {
        alias,
        statement,
        projection,
        join_aliases,
        function_aliases,
        has_constructor_expression: has_constructor,
    }
}

/// The alias following a range declaration at `from_index`.
fn alias_after(tokens: &[Token], from_index: usize) -> Option<String> {
    let mut i = from_index + 1;
    // Entity path, possibly dotted or schema qualified.
    if !tokens.get(i).is_some_and(|t| t.kind == TokenKind::Word) {
        return None;
    }
    i += 1;
    while tokens.get(i).is_some_and(|t| t.is_punct(".")) {
        i += 2;
    }
    if tokens.get(i).is_some_and(|t| t.is_word("as")) {
        i += 1;
    }
    tokens
        .get(i)
        .filter(|t| t.kind == TokenKind::Word && !ALIAS_STOP_WORDS.iter().any(|kw| t.is_word(kw)))
        .map(|t| t.text.clone())
}

fn join_aliases(tokens: &[Token]) -> BTreeSet<String> {
    let mut aliases = BTreeSet::new();
    for (i, token) in tokens.iter().enumerate() {
        if !token.is_word("join") || (i > 0 && tokens[i - 1].is_punct(".")) {
            continue;
        }
        let mut j = i + 1;
        if tokens.get(j).is_some_and(|t| t.is_word("fetch")) {
            j += 1;
        }
        if !tokens.get(j).is_some_and(|t| t.kind == TokenKind::Word) {
            continue;
        }
        j += 1;
        while tokens.get(j).is_some_and(|t| t.is_punct(".")) {
            j += 2;
        }
        if tokens.get(j).is_some_and(|t| t.is_word("as")) {
            j += 1;
        }
        if let Some(alias) = tokens.get(j).filter(|t| {
            t.kind == TokenKind::Word && !ALIAS_STOP_WORDS.iter().any(|kw| t.is_word(kw))
        }) {
            aliases.insert(alias.text.clone());
        }
    }
    aliases
}

/// First occurrence of `keyword` at parenthesis depth zero, not preceded
/// by `.`, at or after `start`.
fn top_level_position(tokens: &[Token], start: usize, keyword: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate() {
        if token.is_punct("(") {
            depth += 1;
        } else if token.is_punct(")") {
            depth = depth.saturating_sub(1);
        } else if i >= start
            && depth == 0
            && token.is_word(keyword)
            && !(i > 0 && tokens[i - 1].is_punct("."))
        {
            return Some(i);
        }
    }
    None
}

/// Index of a trailing top-level `order` (of `order by`), if any.
fn top_level_order_by(tokens: &[Token]) -> Option<usize> {
    let mut depth = 0usize;
    let mut found = None;
    for (i, token) in tokens.iter().enumerate() {
        if token.is_punct("(") {
            depth += 1;
        } else if token.is_punct(")") {
            depth = depth.saturating_sub(1);
        } else if depth == 0
            && token.is_word("order")
            && !(i > 0 && tokens[i - 1].is_punct("."))
            && tokens.get(i + 1).is_some_and(|t| t.is_word("by"))
        {
            found = Some(i);
        }
    }
    found
}

fn top_level_comma(tokens: &[Token]) -> bool {
    let mut depth = 0usize;
    for token in tokens {
        if token.is_punct("(") {
            depth += 1;
        } else if token.is_punct(")") {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && token.is_punct(",") {
            return true;
        }
    }
    false
}

fn is_count_call(items: &[Token]) -> bool {
    items.first().is_some_and(|t| t.is_word("count"))
        && items.get(1).is_some_and(|t| t.is_punct("("))
}

fn render_span(tokens: &[Token]) -> String {
    QueryStream::tokens_with_leading(tokens, false).render()
}

/// Everything from the `from` keyword on, with `join fetch` degraded to
/// `join` and any trailing `order by` dropped.
fn tail_without_fetch_and_order(tokens: &[Token]) -> QueryStream {
    let end = top_level_order_by(tokens).unwrap_or(tokens.len());
    let mut kept = Vec::new();
    for (i, token) in tokens[..end].iter().enumerate() {
        if token.is_word("fetch") && i > 0 && tokens[i - 1].is_word("join") {
            continue;
        }
        kept.push(token.clone());
    }
    QueryStream::tokens_with_leading(&kept, true)
}
