//! Top-level grammar driver and the token cursor shared by the grammar
//! submodules.

mod clauses;
mod dml;
mod expressions;

use crate::error::{OqlError, OqlResult};
use crate::parser::ast::{ParsedQuery, Statement};
use crate::parser::tokens::{Token, TokenKind};
use crate::transform::Dialect;

/// Words that terminate a clause when they occur at nesting depth zero.
pub(crate) const CLAUSE_BOUNDARIES: &[&str] = &[
    "where",
    "group",
    "having",
    "order",
    "union",
    "except",
    "intersect",
];

/// Words that cannot serve as an implicit (no `AS`) alias because they start
/// the next clause or join.
pub(crate) const ALIAS_EXCLUSIONS: &[&str] = &[
    "where",
    "group",
    "having",
    "order",
    "union",
    "except",
    "intersect",
    "join",
    "left",
    "right",
    "full",
    "inner",
    "outer",
    "cross",
    "fetch",
    "on",
    "set",
    "with",
];

pub(crate) struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Cursor { tokens, pos: 0 }
    }

    pub(crate) fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub(crate) fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    pub(crate) fn nth(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    pub(crate) fn prev(&self) -> Option<&Token> {
        self.pos.checked_sub(1).and_then(|i| self.tokens.get(i))
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn slice(&self, start: usize, end: usize) -> &[Token] {
        &self.tokens[start..end]
    }

    pub(crate) fn bump(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        self.pos += 1;
        token
    }

    pub(crate) fn at_word(&self, keyword: &str) -> bool {
        self.peek().is_some_and(|t| t.is_word(keyword))
    }

    pub(crate) fn eat_word(&mut self, keyword: &str) -> Option<Token> {
        if self.at_word(keyword) {
            Some(self.bump())
        } else {
            None
        }
    }

    pub(crate) fn expect_word(&mut self, keyword: &str) -> OqlResult<Token> {
        self.eat_word(keyword)
            .ok_or_else(|| self.error(format!("'{keyword}'")))
    }

    /// Whether the upcoming token is `keyword` in clause-starting position:
    /// at depth zero (caller-tracked) and not a path segment following `.`.
    pub(crate) fn at_boundary_word(&self, keyword: &str) -> bool {
        if !self.at_word(keyword) {
            return false;
        }
        if self.prev().is_some_and(|t| t.is_punct(".")) {
            return false;
        }
        // `group`/`order` only bound a clause when followed by `by`.
        if keyword.eq_ignore_ascii_case("group") || keyword.eq_ignore_ascii_case("order") {
            return self.nth(1).is_some_and(|t| t.is_word("by"));
        }
        true
    }

    pub(crate) fn error(&self, expected: impl Into<String>) -> OqlError {
        match self.peek() {
            Some(token) => OqlError::syntax(token.position, expected, token.text.clone()),
            None => {
                let position = self
                    .tokens
                    .last()
                    .map(|t| t.end())
                    .unwrap_or_default();
                OqlError::syntax(position, expected, "end of query")
            }
        }
    }

    /// Consume a balanced token run until one of `stops` occurs in
    /// clause-starting position at depth zero, a stray closing parenthesis
    /// is seen, or the input ends. Fails on an unclosed parenthesis.
    pub(crate) fn collect_run(&mut self, stops: &[&str]) -> OqlResult<Vec<Token>> {
        let mut run = Vec::new();
        let mut depth = 0usize;

        while let Some(token) = self.peek() {
            if depth == 0 {
                if token.is_punct(")") || token.is_punct("]") {
                    break;
                }
                if stops.iter().any(|stop| self.at_boundary_word(stop)) {
                    break;
                }
            }
            if token.is_punct("(") || token.is_punct("[") {
                depth += 1;
            } else if token.is_punct(")") || token.is_punct("]") {
                depth -= 1;
            }
            run.push(self.bump());
        }

        if depth > 0 {
            return Err(self.error("closing parenthesis"));
        }
        Ok(run)
    }

    /// Consume a parenthesized group including both parentheses.
    pub(crate) fn collect_group(&mut self) -> OqlResult<Vec<Token>> {
        if !self.peek().is_some_and(|t| t.is_punct("(")) {
            return Err(self.error("opening parenthesis"));
        }
        let mut run = vec![self.bump()];
        let mut depth = 1usize;
        while depth > 0 {
            let Some(token) = self.peek() else {
                return Err(self.error("closing parenthesis"));
            };
            if token.is_punct("(") {
                depth += 1;
            } else if token.is_punct(")") {
                depth -= 1;
            }
            run.push(self.bump());
        }
        Ok(run)
    }

    /// Consume a dotted path: `word (. word)*`.
    pub(crate) fn collect_path(&mut self, expected: &str) -> OqlResult<Vec<Token>> {
        if !self.peek().is_some_and(|t| t.kind == TokenKind::Word) {
            return Err(self.error(expected));
        }
        let mut run = vec![self.bump()];
        while self.peek().is_some_and(|t| t.is_punct(".")) {
            run.push(self.bump());
            if !self.peek().is_some_and(|t| t.kind == TokenKind::Word) {
                return Err(self.error("path segment"));
            }
            run.push(self.bump());
        }
        Ok(run)
    }

    /// An optional alias: `AS word` (any word allowed after an explicit
    /// `AS`) or a bare word that is not a clause or join keyword.
    pub(crate) fn eat_alias(&mut self) -> OqlResult<Option<String>> {
        if self.eat_word("as").is_some() {
            let Some(token) = self.peek() else {
                return Err(self.error("alias after 'as'"));
            };
            if token.kind != TokenKind::Word {
                return Err(self.error("alias after 'as'"));
            }
            return Ok(Some(self.bump().text));
        }
        match self.peek() {
            Some(token)
                if token.kind == TokenKind::Word
                    && !ALIAS_EXCLUSIONS.iter().any(|kw| token.is_word(kw)) =>
            {
                Ok(Some(self.bump().text))
            }
            _ => Ok(None),
        }
    }
}

/// Parse a tokenized query under the given dialect grammar.
pub(crate) fn parse_query(tokens: &[Token], dialect: Dialect) -> OqlResult<ParsedQuery> {
    let mut cursor = Cursor::new(tokens);

    if cursor.at_end() {
        return Err(cursor.error("query statement"));
    }

    let with = if cursor.at_word("with") {
        if dialect == Dialect::Strict {
            return Err(cursor.error("statement (the strict dialect has no WITH clause)"));
        }
        Some(clauses::parse_with_clause(&mut cursor)?)
    } else {
        None
    };

    let statement = if cursor.at_word("select") {
        Statement::Select(clauses::parse_select_statement(&mut cursor, dialect)?)
    } else if cursor.at_word("update") {
        Statement::Update(dml::parse_update(&mut cursor)?)
    } else if cursor.at_word("delete") {
        Statement::Delete(dml::parse_delete(&mut cursor)?)
    } else if cursor.at_word("insert") || cursor.at_word("merge") {
        Statement::Insert(dml::parse_insert(&mut cursor)?)
    } else {
        return Err(cursor.error("select, update, delete or insert"));
    };

    if !cursor.at_end() {
        return Err(cursor.error("end of query"));
    }

    Ok(ParsedQuery {
        dialect,
        with,
        statement,
    })
}
