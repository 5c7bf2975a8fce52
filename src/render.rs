//! Token-stream rendering.
//!
//! Rewrite passes assemble a [`QueryStream`] out of original source tokens
//! and synthetic tokens. Nested sub-streams stay unflattened until
//! [`QueryStream::render`] runs, so a deeply nested sub-select is only
//! materialized once, at final render time.
//!
//! Spacing rule: a token is preceded by exactly one space iff it was
//! separated from its predecessor in the source (or was synthesized as a
//! spaced token). Everything else renders adjacent, which reproduces the
//! original text with whitespace runs collapsed and comments dropped.

use crate::parser::tokens::{Token, TokenKind};

/// A lazily flattened tree of token runs.
#[derive(Debug, Clone, Default)]
pub enum QueryStream {
    #[default]
    Empty,
    Tokens(Vec<Token>),
    Composite(Vec<QueryStream>),
}

impl QueryStream {
    /// A stream over a run of source tokens, cloned as-is.
    pub fn tokens(tokens: &[Token]) -> Self {
        if tokens.is_empty() {
            QueryStream::Empty
        } else {
            QueryStream::Tokens(tokens.to_vec())
        }
    }

    /// Like [`QueryStream::tokens`] but forcing the spacing of the first
    /// token, so a run lifted out of one context can be re-embedded in
    /// another.
    pub fn tokens_with_leading(tokens: &[Token], spaced: bool) -> Self {
        let mut tokens = tokens.to_vec();
        if let Some(first) = tokens.first_mut() {
            first.spaced = spaced;
        }
        QueryStream::Tokens(tokens)
    }

    /// A synthetic keyword or identifier, space-separated from what precedes it.
    pub fn word(text: impl Into<String>) -> Self {
        QueryStream::Tokens(vec![Token::synthetic(TokenKind::Word, text, true)])
    }

    /// Synthetic text glued directly to the previous token (`(`, `,`, ...).
    pub fn glue(text: impl Into<String>) -> Self {
        QueryStream::Tokens(vec![Token::synthetic(TokenKind::Punct, text, false)])
    }

    /// Append a sub-stream without flattening it.
    pub fn append(&mut self, other: QueryStream) {
        if matches!(other, QueryStream::Empty) {
            return;
        }
        match self {
            QueryStream::Empty => *self = other,
            QueryStream::Composite(parts) => parts.push(other),
            QueryStream::Tokens(_) => {
                let current = std::mem::take(self);
                *self = QueryStream::Composite(vec![current, other]);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            QueryStream::Empty => true,
            QueryStream::Tokens(tokens) => tokens.is_empty(),
            QueryStream::Composite(parts) => parts.iter().all(QueryStream::is_empty),
        }
    }

    fn render_into(&self, out: &mut String) {
        match self {
            QueryStream::Empty => {}
            QueryStream::Tokens(tokens) => {
                for token in tokens {
                    if token.spaced && !out.is_empty() && !out.ends_with(' ') {
                        out.push(' ');
                    }
                    out.push_str(&token.text);
                }
            }
            QueryStream::Composite(parts) => {
                for part in parts {
                    part.render_into(out);
                }
            }
        }
    }

    /// Flatten the stream into the final query text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }
}

/// Render a run of source tokens directly.
pub fn render_tokens(tokens: &[Token]) -> String {
    QueryStream::tokens(tokens).render()
}
