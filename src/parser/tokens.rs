//! Tokenizer for the object-query dialects.
//!
//! Splits raw query text into a flat token stream. Comments are stripped
//! here, string literals keep their quotes (including the `''` escape), and
//! every token records whether whitespace or a comment separated it from
//! its predecessor so the renderer can reproduce token adjacency exactly.

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_until, take_while, take_while1},
    character::complete::{char, digit1, not_line_ending},
    combinator::{opt, recognize},
    multi::many0_count,
    sequence::{delimited, pair, tuple},
    IResult,
};

use crate::error::{OqlError, OqlResult};

/// Classification of a single token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// An identifier or keyword. Keyword-ness is decided by the parser so
    /// that reserved words can still act as identifiers.
    Word,
    /// A single-quoted string literal, quotes included.
    StringLiteral,
    /// A numeric literal, including any type suffix (`1L`, `1.5f`).
    NumericLiteral,
    /// A named placeholder such as `:name`.
    NamedParameter,
    /// A numbered placeholder such as `?1`.
    PositionalParameter,
    /// An anonymous JDBC-style `?` placeholder.
    JdbcParameter,
    /// Punctuation or an operator (`.`, `,`, `(`, `<=`, `||`, ...).
    Punct,
}

/// One token of the source query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Byte offset of the token in the original source.
    pub position: usize,
    /// Whether whitespace or a comment preceded this token.
    pub spaced: bool,
}

impl Token {
    /// Case-insensitive keyword test. Only meaningful for [`TokenKind::Word`].
    pub fn is_word(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Word && self.text.eq_ignore_ascii_case(keyword)
    }

    /// Exact punctuation test.
    pub fn is_punct(&self, punct: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == punct
    }

    /// Byte offset one past the end of the token text.
    pub fn end(&self) -> usize {
        self.position + self.text.len()
    }

    pub(crate) fn synthetic(kind: TokenKind, text: impl Into<String>, spaced: bool) -> Self {
        Token {
            kind,
            text: text.into(),
            position: usize::MAX,
            spaced,
        }
    }
}

fn is_word_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_word_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn block_comment(input: &str) -> IResult<&str, &str> {
    recognize(tuple((tag("/*"), take_until("*/"), tag("*/"))))(input)
}

fn line_comment(input: &str) -> IResult<&str, &str> {
    recognize(pair(alt((tag("--"), tag("//"))), not_line_ending))(input)
}

fn whitespace(input: &str) -> IResult<&str, &str> {
    take_while1(char::is_whitespace)(input)
}

/// Consume whitespace and comments, returning how many elements were skipped.
fn trivia(input: &str) -> IResult<&str, usize> {
    many0_count(alt((whitespace, block_comment, line_comment)))(input)
}

/// A string literal with `''` escapes, quotes included.
fn string_literal(input: &str) -> IResult<&str, &str> {
    recognize(delimited(
        char('\''),
        many0_count(alt((is_not("'"), tag("''")))),
        char('\''),
    ))(input)
}

/// A numeric literal: integer or decimal, optional exponent and type suffix.
fn numeric_literal(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        alt((
            recognize(tuple((digit1, opt(pair(char('.'), digit1))))),
            recognize(pair(char('.'), digit1)),
        )),
        opt(tuple((
            alt((char('e'), char('E'))),
            opt(alt((char('+'), char('-')))),
            digit1,
        ))),
        take_while(|c: char| c.is_ascii_alphabetic()),
    )))(input)
}

fn word(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(is_word_start),
        take_while(is_word_part),
    ))(input)
}

fn named_parameter(input: &str) -> IResult<&str, &str> {
    recognize(pair(char(':'), word))(input)
}

fn positional_parameter(input: &str) -> IResult<&str, &str> {
    recognize(pair(char('?'), digit1))(input)
}

/// Multi-character operators recognized before single punctuation.
fn operator(input: &str) -> IResult<&str, &str> {
    alt((
        tag("<="),
        tag(">="),
        tag("<>"),
        tag("!="),
        tag("||"),
        tag("::"),
        tag("=>"),
    ))(input)
}

fn next_token(input: &str) -> IResult<&str, (TokenKind, &str)> {
    if let Ok((rest, text)) = string_literal(input) {
        return Ok((rest, (TokenKind::StringLiteral, text)));
    }
    if let Ok((rest, text)) = numeric_literal(input) {
        return Ok((rest, (TokenKind::NumericLiteral, text)));
    }
    if let Ok((rest, text)) = word(input) {
        return Ok((rest, (TokenKind::Word, text)));
    }
    if let Ok((rest, text)) = named_parameter(input) {
        return Ok((rest, (TokenKind::NamedParameter, text)));
    }
    if let Ok((rest, text)) = positional_parameter(input) {
        return Ok((rest, (TokenKind::PositionalParameter, text)));
    }
    if input.starts_with('?') {
        return Ok((&input[1..], (TokenKind::JdbcParameter, &input[..1])));
    }
    if let Ok((rest, text)) = operator(input) {
        return Ok((rest, (TokenKind::Punct, text)));
    }
    let mut chars = input.char_indices();
    match chars.next() {
        Some((_, c)) => {
            let len = c.len_utf8();
            Ok((&input[len..], (TokenKind::Punct, &input[..len])))
        }
        None => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Eof,
        ))),
    }
}

fn unterminated_fragment(input: &str) -> String {
    input.chars().take(20).collect()
}

/// Tokenize a complete query string.
///
/// Fails with a syntax error when a string literal or block comment is left
/// unterminated. Comment markers inside string literals are not treated as
/// comments, and `/`, `*`, `-` remain ordinary operators when they do not
/// open a comment.
pub fn tokenize(input: &str) -> OqlResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut rest = input;

    loop {
        let before = rest;
        let (after_trivia, skipped) = trivia(before).map_err(|_| {
            OqlError::syntax(
                input.len() - before.len(),
                "whitespace or comment",
                unterminated_fragment(before),
            )
        })?;
        rest = after_trivia;

        // An opening block comment that trivia() could not consume is
        // unterminated.
        if rest.starts_with("/*") {
            return Err(OqlError::syntax(
                input.len() - rest.len(),
                "terminated block comment",
                unterminated_fragment(rest),
            ));
        }

        if rest.is_empty() {
            return Ok(tokens);
        }

        if rest.starts_with('\'') && string_literal(rest).is_err() {
            return Err(OqlError::syntax(
                input.len() - rest.len(),
                "terminated string literal",
                unterminated_fragment(rest),
            ));
        }

        let position = input.len() - rest.len();
        let (after, (kind, text)) = next_token(rest).map_err(|_| {
            OqlError::syntax(position, "query token", unterminated_fragment(rest))
        })?;

        tokens.push(Token {
            kind,
            text: text.to_string(),
            position,
            spaced: skipped > 0 && !tokens.is_empty(),
        });
        rest = after;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(input: &str) -> Vec<String> {
        tokenize(input).unwrap().into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn splits_words_and_punctuation() {
        assert_eq!(
            texts("select u.name from User u"),
            vec!["select", "u", ".", "name", "from", "User", "u"]
        );
    }

    #[test]
    fn strips_block_comments() {
        assert_eq!(
            texts("select /* the user */ u from User u"),
            vec!["select", "u", "from", "User", "u"]
        );
    }

    #[test]
    fn tolerates_extra_stars_in_block_comments() {
        assert_eq!(texts("select u /** note **/ from User u").len(), 5);
    }

    #[test]
    fn strips_both_line_comment_styles() {
        assert_eq!(
            texts("select u -- trailing\nfrom User u // tail"),
            vec!["select", "u", "from", "User", "u"]
        );
    }

    #[test]
    fn comment_marker_inside_string_is_literal_text() {
        assert_eq!(
            texts("select '/* not a comment */' from User u")[1],
            "'/* not a comment */'"
        );
    }

    #[test]
    fn slash_and_star_remain_arithmetic_operators() {
        assert_eq!(texts("select u.a / u.b * 2 - 1 from User u")[3], "/");
        assert_eq!(texts("select u.a / u.b * 2 - 1 from User u")[7], "*");
    }

    #[test]
    fn doubled_quote_is_one_literal() {
        assert_eq!(texts("select 'It''s' from User u")[1], "'It''s'");
    }

    #[test]
    fn unterminated_string_fails() {
        assert!(matches!(
            tokenize("select 'oops from User u"),
            Err(OqlError::Syntax { .. })
        ));
    }

    #[test]
    fn unterminated_block_comment_fails() {
        assert!(matches!(
            tokenize("select u /* oops"),
            Err(OqlError::Syntax { .. })
        ));
    }

    #[test]
    fn classifies_parameters() {
        let tokens = tokenize("where u.a = :name and u.b = ?1 and u.c = ?").unwrap();
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert!(kinds.contains(&TokenKind::NamedParameter));
        assert!(kinds.contains(&TokenKind::PositionalParameter));
        assert!(kinds.contains(&TokenKind::JdbcParameter));
    }

    #[test]
    fn double_colon_is_not_a_named_parameter() {
        let tokens = tokenize("select u.data::text from User u").unwrap();
        assert!(tokens.iter().any(|t| t.is_punct("::")));
        assert!(!tokens.iter().any(|t| t.kind == TokenKind::NamedParameter));
    }

    #[test]
    fn numeric_suffixes_stay_attached() {
        assert_eq!(texts("select 1L, 1.5f, 2e3 from User u")[1], "1L");
        assert_eq!(texts("select 1L, 1.5f, 2e3 from User u")[3], "1.5f");
    }

    #[test]
    fn adjacency_is_recorded() {
        let tokens = tokenize("select u.name from User u").unwrap();
        // `.` binds tight to `u`; `from` is separated.
        assert!(!tokens[2].spaced);
        assert!(!tokens[3].spaced);
        assert!(tokens[4].spaced);
    }
}
