//! Parameter placeholder detection and LIKE-style value wrapping.
//!
//! A query may use named placeholders (`:name`), numbered placeholders
//! (`?1`) or anonymous JDBC-style `?`, but never a mix of styles; the mix
//! is rejected here, before any rewriting happens. Placeholders adjacent to
//! `%` wildcards pick up a LIKE binding kind so callers can wrap bound
//! values accordingly.

use serde::{Deserialize, Serialize};

use crate::error::{OqlError, OqlResult};
use crate::parser::tokens::{tokenize, Token, TokenKind};

/// How a placeholder is identified in the query text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BindingIdentifier {
    Name(String),
    Position(u32),
}

/// Where a binding's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterOrigin {
    /// A method/caller supplied parameter.
    Parameter,
    /// A value computed by the caller, registered via
    /// [`ParameterBinding::expression`].
    Expression,
}

/// LIKE-style wrapping applied to the bound value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BindingKind {
    Plain,
    /// `%value%`
    Containing,
    /// `value%`
    StartingWith,
    /// `%value`
    EndingWith,
}

/// One detected placeholder, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterBinding {
    pub identifier: BindingIdentifier,
    pub origin: ParameterOrigin,
    pub kind: BindingKind,
}

impl ParameterBinding {
    pub fn named(name: impl Into<String>) -> Self {
        ParameterBinding {
            identifier: BindingIdentifier::Name(name.into()),
            origin: ParameterOrigin::Parameter,
            kind: BindingKind::Plain,
        }
    }

    pub fn positional(position: u32) -> Self {
        ParameterBinding {
            identifier: BindingIdentifier::Position(position),
            origin: ParameterOrigin::Parameter,
            kind: BindingKind::Plain,
        }
    }

    /// A binding whose value is computed by the caller rather than passed
    /// in. [`parse_bindings`] never produces these; callers register them
    /// alongside the scanned bindings.
    pub fn expression(name: impl Into<String>) -> Self {
        ParameterBinding {
            identifier: BindingIdentifier::Name(name.into()),
            origin: ParameterOrigin::Expression,
            kind: BindingKind::Plain,
        }
    }

    /// Apply the LIKE wrapping for this binding's kind. Escaping of
    /// wildcard characters inside the value is the caller's concern (see
    /// [`crate::builder::EscapeCharacter`]).
    pub fn prepare(&self, value: &str) -> String {
        match self.kind {
            BindingKind::Plain => value.to_string(),
            BindingKind::Containing => format!("%{value}%"),
            BindingKind::StartingWith => format!("{value}%"),
            BindingKind::EndingWith => format!("%{value}"),
        }
    }
}

/// Scan a query for placeholders, in order of first occurrence.
///
/// Fails on a zero position, and on any mix of placeholder styles within
/// one query.
pub fn parse_bindings(query: &str) -> OqlResult<Vec<ParameterBinding>> {
    let tokens = tokenize(query)?;
    let mut bindings = Vec::new();
    let mut has_named = false;
    let mut has_positional = false;
    let mut has_jdbc = false;

    for (index, token) in tokens.iter().enumerate() {
        let identifier = match token.kind {
            TokenKind::NamedParameter => {
                has_named = true;
                let name = &token.text[1..];
                if name.is_empty() {
                    return Err(OqlError::parameter("parameter name must not be empty"));
                }
                BindingIdentifier::Name(name.to_string())
            }
            TokenKind::PositionalParameter => {
                has_positional = true;
                let position: u32 = token.text[1..]
                    .parse()
                    .map_err(|_| OqlError::parameter(format!("invalid position '{}'", token.text)))?;
                if position == 0 {
                    return Err(OqlError::parameter("parameter positions start at 1"));
                }
                BindingIdentifier::Position(position)
            }
            TokenKind::JdbcParameter => {
                has_jdbc = true;
                // Anonymous placeholders number themselves by occurrence.
                BindingIdentifier::Position(bindings.len() as u32 + 1)
            }
            _ => continue,
        };

        bindings.push(ParameterBinding {
            identifier,
            origin: ParameterOrigin::Parameter,
            kind: like_kind(&tokens, index),
        });
    }

    if has_jdbc && (has_named || has_positional) {
        return Err(OqlError::parameter(
            "anonymous '?' placeholders must not be mixed with named or numbered ones",
        ));
    }
    if has_named && has_positional {
        return Err(OqlError::parameter(
            "named and numbered placeholders must not be mixed in one query",
        ));
    }

    Ok(bindings)
}

/// Infer the LIKE kind from `%` tokens directly adjacent (by source
/// position) to the placeholder.
fn like_kind(tokens: &[Token], index: usize) -> BindingKind {
    let token = &tokens[index];
    let before = index
        .checked_sub(1)
        .and_then(|i| tokens.get(i))
        .is_some_and(|prev| prev.is_punct("%") && prev.end() == token.position);
    let after = tokens
        .get(index + 1)
        .is_some_and(|next| next.is_punct("%") && token.end() == next.position);

    match (before, after) {
        (true, true) => BindingKind::Containing,
        (false, true) => BindingKind::StartingWith,
        (true, false) => BindingKind::EndingWith,
        (false, false) => BindingKind::Plain,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_bindings_in_source_order() {
        let bindings =
            parse_bindings("select u from User u where u.a = :first and u.b = :second").unwrap();
        assert_eq!(
            bindings,
            vec![ParameterBinding::named("first"), ParameterBinding::named("second")]
        );
    }

    #[test]
    fn positional_bindings() {
        let bindings = parse_bindings("where u.a = ?1 and u.b = ?2").unwrap();
        assert_eq!(
            bindings[0].identifier,
            BindingIdentifier::Position(1)
        );
        assert_eq!(bindings[1].identifier, BindingIdentifier::Position(2));
    }

    #[test]
    fn jdbc_placeholders_number_themselves() {
        let bindings = parse_bindings("where u.a = ? and u.b = ?").unwrap();
        assert_eq!(bindings[0].identifier, BindingIdentifier::Position(1));
        assert_eq!(bindings[1].identifier, BindingIdentifier::Position(2));
    }

    #[test]
    fn position_zero_is_rejected() {
        assert!(matches!(
            parse_bindings("where u.a = ?0"),
            Err(OqlError::Parameter(_))
        ));
    }

    #[test]
    fn mixing_jdbc_with_numbered_is_rejected() {
        assert!(parse_bindings("where u.a = ? and u.b = ?2").is_err());
    }

    #[test]
    fn mixing_jdbc_with_named_is_rejected() {
        assert!(parse_bindings("where u.a = ? and u.b = :name").is_err());
    }

    #[test]
    fn mixing_named_with_numbered_is_rejected() {
        assert!(parse_bindings("where u.a = :name and u.b = ?1").is_err());
    }

    #[test]
    fn like_kinds_from_adjacent_wildcards() {
        let bindings = parse_bindings(
            "where u.a like %:contained% or u.b like :prefix% or u.c like %:suffix",
        )
        .unwrap();
        assert_eq!(bindings[0].kind, BindingKind::Containing);
        assert_eq!(bindings[1].kind, BindingKind::StartingWith);
        assert_eq!(bindings[2].kind, BindingKind::EndingWith);
    }

    #[test]
    fn separated_wildcard_stays_plain() {
        let bindings = parse_bindings("where u.a like % :name").unwrap();
        assert_eq!(bindings[0].kind, BindingKind::Plain);
    }

    #[test]
    fn expression_bindings_are_caller_registered() {
        let scanned = parse_bindings("where u.a = :first").unwrap();
        assert!(scanned.iter().all(|b| b.origin == ParameterOrigin::Parameter));

        let computed = ParameterBinding::expression("principal_name");
        assert_eq!(computed.origin, ParameterOrigin::Expression);
        assert_eq!(
            computed.identifier,
            BindingIdentifier::Name("principal_name".to_string())
        );
    }

    #[test]
    fn prepare_wraps_values() {
        let mut binding = ParameterBinding::named("name");
        binding.kind = BindingKind::Containing;
        assert_eq!(binding.prepare("al"), "%al%");
        binding.kind = BindingKind::StartingWith;
        assert_eq!(binding.prepare("al"), "al%");
        binding.kind = BindingKind::EndingWith;
        assert_eq!(binding.prepare("al"), "%al");
    }
}
