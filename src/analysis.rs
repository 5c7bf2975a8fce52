//! Structural metadata derived from a parsed query.
//!
//! [`QueryInformation`] is what the rewrite passes consult instead of
//! re-walking the tree: the primary range alias, every join alias, every
//! selection alias, and whether the projection is already a constructor
//! expression.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::parser::ast::{ParsedQuery, SelectItem, Statement};
use crate::render::QueryStream;

/// The kind of statement a query parses to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatementKind {
    Select,
    Update,
    Delete,
    Insert,
}

/// Derived, read-only metadata about one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryInformation {
    /// Explicit alias of the primary range declaration, when present.
    pub alias: Option<String>,
    pub statement: StatementKind,
    /// The selection list, rendered with normalized whitespace.
    pub projection: String,
    /// Aliases introduced by join declarations, plain or fetch.
    pub join_aliases: BTreeSet<String>,
    /// `AS` aliases of selected expressions.
    pub function_aliases: BTreeSet<String>,
    pub has_constructor_expression: bool,
}

/// Analyze a parsed query. Deterministic and side-effect free.
pub fn analyze(query: &ParsedQuery) -> QueryInformation {
    let select = match &query.statement {
        Statement::Select(select) => select,
        Statement::Update(raw) => {
            return dml_information(StatementKind::Update, raw.alias.clone())
        }
        Statement::Delete(raw) => {
            return dml_information(StatementKind::Delete, raw.alias.clone())
        }
        Statement::Insert(raw) => {
            return dml_information(StatementKind::Insert, raw.alias.clone())
        }
    };

    let alias = select.from.as_ref().and_then(|f| f.root_alias.clone());

    let join_aliases = select
        .from
        .iter()
        .flat_map(|f| f.joins.iter())
        .filter_map(|join| join.alias.clone())
        .collect();

    let function_aliases = select
        .select
        .items
        .iter()
        .filter_map(|item| item.alias.clone())
        .collect();

    QueryInformation {
        alias,
        statement: StatementKind::Select,
        projection: render_projection(&select.select.items),
        join_aliases,
        function_aliases,
        has_constructor_expression: select.select.items.iter().any(|i| i.is_constructor),
    }
}

impl QueryInformation {
    /// The metadata as a JSON value, for callers that ship it across a
    /// process boundary.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

fn dml_information(statement: StatementKind, alias: Option<String>) -> QueryInformation {
    QueryInformation {
        alias,
        statement,
        projection: String::new(),
        join_aliases: BTreeSet::new(),
        function_aliases: BTreeSet::new(),
        has_constructor_expression: false,
    }
}

/// Render the selection list, aliases included, with normalized spacing.
pub(crate) fn render_projection(items: &[SelectItem]) -> String {
    let mut stream = QueryStream::default();
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            stream.append(QueryStream::glue(","));
        }
        stream.append(QueryStream::tokens_with_leading(&item.tokens, index > 0));
        if let Some(alias_tokens) = &item.alias_tokens {
            stream.append(QueryStream::tokens_with_leading(alias_tokens, true));
        }
    }
    stream.render()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn info(query: &str) -> QueryInformation {
        analyze(&parse(query).unwrap())
    }

    #[test]
    fn detects_primary_alias() {
        assert_eq!(info("select u from User u").alias.as_deref(), Some("u"));
        assert_eq!(info("select u from User as u").alias.as_deref(), Some("u"));
    }

    #[test]
    fn missing_alias_is_none_not_an_error() {
        assert!(info("select count(*) from User").alias.is_none());
        assert!(info("select u.name from User group by u.name").alias.is_none());
        assert!(info("select u.name from User order by u.name").alias.is_none());
    }

    #[test]
    fn collects_join_aliases() {
        let info = info("select u from User u left join fetch u.roles r join u.address a");
        assert!(info.join_aliases.contains("r"));
        assert!(info.join_aliases.contains("a"));
    }

    #[test]
    fn collects_selection_aliases_across_lines() {
        let info = info("select u.firstname\n  as first,\n  u.lastname as last from User u");
        assert!(info.function_aliases.contains("first"));
        assert!(info.function_aliases.contains("last"));
    }

    #[test]
    fn flags_constructor_expressions() {
        assert!(info("select new com.example.Dto(u.a, u.b) from User u").has_constructor_expression);
        assert!(!info("select u.a, u.b from User u").has_constructor_expression);
    }

    #[test]
    fn projection_text_is_normalized() {
        let info = info("select  u.firstname ,\n u.lastname   as last from User u");
        assert_eq!(info.projection, "u.firstname, u.lastname as last");
    }

    #[test]
    fn statement_kind_for_dml() {
        assert_eq!(
            info("update User u set u.active = false").statement,
            StatementKind::Update
        );
        assert_eq!(
            info("delete from User u where u.active = false").statement,
            StatementKind::Delete
        );
    }

    #[test]
    fn serializes_to_json() {
        let value = info("select u from User u left join u.roles r").to_json();
        assert_eq!(value["alias"], "u");
        assert_eq!(value["join_aliases"][0], "r");
    }

    #[test]
    fn dml_alias_is_detected() {
        assert_eq!(
            info("update User u set u.active = false").alias.as_deref(),
            Some("u")
        );
    }
}
