//! Parse-tree types produced by the grammar parser.
//!
//! The tree is token-preserving: every clause owns the run of source tokens
//! it matched, so rewrite passes can re-emit untouched regions exactly while
//! replacing only the parts a transformation targets. Nodes are read-only
//! after construction.

use crate::parser::tokens::Token;
use crate::transform::Dialect;

/// A run of source tokens owned by one grammar node.
pub type TokenRun = Vec<Token>;

/// A fully parsed query: optional leading common table expressions plus one
/// statement.
#[derive(Debug, Clone)]
pub struct ParsedQuery {
    pub dialect: Dialect,
    pub with: Option<WithClause>,
    pub statement: Statement,
}

impl ParsedQuery {
    /// The select statement, if this query is one.
    pub fn as_select(&self) -> Option<&SelectStatement> {
        match &self.statement {
            Statement::Select(select) => Some(select),
            _ => None,
        }
    }
}

/// A leading `WITH` clause, token-preserving.
#[derive(Debug, Clone)]
pub struct WithClause {
    /// The entire clause run, `with` keyword included.
    pub tokens: TokenRun,
    pub items: Vec<CommonTableExpression>,
}

/// A `name AS (body)` entry of a `WITH` clause.
#[derive(Debug, Clone)]
pub struct CommonTableExpression {
    pub name: String,
    /// Tokens between the parentheses of the CTE body.
    pub body: TokenRun,
}

/// One parsed statement.
#[derive(Debug, Clone)]
pub enum Statement {
    Select(SelectStatement),
    /// Bulk `UPDATE`, `DELETE` or `MERGE`/`INSERT`; kept as a loose token
    /// run since no rewrite pass restructures these.
    Update(RawStatement),
    Delete(RawStatement),
    Insert(RawStatement),
}

/// A loosely parsed non-select statement.
#[derive(Debug, Clone)]
pub struct RawStatement {
    pub tokens: TokenRun,
    pub alias: Option<String>,
}

/// A `SELECT` statement with its clause structure.
#[derive(Debug, Clone)]
pub struct SelectStatement {
    pub select: SelectClause,
    pub from: Option<FromClause>,
    /// `where ...` run, keyword included.
    pub where_clause: Option<TokenRun>,
    /// `group by ...` run, keywords included.
    pub group_by: Option<TokenRun>,
    /// `having ...` run, keyword included.
    pub having: Option<TokenRun>,
    /// Trailing set operations (`union`/`except`/`intersect` arms).
    pub set_ops: Vec<SetOperation>,
    /// Top-level `order by ...` run, keywords included. `order by` inside a
    /// sub-select or window never lands here.
    pub order_by: Option<TokenRun>,
}

/// The projection part of a select statement.
#[derive(Debug, Clone)]
pub struct SelectClause {
    /// The original `select` keyword token, case preserved.
    pub select_token: Token,
    /// The original `distinct` token, if present.
    pub distinct: Option<Token>,
    pub items: Vec<SelectItem>,
}

/// One selected expression, with its optional `AS` alias.
#[derive(Debug, Clone)]
pub struct SelectItem {
    /// The expression tokens, alias excluded.
    pub tokens: TokenRun,
    /// `AS <alias>` tokens, when present.
    pub alias_tokens: Option<TokenRun>,
    pub alias: Option<String>,
    /// Whether the expression is a `NEW qualified.Name(...)` constructor.
    pub is_constructor: bool,
}

/// The `FROM` clause: primary range declaration plus any joins.
#[derive(Debug, Clone)]
pub struct FromClause {
    /// The entire clause run, `from` keyword included.
    pub tokens: TokenRun,
    /// Alias of the primary range declaration, when explicitly declared.
    pub root_alias: Option<String>,
    pub joins: Vec<JoinDeclaration>,
    /// Indices (into `tokens`) of `fetch` keywords, so a count rewrite can
    /// drop them.
    pub fetch_indices: Vec<usize>,
}

/// Join flavor, `outer` folded into left/right/full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

/// One `join` declaration inside a `FROM` clause.
#[derive(Debug, Clone)]
pub struct JoinDeclaration {
    pub kind: JoinKind,
    pub fetch: bool,
    /// The navigated path or joined entity tokens.
    pub path: TokenRun,
    pub alias: Option<String>,
}

/// A set-operation arm following a select body.
#[derive(Debug, Clone)]
pub struct SetOperation {
    /// The operator tokens (`union`, `union all`, `except`, ...).
    pub operator: TokenRun,
    /// The right-hand select body, kept as a balanced token run (arbitrary
    /// nesting included).
    pub body: TokenRun,
}
