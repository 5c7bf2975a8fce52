//! Parsing, analysis and source-to-source rewriting for SQL-like object
//! query dialects.
//!
//! The crate takes a query string written in one of three surface grammars
//! (strict, extended, or a portable SQL-like subset), parses it into a
//! token-preserving tree and derives rewritten variants from it: row-count
//! queries, queries with injected `order by` clauses, and constructor
//! (DTO) projections. A fluent [`builder`] API constructs equivalent
//! queries programmatically without going through the parser.
//!
//! ```
//! use oql::prelude::*;
//!
//! let enhancer = enhancer_for("select u from User u", Dialect::Strict).unwrap();
//! let count = enhancer.derive_count_query(None).unwrap();
//! assert_eq!(count, "select count(u) from User u");
//! ```

pub mod analysis;
pub mod bindings;
pub mod builder;
pub mod cache;
pub mod error;
pub mod parser;
pub mod render;
pub mod sort;
pub mod transform;

pub use error::{OqlError, OqlResult};
pub use parser::parse;
pub use transform::{enhancer_for, Dialect, QueryEnhancer, QueryRewriter};

pub mod prelude {
    pub use crate::analysis::{QueryInformation, StatementKind};
    pub use crate::bindings::{BindingKind, ParameterBinding};
    pub use crate::builder::{entity, expression, literal, parameter, select_from, where_};
    pub use crate::error::{OqlError, OqlResult};
    pub use crate::parser::parse;
    pub use crate::sort::{Direction, Order, Sort};
    pub use crate::transform::{enhancer_for, Dialect, QueryEnhancer, QueryRewriter};
}
