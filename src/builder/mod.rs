//! Fluent, immutable construction of queries without parsing.
//!
//! The builder assembles an in-memory tree of entities, joins, expressions
//! and predicates, then renders it through a [`RenderContext`] that maps
//! each origin to its alias. Every step returns a new value; nothing
//! mutates a previously returned step.
//!
//! ```
//! use oql::builder::{entity, select_from, where_, parameter};
//!
//! let user = entity("com.example.User");
//! let query = select_from(user.clone())
//!     .entity()
//!     .filter(where_(user.get("lastname")).eq(parameter("lastname")))
//!     .render()
//!     .unwrap();
//! assert_eq!(query, "SELECT u FROM User u WHERE u.lastname = :lastname");
//! ```

mod predicate;

pub use predicate::{where_, Predicate, WhereStep};

use std::collections::HashMap;

use crate::error::{OqlError, OqlResult};
use crate::sort::Direction;

/// A root range declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Entity {
    qualified_name: String,
    /// The name used in the rendered `FROM` clause.
    name: String,
    alias: String,
}

/// An entity whose alias defaults to the lower-cased first letter of the
/// simple (last-segment) name.
pub fn entity(qualified_name: impl Into<String>) -> Entity {
    let qualified_name = qualified_name.into();
    let name = qualified_name
        .rsplit('.')
        .next()
        .unwrap_or(&qualified_name)
        .to_string();
    let alias = default_alias(&name);
    Entity {
        qualified_name,
        name,
        alias,
    }
}

/// An entity with an explicit mapped name; the alias derives from that name
/// instead of the type name.
pub fn entity_named(qualified_name: impl Into<String>, mapped_name: impl Into<String>) -> Entity {
    let mapped_name = mapped_name.into();
    let alias = default_alias(&mapped_name);
    Entity {
        qualified_name: qualified_name.into(),
        name: mapped_name,
        alias,
    }
}

fn default_alias(name: &str) -> String {
    name.chars()
        .next()
        .map(|c| c.to_lowercase().to_string())
        .unwrap_or_default()
}

impl Entity {
    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    /// A path rooted at this entity.
    pub fn get(&self, property: impl Into<String>) -> Expression {
        Expression::Path(Path {
            origin: Origin::Entity(self.clone()),
            property: property.into(),
        })
    }

    pub fn inner_join(&self, property: impl Into<String>) -> Join {
        Join::new(JoinStyle::Inner, Origin::Entity(self.clone()), property)
    }

    pub fn left_join(&self, property: impl Into<String>) -> Join {
        Join::new(JoinStyle::Left, Origin::Entity(self.clone()), property)
    }
}

/// Join flavor supported by the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinStyle {
    Inner,
    Left,
}

impl JoinStyle {
    fn keyword(self) -> &'static str {
        match self {
            JoinStyle::Inner => "JOIN",
            JoinStyle::Left => "LEFT JOIN",
        }
    }
}

/// A navigated join off an entity or another join.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Join {
    style: JoinStyle,
    source: Box<Origin>,
    property: String,
    alias: Option<String>,
}

impl Join {
    fn new(style: JoinStyle, source: Origin, property: impl Into<String>) -> Self {
        Join {
            style,
            source: Box::new(source),
            property: property.into(),
            alias: None,
        }
    }

    /// Give the join an explicit alias instead of a synthesized `join_<N>`.
    pub fn aliased(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// A path rooted at this join.
    pub fn get(&self, property: impl Into<String>) -> Expression {
        Expression::Path(Path {
            origin: Origin::Join(self.clone()),
            property: property.into(),
        })
    }

    pub fn inner_join(&self, property: impl Into<String>) -> Join {
        Join::new(JoinStyle::Inner, Origin::Join(self.clone()), property)
    }

    pub fn left_join(&self, property: impl Into<String>) -> Join {
        Join::new(JoinStyle::Left, Origin::Join(self.clone()), property)
    }
}

/// What a path is qualified by: the root entity or a join.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Origin {
    Entity(Entity),
    Join(Join),
}

impl Origin {
    fn describe(&self) -> String {
        match self {
            Origin::Entity(entity) => entity.name.clone(),
            Origin::Join(join) => format!("join of '{}'", join.property),
        }
    }
}

/// Maps origins to rendered aliases. Unaliased joins receive `join_<N>`
/// from a counter scoped to this context, in resolution order, so two
/// independent render trees never interfere.
#[derive(Debug, Default)]
pub struct RenderContext {
    aliases: HashMap<Origin, String>,
    counter: usize,
    explicit: bool,
}

impl RenderContext {
    /// A context that derives aliases lazily from the tree itself.
    pub fn new() -> Self {
        RenderContext::default()
    }

    /// A context restricted to the given alias mapping. Any origin missing
    /// from the map fails rendering with [`OqlError::UnresolvedOrigin`].
    pub fn with_aliases(aliases: HashMap<Origin, String>) -> Self {
        RenderContext {
            aliases,
            counter: 0,
            explicit: true,
        }
    }

    pub fn alias_for(&mut self, origin: &Origin) -> OqlResult<String> {
        if let Some(alias) = self.aliases.get(origin) {
            return Ok(alias.clone());
        }
        if self.explicit {
            return Err(OqlError::UnresolvedOrigin(origin.describe()));
        }
        let alias = match origin {
            Origin::Entity(entity) => entity.alias.clone(),
            Origin::Join(join) => match &join.alias {
                Some(alias) => alias.clone(),
                None => {
                    let alias = format!("join_{}", self.counter);
                    self.counter += 1;
                    alias
                }
            },
        };
        self.aliases.insert(origin.clone(), alias.clone());
        Ok(alias)
    }
}

/// A parameter placeholder style.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Placeholder {
    Named(String),
    Indexed(u32),
}

/// A value or computed expression usable in selections and predicates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expression {
    /// Raw text inserted verbatim.
    Raw(String),
    /// A string literal; embedded quotes are doubled at render time.
    StringLiteral(String),
    Numeric(String),
    Parameter(Placeholder),
    Function {
        name: String,
        arguments: Vec<Expression>,
    },
    Path(Path),
}

/// A raw expression, rendered verbatim.
pub fn expression(raw: impl Into<String>) -> Expression {
    Expression::Raw(raw.into())
}

/// A quoted string literal.
pub fn literal(value: impl Into<String>) -> Expression {
    Expression::StringLiteral(value.into())
}

/// A numeric literal.
pub fn numeric(value: impl ToString) -> Expression {
    Expression::Numeric(value.to_string())
}

/// A named parameter placeholder (`:name`).
pub fn parameter(name: impl Into<String>) -> Expression {
    Expression::Parameter(Placeholder::Named(name.into()))
}

/// An indexed parameter placeholder (`?1`).
pub fn indexed_parameter(position: u32) -> Expression {
    Expression::Parameter(Placeholder::Indexed(position))
}

/// A function call over argument expressions.
pub fn function(name: impl Into<String>, arguments: Vec<Expression>) -> Expression {
    Expression::Function {
        name: name.into(),
        arguments,
    }
}

/// A property navigation off an origin, resolved to `alias.property` at
/// render time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    pub origin: Origin,
    pub property: String,
}

impl Expression {
    pub(crate) fn render(&self, ctx: &mut RenderContext) -> OqlResult<String> {
        match self {
            Expression::Raw(text) => Ok(text.clone()),
            Expression::StringLiteral(value) => Ok(format!("'{}'", value.replace('\'', "''"))),
            Expression::Numeric(value) => Ok(value.clone()),
            Expression::Parameter(Placeholder::Named(name)) => Ok(format!(":{name}")),
            Expression::Parameter(Placeholder::Indexed(position)) => Ok(format!("?{position}")),
            Expression::Function { name, arguments } => {
                let rendered: Vec<String> = arguments
                    .iter()
                    .map(|arg| arg.render(ctx))
                    .collect::<OqlResult<_>>()?;
                Ok(format!("{}({})", name, rendered.join(", ")))
            }
            Expression::Path(path) => {
                Ok(format!("{}.{}", ctx.alias_for(&path.origin)?, path.property))
            }
        }
    }
}

/// Escape-character configuration for `LIKE` patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EscapeCharacter(pub char);

impl EscapeCharacter {
    pub const DEFAULT: EscapeCharacter = EscapeCharacter('\\');

    /// Escape LIKE wildcards (and the escape character itself) in a value.
    pub fn escape(&self, value: &str) -> String {
        let mut out = String::with_capacity(value.len());
        for c in value.chars() {
            if c == '_' || c == '%' || c == self.0 {
                out.push(self.0);
            }
            out.push(c);
        }
        out
    }
}

/// Start a select query over `entity`.
pub fn select_from(entity: Entity) -> SelectStep {
    SelectStep {
        entity,
        distinct: false,
    }
}

/// The projection-choice step of the builder.
#[derive(Debug, Clone)]
pub struct SelectStep {
    entity: Entity,
    distinct: bool,
}

impl SelectStep {
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Project the entity itself.
    pub fn entity(self) -> QueryBuilder {
        self.project(Projection::Entity)
    }

    /// Project `count(<alias>)`.
    pub fn count(self) -> QueryBuilder {
        self.project(Projection::Count)
    }

    /// Project an explicit list of expressions.
    pub fn select(self, paths: Vec<Expression>) -> QueryBuilder {
        self.project(Projection::Paths(paths))
    }

    /// Project a constructor expression `new <type_name>(...)`.
    pub fn instantiate(self, type_name: impl Into<String>, arguments: Vec<Expression>) -> QueryBuilder {
        self.project(Projection::Constructor {
            type_name: type_name.into(),
            arguments,
        })
    }

    fn project(self, projection: Projection) -> QueryBuilder {
        QueryBuilder {
            entity: self.entity,
            distinct: self.distinct,
            projection,
            joins: Vec::new(),
            predicate: None,
            orders: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
enum Projection {
    Entity,
    Count,
    Paths(Vec<Expression>),
    Constructor {
        type_name: String,
        arguments: Vec<Expression>,
    },
}

/// A fully projected query under construction.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    entity: Entity,
    distinct: bool,
    projection: Projection,
    joins: Vec<Join>,
    predicate: Option<Predicate>,
    orders: Vec<(Expression, Direction)>,
}

impl QueryBuilder {
    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    /// Add a `WHERE` predicate; repeated calls combine with `AND`.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(match self.predicate {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    pub fn order_by(mut self, expression: Expression, direction: Direction) -> Self {
        self.orders.push((expression, direction));
        self
    }

    /// Render with lazily derived aliases.
    pub fn render(&self) -> OqlResult<String> {
        self.render_with(&mut RenderContext::new())
    }

    /// Render under an explicit context.
    pub fn render_with(&self, ctx: &mut RenderContext) -> OqlResult<String> {
        // Joins claim their aliases first, so `join_<N>` numbering follows
        // declaration order regardless of where a join is first referenced.
        for join in &self.joins {
            ctx.alias_for(&Origin::Join(join.clone()))?;
        }

        let root = Origin::Entity(self.entity.clone());
        let root_alias = ctx.alias_for(&root)?;

        let mut out = String::from("SELECT ");
        if self.distinct && !matches!(self.projection, Projection::Count) {
            out.push_str("DISTINCT ");
        }
        out.push_str(&self.render_projection(&root_alias, ctx)?);

        out.push_str(" FROM ");
        out.push_str(&self.entity.name);
        out.push(' ');
        out.push_str(&root_alias);

        for join in &self.joins {
            let source_alias = ctx.alias_for(&join.source)?;
            let join_alias = ctx.alias_for(&Origin::Join(join.clone()))?;
            out.push(' ');
            out.push_str(join.style.keyword());
            out.push(' ');
            out.push_str(&format!("{source_alias}.{} {join_alias}", join.property));
        }

        if let Some(predicate) = &self.predicate {
            out.push_str(" WHERE ");
            out.push_str(&predicate.render(ctx)?);
        }

        if !self.orders.is_empty() {
            out.push_str(" ORDER BY ");
            let terms: Vec<String> = self
                .orders
                .iter()
                .map(|(expression, direction)| {
                    Ok(format!("{} {}", expression.render(ctx)?, direction.keyword()))
                })
                .collect::<OqlResult<_>>()?;
            out.push_str(&terms.join(", "));
        }

        Ok(out)
    }

    fn render_projection(&self, root_alias: &str, ctx: &mut RenderContext) -> OqlResult<String> {
        match &self.projection {
            Projection::Entity => Ok(root_alias.to_string()),
            Projection::Count => {
                if self.distinct {
                    Ok(format!("COUNT(DISTINCT {root_alias})"))
                } else {
                    Ok(format!("COUNT({root_alias})"))
                }
            }
            Projection::Paths(paths) => {
                let rendered: Vec<String> = paths
                    .iter()
                    .map(|path| path.render(ctx))
                    .collect::<OqlResult<_>>()?;
                Ok(rendered.join(", "))
            }
            Projection::Constructor {
                type_name,
                arguments,
            } => {
                let rendered: Vec<String> = arguments
                    .iter()
                    .map(|arg| arg.render(ctx))
                    .collect::<OqlResult<_>>()?;
                Ok(format!("new {}({})", type_name, rendered.join(", ")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_a_plain_entity_selection() {
        let user = entity("com.example.User");
        let query = select_from(user).entity().render().unwrap();
        assert_eq!(query, "SELECT u FROM User u");
    }

    #[test]
    fn mapped_name_drives_the_alias() {
        let account = entity_named("com.example.User", "Account");
        let query = select_from(account).entity().render().unwrap();
        assert_eq!(query, "SELECT a FROM Account a");
    }

    #[test]
    fn count_projection() {
        let user = entity("com.example.User");
        assert_eq!(
            select_from(user.clone()).count().render().unwrap(),
            "SELECT COUNT(u) FROM User u"
        );
        assert_eq!(
            select_from(user).distinct().count().render().unwrap(),
            "SELECT COUNT(DISTINCT u) FROM User u"
        );
    }

    #[test]
    fn constructor_projection() {
        let user = entity("com.example.User");
        let query = select_from(user.clone())
            .instantiate(
                "com.example.Names",
                vec![user.get("firstname"), user.get("lastname")],
            )
            .render()
            .unwrap();
        assert_eq!(
            query,
            "SELECT new com.example.Names(u.firstname, u.lastname) FROM User u"
        );
    }

    #[test]
    fn unaliased_joins_number_in_declaration_order() {
        let user = entity("com.example.User");
        let roles = user.inner_join("roles");
        let address = user.left_join("address");
        let query = select_from(user)
            .entity()
            .join(roles)
            .join(address)
            .render()
            .unwrap();
        assert_eq!(
            query,
            "SELECT u FROM User u JOIN u.roles join_0 LEFT JOIN u.address join_1"
        );
    }

    #[test]
    fn independent_render_trees_do_not_share_the_counter() {
        let user = entity("com.example.User");
        let one = select_from(user.clone())
            .entity()
            .join(user.inner_join("roles"))
            .render()
            .unwrap();
        let two = select_from(user.clone())
            .entity()
            .join(user.inner_join("orders"))
            .render()
            .unwrap();
        assert!(one.contains("join_0"));
        assert!(two.contains("join_0"));
    }

    #[test]
    fn aliased_join_paths_render_through_the_alias() {
        let user = entity("com.example.User");
        let roles = user.inner_join("roles").aliased("r");
        let query = select_from(user)
            .select(vec![roles.get("name")])
            .join(roles.clone())
            .render()
            .unwrap();
        assert_eq!(query, "SELECT r.name FROM User u JOIN u.roles r");
    }

    #[test]
    fn explicit_context_rejects_unmapped_origins() {
        let user = entity("com.example.User");
        let query = select_from(user.clone())
            .select(vec![user.get("name")])
            .render_with(&mut RenderContext::with_aliases(HashMap::new()));
        assert!(matches!(query, Err(OqlError::UnresolvedOrigin(_))));
    }

    #[test]
    fn string_literal_doubles_embedded_quotes() {
        let mut ctx = RenderContext::new();
        assert_eq!(
            literal("literal's").render(&mut ctx).unwrap(),
            "'literal''s'"
        );
    }

    #[test]
    fn order_by_renders_after_where() {
        let user = entity("com.example.User");
        let query = select_from(user.clone())
            .entity()
            .filter(where_(user.get("age")).gte(numeric(18)))
            .order_by(user.get("lastname"), Direction::Asc)
            .render()
            .unwrap();
        assert_eq!(
            query,
            "SELECT u FROM User u WHERE u.age >= 18 ORDER BY u.lastname asc"
        );
    }

    #[test]
    fn escape_character_escapes_wildcards() {
        let escape = EscapeCharacter::DEFAULT;
        assert_eq!(escape.escape("50%_done"), "50\\%\\_done");
    }
}
