use crate::error::OqlError;
use crate::parser::ast::*;
use crate::parser::{parse, parse_dialect};
use crate::render::render_tokens;
use crate::transform::Dialect;

fn select(query: &str) -> SelectStatement {
    parse(query)
        .unwrap()
        .as_select()
        .cloned()
        .expect("expected a select statement")
}

// ========================================================================
// Select structure
// ========================================================================

#[test]
fn test_simple_select() {
    let stmt = select("select u from User u");
    assert_eq!(stmt.select.items.len(), 1);
    assert_eq!(render_tokens(&stmt.select.items[0].tokens), "u");
    assert_eq!(
        stmt.from.as_ref().unwrap().root_alias.as_deref(),
        Some("u")
    );
    assert!(stmt.where_clause.is_none());
    assert!(stmt.order_by.is_none());
}

#[test]
fn test_select_keyword_casing_is_preserved() {
    let stmt = select("SELECT u FROM User u");
    assert_eq!(stmt.select.select_token.text, "SELECT");
}

#[test]
fn test_distinct_is_captured() {
    let stmt = select("select distinct u.lastname from User u");
    assert!(stmt.select.distinct.is_some());
}

#[test]
fn test_multiple_select_items() {
    let stmt = select("select u.firstname, u.lastname from User u");
    assert_eq!(stmt.select.items.len(), 2);
    assert_eq!(render_tokens(&stmt.select.items[1].tokens), "u.lastname");
}

#[test]
fn test_explicit_as_alias_is_split_off() {
    let stmt = select("select count(u.id) as total from User u");
    let item = &stmt.select.items[0];
    assert_eq!(render_tokens(&item.tokens), "count(u.id)");
    assert_eq!(item.alias.as_deref(), Some("total"));
}

#[test]
fn test_bare_trailing_word_is_not_an_alias() {
    // `end` closes the case expression, it does not alias it.
    let stmt = select("select case when u.age > 18 then 'adult' else 'minor' end from User u");
    let item = &stmt.select.items[0];
    assert!(item.alias.is_none());
    assert!(render_tokens(&item.tokens).ends_with("end"));
}

#[test]
fn test_constructor_expression_is_flagged() {
    let stmt = select("select new com.example.UserDto(u.firstname, u.lastname) from User u");
    assert!(stmt.select.items[0].is_constructor);
}

#[test]
fn test_function_call_commas_do_not_split_items() {
    let stmt = select("select coalesce(u.nickname, u.firstname) from User u");
    assert_eq!(stmt.select.items.len(), 1);
}

#[test]
fn test_subselect_in_projection_stays_one_item() {
    let stmt =
        select("select (select count(r) from Role r where r.user = u) from User u");
    assert_eq!(stmt.select.items.len(), 1);
    assert!(stmt.order_by.is_none());
}

// ========================================================================
// From clause and joins
// ========================================================================

#[test]
fn test_from_without_alias() {
    let stmt = select("select count(*) from User");
    assert!(stmt.from.as_ref().unwrap().root_alias.is_none());
}

#[test]
fn test_as_alias_on_range_declaration() {
    let stmt = select("select u from User as u");
    assert_eq!(stmt.from.unwrap().root_alias.as_deref(), Some("u"));
}

#[test]
fn test_joins_are_collected() {
    let stmt = select("select u from User u left join u.roles r inner join u.address a");
    let from = stmt.from.unwrap();
    assert_eq!(from.joins.len(), 2);
    assert_eq!(from.joins[0].kind, JoinKind::Left);
    assert_eq!(from.joins[0].alias.as_deref(), Some("r"));
    assert_eq!(from.joins[1].kind, JoinKind::Inner);
    assert_eq!(render_tokens(&from.joins[1].path), "u.address");
}

#[test]
fn test_left_outer_join() {
    let stmt = select("select u from User u left outer join u.roles r");
    assert_eq!(stmt.from.unwrap().joins[0].kind, JoinKind::Left);
}

#[test]
fn test_join_fetch_positions_are_recorded() {
    let stmt = select("select u from User u join fetch u.roles left join fetch u.address");
    let from = stmt.from.unwrap();
    assert!(from.joins.iter().all(|j| j.fetch));
    assert_eq!(from.fetch_indices.len(), 2);
    for index in &from.fetch_indices {
        assert!(from.tokens[*index].is_word("fetch"));
    }
}

#[test]
fn test_join_with_on_condition() {
    let stmt = select("select u from User u join Role r on r.user = u.id where u.active = true");
    let from = stmt.from.as_ref().unwrap();
    assert_eq!(from.joins.len(), 1);
    assert!(stmt.where_clause.is_some());
}

#[test]
fn test_left_as_function_is_not_a_join() {
    let stmt = select("select left(u.name, 3) from User u");
    assert_eq!(stmt.select.items.len(), 1);
    assert!(stmt.from.unwrap().joins.is_empty());
}

#[test]
fn test_comma_separated_range_declarations() {
    let stmt = select("select u from User u, Role r where r.user = u");
    let from = stmt.from.unwrap();
    assert_eq!(from.root_alias.as_deref(), Some("u"));
}

#[test]
fn test_comma_separated_join_declarations() {
    let stmt = select(
        "select p from Person p left outer join x.foo as b2, left join x.bar as foo where x.b = 1",
    );
    let from = stmt.from.as_ref().unwrap();
    assert_eq!(from.root_alias.as_deref(), Some("p"));
    assert_eq!(from.joins.len(), 2);
    assert_eq!(from.joins[0].alias.as_deref(), Some("b2"));
    assert_eq!(from.joins[1].alias.as_deref(), Some("foo"));
    assert!(stmt.where_clause.is_some());
}

// ========================================================================
// Reserved words as identifiers
// ========================================================================

#[test]
fn test_reserved_words_in_paths() {
    let stmt = select("select u.order from User u where u.order.value > 1");
    assert_eq!(render_tokens(&stmt.select.items[0].tokens), "u.order");
    assert!(stmt.where_clause.is_some());
    assert!(stmt.order_by.is_none());
}

#[test]
fn test_group_as_alias_requires_by_to_open_clause() {
    let stmt = select("select g from Group g where g.name = :name");
    assert_eq!(stmt.from.unwrap().root_alias.as_deref(), Some("g"));
    assert!(stmt.group_by.is_none());
}

// ========================================================================
// Tail clauses
// ========================================================================

#[test]
fn test_clause_runs_keep_their_keywords() {
    let stmt = select(
        "select u from User u where u.age > 18 group by u.city having count(u) > 1 order by u.name",
    );
    assert!(render_tokens(stmt.where_clause.as_ref().unwrap()).starts_with("where"));
    assert!(render_tokens(stmt.group_by.as_ref().unwrap()).starts_with("group by"));
    assert!(render_tokens(stmt.having.as_ref().unwrap()).starts_with("having"));
    assert_eq!(
        render_tokens(stmt.order_by.as_ref().unwrap()),
        "order by u.name"
    );
}

#[test]
fn test_order_by_inside_subselect_is_not_top_level() {
    let stmt = select(
        "select u from User u where u.id in (select o.user from Orders o order by o.total)",
    );
    assert!(stmt.order_by.is_none());
}

#[test]
fn test_union_arms_are_collected() {
    let stmt = select("select u.name from User u union all select c.name from Customer c");
    assert_eq!(stmt.set_ops.len(), 1);
    assert_eq!(render_tokens(&stmt.set_ops[0].operator), "union all");
    assert!(render_tokens(&stmt.set_ops[0].body).starts_with("select"));
}

#[test]
fn test_order_by_after_set_operation_is_top_level() {
    let stmt =
        select("select u.name from User u union select c.name from Customer c order by 1");
    assert_eq!(stmt.set_ops.len(), 1);
    assert_eq!(render_tokens(stmt.order_by.as_ref().unwrap()), "order by 1");
}

// ========================================================================
// WITH clauses
// ========================================================================

#[test]
fn test_with_clause() {
    let parsed = parse("with adults as (select u from User u where u.age >= 18) select a from adults a").unwrap();
    let with = parsed.with.as_ref().unwrap();
    assert_eq!(with.items.len(), 1);
    assert_eq!(with.items[0].name, "adults");
    assert!(parsed.as_select().is_some());
}

#[test]
fn test_multiple_ctes() {
    let parsed = parse(
        "with a as (select u from User u), b as (select r from Role r) select x from a x",
    )
    .unwrap();
    assert_eq!(parsed.with.unwrap().items.len(), 2);
}

// ========================================================================
// Dialects
// ========================================================================

#[test]
fn test_strict_dialect_rejects_with() {
    let err = parse_dialect("with a as (select u from User u) select x from a x", Dialect::Strict)
        .unwrap_err();
    assert!(matches!(err, OqlError::Syntax { .. }));
}

#[test]
fn test_strict_dialect_rejects_set_operations() {
    let err = parse_dialect(
        "select u from User u union select c from Customer c",
        Dialect::Strict,
    )
    .unwrap_err();
    assert!(matches!(err, OqlError::Syntax { .. }));
}

#[test]
fn test_strict_dialect_accepts_plain_select() {
    assert!(parse_dialect("select u from User u where u.age > ?1", Dialect::Strict).is_ok());
}

// ========================================================================
// Bulk statements
// ========================================================================

#[test]
fn test_update_alias() {
    let parsed = parse("update User u set u.active = false where u.age < 18").unwrap();
    match parsed.statement {
        Statement::Update(raw) => assert_eq!(raw.alias.as_deref(), Some("u")),
        other => panic!("expected update, got {other:?}"),
    }
}

#[test]
fn test_delete_without_alias() {
    let parsed = parse("delete from User where User.active = false").unwrap();
    match parsed.statement {
        Statement::Delete(raw) => assert!(raw.alias.is_none()),
        other => panic!("expected delete, got {other:?}"),
    }
}

#[test]
fn test_insert_is_accepted_loosely() {
    let parsed =
        parse("insert into User (name, age) select c.name, c.age from Candidate c").unwrap();
    assert!(matches!(parsed.statement, Statement::Insert(_)));
}

// ========================================================================
// Errors
// ========================================================================

#[test]
fn test_unbalanced_parenthesis_fails() {
    assert!(parse("select count(u from User u").is_err());
}

#[test]
fn test_trailing_garbage_fails() {
    assert!(parse("select u from User u )").is_err());
}

#[test]
fn test_empty_input_fails() {
    assert!(parse("").is_err());
    assert!(parse("   ").is_err());
}

#[test]
fn test_non_statement_fails() {
    let err = parse("explain select u from User u").unwrap_err();
    assert!(matches!(err, OqlError::Syntax { .. }));
}
