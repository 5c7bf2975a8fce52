//! Predicate construction and rendering.
//!
//! Predicates are one tagged union folded into text by [`Predicate::render`];
//! there is no trait-object hierarchy behind them.

use crate::error::OqlResult;

use super::{EscapeCharacter, Expression, RenderContext};

/// Start a predicate over an expression (usually a path).
pub fn where_(expression: Expression) -> WhereStep {
    WhereStep { expression }
}

/// Chooses the comparison applied to one left-hand expression.
#[derive(Debug, Clone)]
pub struct WhereStep {
    expression: Expression,
}

impl WhereStep {
    pub fn eq(self, value: Expression) -> Predicate {
        self.compare("=", value)
    }

    pub fn neq(self, value: Expression) -> Predicate {
        self.compare("!=", value)
    }

    pub fn gt(self, value: Expression) -> Predicate {
        self.compare(">", value)
    }

    pub fn gte(self, value: Expression) -> Predicate {
        self.compare(">=", value)
    }

    pub fn lt(self, value: Expression) -> Predicate {
        self.compare("<", value)
    }

    pub fn lte(self, value: Expression) -> Predicate {
        self.compare("<=", value)
    }

    pub fn between(self, lower: Expression, upper: Expression) -> Predicate {
        Predicate::Between {
            expression: self.expression,
            lower,
            upper,
        }
    }

    /// `LIKE <pattern> ESCAPE '<escape>'`.
    pub fn like(self, pattern: Expression, escape: EscapeCharacter) -> Predicate {
        Predicate::Like {
            expression: self.expression,
            pattern,
            escape,
            negated: false,
        }
    }

    pub fn not_like(self, pattern: Expression, escape: EscapeCharacter) -> Predicate {
        Predicate::Like {
            expression: self.expression,
            pattern,
            escape,
            negated: true,
        }
    }

    /// `IN (<operand>)`; an already-parenthesized operand is not re-wrapped.
    pub fn in_(self, operand: Expression) -> Predicate {
        Predicate::In {
            expression: self.expression,
            operand,
            negated: false,
        }
    }

    pub fn not_in(self, operand: Expression) -> Predicate {
        Predicate::In {
            expression: self.expression,
            operand,
            negated: true,
        }
    }

    pub fn is_empty(self) -> Predicate {
        self.test("IS EMPTY")
    }

    pub fn is_not_empty(self) -> Predicate {
        self.test("IS NOT EMPTY")
    }

    pub fn is_null(self) -> Predicate {
        self.test("IS NULL")
    }

    pub fn is_not_null(self) -> Predicate {
        self.test("IS NOT NULL")
    }

    pub fn is_true(self) -> Predicate {
        self.test("IS TRUE")
    }

    pub fn is_false(self) -> Predicate {
        self.test("IS FALSE")
    }

    /// `<value> MEMBER OF <path>`.
    pub fn member_of(self, value: Expression) -> Predicate {
        Predicate::MemberOf {
            value,
            path: self.expression,
            negated: false,
        }
    }

    pub fn not_member_of(self, value: Expression) -> Predicate {
        Predicate::MemberOf {
            value,
            path: self.expression,
            negated: true,
        }
    }

    fn compare(self, operator: &'static str, value: Expression) -> Predicate {
        Predicate::Comparison {
            left: self.expression,
            operator,
            right: value,
        }
    }

    fn test(self, form: &'static str) -> Predicate {
        Predicate::Test {
            expression: self.expression,
            form,
        }
    }
}

/// A composable boolean condition.
#[derive(Debug, Clone)]
pub enum Predicate {
    Comparison {
        left: Expression,
        operator: &'static str,
        right: Expression,
    },
    Between {
        expression: Expression,
        lower: Expression,
        upper: Expression,
    },
    Like {
        expression: Expression,
        pattern: Expression,
        escape: EscapeCharacter,
        negated: bool,
    },
    In {
        expression: Expression,
        operand: Expression,
        negated: bool,
    },
    Test {
        expression: Expression,
        form: &'static str,
    },
    MemberOf {
        value: Expression,
        path: Expression,
        negated: bool,
    },
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Nested(Box<Predicate>),
}

impl Predicate {
    pub fn and(self, other: Predicate) -> Predicate {
        Predicate::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Predicate) -> Predicate {
        Predicate::Or(Box::new(self), Box::new(other))
    }

    /// Wrap in parentheses for grouping.
    pub fn nest(self) -> Predicate {
        Predicate::Nested(Box::new(self))
    }

    pub fn render(&self, ctx: &mut RenderContext) -> OqlResult<String> {
        match self {
            Predicate::Comparison {
                left,
                operator,
                right,
            } => Ok(format!(
                "{} {} {}",
                left.render(ctx)?,
                operator,
                right.render(ctx)?
            )),
            Predicate::Between {
                expression,
                lower,
                upper,
            } => Ok(format!(
                "{} BETWEEN {} AND {}",
                expression.render(ctx)?,
                lower.render(ctx)?,
                upper.render(ctx)?
            )),
            Predicate::Like {
                expression,
                pattern,
                escape,
                negated,
            } => Ok(format!(
                "{} {} {} ESCAPE '{}'",
                expression.render(ctx)?,
                if *negated { "NOT LIKE" } else { "LIKE" },
                pattern.render(ctx)?,
                escape.0
            )),
            Predicate::In {
                expression,
                operand,
                negated,
            } => Ok(format!(
                "{} {} {}",
                expression.render(ctx)?,
                if *negated { "NOT IN" } else { "IN" },
                parenthesized(&operand.render(ctx)?)
            )),
            Predicate::Test { expression, form } => {
                Ok(format!("{} {}", expression.render(ctx)?, form))
            }
            Predicate::MemberOf {
                value,
                path,
                negated,
            } => Ok(format!(
                "{} {} {}",
                value.render(ctx)?,
                if *negated { "NOT MEMBER OF" } else { "MEMBER OF" },
                path.render(ctx)?
            )),
            Predicate::And(left, right) => {
                Ok(format!("{} AND {}", left.render(ctx)?, right.render(ctx)?))
            }
            Predicate::Or(left, right) => {
                Ok(format!("{} OR {}", left.render(ctx)?, right.render(ctx)?))
            }
            Predicate::Nested(inner) => Ok(format!("({})", inner.render(ctx)?)),
        }
    }
}

/// Wrap an `IN` operand, avoiding a double wrap around operands that are
/// already parenthesized (explicit lists, sub-selects). Commas outside
/// string literals are rendered with a single trailing space.
fn parenthesized(operand: &str) -> String {
    let trimmed = operand.trim();
    if trimmed.starts_with('(') && trimmed.ends_with(')') {
        spaced_commas(trimmed)
    } else {
        format!("({})", spaced_commas(trimmed))
    }
}

fn spaced_commas(list: &str) -> String {
    let mut out = String::with_capacity(list.len() + 4);
    let mut in_string = false;
    let mut chars = list.chars().peekable();
    while let Some(c) = chars.next() {
        out.push(c);
        if c == '\'' {
            in_string = !in_string;
        } else if c == ',' && !in_string && chars.peek().is_some_and(|n| !n.is_whitespace()) {
            out.push(' ');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{entity, expression, literal, numeric, parameter};

    fn render(predicate: Predicate) -> String {
        predicate.render(&mut RenderContext::new()).unwrap()
    }

    #[test]
    fn comparison_forms() {
        let user = entity("com.example.User");
        assert_eq!(
            render(where_(user.get("age")).gte(numeric(18))),
            "u.age >= 18"
        );
        assert_eq!(
            render(where_(user.get("name")).neq(parameter("name"))),
            "u.name != :name"
        );
    }

    #[test]
    fn between_renders_both_bounds() {
        let user = entity("com.example.User");
        assert_eq!(
            render(where_(user.get("age")).between(numeric(18), numeric(65))),
            "u.age BETWEEN 18 AND 65"
        );
    }

    #[test]
    fn like_carries_the_escape_character() {
        let user = entity("com.example.User");
        assert_eq!(
            render(where_(user.get("name")).like(literal("Al%"), EscapeCharacter('\\'))),
            "u.name LIKE 'Al%' ESCAPE '\\'"
        );
        assert_eq!(
            render(where_(user.get("name")).not_like(literal("Al%"), EscapeCharacter('!'))),
            "u.name NOT LIKE 'Al%' ESCAPE '!'"
        );
    }

    #[test]
    fn in_wraps_bare_lists() {
        let user = entity("com.example.User");
        assert_eq!(
            render(where_(user.get("country")).in_(expression("'AT', 'DE'"))),
            "u.country IN ('AT', 'DE')"
        );
    }

    #[test]
    fn in_does_not_double_wrap() {
        let user = entity("com.example.User");
        assert_eq!(
            render(where_(user.get("country")).in_(expression("('AT','DE')"))),
            "u.country IN ('AT', 'DE')"
        );
    }

    #[test]
    fn in_list_commas_inside_literals_are_untouched() {
        let user = entity("com.example.User");
        assert_eq!(
            render(where_(user.get("country")).in_(expression("('A,T','DE')"))),
            "u.country IN ('A,T', 'DE')"
        );
    }

    #[test]
    fn fixed_test_forms() {
        let user = entity("com.example.User");
        assert_eq!(render(where_(user.get("roles")).is_empty()), "u.roles IS EMPTY");
        assert_eq!(
            render(where_(user.get("manager")).is_not_null()),
            "u.manager IS NOT NULL"
        );
        assert_eq!(render(where_(user.get("active")).is_true()), "u.active IS TRUE");
    }

    #[test]
    fn member_of_puts_the_value_first() {
        let user = entity("com.example.User");
        assert_eq!(
            render(where_(user.get("roles")).member_of(parameter("role"))),
            ":role MEMBER OF u.roles"
        );
    }

    #[test]
    fn and_or_compose_left_to_right() {
        let user = entity("com.example.User");
        let predicate = where_(user.get("age")).gte(numeric(18))
            .and(where_(user.get("active")).is_true())
            .or(where_(user.get("admin")).is_true());
        assert_eq!(
            render(predicate),
            "u.age >= 18 AND u.active IS TRUE OR u.admin IS TRUE"
        );
    }

    #[test]
    fn nesting_adds_exactly_one_pair_of_parentheses() {
        let user = entity("com.example.User");
        let predicate = where_(user.get("a")).is_true()
            .or(where_(user.get("b")).is_true())
            .nest()
            .and(where_(user.get("c")).is_true());
        assert_eq!(
            render(predicate),
            "(u.a IS TRUE OR u.b IS TRUE) AND u.c IS TRUE"
        );
    }
}
