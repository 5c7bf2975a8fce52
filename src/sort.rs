//! Sort specifications consumed by the sorting rewrite pass.

use serde::{Deserialize, Serialize};

/// Sort direction of one order term.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn keyword(self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

/// One requested order: a property reference plus direction and flags.
///
/// The property is normally a plain path (`firstname`, `address.city`).
/// Anything containing whitespace or parentheses is rejected by the sorting
/// pass unless the order is explicitly marked [`unsafe_expression`].
///
/// [`unsafe_expression`]: Order::allow_unsafe
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Order {
    pub property: String,
    pub direction: Direction,
    pub ignore_case: bool,
    /// Marks the property as an unchecked raw expression.
    pub unchecked: bool,
}

impl Order {
    pub fn asc(property: impl Into<String>) -> Self {
        Order {
            property: property.into(),
            direction: Direction::Asc,
            ignore_case: false,
            unchecked: false,
        }
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Order {
            property: property.into(),
            direction: Direction::Desc,
            ignore_case: false,
            unchecked: false,
        }
    }

    /// Request case-insensitive ordering (`lower(...)`).
    pub fn ignoring_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    /// Accept the property as a raw expression, bypassing the
    /// whitespace/parenthesis safety check.
    pub fn allow_unsafe(mut self) -> Self {
        self.unchecked = true;
        self
    }
}

/// An ordered list of [`Order`]s. Doubles as the sort part of cache keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sort {
    orders: Vec<Order>,
}

impl Sort {
    pub fn by(orders: impl IntoIterator<Item = Order>) -> Self {
        Sort {
            orders: orders.into_iter().collect(),
        }
    }

    pub fn unsorted() -> Self {
        Sort::default()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter()
    }

    /// Concatenate two sorts, keeping `self`'s terms first.
    pub fn and(mut self, other: Sort) -> Self {
        self.orders.extend(other.orders);
        self
    }
}

impl FromIterator<Order> for Sort {
    fn from_iter<I: IntoIterator<Item = Order>>(iter: I) -> Self {
        Sort::by(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_keeps_left_terms_first() {
        let sort = Sort::by([Order::asc("lastname")]).and(Sort::by([Order::desc("age")]));
        let props: Vec<&str> = sort.iter().map(|o| o.property.as_str()).collect();
        assert_eq!(props, ["lastname", "age"]);
    }

    #[test]
    fn unsorted_is_empty() {
        assert!(Sort::unsorted().is_empty());
        assert!(!Sort::by([Order::asc("a")]).is_empty());
    }
}
