//! Boolean filter expressions.
//!
//! Row filters are expression trees: leaf `Condition`s comparing one column
//! against a literal, combined by n-ary `Conjunction` (AND) and `Disjunction`
//! (OR) nodes. An expression can render itself to a textual predicate for
//! the query executor, or evaluate itself directly against a [`Row`].

use miniorm_core::{Error, Result, Row, Value};
use std::cmp::Ordering;
use std::fmt;

/// Comparison operator of a leaf condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Gt,
    Lt,
    Ge,
    Le,
}

impl Comparison {
    /// The textual operator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::Gt => ">",
            Comparison::Lt => "<",
            Comparison::Ge => ">=",
            Comparison::Le => "<=",
        }
    }

    /// Whether an ordering between two values satisfies this comparison.
    #[must_use]
    pub const fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Comparison::Eq => matches!(ordering, Ordering::Equal),
            Comparison::Gt => matches!(ordering, Ordering::Greater),
            Comparison::Lt => matches!(ordering, Ordering::Less),
            Comparison::Ge => matches!(ordering, Ordering::Greater | Ordering::Equal),
            Comparison::Le => matches!(ordering, Ordering::Less | Ordering::Equal),
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A boolean filter over rows.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// `property <op> literal`.
    Condition {
        property: String,
        comparison: Comparison,
        value: Value,
    },
    /// All inner expressions must hold. Empty conjunctions hold.
    Conjunction(Vec<Expression>),
    /// At least one inner expression must hold. Empty disjunctions never do.
    Disjunction(Vec<Expression>),
}

impl Expression {
    /// A leaf condition.
    #[must_use]
    pub fn condition(
        property: impl Into<String>,
        comparison: Comparison,
        value: impl Into<Value>,
    ) -> Self {
        Expression::Condition {
            property: property.into(),
            comparison,
            value: value.into(),
        }
    }

    #[must_use]
    pub fn eq(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::condition(property, Comparison::Eq, value)
    }

    #[must_use]
    pub fn gt(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::condition(property, Comparison::Gt, value)
    }

    #[must_use]
    pub fn lt(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::condition(property, Comparison::Lt, value)
    }

    #[must_use]
    pub fn ge(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::condition(property, Comparison::Ge, value)
    }

    #[must_use]
    pub fn le(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::condition(property, Comparison::Le, value)
    }

    /// Conjunction of the given expressions.
    #[must_use]
    pub fn all(expressions: Vec<Expression>) -> Self {
        Expression::Conjunction(expressions)
    }

    /// Disjunction of the given expressions.
    #[must_use]
    pub fn any(expressions: Vec<Expression>) -> Self {
        Expression::Disjunction(expressions)
    }

    /// Combine with AND. Extends an existing conjunction in place.
    #[must_use]
    pub fn and(self, other: Expression) -> Self {
        match self {
            Expression::Conjunction(mut inner) => {
                inner.push(other);
                Expression::Conjunction(inner)
            }
            first => Expression::Conjunction(vec![first, other]),
        }
    }

    /// Combine with OR. Extends an existing disjunction in place.
    #[must_use]
    pub fn or(self, other: Expression) -> Self {
        match self {
            Expression::Disjunction(mut inner) => {
                inner.push(other);
                Expression::Disjunction(inner)
            }
            first => Expression::Disjunction(vec![first, other]),
        }
    }

    /// Render the textual predicate.
    ///
    /// String literals are double-quoted with embedded quotes and
    /// backslashes escaped.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Expression::Condition {
                property,
                comparison,
                value,
            } => format!("{property} {comparison} {}", render_literal(value)),
            Expression::Conjunction(inner) => render_group(inner, " AND "),
            Expression::Disjunction(inner) => render_group(inner, " OR "),
        }
    }

    /// Evaluate this filter against a row.
    ///
    /// A condition on a column the row does not carry, or whose stored value
    /// is NULL, does not match. Comparing values of incompatible kinds is a
    /// `ValueError`.
    pub fn matches(&self, row: &Row) -> Result<bool> {
        match self {
            Expression::Condition {
                property,
                comparison,
                value,
            } => {
                let stored = row.get(property).unwrap_or(&Value::Null);
                Ok(compare_values(stored, value)?
                    .is_some_and(|ordering| comparison.accepts(ordering)))
            }
            Expression::Conjunction(inner) => {
                for expression in inner {
                    if !expression.matches(row)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Expression::Disjunction(inner) => {
                for expression in inner {
                    if expression.matches(row)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn render_group(inner: &[Expression], separator: &str) -> String {
    let rendered: Vec<String> = inner.iter().map(Expression::render).collect();
    format!("({})", rendered.join(separator))
}

fn render_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Text(s) => {
            let escaped = s.replace('\\', "\\\\").replace('"', "\\\"");
            format!("\"{escaped}\"")
        }
        Value::Bytes(b) => format!("0x{}", hex::encode(b)),
    }
}

/// Compare two scalar values.
///
/// Returns `None` when either side is NULL (NULL never compares), an
/// ordering for comparable kinds, and a `ValueError` for incomparable kinds.
pub fn compare_values(lhs: &Value, rhs: &Value) -> Result<Option<Ordering>> {
    let ordering = match (lhs, rhs) {
        (Value::Null, _) | (_, Value::Null) => return Ok(None),
        (Value::Int(a), Value::Int(b)) => a.cmp(b),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            let a = lhs.as_float().unwrap_or(f64::NAN);
            let b = rhs.as_float().unwrap_or(f64::NAN);
            return Ok(a.partial_cmp(&b));
        }
        (Value::Text(a), Value::Text(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
        _ => {
            return Err(Error::value(format!(
                "cannot compare {} to {}",
                lhs.kind(),
                rhs.kind()
            )));
        }
    };
    Ok(Some(ordering))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_rendering() {
        let expression = Expression::gt("id", 10)
            .and(Expression::lt("id", 20))
            .or(Expression::eq("name", "Test"));

        assert_eq!(
            expression.render(),
            "((id > 10 AND id < 20) OR name = \"Test\")"
        );
    }

    #[test]
    fn test_string_escaping() {
        let expression = Expression::eq("name", "say \"hi\" \\ bye");
        assert_eq!(
            expression.render(),
            "name = \"say \\\"hi\\\" \\\\ bye\""
        );
    }

    #[test]
    fn test_empty_groups_render() {
        assert_eq!(Expression::all(vec![]).render(), "()");
        assert_eq!(Expression::any(vec![]).render(), "()");
    }

    #[test]
    fn test_explicit_tree_construction() {
        let expression = Expression::any(vec![
            Expression::all(vec![Expression::gt("id", 10), Expression::lt("id", 20)]),
            Expression::eq("name", "Test"),
        ]);
        assert_eq!(
            expression.render(),
            "((id > 10 AND id < 20) OR name = \"Test\")"
        );
    }

    fn sample_row() -> Row {
        Row::from_pairs([
            ("id", Value::Int(15)),
            ("name", Value::Text("Test".into())),
            ("score", Value::Null),
        ])
    }

    #[test]
    fn test_condition_matching() {
        let row = sample_row();
        assert!(Expression::eq("id", 15).matches(&row).unwrap());
        assert!(Expression::gt("id", 10).matches(&row).unwrap());
        assert!(!Expression::gt("id", 15).matches(&row).unwrap());
        assert!(Expression::ge("id", 15).matches(&row).unwrap());
        assert!(Expression::le("id", 15).matches(&row).unwrap());
        assert!(Expression::eq("name", "Test").matches(&row).unwrap());
    }

    #[test]
    fn test_null_never_matches() {
        let row = sample_row();
        assert!(!Expression::eq("score", 1).matches(&row).unwrap());
        assert!(!Expression::eq("missing", 1).matches(&row).unwrap());
        assert!(!Expression::eq("id", Value::Null).matches(&row).unwrap());
    }

    #[test]
    fn test_group_matching() {
        let row = sample_row();
        let in_range = Expression::gt("id", 10).and(Expression::lt("id", 20));
        assert!(in_range.matches(&row).unwrap());

        let out_of_range = Expression::gt("id", 20).or(Expression::eq("name", "Test"));
        assert!(out_of_range.matches(&row).unwrap());

        assert!(Expression::all(vec![]).matches(&row).unwrap());
        assert!(!Expression::any(vec![]).matches(&row).unwrap());
    }

    #[test]
    fn test_incomparable_kinds_error() {
        let row = sample_row();
        let err = Expression::gt("name", 10).matches(&row).unwrap_err();
        assert!(matches!(err, Error::Value(_)));
    }

    #[test]
    fn test_numeric_cross_kind_comparison() {
        let row = Row::from_pairs([("ratio", Value::Float(1.5))]);
        assert!(Expression::gt("ratio", 1).matches(&row).unwrap());
        assert!(Expression::lt("ratio", 2).matches(&row).unwrap());
    }
}
