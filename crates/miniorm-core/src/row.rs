//! Flat row representation.
//!
//! A `Row` is the shape the query executor speaks: an ordered mapping from
//! column name to scalar value, with O(1) name lookup. Rows carry an optional
//! `discriminator` column naming the concrete subclass when the mapped class
//! has registered subclasses.

use crate::value::Value;
use std::collections::HashMap;

/// Column holding the concrete subclass name for polymorphic rows.
pub const DISCRIMINATOR_COLUMN: &str = "discriminator";

/// Column holding the row identifier.
pub const ID_COLUMN: &str = "id";

/// A flat mapping from column name to scalar value.
#[derive(Debug, Clone, Default)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
    index: HashMap<String, usize>,
}

impl Row {
    /// Create an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from column/value pairs.
    #[must_use]
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let mut row = Self::new();
        for (column, value) in pairs {
            row.set(column, value);
        }
        row
    }

    /// Set a column value, overwriting any previous value for the column.
    pub fn set(&mut self, column: impl Into<String>, value: Value) {
        let column = column.into();
        if let Some(&i) = self.index.get(&column) {
            self.values[i] = value;
        } else {
            self.index.insert(column.clone(), self.columns.len());
            self.columns.push(column);
            self.values.push(value);
        }
    }

    /// Get a column value by name.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.index.get(column).map(|&i| &self.values[i])
    }

    /// The row identifier, if the `id` column is present and integral.
    #[must_use]
    pub fn id(&self) -> Option<i64> {
        self.get(ID_COLUMN).and_then(Value::as_int)
    }

    /// The concrete subclass name, if the discriminator column is set.
    #[must_use]
    pub fn discriminator(&self) -> Option<&str> {
        self.get(DISCRIMINATOR_COLUMN).and_then(Value::as_text)
    }

    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        self.index.contains_key(column)
    }

    /// Column names in insertion order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Iterate column/value pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut row = Row::new();
        row.set("id", Value::Int(1));
        row.set("name", Value::Text("x".into()));

        assert_eq!(row.get("id"), Some(&Value::Int(1)));
        assert_eq!(row.get("name"), Some(&Value::Text("x".into())));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn test_set_overwrites() {
        let mut row = Row::new();
        row.set("id", Value::Int(1));
        row.set("id", Value::Int(2));

        assert_eq!(row.id(), Some(2));
        assert_eq!(row.len(), 1);
    }

    #[test]
    fn test_discriminator() {
        let row = Row::from_pairs([
            ("id", Value::Int(3)),
            (DISCRIMINATOR_COLUMN, Value::Text("ArticlePage".into())),
        ]);
        assert_eq!(row.discriminator(), Some("ArticlePage"));

        let plain = Row::from_pairs([("id", Value::Int(3))]);
        assert_eq!(plain.discriminator(), None);

        let null = Row::from_pairs([(DISCRIMINATOR_COLUMN, Value::Null)]);
        assert_eq!(null.discriminator(), None);
    }

    #[test]
    fn test_iteration_preserves_order() {
        let row = Row::from_pairs([
            ("c", Value::Int(3)),
            ("a", Value::Int(1)),
            ("b", Value::Int(2)),
        ]);
        let order: Vec<&str> = row.iter().map(|(name, _)| name).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }
}
