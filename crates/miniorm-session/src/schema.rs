//! Schema registration and dependency-safe table ordering.
//!
//! Hosts register the entity classes they persist; `update_list` yields the
//! mapped tables in global commit order, so tables can be created (or
//! migrated) with every referenced table already in place.

use crate::unit_of_work::UnitOfWork;
use miniorm_core::{Identity, Result};
use std::sync::Arc;

/// Registry of entity classes participating in schema management.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    classes: Vec<String>,
}

impl SchemaRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class; idempotent. Returns whether it was newly added.
    pub fn register(&mut self, class_name: &str) -> bool {
        if self.classes.iter().any(|c| c == class_name) {
            return false;
        }
        self.classes.push(class_name.to_string());
        true
    }

    /// Registered class names, in registration order.
    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// The registered classes' tables, in dependency-safe creation order:
    /// base tables before subclass tables, referenced tables before
    /// referencing ones.
    pub fn update_list(&self, unit_of_work: &UnitOfWork) -> Result<Vec<String>> {
        let identities: Vec<Arc<Identity>> = self
            .classes
            .iter()
            .map(|class| unit_of_work.identity(class))
            .collect::<Result<_>>()?;

        let commit_order = unit_of_work.commit_order(&identities)?;

        let mut tables = Vec::new();
        for class_name in commit_order {
            if self.classes.contains(&class_name) {
                tables.push(unit_of_work.identity(&class_name)?.table_name().to_string());
            }
        }
        Ok(tables)
    }
}
