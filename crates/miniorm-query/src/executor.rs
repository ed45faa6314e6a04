//! The query executor collaborator interface.
//!
//! The mapping engine never speaks SQL itself; it drives an implementation
//! of [`QueryExecutor`] with table names, rows, and filter expressions. Every
//! operation is synchronous: it returns a result or fails, nothing suspends.

use crate::expr::Expression;
use crate::options::SelectOptions;
use miniorm_core::{Result, Row};

/// Catalog pseudo-table consulted for auto-increment metadata during id
/// generation. Executors backed by a real server pass this through to
/// `information_schema`; embedded executors synthesize it.
pub const CATALOG_TABLE: &str = "information_schema.tables";

/// Table-level database primitives the engine is built on.
///
/// Implementations are expected to render [`Expression`] predicates into
/// their native filter syntax (or evaluate them directly, as the in-memory
/// executor does).
pub trait QueryExecutor: Send + Sync {
    /// Fetch at most one row. `columns` restricts the projection; empty
    /// means all columns.
    fn select_one(
        &self,
        table: &str,
        columns: &[&str],
        predicate: Option<&Expression>,
    ) -> Result<Option<Row>>;

    /// Fetch all matching rows, honoring the select options.
    fn select_many(
        &self,
        table: &str,
        columns: &[&str],
        predicate: Option<&Expression>,
        options: &SelectOptions,
    ) -> Result<Vec<Row>>;

    /// Count matching rows.
    fn count(&self, table: &str, predicate: Option<&Expression>) -> Result<u64>;

    /// Insert a row, returning the generated (or echoed) id.
    fn insert(&self, table: &str, row: Row) -> Result<i64>;

    /// Update matching rows with the columns of `row`.
    fn update(&self, table: &str, row: Row, predicate: Option<&Expression>) -> Result<()>;

    /// Delete matching rows.
    fn delete(&self, table: &str, predicate: Option<&Expression>) -> Result<()>;

    /// The logical database name, used for catalog lookups.
    fn database_name(&self) -> &str;
}

impl<T: QueryExecutor + ?Sized> QueryExecutor for std::sync::Arc<T> {
    fn select_one(
        &self,
        table: &str,
        columns: &[&str],
        predicate: Option<&Expression>,
    ) -> Result<Option<Row>> {
        (**self).select_one(table, columns, predicate)
    }

    fn select_many(
        &self,
        table: &str,
        columns: &[&str],
        predicate: Option<&Expression>,
        options: &SelectOptions,
    ) -> Result<Vec<Row>> {
        (**self).select_many(table, columns, predicate, options)
    }

    fn count(&self, table: &str, predicate: Option<&Expression>) -> Result<u64> {
        (**self).count(table, predicate)
    }

    fn insert(&self, table: &str, row: Row) -> Result<i64> {
        (**self).insert(table, row)
    }

    fn update(&self, table: &str, row: Row, predicate: Option<&Expression>) -> Result<()> {
        (**self).update(table, row, predicate)
    }

    fn delete(&self, table: &str, predicate: Option<&Expression>) -> Result<()> {
        (**self).delete(table, predicate)
    }

    fn database_name(&self) -> &str {
        (**self).database_name()
    }
}
