//! In-memory query executor.
//!
//! A table store that evaluates filter expressions directly against its
//! rows. Backs the test suites and any host that wants the engine without a
//! real database. Auto-increment ids are assigned per table, and the
//! `information_schema.tables` catalog is synthesized so id-reservation
//! lookups work like they do against a real server.

use crate::executor::{QueryExecutor, CATALOG_TABLE};
use crate::expr::{compare_values, Expression};
use crate::options::{OrderDirection, SelectOptions};
use miniorm_core::{Error, Result, Row, Value, ID_COLUMN};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Default)]
struct MemoryTable {
    rows: Vec<Row>,
    next_id: i64,
}

impl MemoryTable {
    fn new() -> Self {
        Self {
            rows: Vec::new(),
            next_id: 1,
        }
    }
}

/// A [`QueryExecutor`] over in-memory tables.
#[derive(Debug)]
pub struct MemoryExecutor {
    database: String,
    tables: RwLock<HashMap<String, MemoryTable>>,
}

impl MemoryExecutor {
    #[must_use]
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Ensure a table exists; idempotent.
    pub fn create_table(&self, table: &str) {
        self.tables
            .write()
            .expect("table store lock poisoned")
            .entry(table.to_string())
            .or_insert_with(MemoryTable::new);
    }

    /// Snapshot of all rows in a table, for assertions.
    pub fn rows(&self, table: &str) -> Result<Vec<Row>> {
        let tables = self.tables.read().expect("table store lock poisoned");
        let stored = tables
            .get(table)
            .ok_or_else(|| Error::database(format!("no such table `{table}`")))?;
        Ok(stored.rows.clone())
    }

    fn catalog_rows(&self) -> Vec<Row> {
        let tables = self.tables.read().expect("table store lock poisoned");
        let mut names: Vec<&String> = tables.keys().collect();
        names.sort_unstable();
        names
            .into_iter()
            .map(|name| {
                let table = &tables[name];
                Row::from_pairs([
                    ("table_schema", Value::Text(self.database.clone())),
                    ("table_name", Value::Text(name.clone())),
                    ("auto_increment", Value::Int(table.next_id)),
                ])
            })
            .collect()
    }

    fn select_rows(
        &self,
        table: &str,
        predicate: Option<&Expression>,
    ) -> Result<Vec<Row>> {
        let source = if table == CATALOG_TABLE {
            self.catalog_rows()
        } else {
            self.rows(table)?
        };

        let mut matched = Vec::new();
        for row in source {
            if filter_matches(predicate, &row)? {
                matched.push(row);
            }
        }
        Ok(matched)
    }
}

fn filter_matches(predicate: Option<&Expression>, row: &Row) -> Result<bool> {
    predicate.map_or(Ok(true), |p| p.matches(row))
}

fn project(row: Row, columns: &[&str]) -> Row {
    if columns.is_empty() {
        return row;
    }
    let mut projected = Row::new();
    for &column in columns {
        let value = row.get(column).cloned().unwrap_or(Value::Null);
        projected.set(column, value);
    }
    projected
}

fn apply_options(mut rows: Vec<Row>, options: &SelectOptions) -> Vec<Row> {
    // Stable sort per key, least significant first, so earlier order_by
    // entries take precedence.
    for order in options.order_by.iter().rev() {
        rows.sort_by(|a, b| {
            let lhs = a.get(&order.column).unwrap_or(&Value::Null);
            let rhs = b.get(&order.column).unwrap_or(&Value::Null);
            let ordering = compare_values(lhs, rhs)
                .ok()
                .flatten()
                .unwrap_or(Ordering::Equal);
            match order.direction {
                OrderDirection::Asc => ordering,
                OrderDirection::Desc => ordering.reverse(),
            }
        });
    }

    let offset = options.offset.unwrap_or(0) as usize;
    let rows: Vec<Row> = rows.into_iter().skip(offset).collect();
    match options.limit {
        Some(limit) => rows.into_iter().take(limit as usize).collect(),
        None => rows,
    }
}

impl QueryExecutor for MemoryExecutor {
    fn select_one(
        &self,
        table: &str,
        columns: &[&str],
        predicate: Option<&Expression>,
    ) -> Result<Option<Row>> {
        let matched = self.select_rows(table, predicate)?;
        tracing::trace!(table, matched = matched.len(), "select_one");
        Ok(matched.into_iter().next().map(|row| project(row, columns)))
    }

    fn select_many(
        &self,
        table: &str,
        columns: &[&str],
        predicate: Option<&Expression>,
        options: &SelectOptions,
    ) -> Result<Vec<Row>> {
        let matched = apply_options(self.select_rows(table, predicate)?, options);
        tracing::trace!(table, matched = matched.len(), "select_many");
        Ok(matched
            .into_iter()
            .map(|row| project(row, columns))
            .collect())
    }

    fn count(&self, table: &str, predicate: Option<&Expression>) -> Result<u64> {
        Ok(self.select_rows(table, predicate)?.len() as u64)
    }

    fn insert(&self, table: &str, mut row: Row) -> Result<i64> {
        let mut tables = self.tables.write().expect("table store lock poisoned");
        let stored = tables
            .entry(table.to_string())
            .or_insert_with(MemoryTable::new);

        let id = match row.id() {
            Some(explicit) => {
                stored.next_id = stored.next_id.max(explicit + 1);
                explicit
            }
            None => {
                let generated = stored.next_id;
                stored.next_id += 1;
                row.set(ID_COLUMN, Value::Int(generated));
                generated
            }
        };

        tracing::trace!(table, id, "insert");
        stored.rows.push(row);
        Ok(id)
    }

    fn update(&self, table: &str, row: Row, predicate: Option<&Expression>) -> Result<()> {
        let mut tables = self.tables.write().expect("table store lock poisoned");
        let stored = tables
            .get_mut(table)
            .ok_or_else(|| Error::database(format!("no such table `{table}`")))?;

        let mut updated = 0_usize;
        for existing in &mut stored.rows {
            if filter_matches(predicate, existing)? {
                for (column, value) in row.iter() {
                    existing.set(column, value.clone());
                }
                updated += 1;
            }
        }
        tracing::trace!(table, updated, "update");
        Ok(())
    }

    fn delete(&self, table: &str, predicate: Option<&Expression>) -> Result<()> {
        let mut tables = self.tables.write().expect("table store lock poisoned");
        let stored = tables
            .get_mut(table)
            .ok_or_else(|| Error::database(format!("no such table `{table}`")))?;

        let mut kept = Vec::with_capacity(stored.rows.len());
        let mut deleted = 0_usize;
        for row in stored.rows.drain(..) {
            if filter_matches(predicate, &row)? {
                deleted += 1;
            } else {
                kept.push(row);
            }
        }
        stored.rows = kept;
        tracing::trace!(table, deleted, "delete");
        Ok(())
    }

    fn database_name(&self) -> &str {
        &self.database
    }
}
