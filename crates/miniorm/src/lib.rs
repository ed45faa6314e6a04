//! MiniORM: a data-mapper ORM engine.
//!
//! MiniORM maps in-memory domain objects to relational table rows, tracks
//! object lifecycle changes, and persists a batch of changes in one pass
//! respecting foreign-key dependency order.
//!
//! # Architecture
//!
//! - [`miniorm-core`](miniorm_core): entities, values, rows, and the
//!   metadata model — declarative class specs compiled into per-class
//!   identity descriptors with getter/setter closures.
//! - [`miniorm-query`](miniorm_query): filter expression trees, select
//!   options, and the `QueryExecutor` trait behind which SQL execution
//!   lives; includes an in-memory executor.
//! - [`miniorm-session`](miniorm_session): the unit of work (identity map
//!   plus new/dirty/removed registries), the data mapper, and the
//!   commit-order calculator.
//!
//! # Example
//!
//! ```ignore
//! use miniorm::*;
//!
//! let mut registry = MetadataRegistry::new();
//! registry.register(
//!     ClassSpec::new("Page", Page::fresh)
//!         .table("pages")
//!         .field(
//!             FieldSpec::new("title", "String", scalar_accessors(
//!                 |p: &Page| Value::from(p.title.clone()),
//!                 |p: &mut Page, v| p.title = v.as_text().map(str::to_string),
//!             ))
//!             .column(ColumnSpec::new("page_title", ColumnType::Binary).length(255)),
//!         ),
//! );
//!
//! let uow = UnitOfWork::new(
//!     Box::new(MemoryExecutor::new("wiki")),
//!     Arc::new(registry),
//!     TransformRegistry::new(),
//! );
//!
//! let page = uow.find_by_id("Page", 1)?;
//! uow.commit()?;
//! ```

pub use miniorm_core::*;
pub use miniorm_query::{
    compare_values, Comparison, Expression, MemoryExecutor, OrderBy, OrderDirection,
    QueryExecutor, SelectOptions, CATALOG_TABLE,
};
pub use miniorm_session::{
    CommitOrderCalculator, DataMapper, EntityRegistry, IdentityMap, SchemaRegistry, UnitOfWork,
};
