//! Unit of work, identity map, data mapper, and commit ordering for MiniORM.
//!
//! `miniorm-session` is the persistence-coordination layer. It ties the
//! metadata model to the query executor:
//!
//! - **Identity map**: one in-memory instance per persisted row, partitioned
//!   by root class so inheritance chains share instances.
//! - **Change registries**: new/dirty/removed entities, keyed by identity
//!   hash, flushed in one commit pass.
//! - **Data mapper**: rows to entities and back, resolving associations by
//!   recursively consulting other mappers, with discriminator re-dispatch
//!   for polymorphic rows.
//! - **Commit order calculator**: a topological sort over class dependency
//!   graphs deciding insert/update/delete ordering, failing fast on cycles.
//!
//! # Example
//!
//! ```ignore
//! let uow = UnitOfWork::new(executor, provider, transforms);
//!
//! // Load entities; the identity map deduplicates instances.
//! let page = uow.find_by_id("Page", 1)?.unwrap();
//!
//! // Track changes explicitly.
//! uow.register_dirty(&page);
//!
//! // Flush inserts, updates, and deletions in dependency order.
//! uow.commit()?;
//! ```

pub mod commit_order;
pub mod mapper;
pub mod registry;
pub mod schema;
pub mod unit_of_work;

pub use commit_order::CommitOrderCalculator;
pub use mapper::DataMapper;
pub use registry::{EntityRegistry, IdentityMap};
pub use schema::SchemaRegistry;
pub use unit_of_work::UnitOfWork;
