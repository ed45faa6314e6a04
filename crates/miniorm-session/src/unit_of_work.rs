//! The unit of work: identity map, change registries, and commit
//! orchestration.
//!
//! A `UnitOfWork` is an explicitly constructed context — one per logical
//! transaction or request, never shared between them. It owns the query
//! executor, the per-context identity cache, the identity map of clean
//! entities, and the three disjoint change registries (new, dirty, removed).
//!
//! `commit()` flushes every registered change in one pass: inserts per class
//! in dependency order, updates in the same order, deletions in reverse
//! order, then resets all registries. There is no rollback; a failing step
//! aborts the remaining ones and already-flushed rows stay flushed, so
//! callers wanting atomicity wrap the commit in an external transaction.

use crate::commit_order::CommitOrderCalculator;
use crate::mapper::DataMapper;
use crate::registry::{EntityRegistry, IdentityMap};
use miniorm_core::{
    read_entity, Association, Entity, EntityRef, Identity, IdentityCache, MetadataProvider,
    Result, TransformRegistry,
};
use miniorm_query::{Expression, QueryExecutor, SelectOptions};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// Transaction-scoped registry of loaded and pending entities.
pub struct UnitOfWork {
    executor: Box<dyn QueryExecutor>,
    identities: IdentityCache,
    clean: RwLock<IdentityMap>,
    new: RwLock<EntityRegistry>,
    dirty: RwLock<EntityRegistry>,
    removed: RwLock<EntityRegistry>,
    debug: AtomicBool,
}

impl UnitOfWork {
    /// Build a unit of work over an executor, a metadata provider, and a
    /// transform registry.
    #[must_use]
    pub fn new(
        executor: Box<dyn QueryExecutor>,
        provider: Arc<dyn MetadataProvider>,
        transforms: TransformRegistry,
    ) -> Self {
        Self {
            executor,
            identities: IdentityCache::new(provider, transforms),
            clean: RwLock::new(IdentityMap::new()),
            new: RwLock::new(EntityRegistry::new()),
            dirty: RwLock::new(EntityRegistry::new()),
            removed: RwLock::new(EntityRegistry::new()),
            debug: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn executor(&self) -> &dyn QueryExecutor {
        self.executor.as_ref()
    }

    /// Gate verbose tracing of mapper activity.
    pub fn set_debug(&self, debug: bool) {
        self.debug.store(debug, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    /// The memoized identity for a class.
    pub fn identity(&self, class_name: &str) -> Result<Arc<Identity>> {
        self.identities.identity(class_name)
    }

    /// The identity of an entity's concrete class.
    pub fn identity_of(&self, entity: &EntityRef) -> Result<Arc<Identity>> {
        self.identity(read_entity(entity).class_name())
    }

    /// A data mapper for a class.
    pub fn mapper(&self, class_name: &str) -> Result<DataMapper<'_>> {
        Ok(DataMapper::new(self, self.identity(class_name)?))
    }

    // ------------------------------------------------------------------
    // Finders
    // ------------------------------------------------------------------

    /// Count rows of a class matching an optional filter.
    pub fn count(&self, class_name: &str, filter: Option<&Expression>) -> Result<u64> {
        self.mapper(class_name)?.count(filter)
    }

    /// Find one entity by id.
    pub fn find_by_id(&self, class_name: &str, id: i64) -> Result<Option<EntityRef>> {
        self.mapper(class_name)?
            .find_single(&Expression::eq(miniorm_core::ID_COLUMN, id))
    }

    /// Find at most one entity matching the filter.
    pub fn find_single(&self, class_name: &str, filter: &Expression) -> Result<Option<EntityRef>> {
        self.mapper(class_name)?.find_single(filter)
    }

    /// Find all entities matching the filter.
    pub fn find_multiple(
        &self,
        class_name: &str,
        filter: &Expression,
        options: &SelectOptions,
    ) -> Result<Vec<EntityRef>> {
        self.mapper(class_name)?.find_multiple(filter, options)
    }

    // ------------------------------------------------------------------
    // Registries
    // ------------------------------------------------------------------

    /// Identity-map lookup, keyed by the root class of `class_name`.
    pub fn get_cached(&self, class_name: &str, id: i64) -> Result<Option<EntityRef>> {
        let root = self.identity(class_name)?.root_class();
        Ok(self
            .clean
            .read()
            .expect("identity map lock poisoned")
            .get(root.class_name(), id))
    }

    /// Cache a loaded entity as clean under its root class and id.
    ///
    /// First writer wins; later loads of the same row return the instance
    /// cached here. Entities without an id are not cacheable and are
    /// skipped.
    pub fn register_clean(&self, entity: &EntityRef) -> Result<()> {
        let (class_name, id) = {
            let guard = read_entity(entity);
            (guard.class_name(), guard.id())
        };
        let Some(id) = id else {
            tracing::trace!(class = class_name, "skipping clean registration without id");
            return Ok(());
        };

        let root = self.identity(class_name)?.root_class();
        let inserted = self
            .clean
            .write()
            .expect("identity map lock poisoned")
            .insert(root.class_name(), id, entity);
        tracing::trace!(
            class = class_name,
            root = root.class_name(),
            id,
            inserted,
            "registered clean entity"
        );
        Ok(())
    }

    /// Register a freshly created entity for insertion.
    pub fn register_new(&self, entity: &EntityRef) {
        self.new
            .write()
            .expect("registry lock poisoned")
            .insert(entity);
    }

    /// Register a mutated entity for update.
    ///
    /// No-op for entities already registered new: an unsaved entity cannot
    /// be dirty, it is simply new.
    pub fn register_dirty(&self, entity: &EntityRef) {
        let hash = read_entity(entity).entity_hash().clone();
        if self
            .new
            .read()
            .expect("registry lock poisoned")
            .contains(&hash)
        {
            tracing::trace!("entity already registered new, dirty registration skipped");
            return;
        }
        self.dirty
            .write()
            .expect("registry lock poisoned")
            .insert(entity);
    }

    /// Register an entity for deletion.
    pub fn register_removed(&self, entity: &EntityRef) {
        self.removed
            .write()
            .expect("registry lock poisoned")
            .insert(entity);
    }

    /// Whether any insert, update, or deletion is pending.
    #[must_use]
    pub fn has_pending_changes(&self) -> bool {
        !self.new.read().expect("registry lock poisoned").is_empty()
            || !self.dirty.read().expect("registry lock poisoned").is_empty()
            || !self
                .removed
                .read()
                .expect("registry lock poisoned")
                .is_empty()
    }

    // ------------------------------------------------------------------
    // Commit
    // ------------------------------------------------------------------

    /// Flush all pending changes in dependency order, then reset.
    ///
    /// Per class in commit order: inserts; per class in the same order:
    /// updates; per class in reverse order: deletions. Any failure
    /// propagates immediately and aborts the remaining steps.
    #[tracing::instrument(level = "info", skip(self))]
    pub fn commit(&self) -> Result<()> {
        let pending: Vec<EntityRef> = self
            .new
            .read()
            .expect("registry lock poisoned")
            .entries()
            .into_iter()
            .chain(self.dirty.read().expect("registry lock poisoned").entries())
            .chain(
                self.removed
                    .read()
                    .expect("registry lock poisoned")
                    .entries(),
            )
            .collect();

        let mut identities: Vec<Arc<Identity>> = Vec::new();
        for entity in &pending {
            let identity = self.identity_of(entity)?;
            if !identities
                .iter()
                .any(|known| known.class_name() == identity.class_name())
            {
                identities.push(identity);
            }
        }

        let commit_order = self.commit_order(&identities)?;
        tracing::debug!(
            classes = ?commit_order,
            pending = pending.len(),
            "computed commit order"
        );

        for class_name in &commit_order {
            self.execute_inserts(class_name)?;
        }
        for class_name in &commit_order {
            self.execute_updates(class_name)?;
        }
        for class_name in commit_order.iter().rev() {
            self.execute_deletions(class_name)?;
        }

        self.cleanup();
        Ok(())
    }

    /// Insert all new entities that are instances of `class_name`, through
    /// that class's own mapper.
    ///
    /// Subclass entities match their ancestors' passes too; that is what
    /// writes each level of a joined inheritance chain.
    pub fn execute_inserts(&self, class_name: &str) -> Result<()> {
        let pending = self.new.read().expect("registry lock poisoned").entries();
        for entity in pending {
            if self.is_instance_of(&entity, class_name)? {
                self.mapper(class_name)?.insert(&entity)?;
            }
        }
        Ok(())
    }

    /// Update all dirty entities that are instances of `class_name`.
    pub fn execute_updates(&self, class_name: &str) -> Result<()> {
        let pending = self.dirty.read().expect("registry lock poisoned").entries();
        for entity in pending {
            if self.is_instance_of(&entity, class_name)? {
                self.mapper(class_name)?.update(&entity)?;
            }
        }
        Ok(())
    }

    /// Delete all removed entities that are instances of `class_name`.
    pub fn execute_deletions(&self, class_name: &str) -> Result<()> {
        let pending = self
            .removed
            .read()
            .expect("registry lock poisoned")
            .entries();
        for entity in pending {
            if self.is_instance_of(&entity, class_name)? {
                self.mapper(class_name)?.delete(&entity)?;
            }
        }
        Ok(())
    }

    fn is_instance_of(&self, entity: &EntityRef, class_name: &str) -> Result<bool> {
        Ok(self.identity_of(entity)?.descends_from(class_name))
    }

    /// Compute the global commit order for a set of identities.
    ///
    /// Each class depends on its base class and on the target of every
    /// owning association. The graph is expanded transitively: discovered
    /// dependency classes get nodes of their own even when they have no
    /// pending entities, so the ordering is well-defined.
    pub fn commit_order(&self, identities: &[Arc<Identity>]) -> Result<Vec<String>> {
        let mut calculator = CommitOrderCalculator::new();
        let mut queue: Vec<Arc<Identity>> = identities.to_vec();

        while let Some(identity) = queue.pop() {
            if !calculator.add_node(identity.class_name()) {
                continue;
            }

            if let Some(base) = identity.base_class() {
                calculator.add_dependency(identity.class_name(), base.class_name());
                queue.push(Arc::clone(base));
            }

            for property in identity.properties() {
                if let Some(association) = property.association() {
                    if association.is_owning() {
                        let reference = self.identity(association.target())?;
                        calculator.add_dependency(identity.class_name(), reference.class_name());
                        queue.push(reference);
                    }
                }
            }
        }

        calculator.calculate()
    }

    /// Reset the identity map and all change registries.
    ///
    /// After cleanup the unit of work has no knowledge of previously loaded
    /// entities; callers re-load what they still need.
    pub fn cleanup(&self) {
        self.clean
            .write()
            .expect("identity map lock poisoned")
            .clear();
        self.new.write().expect("registry lock poisoned").clear();
        self.dirty.write().expect("registry lock poisoned").clear();
        self.removed.write().expect("registry lock poisoned").clear();
        tracing::debug!("unit of work reset");
    }

    // ------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------

    /// Serialize an entity to a JSON object.
    ///
    /// Properties are merged across the base-class chain (subclass
    /// definitions win). Owning one-to-one references nest their full
    /// serialization; inverse one-to-one and many-to-one references
    /// flatten to `<name>ID`; one-to-many collections nest as arrays.
    pub fn serialize(&self, entity: &EntityRef) -> Result<serde_json::Value> {
        let identity = self.identity_of(entity)?;

        let mut chain = vec![Arc::clone(&identity)];
        let mut current = Arc::clone(&identity);
        while let Some(base) = current.base_class().map(Arc::clone) {
            chain.push(Arc::clone(&base));
            current = base;
        }

        // Capture values under one short-lived read guard, then serialize
        // references after it is released.
        let mut captured: Vec<(String, Option<Association>, miniorm_core::FieldValue)> =
            Vec::new();
        let (class_name, id_value) = {
            let guard = read_entity(entity);
            let mut seen = std::collections::HashSet::new();
            for level in &chain {
                for property in level.properties() {
                    if property.name() == miniorm_core::ID_COLUMN
                        || !seen.insert(property.name().to_string())
                    {
                        continue;
                    }
                    captured.push((
                        property.name().to_string(),
                        property.association().cloned(),
                        property.get(&*guard),
                    ));
                }
            }
            let id_value = identity
                .identifier()
                .get(&*guard)
                .into_scalar()
                .unwrap_or(miniorm_core::Value::Null);
            (guard.class_name(), id_value)
        };

        let mut object = serde_json::Map::new();
        object.insert("id".to_string(), id_value.to_json());
        object.insert("class".to_string(), json!(class_name));

        for (name, association, value) in captured {
            if value.is_null() {
                object.insert(name, serde_json::Value::Null);
                continue;
            }

            match association {
                None => {
                    let scalar = value
                        .into_scalar()
                        .unwrap_or(miniorm_core::Value::Null);
                    object.insert(name, scalar.to_json());
                }
                Some(Association::OneToOne {
                    mapped_by: None, ..
                }) => {
                    if let Some(target) = value.into_reference() {
                        object.insert(name, self.serialize(&target)?);
                    }
                }
                Some(
                    Association::OneToOne {
                        mapped_by: Some(_), ..
                    }
                    | Association::ManyToOne { .. },
                ) => {
                    if let Some(target) = value.into_reference() {
                        let target_id = read_entity(&target).id();
                        object.insert(format!("{name}ID"), json!(target_id));
                    }
                }
                Some(Association::OneToMany { .. }) => {
                    let mut serialized = Vec::new();
                    for member in value.into_collection().unwrap_or_default() {
                        serialized.push(self.serialize(&member)?);
                    }
                    object.insert(name, serde_json::Value::Array(serialized));
                }
            }
        }

        Ok(serde_json::Value::Object(object))
    }
}

impl std::fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWork")
            .field(
                "clean",
                &self.clean.read().expect("identity map lock poisoned").len(),
            )
            .field("new", &self.new.read().expect("registry lock poisoned").len())
            .field(
                "dirty",
                &self.dirty.read().expect("registry lock poisoned").len(),
            )
            .field(
                "removed",
                &self.removed.read().expect("registry lock poisoned").len(),
            )
            .finish_non_exhaustive()
    }
}
