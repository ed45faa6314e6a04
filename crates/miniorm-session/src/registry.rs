//! Entity registries and the identity map.
//!
//! The unit of work keeps three disjoint change registries (new, dirty,
//! removed), each keyed by entity identity hash so an entity appears at most
//! once no matter how many references to it exist, and an identity map of
//! clean entities partitioned by *root* class name — subclass rows share a
//! physical identity with their base row, so all classes of one inheritance
//! chain cache into the same partition.

use miniorm_core::{read_entity, Entity, EntityHash, EntityRef};
use std::collections::HashMap;

/// Insertion-ordered set of entities keyed by identity hash.
#[derive(Default)]
pub struct EntityRegistry {
    entries: Vec<EntityRef>,
    index: HashMap<EntityHash, usize>,
}

impl EntityRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entity; idempotent per identity hash. Returns whether the
    /// entity was newly added.
    pub fn insert(&mut self, entity: &EntityRef) -> bool {
        let hash = read_entity(entity).entity_hash().clone();
        if self.index.contains_key(&hash) {
            return false;
        }
        self.index.insert(hash, self.entries.len());
        self.entries.push(EntityRef::clone(entity));
        true
    }

    #[must_use]
    pub fn contains(&self, hash: &EntityHash) -> bool {
        self.index.contains_key(hash)
    }

    /// Snapshot of the registered entities, in insertion order.
    #[must_use]
    pub fn entries(&self) -> Vec<EntityRef> {
        self.entries.clone()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Identity map: root class name -> id -> the one shared instance.
#[derive(Default)]
pub struct IdentityMap {
    partitions: HashMap<String, HashMap<i64, EntityRef>>,
}

impl IdentityMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache an entity under its root class and id.
    ///
    /// First writer wins: a later load of the same row keeps returning the
    /// instance cached first. Returns whether the entry was newly inserted.
    pub fn insert(&mut self, root_class: &str, id: i64, entity: &EntityRef) -> bool {
        let partition = self.partitions.entry(root_class.to_string()).or_default();
        if partition.contains_key(&id) {
            return false;
        }
        partition.insert(id, EntityRef::clone(entity));
        true
    }

    #[must_use]
    pub fn get(&self, root_class: &str, id: i64) -> Option<EntityRef> {
        self.partitions
            .get(root_class)
            .and_then(|partition| partition.get(&id))
            .map(EntityRef::clone)
    }

    pub fn clear(&mut self) {
        self.partitions.clear();
    }

    /// Total number of cached entities across all partitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.partitions.values().map(HashMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use miniorm_core::{entity_ref, Entity, EntityHash};
    use std::any::Any;
    use std::sync::Arc;

    struct Item {
        hash: EntityHash,
        id: Option<i64>,
    }

    impl Item {
        fn fresh(id: Option<i64>) -> EntityRef {
            entity_ref(Self {
                hash: EntityHash::generate(),
                id,
            })
        }
    }

    impl Entity for Item {
        fn class_name(&self) -> &'static str {
            "Item"
        }
        fn entity_hash(&self) -> &EntityHash {
            &self.hash
        }
        fn id(&self) -> Option<i64> {
            self.id
        }
        fn set_id(&mut self, id: i64) {
            self.id = Some(id);
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn test_registry_insert_is_idempotent_per_hash() {
        let mut registry = EntityRegistry::new();
        let item = Item::fresh(None);

        assert!(registry.insert(&item));
        // A second reference to the same entity is deduplicated.
        assert!(!registry.insert(&Arc::clone(&item)));
        assert_eq!(registry.len(), 1);

        let other = Item::fresh(None);
        assert!(registry.insert(&other));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_registry_preserves_insertion_order() {
        let mut registry = EntityRegistry::new();
        let first = Item::fresh(Some(1));
        let second = Item::fresh(Some(2));
        registry.insert(&first);
        registry.insert(&second);

        let entries = registry.entries();
        assert!(Arc::ptr_eq(&entries[0], &first));
        assert!(Arc::ptr_eq(&entries[1], &second));
    }

    #[test]
    fn test_registry_clear() {
        let mut registry = EntityRegistry::new();
        let item = Item::fresh(None);
        let hash = read_entity(&item).entity_hash().clone();
        registry.insert(&item);

        registry.clear();
        assert!(registry.is_empty());
        assert!(!registry.contains(&hash));
    }

    #[test]
    fn test_identity_map_first_writer_wins() {
        let mut map = IdentityMap::new();
        let first = Item::fresh(Some(1));
        let second = Item::fresh(Some(1));

        assert!(map.insert("Item", 1, &first));
        assert!(!map.insert("Item", 1, &second));

        let cached = map.get("Item", 1).unwrap();
        assert!(Arc::ptr_eq(&cached, &first));
    }

    #[test]
    fn test_identity_map_partitions_by_class() {
        let mut map = IdentityMap::new();
        let a = Item::fresh(Some(1));
        let b = Item::fresh(Some(1));

        map.insert("Item", 1, &a);
        map.insert("Other", 1, &b);

        assert_eq!(map.len(), 2);
        assert!(Arc::ptr_eq(&map.get("Item", 1).unwrap(), &a));
        assert!(Arc::ptr_eq(&map.get("Other", 1).unwrap(), &b));
        assert!(map.get("Item", 2).is_none());
    }

    #[test]
    fn test_identity_map_clear() {
        let mut map = IdentityMap::new();
        map.insert("Item", 1, &Item::fresh(Some(1)));
        map.clear();
        assert!(map.is_empty());
    }
}
