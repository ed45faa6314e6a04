//! Per-class identity descriptors.
//!
//! An `Identity` is the compiled metadata for one entity class: its table,
//! its ordered properties, and its inheritance links. Identities are built
//! once per class by the [`IdentityBuilder`](super::IdentityBuilder) and
//! shared behind `Arc`.
//!
//! The base-class chain is acyclic and terminates; the root of the chain
//! defines the identity-map partition, because subclass rows share a
//! physical identity with their base row through a common primary key.

use crate::entity::EntityRef;
use crate::metadata::property::Property;
use crate::metadata::spec::EntityFactory;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Compiled metadata for one entity class.
pub struct Identity {
    class_name: String,
    table_name: String,
    base_class: Option<Arc<Identity>>,
    sub_classes: RwLock<Vec<String>>,
    properties: Vec<Property>,
    index: HashMap<String, usize>,
    factory: EntityFactory,
}

impl Identity {
    #[must_use]
    pub fn new(
        class_name: String,
        table_name: String,
        base_class: Option<Arc<Identity>>,
        properties: Vec<Property>,
        factory: EntityFactory,
    ) -> Self {
        let index = properties
            .iter()
            .enumerate()
            .map(|(i, p)| (p.name().to_string(), i))
            .collect();
        Self {
            class_name,
            table_name,
            base_class,
            sub_classes: RwLock::new(Vec::new()),
            properties,
            index,
            factory,
        }
    }

    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    #[must_use]
    pub fn base_class(&self) -> Option<&Arc<Identity>> {
        self.base_class.as_ref()
    }

    /// The root of the base-class chain; `self` when there is no base.
    #[must_use]
    pub fn root_class(self: &Arc<Self>) -> Arc<Identity> {
        match &self.base_class {
            None => Arc::clone(self),
            Some(base) => base.root_class(),
        }
    }

    /// Whether `class_name` is this class or an ancestor of it.
    #[must_use]
    pub fn descends_from(&self, class_name: &str) -> bool {
        if self.class_name == class_name {
            return true;
        }
        self.base_class
            .as_ref()
            .is_some_and(|base| base.descends_from(class_name))
    }

    #[must_use]
    pub fn has_sub_classes(&self) -> bool {
        !self.sub_classes.read().expect("identity lock poisoned").is_empty()
    }

    /// Names of the directly registered subclasses, in registration order.
    #[must_use]
    pub fn sub_class_names(&self) -> Vec<String> {
        self.sub_classes
            .read()
            .expect("identity lock poisoned")
            .clone()
    }

    /// Record a direct subclass; idempotent.
    pub fn add_sub_class(&self, class_name: &str) {
        let mut subs = self.sub_classes.write().expect("identity lock poisoned");
        if !subs.iter().any(|s| s == class_name) {
            subs.push(class_name.to_string());
        }
    }

    /// Property names in declaration order, identifier first.
    #[must_use]
    pub fn property_names(&self) -> Vec<&str> {
        self.properties.iter().map(Property::name).collect()
    }

    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.index.get(name).map(|&i| &self.properties[i])
    }

    /// The synthesized identifier property.
    #[must_use]
    pub fn identifier(&self) -> &Property {
        self.property(crate::row::ID_COLUMN)
            .expect("identity built without an identifier property")
    }

    /// Iterate properties in declaration order.
    pub fn properties(&self) -> impl DoubleEndedIterator<Item = &Property> {
        self.properties.iter()
    }

    /// Instantiate a fresh, unpersisted entity of this class.
    #[must_use]
    pub fn new_instance(&self) -> EntityRef {
        (self.factory)()
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("class_name", &self.class_name)
            .field("table_name", &self.table_name)
            .field(
                "base_class",
                &self.base_class.as_ref().map(|b| b.class_name()),
            )
            .field("properties", &self.property_names())
            .finish_non_exhaustive()
    }
}
