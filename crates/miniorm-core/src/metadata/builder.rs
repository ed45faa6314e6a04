//! Identity construction and memoization.
//!
//! [`IdentityBuilder`] compiles one class spec into an [`Identity`];
//! [`IdentityCache`] memoizes the result per class for the lifetime of the
//! owning context, resolving base classes transitively and registering each
//! class with its direct base as a subclass.

use crate::entity::{Entity, FieldValue};
use crate::error::{Error, Result};
use crate::metadata::identity::Identity;
use crate::metadata::property::{Property, PropertyBuilder};
use crate::metadata::spec::{
    ColumnSpec, ColumnType, FieldGetter, FieldSetter, MetadataProvider,
};
use crate::row::ID_COLUMN;
use crate::transform::TransformRegistry;
use crate::value::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

/// Declared type name of the synthesized identifier field.
const ID_VALUE_TYPE: &str = "i64";

/// Synthesize the implicit identifier property: column `id`, integer,
/// length 10, non-nullable, with accessors delegating to the entity's own
/// id storage.
fn identifier_property(transforms: &TransformRegistry) -> Property {
    let getter: FieldGetter = Arc::new(|entity: &dyn Entity| FieldValue::Scalar(Value::from(entity.id())));
    let setter: FieldSetter = Arc::new(|entity: &mut dyn Entity, value| {
        if let FieldValue::Scalar(Value::Int(id)) = value {
            entity.set_id(id);
        }
    });

    PropertyBuilder::from_parts(
        ID_COLUMN,
        ID_VALUE_TYPE,
        transforms.resolve(ID_VALUE_TYPE),
        getter,
        setter,
    )
    .column(
        ColumnSpec::new(ID_COLUMN, ColumnType::Integer)
            .length(10)
            .nullable(false),
    )
    .build()
}

/// Compiles a single class spec into an identity.
pub struct IdentityBuilder<'a> {
    cache: &'a IdentityCache,
    class_name: &'a str,
}

impl<'a> IdentityBuilder<'a> {
    #[must_use]
    pub fn new(cache: &'a IdentityCache, class_name: &'a str) -> Self {
        Self { cache, class_name }
    }

    /// Build the identity.
    ///
    /// Resolves the base class through the cache first (so the whole chain
    /// exists before this identity does), synthesizes the identifier
    /// property, then compiles the declared fields, skipping transient ones.
    pub fn build(&self) -> Result<Arc<Identity>> {
        let spec = self
            .cache
            .provider()
            .class_spec(self.class_name)
            .ok_or_else(|| Error::unknown_class(self.class_name))?;

        let base_class = spec
            .base_class_name()
            .map(|base| self.cache.identity(base))
            .transpose()?;

        let table_name = spec
            .table_name()
            .ok_or_else(|| Error::missing_table(self.class_name))?
            .to_string();

        let transforms = self.cache.transforms();
        let mut properties = vec![identifier_property(transforms)];

        for field in spec.fields() {
            if field.name() == ID_COLUMN {
                continue;
            }

            let builder = PropertyBuilder::from_spec(self.class_name, field, transforms)?;
            if builder.is_transient() {
                tracing::trace!(
                    class = self.class_name,
                    field = field.name(),
                    "skipping transient field"
                );
                continue;
            }
            properties.push(builder.build());
        }

        let identity = Arc::new(Identity::new(
            self.class_name.to_string(),
            table_name,
            base_class,
            properties,
            Arc::clone(spec.factory()),
        ));

        if let Some(base) = identity.base_class() {
            base.add_sub_class(identity.class_name());
        }

        tracing::debug!(
            class = identity.class_name(),
            table = identity.table_name(),
            base = identity.base_class().map(|b| b.class_name()),
            "built identity"
        );

        Ok(identity)
    }
}

/// Per-context identity memoization.
///
/// One instance lives inside each unit of work; identities are built on
/// first use and shared thereafter.
pub struct IdentityCache {
    provider: Arc<dyn MetadataProvider>,
    transforms: TransformRegistry,
    identities: RwLock<HashMap<String, Arc<Identity>>>,
    building: RwLock<HashSet<String>>,
}

impl IdentityCache {
    #[must_use]
    pub fn new(provider: Arc<dyn MetadataProvider>, transforms: TransformRegistry) -> Self {
        Self {
            provider,
            transforms,
            identities: RwLock::new(HashMap::new()),
            building: RwLock::new(HashSet::new()),
        }
    }

    #[must_use]
    pub fn provider(&self) -> &dyn MetadataProvider {
        self.provider.as_ref()
    }

    #[must_use]
    pub fn transforms(&self) -> &TransformRegistry {
        &self.transforms
    }

    /// The memoized identity for a class, building it on first use.
    ///
    /// A base-class chain that loops back on itself fails with
    /// `MetadataErrorKind::CyclicInheritance` instead of recursing forever.
    pub fn identity(&self, class_name: &str) -> Result<Arc<Identity>> {
        if let Some(identity) = self
            .identities
            .read()
            .expect("identity cache lock poisoned")
            .get(class_name)
        {
            return Ok(Arc::clone(identity));
        }

        {
            let mut building = self.building.write().expect("identity cache lock poisoned");
            if !building.insert(class_name.to_string()) {
                return Err(Error::cyclic_inheritance(class_name));
            }
        }

        let result = IdentityBuilder::new(self, class_name).build();

        self.building
            .write()
            .expect("identity cache lock poisoned")
            .remove(class_name);

        let identity = result?;
        let mut identities = self
            .identities
            .write()
            .expect("identity cache lock poisoned");
        let entry = identities
            .entry(class_name.to_string())
            .or_insert(identity);
        Ok(Arc::clone(entry))
    }

    /// Drop all memoized identities.
    pub fn clear(&self) {
        self.identities
            .write()
            .expect("identity cache lock poisoned")
            .clear();
    }
}

impl std::fmt::Debug for IdentityCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let identities = self.identities.read().expect("identity cache lock poisoned");
        let mut names: Vec<&str> = identities.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("IdentityCache")
            .field("identities", &names)
            .finish_non_exhaustive()
    }
}
