//! Entity trait and identity hashes.
//!
//! Domain objects implement [`Entity`] to participate in persistence. An
//! entity carries a process-lifetime-unique random hash assigned at
//! construction — the key the change registries deduplicate on before a
//! database id exists — and an optional database id, absent until the row is
//! first written.
//!
//! Entities are shared through [`EntityRef`] so that one persisted row maps
//! to exactly one in-memory instance per unit-of-work lifetime.

use crate::value::Value;
use rand::RngCore;
use std::any::Any;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A process-lifetime-unique 160-bit identity hash.
///
/// Two entities compare equal iff they have the same concrete type and the
/// same hash, regardless of field contents.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct EntityHash(String);

impl EntityHash {
    /// Generate a fresh random hash (20 random bytes, hex-encoded).
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 20];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for EntityHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityHash({})", &self.0[..8.min(self.0.len())])
    }
}

/// A persistable domain object.
///
/// Lifecycle status (new/clean/dirty/removed) is tracked by the unit of work,
/// not on the entity itself; implementors only store their hash and id.
pub trait Entity: Any + Send + Sync {
    /// The entity's class name, as registered in the metadata provider.
    fn class_name(&self) -> &'static str;

    /// The identity hash assigned at construction.
    fn entity_hash(&self) -> &EntityHash;

    /// The database id, absent until persisted.
    fn id(&self) -> Option<i64>;

    /// Assign the database id after an insert.
    fn set_id(&mut self, id: i64);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A shared, lockable handle to an entity.
pub type EntityRef = Arc<RwLock<dyn Entity>>;

/// Wrap a concrete entity into a shared handle.
pub fn entity_ref<E: Entity>(entity: E) -> EntityRef {
    Arc::new(RwLock::new(entity))
}

/// Lock an entity for reading.
pub fn read_entity(entity: &EntityRef) -> RwLockReadGuard<'_, dyn Entity> {
    entity.read().expect("entity lock poisoned")
}

/// Lock an entity for writing.
pub fn write_entity(entity: &EntityRef) -> RwLockWriteGuard<'_, dyn Entity> {
    entity.write().expect("entity lock poisoned")
}

/// Entity equality: same concrete type and same identity hash.
#[must_use]
pub fn entities_equal(a: &dyn Entity, b: &dyn Entity) -> bool {
    a.class_name() == b.class_name() && a.entity_hash() == b.entity_hash()
}

/// The value of a single mapped field.
///
/// Plain columns carry scalars; association fields carry entity references
/// (`Reference` for to-one sides, `Collection` for to-many sides).
#[derive(Clone)]
pub enum FieldValue {
    Scalar(Value),
    Reference(Option<EntityRef>),
    Collection(Vec<EntityRef>),
}

impl FieldValue {
    /// The null scalar.
    #[must_use]
    pub fn null() -> Self {
        FieldValue::Scalar(Value::Null)
    }

    /// Whether this value carries nothing: a null scalar or an absent
    /// reference. Collections are never null, only empty.
    #[must_use]
    pub fn is_null(&self) -> bool {
        match self {
            FieldValue::Scalar(v) => v.is_null(),
            FieldValue::Reference(r) => r.is_none(),
            FieldValue::Collection(_) => false,
        }
    }

    #[must_use]
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            FieldValue::Scalar(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_scalar(self) -> Option<Value> {
        match self {
            FieldValue::Scalar(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_reference(&self) -> Option<&EntityRef> {
        match self {
            FieldValue::Reference(Some(r)) => Some(r),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_reference(self) -> Option<EntityRef> {
        match self {
            FieldValue::Reference(r) => r,
            _ => None,
        }
    }

    #[must_use]
    pub fn into_collection(self) -> Option<Vec<EntityRef>> {
        match self {
            FieldValue::Collection(c) => Some(c),
            _ => None,
        }
    }
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Scalar(v) => write!(f, "Scalar({v:?})"),
            FieldValue::Reference(None) => write!(f, "Reference(None)"),
            FieldValue::Reference(Some(r)) => {
                let guard = read_entity(r);
                write!(f, "Reference({} #{:?})", guard.class_name(), guard.id())
            }
            FieldValue::Collection(c) => write!(f, "Collection(len={})", c.len()),
        }
    }
}

impl From<Value> for FieldValue {
    fn from(v: Value) -> Self {
        FieldValue::Scalar(v)
    }
}
