//! Core types and metadata model for MiniORM.
//!
//! This crate provides the foundational abstractions of the mapping engine:
//!
//! - `Entity` trait and shared `EntityRef` handles
//! - `Value` scalars and flat `Row` records
//! - the metadata model: class specs, identities, properties, associations
//! - value transforms between column and in-memory representations
//! - the `Error`/`Result` types shared across all MiniORM crates

pub mod entity;
pub mod error;
pub mod metadata;
pub mod row;
pub mod transform;
pub mod value;

pub use entity::{
    entities_equal, entity_ref, read_entity, write_entity, Entity, EntityHash, EntityRef,
    FieldValue,
};
pub use error::{
    CycleError, DatabaseError, Error, MetadataError, MetadataErrorKind, NotFoundError, Result,
    ValueError,
};
pub use metadata::{
    collection_accessors, collection_accessors_with, reference_accessors,
    reference_accessors_with, scalar_accessors, scalar_accessors_with, Association,
    AssociationBuilder, AssociationKind, AssociationSpec, ClassSpec, ColumnSpec, ColumnType,
    EntityFactory, FieldGetter, FieldSetter, FieldSpec, Identity, IdentityBuilder, IdentityCache,
    MetadataProvider, MetadataRegistry, Property, PropertyBuilder,
};
pub use row::{Row, DISCRIMINATOR_COLUMN, ID_COLUMN};
pub use transform::{IdentityTransform, Transform, TransformRegistry};
pub use value::Value;
