//! The metadata model: declarative class specs compiled into per-class
//! identity descriptors.
//!
//! Hosts declare entity classes through [`ClassSpec`] registrations (or a
//! custom [`MetadataProvider`]); the [`IdentityCache`] compiles each class
//! once into an [`Identity`] holding ordered [`Property`] descriptors and
//! [`Association`] links, resolved transitively across base classes.

pub mod association;
pub mod builder;
pub mod identity;
pub mod property;
pub mod spec;

pub use association::{Association, AssociationBuilder};
pub use builder::{IdentityBuilder, IdentityCache};
pub use identity::Identity;
pub use property::{Property, PropertyBuilder};
pub use spec::{
    collection_accessors, collection_accessors_with, reference_accessors,
    reference_accessors_with, scalar_accessors, scalar_accessors_with, AssociationKind,
    AssociationSpec, ClassSpec, ColumnSpec, ColumnType, EntityFactory, FieldGetter, FieldSetter,
    FieldSpec, MetadataProvider, MetadataRegistry,
};
