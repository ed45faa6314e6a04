//! Declarative class specifications.
//!
//! A [`ClassSpec`] is the raw, host-declared description of an entity type:
//! table name, optional base class, and per-field column or association
//! facts. Specs are registered with a [`MetadataRegistry`] (or any other
//! [`MetadataProvider`]) and compiled into [`Identity`](super::Identity)
//! descriptors by the identity builder.
//!
//! Field access goes through getter/setter closures captured at declaration
//! time, so no runtime reflection is involved; likewise each class carries a
//! factory closure used to instantiate fresh entities when rows are mapped.
//!
//! # Example
//!
//! ```ignore
//! let spec = ClassSpec::new("Page", || Page::fresh())
//!     .table("pages")
//!     .field(
//!         FieldSpec::new(
//!             "title",
//!             "String",
//!             scalar_accessors(
//!                 |p: &Page| Value::from(p.title.clone()),
//!                 |p: &mut Page, v| p.title = v.as_text().map(str::to_string),
//!             ),
//!         )
//!         .column(ColumnSpec::new("page_title", ColumnType::Binary).length(255)),
//!     );
//! ```

use crate::entity::{entity_ref, Entity, EntityRef, FieldValue};
use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Instantiates a fresh, unpersisted entity of one class.
pub type EntityFactory = Arc<dyn Fn() -> EntityRef + Send + Sync>;

/// Reads a field value off an entity.
pub type FieldGetter = Arc<dyn Fn(&dyn Entity) -> FieldValue + Send + Sync>;

/// Writes a field value onto an entity.
pub type FieldSetter = Arc<dyn Fn(&mut dyn Entity, FieldValue) + Send + Sync>;

const ACCESSOR_TYPE_MISMATCH: &str = "field accessor applied to a different entity type";

/// Build getter/setter closures for a scalar-valued field, from closures
/// over `&dyn Entity`.
///
/// Classes acting as the base of an inheritance chain declare their fields
/// this way: the closures receive whatever concrete entity is being mapped
/// (the base class itself or any subclass), and project to the shared base
/// state by matching on the concrete type.
pub fn scalar_accessors_with<G, S>(get: G, set: S) -> (FieldGetter, FieldSetter)
where
    G: Fn(&dyn Entity) -> Value + Send + Sync + 'static,
    S: Fn(&mut dyn Entity, Value) + Send + Sync + 'static,
{
    let getter: FieldGetter = Arc::new(move |entity| FieldValue::Scalar(get(entity)));
    let setter: FieldSetter = Arc::new(move |entity, value| {
        if let FieldValue::Scalar(v) = value {
            set(entity, v);
        }
    });
    (getter, setter)
}

/// Build getter/setter closures for a to-one association field, from
/// closures over `&dyn Entity`. See [`scalar_accessors_with`].
pub fn reference_accessors_with<G, S>(get: G, set: S) -> (FieldGetter, FieldSetter)
where
    G: Fn(&dyn Entity) -> Option<EntityRef> + Send + Sync + 'static,
    S: Fn(&mut dyn Entity, Option<EntityRef>) + Send + Sync + 'static,
{
    let getter: FieldGetter = Arc::new(move |entity| FieldValue::Reference(get(entity)));
    let setter: FieldSetter = Arc::new(move |entity, value| {
        if let FieldValue::Reference(r) = value {
            set(entity, r);
        }
    });
    (getter, setter)
}

/// Build getter/setter closures for a to-many association field, from
/// closures over `&dyn Entity`. See [`scalar_accessors_with`].
pub fn collection_accessors_with<G, S>(get: G, set: S) -> (FieldGetter, FieldSetter)
where
    G: Fn(&dyn Entity) -> Vec<EntityRef> + Send + Sync + 'static,
    S: Fn(&mut dyn Entity, Vec<EntityRef>) + Send + Sync + 'static,
{
    let getter: FieldGetter = Arc::new(move |entity| FieldValue::Collection(get(entity)));
    let setter: FieldSetter = Arc::new(move |entity, value| {
        if let FieldValue::Collection(c) = value {
            set(entity, c);
        }
    });
    (getter, setter)
}

/// Build getter/setter closures for a scalar-valued field.
pub fn scalar_accessors<E, G, S>(get: G, set: S) -> (FieldGetter, FieldSetter)
where
    E: Entity,
    G: Fn(&E) -> Value + Send + Sync + 'static,
    S: Fn(&mut E, Value) + Send + Sync + 'static,
{
    let getter: FieldGetter = Arc::new(move |entity| {
        let entity = entity
            .as_any()
            .downcast_ref::<E>()
            .expect(ACCESSOR_TYPE_MISMATCH);
        FieldValue::Scalar(get(entity))
    });
    let setter: FieldSetter = Arc::new(move |entity, value| {
        let entity = entity
            .as_any_mut()
            .downcast_mut::<E>()
            .expect(ACCESSOR_TYPE_MISMATCH);
        if let FieldValue::Scalar(v) = value {
            set(entity, v);
        }
    });
    (getter, setter)
}

/// Build getter/setter closures for a to-one association field.
pub fn reference_accessors<E, G, S>(get: G, set: S) -> (FieldGetter, FieldSetter)
where
    E: Entity,
    G: Fn(&E) -> Option<EntityRef> + Send + Sync + 'static,
    S: Fn(&mut E, Option<EntityRef>) + Send + Sync + 'static,
{
    let getter: FieldGetter = Arc::new(move |entity| {
        let entity = entity
            .as_any()
            .downcast_ref::<E>()
            .expect(ACCESSOR_TYPE_MISMATCH);
        FieldValue::Reference(get(entity))
    });
    let setter: FieldSetter = Arc::new(move |entity, value| {
        let entity = entity
            .as_any_mut()
            .downcast_mut::<E>()
            .expect(ACCESSOR_TYPE_MISMATCH);
        if let FieldValue::Reference(r) = value {
            set(entity, r);
        }
    });
    (getter, setter)
}

/// Build getter/setter closures for a to-many association field.
pub fn collection_accessors<E, G, S>(get: G, set: S) -> (FieldGetter, FieldSetter)
where
    E: Entity,
    G: Fn(&E) -> Vec<EntityRef> + Send + Sync + 'static,
    S: Fn(&mut E, Vec<EntityRef>) + Send + Sync + 'static,
{
    let getter: FieldGetter = Arc::new(move |entity| {
        let entity = entity
            .as_any()
            .downcast_ref::<E>()
            .expect(ACCESSOR_TYPE_MISMATCH);
        FieldValue::Collection(get(entity))
    });
    let setter: FieldSetter = Arc::new(move |entity, value| {
        let entity = entity
            .as_any_mut()
            .downcast_mut::<E>()
            .expect(ACCESSOR_TYPE_MISMATCH);
        if let FieldValue::Collection(c) = value {
            set(entity, c);
        }
    });
    (getter, setter)
}

/// Column type of a persisted property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    BigInt,
    Float,
    Boolean,
    Binary,
    Text,
    Timestamp,
}

impl ColumnType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ColumnType::Integer => "int",
            ColumnType::BigInt => "bigint",
            ColumnType::Float => "float",
            ColumnType::Boolean => "tinyint",
            ColumnType::Binary => "varbinary",
            ColumnType::Text => "text",
            ColumnType::Timestamp => "binary",
        }
    }
}

/// Persisted-column facts for a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    name: String,
    column_type: ColumnType,
    length: Option<u32>,
    nullable: bool,
}

impl ColumnSpec {
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            length: None,
            nullable: false,
        }
    }

    #[must_use]
    pub fn length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    #[must_use]
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    #[must_use]
    pub fn column_length(&self) -> Option<u32> {
        self.length
    }

    #[must_use]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }
}

/// Relation kind declared on a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationKind {
    OneToOne,
    OneToMany,
    ManyToOne,
}

/// Association facts for a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationSpec {
    kind: AssociationKind,
    target: String,
    mapped_by: Option<String>,
}

impl AssociationSpec {
    #[must_use]
    pub fn one_to_one(target: impl Into<String>) -> Self {
        Self {
            kind: AssociationKind::OneToOne,
            target: target.into(),
            mapped_by: None,
        }
    }

    #[must_use]
    pub fn one_to_many(target: impl Into<String>, mapped_by: impl Into<String>) -> Self {
        Self {
            kind: AssociationKind::OneToMany,
            target: target.into(),
            mapped_by: Some(mapped_by.into()),
        }
    }

    #[must_use]
    pub fn many_to_one(target: impl Into<String>) -> Self {
        Self {
            kind: AssociationKind::ManyToOne,
            target: target.into(),
            mapped_by: None,
        }
    }

    /// Mark the relation as inverse, mapped by a property on the target.
    #[must_use]
    pub fn mapped_by(mut self, property: impl Into<String>) -> Self {
        self.mapped_by = Some(property.into());
        self
    }

    #[must_use]
    pub fn kind(&self) -> AssociationKind {
        self.kind
    }

    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    #[must_use]
    pub fn mapped_by_property(&self) -> Option<&str> {
        self.mapped_by.as_deref()
    }
}

/// Declared facts for one field of a class.
///
/// A field with neither column nor association facts is transient and is
/// excluded from persistence entirely.
pub struct FieldSpec {
    name: String,
    value_type: String,
    column: Option<ColumnSpec>,
    association: Option<AssociationSpec>,
    getter: FieldGetter,
    setter: FieldSetter,
}

impl FieldSpec {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        value_type: impl Into<String>,
        accessors: (FieldGetter, FieldSetter),
    ) -> Self {
        Self {
            name: name.into(),
            value_type: value_type.into(),
            column: None,
            association: None,
            getter: accessors.0,
            setter: accessors.1,
        }
    }

    #[must_use]
    pub fn column(mut self, column: ColumnSpec) -> Self {
        self.column = Some(column);
        self
    }

    #[must_use]
    pub fn association(mut self, association: AssociationSpec) -> Self {
        self.association = Some(association);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared field type name; keys the transform registry.
    #[must_use]
    pub fn value_type(&self) -> &str {
        &self.value_type
    }

    #[must_use]
    pub fn column_spec(&self) -> Option<&ColumnSpec> {
        self.column.as_ref()
    }

    #[must_use]
    pub fn association_spec(&self) -> Option<&AssociationSpec> {
        self.association.as_ref()
    }

    #[must_use]
    pub fn getter(&self) -> &FieldGetter {
        &self.getter
    }

    #[must_use]
    pub fn setter(&self) -> &FieldSetter {
        &self.setter
    }
}

impl std::fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("value_type", &self.value_type)
            .field("column", &self.column)
            .field("association", &self.association)
            .finish_non_exhaustive()
    }
}

/// Declared facts for one entity class.
pub struct ClassSpec {
    class_name: String,
    table_name: Option<String>,
    base_class: Option<String>,
    factory: EntityFactory,
    fields: Vec<FieldSpec>,
}

impl ClassSpec {
    /// Declare a class with its entity factory.
    ///
    /// The factory must produce a fresh, unpersisted instance: new identity
    /// hash, no database id.
    #[must_use]
    pub fn new<F, E>(class_name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> E + Send + Sync + 'static,
        E: Entity,
    {
        Self {
            class_name: class_name.into(),
            table_name: None,
            base_class: None,
            factory: Arc::new(move || entity_ref(factory())),
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn table(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    #[must_use]
    pub fn base_class(mut self, base_class: impl Into<String>) -> Self {
        self.base_class = Some(base_class.into());
        self
    }

    #[must_use]
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    #[must_use]
    pub fn table_name(&self) -> Option<&str> {
        self.table_name.as_deref()
    }

    #[must_use]
    pub fn base_class_name(&self) -> Option<&str> {
        self.base_class.as_deref()
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    #[must_use]
    pub fn factory(&self) -> &EntityFactory {
        &self.factory
    }
}

impl std::fmt::Debug for ClassSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassSpec")
            .field("class_name", &self.class_name)
            .field("table_name", &self.table_name)
            .field("base_class", &self.base_class)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

/// Source of declared class facts.
///
/// The shipped implementation is [`MetadataRegistry`]; hosts with their own
/// declaration mechanism (config files, code generation) implement this trait
/// instead.
pub trait MetadataProvider: Send + Sync {
    /// The declared facts for a class, if the class is known.
    fn class_spec(&self, class_name: &str) -> Option<&ClassSpec>;
}

/// Builder-pattern metadata provider: class specs registered at startup.
#[derive(Default)]
pub struct MetadataRegistry {
    specs: HashMap<String, ClassSpec>,
    names: Vec<String>,
}

impl MetadataRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class spec, replacing any previous spec for the same name.
    pub fn register(&mut self, spec: ClassSpec) {
        let name = spec.class_name().to_string();
        if self.specs.insert(name.clone(), spec).is_none() {
            self.names.push(name);
        }
    }

    /// Chainable form of [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, spec: ClassSpec) -> Self {
        self.register(spec);
        self
    }

    /// Registered class names, in registration order.
    #[must_use]
    pub fn class_names(&self) -> &[String] {
        &self.names
    }
}

impl MetadataProvider for MetadataRegistry {
    fn class_spec(&self, class_name: &str) -> Option<&ClassSpec> {
        self.specs.get(class_name)
    }
}
