//! Property descriptors.
//!
//! A property is one mapped field of an entity class: either a plain column,
//! or an association (optionally with a shadow foreign-key column when this
//! side owns the relation). Scalar values pass through the property's value
//! transform on the way in and out of column space.

use crate::entity::{Entity, FieldValue};
use crate::metadata::association::{Association, AssociationBuilder};
use crate::metadata::spec::{ColumnSpec, FieldGetter, FieldSetter, FieldSpec};
use crate::transform::{Transform, TransformRegistry};
use std::sync::Arc;

/// A column-or-association descriptor for one field.
pub struct Property {
    name: String,
    value_type: String,
    column: Option<ColumnSpec>,
    association: Option<Association>,
    transform: Arc<dyn Transform>,
    getter: FieldGetter,
    setter: FieldSetter,
}

impl Property {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared field type name the transform was resolved by.
    #[must_use]
    pub fn value_type(&self) -> &str {
        &self.value_type
    }

    /// Whether this property maps to a stored column.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.column.is_some()
    }

    #[must_use]
    pub fn column(&self) -> Option<&ColumnSpec> {
        self.column.as_ref()
    }

    #[must_use]
    pub fn column_name(&self) -> Option<&str> {
        self.column.as_ref().map(ColumnSpec::name)
    }

    #[must_use]
    pub fn has_association(&self) -> bool {
        self.association.is_some()
    }

    #[must_use]
    pub fn association(&self) -> Option<&Association> {
        self.association.as_ref()
    }

    /// Read the field value in column space.
    ///
    /// Scalars are run through the value transform; association values pass
    /// through untouched.
    #[must_use]
    pub fn get(&self, entity: &dyn Entity) -> FieldValue {
        match (self.getter)(entity) {
            FieldValue::Scalar(v) if !v.is_null() => {
                FieldValue::Scalar(self.transform.to_column(v))
            }
            other => other,
        }
    }

    /// Write a column-space value onto the field.
    ///
    /// Scalars are run through the value transform; association values pass
    /// through untouched.
    pub fn set(&self, entity: &mut dyn Entity, value: FieldValue) {
        let value = match value {
            FieldValue::Scalar(v) if !v.is_null() => {
                FieldValue::Scalar(self.transform.from_column(v))
            }
            other => other,
        };
        (self.setter)(entity, value);
    }
}

impl std::fmt::Debug for Property {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("column", &self.column)
            .field("association", &self.association)
            .finish_non_exhaustive()
    }
}

/// Builds a [`Property`] from declared field facts.
pub struct PropertyBuilder {
    name: String,
    value_type: String,
    column: Option<ColumnSpec>,
    association: Option<Association>,
    transform: Arc<dyn Transform>,
    getter: FieldGetter,
    setter: FieldSetter,
}

impl PropertyBuilder {
    /// Start from a field spec, resolving the transform by the declared
    /// field type name and validating any association declaration.
    pub fn from_spec(
        class_name: &str,
        spec: &FieldSpec,
        transforms: &TransformRegistry,
    ) -> crate::error::Result<Self> {
        let association = spec
            .association_spec()
            .map(|a| AssociationBuilder::from_spec(a).build(class_name))
            .transpose()?;

        Ok(Self {
            name: spec.name().to_string(),
            value_type: spec.value_type().to_string(),
            column: spec.column_spec().cloned(),
            association,
            transform: transforms.resolve(spec.value_type()),
            getter: Arc::clone(spec.getter()),
            setter: Arc::clone(spec.setter()),
        })
    }

    /// Start from raw parts; used for synthesized properties.
    #[must_use]
    pub fn from_parts(
        name: impl Into<String>,
        value_type: impl Into<String>,
        transform: Arc<dyn Transform>,
        getter: FieldGetter,
        setter: FieldSetter,
    ) -> Self {
        Self {
            name: name.into(),
            value_type: value_type.into(),
            column: None,
            association: None,
            transform,
            getter,
            setter,
        }
    }

    #[must_use]
    pub fn column(mut self, column: ColumnSpec) -> Self {
        self.column = Some(column);
        self
    }

    #[must_use]
    pub fn association(mut self, association: Association) -> Self {
        self.association = Some(association);
        self
    }

    /// Whether the declared field maps to anything at all. Fields with
    /// neither column nor association facts are transient.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.column.is_none() && self.association.is_none()
    }

    #[must_use]
    pub fn build(self) -> Property {
        Property {
            name: self.name,
            value_type: self.value_type,
            column: self.column,
            association: self.association,
            transform: self.transform,
            getter: self.getter,
            setter: self.setter,
        }
    }
}
