//! Association descriptors.

use crate::error::{Error, Result};
use crate::metadata::spec::{AssociationKind, AssociationSpec};

/// A relation between two entity classes.
///
/// The owning side of a relation is exactly the side without `mapped_by`: it
/// physically stores the foreign key. Inverse sides are looked up by querying
/// the target's mapped-by column against this entity's id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Association {
    /// To-one relation; inverse when `mapped_by` names the owning property
    /// on the target.
    OneToOne {
        target: String,
        mapped_by: Option<String>,
    },
    /// To-many relation; always inverse, the target holds the foreign key.
    OneToMany { target: String, mapped_by: String },
    /// To-one relation; this side always holds the foreign key.
    ManyToOne { target: String },
}

impl Association {
    /// The class name of the related entity type.
    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            Association::OneToOne { target, .. }
            | Association::OneToMany { target, .. }
            | Association::ManyToOne { target } => target,
        }
    }

    /// The owning property on the target, for inverse sides.
    #[must_use]
    pub fn mapped_by(&self) -> Option<&str> {
        match self {
            Association::OneToOne { mapped_by, .. } => mapped_by.as_deref(),
            Association::OneToMany { mapped_by, .. } => Some(mapped_by),
            Association::ManyToOne { .. } => None,
        }
    }

    /// Whether this side stores the foreign key.
    #[must_use]
    pub fn is_owning(&self) -> bool {
        self.mapped_by().is_none()
    }

    /// Whether this side resolves to a collection of entities.
    #[must_use]
    pub fn is_collection(&self) -> bool {
        matches!(self, Association::OneToMany { .. })
    }
}

/// Builds an [`Association`] from declared facts.
#[derive(Debug, Default)]
pub struct AssociationBuilder {
    kind: Option<AssociationKind>,
    target: Option<String>,
    mapped_by: Option<String>,
}

impl AssociationBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_spec(spec: &AssociationSpec) -> Self {
        Self {
            kind: Some(spec.kind()),
            target: Some(spec.target().to_string()),
            mapped_by: spec.mapped_by_property().map(str::to_string),
        }
    }

    #[must_use]
    pub fn kind(mut self, kind: AssociationKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    #[must_use]
    pub fn mapped_by(mut self, mapped_by: impl Into<String>) -> Self {
        self.mapped_by = Some(mapped_by.into());
        self
    }

    /// Build the association, validating the declaration.
    ///
    /// `class_name` is only used for error attribution.
    pub fn build(self, class_name: &str) -> Result<Association> {
        let target = self
            .target
            .ok_or_else(|| Error::invalid_association(class_name, "association declares no target"))?;

        match self.kind {
            Some(AssociationKind::OneToOne) => Ok(Association::OneToOne {
                target,
                mapped_by: self.mapped_by,
            }),
            Some(AssociationKind::OneToMany) => {
                let mapped_by = self.mapped_by.ok_or_else(|| {
                    Error::invalid_association(
                        class_name,
                        format!("one-to-many association to `{target}` requires mapped_by"),
                    )
                })?;
                Ok(Association::OneToMany { target, mapped_by })
            }
            Some(AssociationKind::ManyToOne) => {
                if self.mapped_by.is_some() {
                    return Err(Error::invalid_association(
                        class_name,
                        format!("many-to-one association to `{target}` cannot be inverse"),
                    ));
                }
                Ok(Association::ManyToOne { target })
            }
            None => Err(Error::invalid_association(
                class_name,
                "association declares no relation kind",
            )),
        }
    }
}
