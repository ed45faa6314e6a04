//! Error types for MiniORM operations.

use std::fmt;

/// Convenience alias used across all MiniORM crates.
pub type Result<T> = std::result::Result<T, Error>;

/// The primary error type for all MiniORM operations.
#[derive(Debug)]
pub enum Error {
    /// Metadata declaration errors, fatal at identity-build time.
    Metadata(MetadataError),
    /// A required related row or catalog entry is missing.
    NotFound(NotFoundError),
    /// An unrecognized or incomparable literal kind was encountered.
    Value(ValueError),
    /// The underlying query executor failed.
    Database(DatabaseError),
    /// The commit dependency graph contains a cycle.
    DependencyCycle(CycleError),
}

/// A missing or malformed metadata declaration.
#[derive(Debug)]
pub struct MetadataError {
    pub kind: MetadataErrorKind,
    /// The entity class the declaration belongs to.
    pub class_name: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataErrorKind {
    /// No class spec is registered under the requested name.
    UnknownClass,
    /// The class spec declares no table.
    MissingTable,
    /// An association declaration is incomplete or contradictory.
    InvalidAssociation,
    /// A property was referenced that the identity does not define.
    UnknownProperty,
    /// The base-class chain loops back on itself.
    CyclicInheritance,
}

/// A required row was absent where one must exist.
#[derive(Debug)]
pub struct NotFoundError {
    /// The table that was queried.
    pub table: String,
    pub message: String,
}

/// A malformed literal or an impossible value comparison.
#[derive(Debug)]
pub struct ValueError {
    pub message: String,
}

/// Failure reported by the query executor collaborator.
#[derive(Debug)]
pub struct DatabaseError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

/// A dependency cycle discovered while computing a commit order.
#[derive(Debug, Clone)]
pub struct CycleError {
    /// The nodes participating in the cycle, in traversal order.
    pub nodes: Vec<String>,
}

impl Error {
    pub fn unknown_class(class_name: impl Into<String>) -> Self {
        let class_name = class_name.into();
        Error::Metadata(MetadataError {
            kind: MetadataErrorKind::UnknownClass,
            message: format!("no class spec registered for `{class_name}`"),
            class_name,
        })
    }

    pub fn missing_table(class_name: impl Into<String>) -> Self {
        let class_name = class_name.into();
        Error::Metadata(MetadataError {
            kind: MetadataErrorKind::MissingTable,
            message: format!("class `{class_name}` declares no table"),
            class_name,
        })
    }

    pub fn invalid_association(class_name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Metadata(MetadataError {
            kind: MetadataErrorKind::InvalidAssociation,
            class_name: class_name.into(),
            message: message.into(),
        })
    }

    pub fn unknown_property(class_name: impl Into<String>, property: &str) -> Self {
        let class_name = class_name.into();
        Error::Metadata(MetadataError {
            kind: MetadataErrorKind::UnknownProperty,
            message: format!("class `{class_name}` has no property `{property}`"),
            class_name,
        })
    }

    pub fn cyclic_inheritance(class_name: impl Into<String>) -> Self {
        let class_name = class_name.into();
        Error::Metadata(MetadataError {
            kind: MetadataErrorKind::CyclicInheritance,
            message: format!("base-class chain of `{class_name}` is cyclic"),
            class_name,
        })
    }

    pub fn not_found(table: impl Into<String>, message: impl Into<String>) -> Self {
        Error::NotFound(NotFoundError {
            table: table.into(),
            message: message.into(),
        })
    }

    pub fn value(message: impl Into<String>) -> Self {
        Error::Value(ValueError {
            message: message.into(),
        })
    }

    pub fn database(message: impl Into<String>) -> Self {
        Error::Database(DatabaseError {
            message: message.into(),
            source: None,
        })
    }

    pub fn database_with_source(
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Error::Database(DatabaseError {
            message: message.into(),
            source: Some(source),
        })
    }

    pub fn cycle(nodes: Vec<String>) -> Self {
        Error::DependencyCycle(CycleError { nodes })
    }

    /// Whether this error is a missing-row condition.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Whether this error is a metadata declaration failure of the given kind.
    #[must_use]
    pub fn is_metadata(&self, kind: MetadataErrorKind) -> bool {
        matches!(self, Error::Metadata(e) if e.kind == kind)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Metadata(e) => write!(f, "metadata error: {}", e.message),
            Error::NotFound(e) => write!(f, "not found in `{}`: {}", e.table, e.message),
            Error::Value(e) => write!(f, "value error: {}", e.message),
            Error::Database(e) => write!(f, "database error: {}", e.message),
            Error::DependencyCycle(e) => {
                write!(f, "dependency cycle: {}", e.nodes.join(" -> "))
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Database(e) => e
                .source
                .as_ref()
                .map(|s| s.as_ref() as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}
