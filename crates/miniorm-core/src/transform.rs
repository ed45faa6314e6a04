//! Value transforms between column and in-memory representations.
//!
//! A transform converts a property's in-memory scalar representation to the
//! stored column representation and back. Transforms are resolved from a
//! registry keyed by the declared field type name; unregistered types fall
//! back to the identity transform.

use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Bidirectional scalar converter between in-memory and column space.
pub trait Transform: Send + Sync {
    /// Convert an in-memory value to its stored column representation.
    fn to_column(&self, value: Value) -> Value;

    /// Convert a stored column value to its in-memory representation.
    fn from_column(&self, value: Value) -> Value;
}

/// The default transform: values pass through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransform;

impl Transform for IdentityTransform {
    fn to_column(&self, value: Value) -> Value {
        value
    }

    fn from_column(&self, value: Value) -> Value {
        value
    }
}

/// Extensible registry mapping declared field type names to transforms.
#[derive(Clone)]
pub struct TransformRegistry {
    transforms: HashMap<String, Arc<dyn Transform>>,
    fallback: Arc<dyn Transform>,
}

impl TransformRegistry {
    /// Create a registry with only the identity fallback.
    #[must_use]
    pub fn new() -> Self {
        Self {
            transforms: HashMap::new(),
            fallback: Arc::new(IdentityTransform),
        }
    }

    /// Register a transform for a declared field type name.
    ///
    /// A later registration for the same type name replaces the earlier one.
    pub fn register(&mut self, type_name: impl Into<String>, transform: Arc<dyn Transform>) {
        self.transforms.insert(type_name.into(), transform);
    }

    /// Resolve the transform for a declared field type name, falling back to
    /// the identity transform when none is registered.
    #[must_use]
    pub fn resolve(&self, type_name: &str) -> Arc<dyn Transform> {
        self.transforms
            .get(type_name)
            .map_or_else(|| Arc::clone(&self.fallback), Arc::clone)
    }

    /// Whether a specific transform is registered for the type name.
    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        self.transforms.contains_key(type_name)
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.transforms.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("TransformRegistry")
            .field("types", &names)
            .finish()
    }
}
