//! Per-build type cache.

use std::collections::HashMap;

use autoql_core::TypeDescriptor;

use super::types::SchemaType;

/// Maps descriptors to their mapped schema types.
///
/// Entries are never removed during a build. A [`SchemaType::Reference`] entry
/// marks a type whose construction is in progress further up the call stack.
#[derive(Debug, Default)]
pub struct TypeCache {
    entries: HashMap<TypeDescriptor, SchemaType>,
}

impl TypeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, descriptor: &TypeDescriptor) -> Option<&SchemaType> {
        self.entries.get(descriptor)
    }

    /// Stores `ty` under `descriptor`, replacing a pending reference, and returns it.
    pub fn put(&mut self, descriptor: TypeDescriptor, ty: SchemaType) -> SchemaType {
        self.entries.insert(descriptor, ty.clone());
        ty
    }

    pub fn contains(&self, descriptor: &TypeDescriptor) -> bool {
        self.entries.contains_key(descriptor)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All cached types, pending references included.
    pub fn types(&self) -> impl Iterator<Item = (&TypeDescriptor, &SchemaType)> {
        self.entries.iter()
    }
}
