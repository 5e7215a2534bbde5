//! Global object identification.
//!
//! Classes declared as nodes implement the shared `Node` interface. The root
//! `node(id: ID!)` field asks the registered [`NodeIdentityFactory`]s which one
//! owns an id, loads the object and reports its concrete schema type.

use std::collections::HashMap;
use std::sync::Arc;

use autoql_core::{InvocationError, TypeDescriptor};
use serde_json::Value;
use tracing::debug;

use crate::error::ResolveError;

/// Name of the root lookup field.
pub const NODE_FIELD: &str = "node";

/// Name of the identity field of every node type.
pub const NODE_ID_FIELD: &str = "id";

/// An object loaded from a global id.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeObject {
    /// Declared type of the object; must be a mapped node class.
    pub descriptor: TypeDescriptor,
    pub value: Value,
}

/// Recognizes and loads objects by global id.
pub trait NodeIdentityFactory: Send + Sync {
    fn handles_node_id(&self, id: &str) -> bool;

    fn new_object_from_id(&self, id: &str) -> Result<NodeObject, ResolveError>;
}

type Loader = dyn Fn(&str) -> Result<Value, InvocationError> + Send + Sync;

/// Handles ids of the form `<prefix>:<local id>` for one node class.
pub struct PrefixedNodeFactory {
    prefix: String,
    descriptor: TypeDescriptor,
    loader: Arc<Loader>,
}

impl PrefixedNodeFactory {
    /// `loader` receives the local part of the id.
    pub fn new<F>(prefix: impl Into<String>, descriptor: TypeDescriptor, loader: F) -> Self
    where
        F: Fn(&str) -> Result<Value, InvocationError> + Send + Sync + 'static,
    {
        Self {
            prefix: prefix.into(),
            descriptor,
            loader: Arc::new(loader),
        }
    }

    fn local_id<'i>(&self, id: &'i str) -> Option<&'i str> {
        id.strip_prefix(self.prefix.as_str())?.strip_prefix(':')
    }
}

impl NodeIdentityFactory for PrefixedNodeFactory {
    fn handles_node_id(&self, id: &str) -> bool {
        self.local_id(id).is_some()
    }

    fn new_object_from_id(&self, id: &str) -> Result<NodeObject, ResolveError> {
        let local = self
            .local_id(id)
            .ok_or_else(|| ResolveError::UnknownObjectType(id.to_string()))?;
        let value = (self.loader)(local).map_err(|source| ResolveError::Invocation {
            field: NODE_FIELD.to_string(),
            source,
        })?;
        Ok(NodeObject {
            descriptor: self.descriptor.clone(),
            value,
        })
    }
}

impl std::fmt::Debug for PrefixedNodeFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefixedNodeFactory")
            .field("prefix", &self.prefix)
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

/// Resolves global ids to objects and their schema type names.
pub struct NodeResolver {
    factories: Vec<Arc<dyn NodeIdentityFactory>>,
    type_names: HashMap<TypeDescriptor, String>,
}

impl NodeResolver {
    pub fn new(
        factories: Vec<Arc<dyn NodeIdentityFactory>>,
        type_names: impl IntoIterator<Item = (TypeDescriptor, String)>,
    ) -> Self {
        Self {
            factories,
            type_names: type_names.into_iter().collect(),
        }
    }

    /// Loads the object for `id`.
    ///
    /// Returns `Ok(None)` when the owning factory finds no object.
    ///
    /// # Errors
    ///
    /// `UnknownObjectType` when no factory handles the id; `NotANode` when
    /// the loaded object's type is not a mapped node class.
    pub fn resolve(&self, id: &str) -> Result<Option<(String, Value)>, ResolveError> {
        let factory = self
            .factories
            .iter()
            .find(|factory| factory.handles_node_id(id))
            .ok_or_else(|| ResolveError::UnknownObjectType(id.to_string()))?;

        let object = factory.new_object_from_id(id)?;
        if object.value.is_null() {
            debug!(id, "Node not found");
            return Ok(None);
        }

        let type_name = self
            .type_names
            .get(&object.descriptor)
            .ok_or_else(|| ResolveError::NotANode(object.descriptor.to_string()))?;
        Ok(Some((type_name.clone(), object.value)))
    }
}

impl std::fmt::Debug for NodeResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeResolver")
            .field("factories", &self.factories.len())
            .field("type_names", &self.type_names)
            .finish()
    }
}
