//! Constructors for classes found by marker scanning.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use autoql_core::{Instance, RawType, TypePath};

use super::mappers::TypeMapper;

/// A mapper produced by a discovery constructor.
#[derive(Clone)]
pub enum DiscoveredMapper {
    Exact(RawType, Arc<dyn TypeMapper>),
    Interface(Arc<dyn TypeMapper>),
}

type MapperConstructor = dyn Fn() -> DiscoveredMapper + Send + Sync;
type SourceConstructor = dyn Fn() -> Instance + Send + Sync;

/// Maps class paths reported by a scanner to instances.
///
/// Discovered classes without a constructor here are skipped.
#[derive(Clone, Default)]
pub struct Discovery {
    mappers: HashMap<TypePath, Arc<MapperConstructor>>,
    sources: HashMap<TypePath, Arc<SourceConstructor>>,
}

impl Discovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Constructor for a discovered exact mapper of `raw`.
    pub fn exact_mapper<M, F>(mut self, path: impl Into<TypePath>, raw: RawType, constructor: F) -> Self
    where
        M: TypeMapper + 'static,
        F: Fn() -> M + Send + Sync + 'static,
    {
        self.mappers.insert(
            path.into(),
            Arc::new(move || DiscoveredMapper::Exact(raw.clone(), Arc::new(constructor()))),
        );
        self
    }

    /// Constructor for a discovered interface mapper.
    pub fn interface_mapper<M, F>(mut self, path: impl Into<TypePath>, constructor: F) -> Self
    where
        M: TypeMapper + 'static,
        F: Fn() -> M + Send + Sync + 'static,
    {
        self.mappers.insert(
            path.into(),
            Arc::new(move || DiscoveredMapper::Interface(Arc::new(constructor()))),
        );
        self
    }

    /// Constructor for a discovered query source.
    pub fn query_source<T, F>(mut self, path: impl Into<TypePath>, constructor: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.sources.insert(
            path.into(),
            Arc::new(move || Arc::new(constructor()) as Instance),
        );
        self
    }

    pub fn mapper(&self, path: &TypePath) -> Option<DiscoveredMapper> {
        self.mappers.get(path).map(|constructor| constructor())
    }

    pub fn source(&self, path: &TypePath) -> Option<Instance> {
        self.sources.get(path).map(|constructor| constructor())
    }
}

impl std::fmt::Debug for Discovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Discovery")
            .field("mappers", &self.mappers.keys().collect::<Vec<_>>())
            .field("sources", &self.sources.keys().collect::<Vec<_>>())
            .finish()
    }
}
