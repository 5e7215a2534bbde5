//! Deferred schema building.
//!
//! `LazySchema` builds on first access so an application can start serving
//! before its classes are mapped. Swapping the builder or invalidating forces
//! a rebuild on the next access.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use super::builder::{BuiltSchema, SchemaBuilder};
use crate::error::SchemaError;

/// Lifecycle of a [`LazySchema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaState {
    Uninitialized,
    Building,
    Ready,
    Failed,
}

/// Thread-safe holder of a schema built on first use.
pub struct LazySchema {
    schema: RwLock<Option<Arc<BuiltSchema>>>,
    /// Held for the duration of a build or an invalidation.
    build_lock: Mutex<()>,
    state: RwLock<SchemaState>,
    builder: RwLock<Arc<SchemaBuilder>>,
    last_error: RwLock<Option<String>>,
}

impl LazySchema {
    #[must_use]
    pub fn new(builder: SchemaBuilder) -> Self {
        Self {
            schema: RwLock::new(None),
            build_lock: Mutex::new(()),
            state: RwLock::new(SchemaState::Uninitialized),
            builder: RwLock::new(Arc::new(builder)),
            last_error: RwLock::new(None),
        }
    }

    pub async fn state(&self) -> SchemaState {
        *self.state.read().await
    }

    /// Returns the schema, building it if necessary.
    ///
    /// Does not wait for a build started by another caller.
    ///
    /// # Errors
    ///
    /// `SchemaInitializing` while another build is in progress;
    /// `SchemaBuildFailed` if the build fails.
    pub async fn get_or_build(&self) -> Result<Arc<BuiltSchema>, SchemaError> {
        if let Some(schema) = self.get().await {
            return Ok(schema);
        }
        if *self.state.read().await == SchemaState::Building {
            return Err(SchemaError::SchemaInitializing);
        }
        let Ok(_guard) = self.build_lock.try_lock() else {
            return Err(SchemaError::SchemaInitializing);
        };
        if let Some(schema) = self.get().await {
            return Ok(schema);
        }
        self.build_locked().await
    }

    /// Returns the schema, waiting for an in-progress build instead of failing.
    ///
    /// A previous failure is reported again without rebuilding; call
    /// [`invalidate`](Self::invalidate) to retry.
    ///
    /// # Errors
    ///
    /// `SchemaBuildFailed` if the build fails or failed before.
    pub async fn get_or_build_wait(&self) -> Result<Arc<BuiltSchema>, SchemaError> {
        if let Some(schema) = self.get().await {
            return Ok(schema);
        }
        let _guard = self.build_lock.lock().await;
        if let Some(schema) = self.get().await {
            return Ok(schema);
        }
        if *self.state.read().await == SchemaState::Failed
            && let Some(err) = self.last_error.read().await.as_ref()
        {
            return Err(SchemaError::SchemaBuildFailed(err.clone()));
        }
        self.build_locked().await
    }

    /// Runs a build. The caller holds `build_lock`.
    async fn build_locked(&self) -> Result<Arc<BuiltSchema>, SchemaError> {
        *self.state.write().await = SchemaState::Building;
        let builder = Arc::clone(&*self.builder.read().await);

        match builder.build() {
            Ok(schema) => {
                let schema = Arc::new(schema);
                *self.schema.write().await = Some(Arc::clone(&schema));
                *self.state.write().await = SchemaState::Ready;
                *self.last_error.write().await = None;
                info!("Lazy GraphQL schema is ready");
                Ok(schema)
            }
            Err(e) => {
                let error_msg = e.to_string();
                warn!(error = %error_msg, "Failed to build lazy GraphQL schema");
                *self.state.write().await = SchemaState::Failed;
                *self.last_error.write().await = Some(error_msg.clone());
                Err(SchemaError::SchemaBuildFailed(error_msg))
            }
        }
    }

    /// The schema if it is already built.
    pub async fn get(&self) -> Option<Arc<BuiltSchema>> {
        self.schema.read().await.clone()
    }

    /// Drops the cached schema; the next access rebuilds it.
    pub async fn invalidate(&self) {
        let _guard = self.build_lock.lock().await;
        *self.schema.write().await = None;
        *self.state.write().await = SchemaState::Uninitialized;
        *self.last_error.write().await = None;
        info!("GraphQL schema invalidated");
    }

    /// Replaces the builder, e.g. after new classes were registered, and invalidates.
    pub async fn replace_builder(&self, builder: SchemaBuilder) {
        *self.builder.write().await = Arc::new(builder);
        self.invalidate().await;
    }

    pub async fn last_error(&self) -> Option<String> {
        self.last_error.read().await.clone()
    }

    pub async fn is_ready(&self) -> bool {
        *self.state.read().await == SchemaState::Ready
    }
}
