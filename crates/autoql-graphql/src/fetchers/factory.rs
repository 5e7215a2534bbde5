use std::collections::HashMap;
use std::sync::Arc;

use autoql_core::{ClassDef, Instance, MemberDef, MethodDef, TypeConverter};
use tracing::trace;

use super::{DataFetcher, MethodDataFetcher};
use crate::error::SchemaError;

/// What a fetcher is requested for.
#[derive(Debug, Clone, Copy)]
pub enum FetcherShape<'a> {
    Method(&'a MethodDef),
    Member(&'a MemberDef),
}

/// Everything a factory needs to produce a fetcher for one field.
pub struct FetcherRequest<'a> {
    pub owner: &'a ClassDef,
    pub shape: FetcherShape<'a>,
    /// Service instance the method is bound to; `None` for methods on composite types.
    pub target: Option<Instance>,
    pub converter: Arc<dyn TypeConverter>,
}

impl<'a> FetcherRequest<'a> {
    pub fn method(
        owner: &'a ClassDef,
        method: &'a MethodDef,
        target: Option<Instance>,
        converter: Arc<dyn TypeConverter>,
    ) -> Self {
        Self {
            owner,
            shape: FetcherShape::Method(method),
            target,
            converter,
        }
    }

    pub fn member(
        owner: &'a ClassDef,
        member: &'a MemberDef,
        converter: Arc<dyn TypeConverter>,
    ) -> Self {
        Self {
            owner,
            shape: FetcherShape::Member(member),
            target: None,
            converter,
        }
    }

    /// The schema field name the fetcher will serve.
    pub fn field_name(&self) -> &'a str {
        match self.shape {
            FetcherShape::Method(method) => method.exposed_name(),
            FetcherShape::Member(member) => member.field_name(),
        }
    }

    /// The declared custom fetcher key, if any.
    pub fn custom_key(&self) -> Option<&'a str> {
        match self.shape {
            FetcherShape::Method(method) => method.fetcher_key(),
            FetcherShape::Member(member) => member.fetcher_key(),
        }
    }

    /// Builds the default method binding, with every declared parameter bound in order.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::InvalidParameter` for member-shaped requests.
    pub fn default_binding(&self) -> Result<MethodDataFetcher, SchemaError> {
        let FetcherShape::Method(method) = self.shape else {
            return Err(SchemaError::InvalidParameter(format!(
                "{}.{} is a member; only methods have a default binding",
                self.owner.path(),
                self.field_name()
            )));
        };

        let mut fetcher = MethodDataFetcher::new(
            method.exposed_name(),
            self.target.clone(),
            method.handle().clone(),
            Arc::clone(&self.converter),
        );
        for param in method.params() {
            fetcher.add_param(
                param.name(),
                param.descriptor().clone(),
                param.default().cloned(),
            );
        }
        Ok(fetcher)
    }
}

/// Produces data fetchers for fields.
pub trait DataFetcherFactory: Send + Sync {
    fn create(&self, request: &FetcherRequest<'_>) -> Result<Arc<dyn DataFetcher>, SchemaError>;
}

/// Constructor of a named custom fetcher.
pub type FetcherConstructor =
    dyn Fn(&FetcherRequest<'_>) -> Result<Arc<dyn DataFetcher>, SchemaError> + Send + Sync;

/// Builds [`MethodDataFetcher`]s, or a registered custom fetcher when the
/// field declares a fetcher key.
#[derive(Default, Clone)]
pub struct DefaultDataFetcherFactory {
    custom: HashMap<String, Arc<FetcherConstructor>>,
}

impl DefaultDataFetcherFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a custom fetcher constructor under `key`.
    pub fn register<F>(&mut self, key: impl Into<String>, constructor: F)
    where
        F: Fn(&FetcherRequest<'_>) -> Result<Arc<dyn DataFetcher>, SchemaError>
            + Send
            + Sync
            + 'static,
    {
        self.custom.insert(key.into(), Arc::new(constructor));
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_fetcher<F>(mut self, key: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(&FetcherRequest<'_>) -> Result<Arc<dyn DataFetcher>, SchemaError>
            + Send
            + Sync
            + 'static,
    {
        self.register(key, constructor);
        self
    }
}

impl DataFetcherFactory for DefaultDataFetcherFactory {
    fn create(&self, request: &FetcherRequest<'_>) -> Result<Arc<dyn DataFetcher>, SchemaError> {
        if let Some(key) = request.custom_key() {
            let constructor = self.custom.get(key).ok_or_else(|| {
                SchemaError::InvalidParameter(format!(
                    "unknown data fetcher {key} declared on {}.{}",
                    request.owner.path(),
                    request.field_name()
                ))
            })?;
            trace!(fetcher = key, field = request.field_name(), "Creating custom data fetcher");
            return constructor(request);
        }

        match request.shape {
            FetcherShape::Method(_) => Ok(Arc::new(request.default_binding()?)),
            FetcherShape::Member(_) => Err(SchemaError::InvalidParameter(format!(
                "member {}.{} requires a custom data fetcher",
                request.owner.path(),
                request.field_name()
            ))),
        }
    }
}

impl std::fmt::Debug for DefaultDataFetcherFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultDataFetcherFactory")
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .finish()
    }
}
