//! Data fetchers: the runtime units that resolve one schema field.
//!
//! A fetcher sees the execution through a [`FetchEnvironment`], which keeps it
//! independent of the GraphQL engine. [`ResolverEnvironment`] adapts
//! async-graphql's dynamic [`ResolverContext`].

mod factory;
mod method;

use async_graphql::dynamic::ResolverContext;
use serde_json::Value;

use crate::error::ResolveError;

pub use factory::{
    DataFetcherFactory, DefaultDataFetcherFactory, FetcherConstructor, FetcherRequest,
    FetcherShape,
};
pub use method::MethodDataFetcher;

/// What a fetcher can observe about the field being resolved.
pub trait FetchEnvironment {
    /// Name of the requested field.
    fn field_name(&self) -> &str;

    /// Raw value of a named argument, if supplied.
    fn argument(&self, name: &str) -> Option<Value>;

    /// The resolved parent object, if any.
    fn source(&self) -> Option<&Value>;
}

/// Resolves a field value.
pub trait DataFetcher: Send + Sync {
    /// Returns `Ok(None)` when the fetcher is asked about a field it does not own.
    fn fetch(&self, env: &dyn FetchEnvironment) -> Result<Option<Value>, ResolveError>;
}

/// [`FetchEnvironment`] over an async-graphql resolver context.
pub struct ResolverEnvironment<'r, 'a> {
    ctx: &'r ResolverContext<'a>,
    field_name: String,
    source: Option<Value>,
}

impl<'r, 'a> ResolverEnvironment<'r, 'a> {
    pub fn new(ctx: &'r ResolverContext<'a>) -> Self {
        let source = ctx
            .parent_value
            .as_value()
            .filter(|value| !matches!(value, async_graphql::Value::Null))
            .and_then(|value| value.clone().into_json().ok());

        Self {
            ctx,
            field_name: ctx.ctx.field().name().to_string(),
            source,
        }
    }
}

impl FetchEnvironment for ResolverEnvironment<'_, '_> {
    fn field_name(&self) -> &str {
        &self.field_name
    }

    fn argument(&self, name: &str) -> Option<Value> {
        self.ctx
            .args
            .get(name)
            .and_then(|accessor| accessor.as_value().clone().into_json().ok())
    }

    fn source(&self) -> Option<&Value> {
        self.source.as_ref()
    }
}

/// In-memory [`FetchEnvironment`], for invoking fetchers outside a query.
#[derive(Debug, Clone, Default)]
pub struct StaticEnvironment {
    pub field_name: String,
    pub arguments: serde_json::Map<String, Value>,
    pub source: Option<Value>,
}

impl StaticEnvironment {
    pub fn new(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            ..Self::default()
        }
    }

    pub fn with_argument(mut self, name: impl Into<String>, value: Value) -> Self {
        self.arguments.insert(name.into(), value);
        self
    }

    pub fn with_source(mut self, source: Value) -> Self {
        self.source = Some(source);
        self
    }
}

impl FetchEnvironment for StaticEnvironment {
    fn field_name(&self) -> &str {
        &self.field_name
    }

    fn argument(&self, name: &str) -> Option<Value> {
        self.arguments.get(name).cloned()
    }

    fn source(&self) -> Option<&Value> {
        self.source.as_ref()
    }
}
