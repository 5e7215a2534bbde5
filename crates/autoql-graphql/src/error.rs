//! Error types for schema generation and field resolution.
//!
//! Build-time failures are [`SchemaError`]s and abort `build()` entirely.
//! Failures while resolving a single field are [`ResolveError`]s; they are
//! surfaced to the client as field-level GraphQL errors with a `code`
//! extension and never affect sibling fields.

use async_graphql::ErrorExtensions;
use autoql_core::{ConversionError, CoreError, InvocationError, TypeDescriptor};
use thiserror::Error;

/// Errors that can occur while building a schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// No mapper, built-in rule or object fallback applies to the type.
    #[error("Type {descriptor} cannot be mapped: {reason}")]
    NotMappable {
        descriptor: TypeDescriptor,
        reason: String,
    },

    /// A mapper produced a shape the engine does not know how to handle.
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// Two distinct types were given the same schema name.
    #[error("Type name {name} is used by both {first} and {second}")]
    NameCollision {
        name: String,
        first: String,
        second: String,
    },

    /// A data fetcher could not be created for a field.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Class(#[from] CoreError),

    /// The executable schema could not be assembled.
    #[error("Failed to assemble GraphQL schema: {0}")]
    Assembly(String),

    /// Schema is still being built - client should retry.
    #[error("GraphQL schema is initializing, please retry")]
    SchemaInitializing,

    #[error("Failed to build GraphQL schema: {0}")]
    SchemaBuildFailed(String),
}

impl SchemaError {
    /// Create a new NotMappable error
    pub fn not_mappable(descriptor: &TypeDescriptor, reason: impl Into<String>) -> Self {
        Self::NotMappable {
            descriptor: descriptor.clone(),
            reason: reason.into(),
        }
    }

    /// Whether this error may be degraded to skip-and-log at member scope.
    pub fn is_not_mappable(&self) -> bool {
        matches!(self, Self::NotMappable { .. })
    }

    /// Returns the error code for diagnostics and GraphQL error extensions.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotMappable { .. } => "NOT_MAPPABLE",
            Self::Mapping(_) => "MAPPING_ERROR",
            Self::NameCollision { .. } => "NAME_COLLISION",
            Self::InvalidParameter(_) => "INVALID_PARAMETER",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Class(_) => "INVALID_CLASS",
            Self::Assembly(_) => "ASSEMBLY_FAILED",
            Self::SchemaInitializing => "SCHEMA_INITIALIZING",
            Self::SchemaBuildFailed(_) => "SCHEMA_BUILD_FAILED",
        }
    }

    /// Returns the suggested retry delay in seconds, if applicable.
    #[must_use]
    pub fn retry_after(&self) -> Option<u32> {
        match self {
            Self::SchemaInitializing => Some(5),
            _ => None,
        }
    }
}

/// Errors raised while resolving a single field.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The bound method failed.
    #[error("Failed to invoke {field}: {source}")]
    Invocation {
        field: String,
        #[source]
        source: InvocationError,
    },

    /// An argument did not fit its declared type.
    #[error("Argument {argument} could not be converted: {source}")]
    Conversion {
        argument: String,
        #[source]
        source: ConversionError,
    },

    /// No node identity factory claims the id.
    #[error("No registered node type handles id {0}")]
    UnknownObjectType(String),

    /// A node factory returned an object whose type does not implement Node.
    #[error("Type {0} is not a registered node type")]
    NotANode(String),
}

impl ResolveError {
    /// Returns the error code for GraphQL error extensions.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Invocation { .. } => "INVOCATION_ERROR",
            Self::Conversion { .. } => "CONVERSION_ERROR",
            Self::UnknownObjectType(_) => "UNKNOWN_OBJECT_TYPE",
            Self::NotANode(_) => "NOT_A_NODE",
        }
    }

    /// Converts the error into a field-level GraphQL error.
    pub fn into_graphql(self) -> async_graphql::Error {
        let code = self.error_code();
        async_graphql::Error::new(self.to_string()).extend_with(|_, e| e.set("code", code))
    }
}
