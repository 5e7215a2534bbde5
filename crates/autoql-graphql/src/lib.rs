//! # autoql-graphql
//!
//! GraphQL schema generation from the class model of `autoql-core`.
//!
//! Register classes once, point the builder at one or more service instances
//! and get an executable async-graphql dynamic schema:
//!
//! - Methods marked as queries or mutations become root fields
//! - Members of returned classes become object fields, recursively
//! - Object types are mirrored into input types for arguments
//! - Containers, optionals, enum-keyed maps and value types map through
//!   pluggable type mappers
//! - Classes declared as nodes implement a shared `Node` interface, with a root
//!   `node(id: ID!)` lookup
//!
//! ## Configuration
//!
//! ```toml
//! query_type_name = "Query"
//! mutation_type_name = "Mutation"
//! input_suffix = "Input"
//! max_depth = 15
//! max_complexity = 500
//! introspection = true
//! date_format = "epoch_millis"
//! ```
//!
//! ## Modules
//!
//! - [`config`] - Configuration options
//! - [`schema`] - Type mapping, schema building and lazy loading
//! - [`fetchers`] - Field resolution
//! - [`observability`] - Tracing setup
//! - [`error`] - Error types

pub mod config;
pub mod error;
pub mod fetchers;
pub mod observability;
pub mod schema;

pub use config::{DateFormat, SchemaConfig};
pub use error::{ResolveError, SchemaError};
pub use fetchers::{
    DataFetcher, DataFetcherFactory, DefaultDataFetcherFactory, FetchEnvironment,
    MethodDataFetcher,
};
pub use schema::{BuiltSchema, LazySchema, SchemaBuilder};

/// Result type for schema generation.
pub type Result<T> = std::result::Result<T, SchemaError>;
