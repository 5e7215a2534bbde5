//! Schema generation: descriptors in, executable GraphQL schema out.

mod assemble;
mod builder;
mod cache;
mod discovery;
mod lazy;
mod mappers;
mod naming;
mod node;
mod object_mapper;
mod query_factory;
mod types;

pub use builder::{BuiltSchema, SchemaBuilder};
pub use cache::TypeCache;
pub use discovery::{DiscoveredMapper, Discovery};
pub use lazy::{LazySchema, SchemaState};
pub use mappers::{
    ArrayMapper, CollectionMapper, EnumMapMapper, GenericObjectMapper, MapperRegistry,
    OptionalMapper, ScalarMapper, TypeMapper,
};
pub use naming::{
    CONNECTION_SUFFIX, FullNamingStrategy, NamingStrategy, RelayNamingStrategy,
    SimpleNamingStrategy,
};
pub use node::{
    NODE_FIELD, NODE_ID_FIELD, NodeIdentityFactory, NodeObject, NodeResolver, PrefixedNodeFactory,
};
pub use object_mapper::{MapperContext, ObjectMapper};
pub use query_factory::{FieldScope, build_fields};
pub use types::{
    ArgumentDefinition, EnumType, FieldDefinition, FieldResolver, InputField, InputObjectType,
    InterfaceField, InterfaceType, LONG_SCALAR, NODE_INTERFACE, ObjectType, PLACEHOLDER_FIELD,
    ScalarType, SchemaType,
};
