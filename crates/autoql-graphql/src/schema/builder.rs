//! Top-level schema generation.
//!
//! [`SchemaBuilder`] collects query sources, custom mappers and the pluggable
//! strategies, then builds the schema in a single pass:
//!
//! 1. Validate the configuration and merge custom mappers with the built-ins.
//! 2. Turn every query (and mutation) method of every source into a root field.
//! 3. If node identity factories are registered, map all node classes and add
//!    the root `node(id: ID!)` field.
//! 4. Assemble the executable schema.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use async_graphql::dynamic::Schema;
use autoql_core::{
    ClassRegistry, Instance, JsonTypeConverter, MarkerScanner, MethodMarker, RawType,
    TypeConverter, TypeDescriptor, TypeMarker, TypePath,
};
use tracing::{debug, info, warn};

use super::assemble::assemble;
use super::discovery::{DiscoveredMapper, Discovery};
use super::mappers::{MapperRegistry, TypeMapper};
use super::naming::{NamingStrategy, SimpleNamingStrategy};
use super::node::{NODE_FIELD, NODE_ID_FIELD, NodeIdentityFactory, NodeResolver};
use super::object_mapper::{MapperContext, ObjectMapper};
use super::query_factory::{FieldScope, build_fields};
use super::types::{
    ArgumentDefinition, FieldDefinition, FieldResolver, ObjectType, ScalarType, SchemaType,
};
use crate::config::SchemaConfig;
use crate::error::SchemaError;
use crate::fetchers::{DataFetcherFactory, DefaultDataFetcherFactory};

#[derive(Clone)]
struct QuerySource {
    path: TypePath,
    instance: Instance,
}

/// Builds GraphQL schemas from a class registry.
#[derive(Clone)]
pub struct SchemaBuilder {
    classes: Arc<ClassRegistry>,
    sources: Vec<QuerySource>,
    mappers: MapperRegistry,
    naming: Arc<dyn NamingStrategy>,
    fetchers: Arc<dyn DataFetcherFactory>,
    converter: Arc<dyn TypeConverter>,
    node_factories: Vec<Arc<dyn NodeIdentityFactory>>,
    config: SchemaConfig,
}

impl SchemaBuilder {
    pub fn new(classes: Arc<ClassRegistry>) -> Self {
        Self {
            classes,
            sources: Vec::new(),
            mappers: MapperRegistry::new(),
            naming: Arc::new(SimpleNamingStrategy),
            fetchers: Arc::new(DefaultDataFetcherFactory::new()),
            converter: Arc::new(JsonTypeConverter),
            node_factories: Vec::new(),
            config: SchemaConfig::default(),
        }
    }

    /// Adds a service instance whose marked methods become root fields.
    pub fn query_source<T>(self, path: impl Into<TypePath>, instance: T) -> Self
    where
        T: Any + Send + Sync,
    {
        self.shared_query_source(path, Arc::new(instance))
    }

    /// [`query_source`](Self::query_source) for an already shared instance.
    pub fn shared_query_source(mut self, path: impl Into<TypePath>, instance: Instance) -> Self {
        self.sources.push(QuerySource {
            path: path.into(),
            instance,
        });
        self
    }

    /// Registers an exact mapper; a later registration for the same raw type wins.
    pub fn type_mapper(mut self, raw: RawType, mapper: impl TypeMapper + 'static) -> Self {
        self.mappers.register_exact(raw, Arc::new(mapper));
        self
    }

    /// Registers an interface mapper, consulted before the built-in ones.
    pub fn interface_mapper(mut self, mapper: impl TypeMapper + 'static) -> Self {
        self.mappers.register_interface(Arc::new(mapper));
        self
    }

    pub fn naming_strategy(mut self, strategy: impl NamingStrategy + 'static) -> Self {
        self.naming = Arc::new(strategy);
        self
    }

    pub fn data_fetcher_factory(mut self, factory: impl DataFetcherFactory + 'static) -> Self {
        self.fetchers = Arc::new(factory);
        self
    }

    pub fn type_converter(mut self, converter: impl TypeConverter + 'static) -> Self {
        self.converter = Arc::new(converter);
        self
    }

    pub fn node_factory(mut self, factory: impl NodeIdentityFactory + 'static) -> Self {
        self.node_factories.push(Arc::new(factory));
        self
    }

    pub fn config(mut self, config: SchemaConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers the mappers and query sources found by `scanner` in `namespace`.
    ///
    /// Classes without a constructor in `discovery` are skipped with a warning.
    pub fn discover(
        mut self,
        scanner: &dyn MarkerScanner,
        namespace: &str,
        discovery: &Discovery,
    ) -> Self {
        for path in scanner.scan(namespace, TypeMarker::TypeMapper) {
            match discovery.mapper(&path) {
                Some(DiscoveredMapper::Exact(raw, mapper)) => {
                    debug!(class = %path, raw_type = %raw, "Discovered exact type mapper");
                    self.mappers.register_exact(raw, mapper);
                }
                Some(DiscoveredMapper::Interface(mapper)) => {
                    debug!(class = %path, "Discovered interface type mapper");
                    self.mappers.register_interface(mapper);
                }
                None => warn!(class = %path, "No constructor for discovered type mapper"),
            }
        }

        for path in scanner.scan(namespace, TypeMarker::QuerySource) {
            match discovery.source(&path) {
                Some(instance) => {
                    debug!(class = %path, "Discovered query source");
                    self = self.shared_query_source(path, instance);
                }
                None => warn!(class = %path, "No constructor for discovered query source"),
            }
        }
        self
    }

    /// An object mapper wired the way [`build`](Self::build) wires it.
    pub fn object_mapper(&self) -> ObjectMapper {
        let mappers = MapperRegistry::merged(&self.mappers, MapperRegistry::builtin(&self.config));
        ObjectMapper::new(Arc::new(MapperContext {
            classes: Arc::clone(&self.classes),
            mappers,
            naming: Arc::clone(&self.naming),
            fetchers: Arc::clone(&self.fetchers),
            converter: Arc::clone(&self.converter),
            config: self.config.clone(),
        }))
    }

    /// Builds the schema.
    ///
    /// # Errors
    ///
    /// Any failure aborts the whole build; no partial schema is returned.
    pub fn build(&self) -> Result<BuiltSchema, SchemaError> {
        self.config.validate().map_err(SchemaError::InvalidConfig)?;
        info!(
            sources = self.sources.len(),
            classes = self.classes.len(),
            "Building GraphQL schema"
        );

        let mut mapper = self.object_mapper();
        let mut query = RootType::new(&self.config.query_type_name);
        let mut mutation = RootType::new(&self.config.mutation_type_name);
        let no_bindings = HashMap::new();

        for source in &self.sources {
            let class = self.classes.class(&source.path)?;
            for (marker, root) in [
                (MethodMarker::Query, &mut query),
                (MethodMarker::Mutation, &mut mutation),
            ] {
                let fields = build_fields(
                    &mut mapper,
                    class,
                    Some(Arc::clone(&source.instance)),
                    marker,
                    FieldScope::Root,
                    &no_bindings,
                )?;
                root.extend(fields, &source.path)?;
            }
        }

        if !self.node_factories.is_empty() {
            self.add_node_field(&mut mapper, &mut query)?;
        }

        let query = Arc::new(query.object);
        let mutation = (!mutation.object.fields.is_empty()).then(|| Arc::new(mutation.object));
        let schema = assemble(&self.config, &query, mutation.as_ref(), &mapper)?;

        let output_types = named_types(mapper.output_cache().types().map(|(_, ty)| ty));
        let input_types = named_types(mapper.input_cache().types().map(|(_, ty)| ty));
        info!(
            output_types = output_types.len(),
            input_types = input_types.len(),
            "GraphQL schema built"
        );

        Ok(BuiltSchema {
            schema,
            query,
            mutation,
            output_types,
            input_types,
        })
    }

    fn add_node_field(
        &self,
        mapper: &mut ObjectMapper,
        query: &mut RootType,
    ) -> Result<(), SchemaError> {
        for class in self
            .classes
            .iter()
            .filter(|class| class.is_node() && class.type_params().is_empty())
        {
            mapper.get_output_type(&TypeDescriptor::named(class.path().clone()))?;
        }

        let resolver = NodeResolver::new(
            self.node_factories.clone(),
            mapper
                .node_types()
                .iter()
                .map(|(descriptor, name)| (descriptor.clone(), name.clone())),
        );
        let field = FieldDefinition {
            name: NODE_FIELD.to_string(),
            ty: mapper.node_interface(),
            non_null: false,
            description: Some("Fetches an object given its global id".to_string()),
            arguments: vec![ArgumentDefinition {
                name: NODE_ID_FIELD.to_string(),
                ty: SchemaType::Scalar(ScalarType::Id),
                required: true,
                default: None,
                description: None,
            }],
            resolver: FieldResolver::Node(Arc::new(resolver)),
            source: None,
            materialize_list: false,
        };
        debug!(node_types = mapper.node_types().len(), "Adding node field");
        query.extend(vec![field], &TypePath::new(NODE_FIELD))
    }
}

impl std::fmt::Debug for SchemaBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaBuilder")
            .field(
                "sources",
                &self.sources.iter().map(|s| &s.path).collect::<Vec<_>>(),
            )
            .field("mappers", &self.mappers)
            .field("node_factories", &self.node_factories.len())
            .field("config", &self.config)
            .finish()
    }
}

/// A root type under construction, remembering which source declared each field.
struct RootType {
    object: ObjectType,
    owners: HashMap<String, TypePath>,
}

impl RootType {
    fn new(name: &str) -> Self {
        Self {
            object: ObjectType::new(name),
            owners: HashMap::new(),
        }
    }

    fn extend(&mut self, fields: Vec<FieldDefinition>, owner: &TypePath) -> Result<(), SchemaError> {
        for field in fields {
            if let Some(first) = self.owners.get(&field.name) {
                return Err(SchemaError::NameCollision {
                    name: format!("{}.{}", self.object.name, field.name),
                    first: first.to_string(),
                    second: owner.to_string(),
                });
            }
            self.owners.insert(field.name.clone(), owner.clone());
            self.object.fields.push(field);
        }
        Ok(())
    }
}

/// Named types of a cache, deduplicated by name and sorted.
fn named_types<'a>(types: impl Iterator<Item = &'a SchemaType>) -> Vec<SchemaType> {
    let mut named: Vec<SchemaType> = Vec::new();
    for ty in types {
        let keep = match ty {
            SchemaType::Scalar(scalar) => !scalar.is_builtin(),
            SchemaType::List(_) | SchemaType::Reference(_) => false,
            _ => true,
        };
        if keep && !named.iter().any(|existing| existing.name() == ty.name()) {
            named.push(ty.clone());
        }
    }
    named.sort_by(|a, b| a.name().cmp(&b.name()));
    named
}

/// The result of a successful build.
pub struct BuiltSchema {
    schema: Schema,
    query: Arc<ObjectType>,
    mutation: Option<Arc<ObjectType>>,
    output_types: Vec<SchemaType>,
    input_types: Vec<SchemaType>,
}

impl BuiltSchema {
    /// The executable async-graphql schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Schema definition language rendering.
    pub fn sdl(&self) -> String {
        self.schema.sdl()
    }

    pub fn query_type(&self) -> &Arc<ObjectType> {
        &self.query
    }

    pub fn mutation_type(&self) -> Option<&Arc<ObjectType>> {
        self.mutation.as_ref()
    }

    /// Named output types produced by the build, sorted by name.
    pub fn output_types(&self) -> &[SchemaType] {
        &self.output_types
    }

    /// Named input types produced by the build, sorted by name.
    pub fn input_types(&self) -> &[SchemaType] {
        &self.input_types
    }

    pub fn output_type(&self, name: &str) -> Option<&SchemaType> {
        self.output_types.iter().find(|ty| ty.name() == Some(name))
    }

    pub fn input_type(&self, name: &str) -> Option<&SchemaType> {
        self.input_types.iter().find(|ty| ty.name() == Some(name))
    }

    /// Executes a request against the schema.
    pub async fn execute(
        &self,
        request: impl Into<async_graphql::Request>,
    ) -> async_graphql::Response {
        self.schema.execute(request).await
    }
}

impl std::fmt::Debug for BuiltSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltSchema")
            .field("query", &self.query.name)
            .field("mutation", &self.mutation.as_ref().map(|m| &m.name))
            .field("output_types", &self.output_types.len())
            .field("input_types", &self.input_types.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoql_core::{ClassDef, MemberDef, MethodDef};
    use serde_json::json;

    struct Api;

    fn classes() -> Arc<ClassRegistry> {
        Arc::new(
            ClassRegistry::new()
                .with(ClassDef::object("app::Person").member(MemberDef::new("name", TypeDescriptor::string())))
                .unwrap()
                .with(
                    ClassDef::object("app::Api")
                        .method(
                            MethodDef::query("me", TypeDescriptor::named("app::Person"))
                                .handler(|_, _| Ok(json!({ "name": "Ann" }))),
                        )
                        .method(
                            MethodDef::mutation("rename", TypeDescriptor::named("app::Person"))
                                .handler(|_, _| Ok(json!({ "name": "Bob" }))),
                        ),
                )
                .unwrap()
                .with(
                    ClassDef::object("app::Other").method(
                        MethodDef::query("me", TypeDescriptor::string()).handler(|_, _| Ok(json!("x"))),
                    ),
                )
                .unwrap(),
        )
    }

    #[test]
    fn test_build_collects_types() {
        let built = SchemaBuilder::new(classes())
            .query_source("app::Api", Api)
            .build()
            .unwrap();

        assert_eq!(built.query_type().field_names(), vec!["me"]);
        assert_eq!(built.mutation_type().unwrap().field_names(), vec!["rename"]);
        assert!(built.output_type("Person").is_some());
        assert!(built.input_types().is_empty());
    }

    #[test]
    fn test_duplicate_root_field() {
        let err = SchemaBuilder::new(classes())
            .query_source("app::Api", Api)
            .query_source("app::Other", Api)
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::NameCollision { ref name, .. } if name == "Query.me"));
    }

    #[test]
    fn test_unknown_source_class() {
        let err = SchemaBuilder::new(classes())
            .query_source("app::Nowhere", Api)
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::Class(_)));
    }

    #[test]
    fn test_invalid_config_aborts() {
        let config = SchemaConfig {
            max_depth: 0,
            ..SchemaConfig::default()
        };
        let err = SchemaBuilder::new(classes()).config(config).build().unwrap_err();
        assert!(matches!(err, SchemaError::InvalidConfig(_)));
    }
}
