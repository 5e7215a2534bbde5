//! Turns the mapped type model into an executable async-graphql dynamic schema.

use std::sync::Arc;

use async_graphql::dynamic::{
    Enum, EnumItem, Field, FieldFuture, FieldValue, InputObject, InputValue, Interface,
    InterfaceField as DynInterfaceField, Object, ResolverContext, Scalar, Schema, SchemaBuilder,
    TypeRef,
};
use async_graphql::{Name, Value};
use indexmap::IndexMap;
use tracing::debug;

use super::node::{NODE_ID_FIELD, NodeResolver};
use super::object_mapper::ObjectMapper;
use super::types::{
    EnumType, FieldDefinition, FieldResolver, InputObjectType, InterfaceType, ObjectType,
    PLACEHOLDER_FIELD, ScalarType, SchemaType,
};
use crate::config::SchemaConfig;
use crate::error::{ResolveError, SchemaError};
use crate::fetchers::{DataFetcher, ResolverEnvironment};

/// Convert a serde_json value to an async-graphql value.
pub(crate) fn json_to_graphql_value(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                Value::Number(u.into())
            } else {
                n.as_f64()
                    .and_then(async_graphql::Number::from_f64)
                    .map_or(Value::Null, Value::Number)
            }
        }
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(items) => {
            Value::List(items.into_iter().map(json_to_graphql_value).collect())
        }
        serde_json::Value::Object(obj) => Value::Object(
            obj.into_iter()
                .map(|(k, v)| (Name::new(k), json_to_graphql_value(v)))
                .collect(),
        ),
    }
}

/// Coercions applied to resolved values so they satisfy the declared output type.
#[derive(Debug, Clone)]
enum OutputShape {
    Plain,
    Enum,
    Id,
    List(Box<OutputShape>),
}

impl OutputShape {
    fn of(ty: &SchemaType) -> Self {
        match ty {
            SchemaType::Enum(_) => Self::Enum,
            SchemaType::Scalar(ScalarType::Id) => Self::Id,
            SchemaType::List(inner) => Self::List(Box::new(Self::of(inner))),
            _ => Self::Plain,
        }
    }

    fn coerce(&self, value: Value) -> Value {
        match (self, value) {
            (Self::Enum, Value::String(s)) => Value::Enum(Name::new(s)),
            (Self::Id, Value::Number(n)) => Value::String(n.to_string()),
            (Self::List(inner), Value::List(items)) => {
                Value::List(items.into_iter().map(|item| inner.coerce(item)).collect())
            }
            (_, value) => value,
        }
    }
}

/// Named types reachable from the roots and the caches, keyed by schema name.
#[derive(Default)]
struct TypeCollector {
    /// Type and a description of where it was first seen.
    named: IndexMap<String, (SchemaType, String)>,
    /// Pending references and where they were used.
    references: Vec<(String, String)>,
}

impl TypeCollector {
    fn visit(&mut self, ty: &SchemaType, origin: &str) -> Result<(), SchemaError> {
        match ty {
            SchemaType::List(inner) => self.visit(inner, origin),
            SchemaType::Reference(name) => {
                self.references.push((name.clone(), origin.to_string()));
                Ok(())
            }
            SchemaType::Scalar(scalar) if scalar.is_builtin() => Ok(()),
            named => {
                let name = named.base_name().to_string();
                if let Some((existing, first)) = self.named.get(&name) {
                    if existing.same_as(named) {
                        return Ok(());
                    }
                    return Err(SchemaError::NameCollision {
                        name,
                        first: first.clone(),
                        second: origin.to_string(),
                    });
                }
                self.named
                    .insert(name.clone(), (named.clone(), origin.to_string()));
                self.visit_children(named, &name)
            }
        }
    }

    fn visit_children(&mut self, ty: &SchemaType, parent: &str) -> Result<(), SchemaError> {
        match ty {
            SchemaType::Object(object) => {
                for field in &object.fields {
                    let origin = format!("{parent}.{}", field.name);
                    self.visit(&field.ty, &origin)?;
                    for argument in &field.arguments {
                        self.visit(&argument.ty, &format!("{origin}({})", argument.name))?;
                    }
                }
            }
            SchemaType::InputObject(input) => {
                for field in &input.fields {
                    self.visit(&field.ty, &format!("{parent}.{}", field.name))?;
                }
            }
            SchemaType::Interface(interface) => {
                for field in &interface.fields {
                    self.visit(&field.ty, &format!("{parent}.{}", field.name))?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn check_references(&self) -> Result<(), SchemaError> {
        for (name, origin) in &self.references {
            if !self.named.contains_key(name) {
                return Err(SchemaError::Assembly(format!(
                    "type {name} referenced by {origin} was never built"
                )));
            }
        }
        Ok(())
    }
}

fn type_ref(ty: &SchemaType, non_null: bool) -> TypeRef {
    let base = match ty {
        SchemaType::List(inner) => TypeRef::List(Box::new(type_ref(inner, false))),
        named => TypeRef::named(named.base_name()),
    };
    if non_null {
        TypeRef::NonNull(Box::new(base))
    } else {
        base
    }
}

fn placeholder_field() -> Field {
    Field::new(PLACEHOLDER_FIELD, TypeRef::named(TypeRef::STRING), |_| {
        FieldFuture::new(async { Ok(None::<Value>) })
    })
    .description("Placeholder field - this type has no fields")
}

fn property_field(
    name: &str,
    key: String,
    type_ref: TypeRef,
    shape: OutputShape,
    materialize_list: bool,
) -> Field {
    Field::new(name, type_ref, move |ctx| {
        let key = key.clone();
        let shape = shape.clone();
        FieldFuture::new(async move {
            let value = match ctx.parent_value.as_value() {
                Some(Value::Object(obj)) => obj.get(&Name::new(&key)).cloned(),
                _ => None,
            };
            Ok(settle(value, &shape, materialize_list))
        })
    })
}

/// Normalizes a resolved value: null becomes a missing result, or an empty
/// list when the field materializes collections.
fn settle(value: Option<Value>, shape: &OutputShape, materialize_list: bool) -> Option<Value> {
    match value {
        Some(Value::Null) | None if materialize_list => Some(Value::List(Vec::new())),
        Some(Value::Null) | None => None,
        Some(value) => Some(shape.coerce(value)),
    }
}

fn fetcher_field(
    name: &str,
    fetcher: Arc<dyn DataFetcher>,
    type_ref: TypeRef,
    shape: OutputShape,
    materialize_list: bool,
) -> Field {
    Field::new(name, type_ref, move |ctx| {
        let fetcher = Arc::clone(&fetcher);
        let shape = shape.clone();
        FieldFuture::new(async move {
            let env = ResolverEnvironment::new(&ctx);
            let value = fetcher.fetch(&env).map_err(ResolveError::into_graphql)?;
            Ok(settle(value.map(json_to_graphql_value), &shape, materialize_list))
        })
    })
}

/// Reads the `id` argument, accepting both string and numeric ids.
fn node_id(ctx: &ResolverContext<'_>) -> async_graphql::Result<String> {
    match ctx.args.try_get(NODE_ID_FIELD)?.as_value() {
        Value::String(id) => Ok(id.clone()),
        Value::Number(id) => Ok(id.to_string()),
        other => Err(async_graphql::Error::new(format!("invalid node id {other}"))),
    }
}

fn node_field(name: &str, resolver: Arc<NodeResolver>, type_ref: TypeRef) -> Field {
    Field::new(name, type_ref, move |ctx| {
        let resolver = Arc::clone(&resolver);
        FieldFuture::new(async move {
            let id = node_id(&ctx)?;
            match resolver.resolve(&id).map_err(ResolveError::into_graphql)? {
                Some((type_name, value)) => Ok(Some(
                    FieldValue::value(json_to_graphql_value(value)).with_type(type_name),
                )),
                None => Ok(None),
            }
        })
    })
}

fn dynamic_field(field: &FieldDefinition) -> Field {
    let ty = type_ref(&field.ty, field.non_null);
    let shape = OutputShape::of(&field.ty);

    let mut dynamic = match &field.resolver {
        FieldResolver::Property { key } => {
            property_field(&field.name, key.clone(), ty, shape, field.materialize_list)
        }
        FieldResolver::Fetcher(fetcher) => fetcher_field(
            &field.name,
            Arc::clone(fetcher),
            ty,
            shape,
            field.materialize_list,
        ),
        FieldResolver::Node(resolver) => node_field(&field.name, Arc::clone(resolver), ty),
    };

    for argument in &field.arguments {
        let mut input = InputValue::new(&argument.name, type_ref(&argument.ty, argument.required));
        if let Some(default) = &argument.default {
            input = input.default_value(json_to_graphql_value(default.clone()));
        }
        if let Some(description) = &argument.description {
            input = input.description(description);
        }
        dynamic = dynamic.argument(input);
    }

    if let Some(description) = &field.description {
        dynamic = dynamic.description(description);
    }
    dynamic
}

fn dynamic_object(object: &ObjectType) -> Object {
    let mut dynamic = Object::new(&object.name);
    if let Some(description) = &object.description {
        dynamic = dynamic.description(description);
    }
    for interface in &object.interfaces {
        dynamic = dynamic.implement(interface);
    }
    if object.fields.is_empty() {
        return dynamic.field(placeholder_field());
    }
    for field in &object.fields {
        dynamic = dynamic.field(dynamic_field(field));
    }
    dynamic
}

fn dynamic_input(input: &InputObjectType) -> InputObject {
    let mut dynamic = InputObject::new(&input.name);
    if let Some(description) = &input.description {
        dynamic = dynamic.description(description);
    }
    if input.fields.is_empty() {
        return dynamic.field(InputValue::new(
            PLACEHOLDER_FIELD,
            TypeRef::named(TypeRef::STRING),
        ));
    }
    for field in &input.fields {
        let mut value = InputValue::new(&field.name, type_ref(&field.ty, false));
        if let Some(description) = &field.description {
            value = value.description(description);
        }
        dynamic = dynamic.field(value);
    }
    dynamic
}

fn dynamic_enum(enumeration: &EnumType) -> Enum {
    let mut dynamic = Enum::new(&enumeration.name);
    if let Some(description) = &enumeration.description {
        dynamic = dynamic.description(description);
    }
    for value in &enumeration.values {
        dynamic = dynamic.item(EnumItem::new(value));
    }
    dynamic
}

fn dynamic_interface(interface: &InterfaceType) -> Interface {
    let mut dynamic = Interface::new(&interface.name);
    if let Some(description) = &interface.description {
        dynamic = dynamic.description(description);
    }
    for field in &interface.fields {
        dynamic = dynamic.field(DynInterfaceField::new(
            &field.name,
            type_ref(&field.ty, field.non_null),
        ));
    }
    dynamic
}

fn register(builder: SchemaBuilder, ty: &SchemaType) -> SchemaBuilder {
    match ty {
        SchemaType::Scalar(ScalarType::Long) => builder
            .register(Scalar::new(ScalarType::Long.name()).description("64-bit signed integer")),
        SchemaType::Scalar(_) | SchemaType::List(_) | SchemaType::Reference(_) => builder,
        SchemaType::Enum(enumeration) => builder.register(dynamic_enum(enumeration)),
        SchemaType::Object(object) => builder.register(dynamic_object(object)),
        SchemaType::InputObject(input) => builder.register(dynamic_input(input)),
        SchemaType::Interface(interface) => builder.register(dynamic_interface(interface)),
    }
}

/// Assembles the executable schema from the root types and every type the
/// mapper produced.
///
/// # Errors
///
/// `NameCollision` when two distinct types share a name, `Assembly` when a
/// pending reference was never resolved or async-graphql rejects the schema.
pub(crate) fn assemble(
    config: &SchemaConfig,
    query: &Arc<ObjectType>,
    mutation: Option<&Arc<ObjectType>>,
    mapper: &ObjectMapper,
) -> Result<Schema, SchemaError> {
    let mut collector = TypeCollector::default();
    collector.visit(&SchemaType::Object(Arc::clone(query)), "the query root")?;
    if let Some(mutation) = mutation {
        collector.visit(&SchemaType::Object(Arc::clone(mutation)), "the mutation root")?;
    }
    if let Some(node) = mapper.node_interface_if_used() {
        collector.visit(node, "the node interface")?;
    }

    let mut cached: Vec<_> = mapper
        .output_cache()
        .types()
        .chain(mapper.input_cache().types())
        .filter(|(_, ty)| !ty.is_reference())
        .collect();
    cached.sort_by_cached_key(|(descriptor, _)| descriptor.to_string());
    for (descriptor, ty) in cached {
        collector.visit(ty, &descriptor.to_string())?;
    }
    collector.check_references()?;

    debug!(types = collector.named.len(), "Registering schema types");
    let mut builder = Schema::build(
        query.name.as_str(),
        mutation.map(|mutation| mutation.name.as_str()),
        None,
    );
    for (ty, _) in collector.named.values() {
        builder = register(builder, ty);
    }

    builder = builder
        .limit_depth(config.max_depth)
        .limit_complexity(config.max_complexity);
    if !config.introspection {
        builder = builder.disable_introspection();
    }

    builder
        .finish()
        .map_err(|e| SchemaError::Assembly(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_conversion() {
        let value = json_to_graphql_value(json!({ "a": [1, 2.5, "x", null, true] }));
        let Value::Object(obj) = value else {
            panic!("expected object");
        };
        let Some(Value::List(items)) = obj.get("a") else {
            panic!("expected list");
        };
        assert_eq!(items.len(), 5);
        assert_eq!(items[2], Value::String("x".into()));
        assert_eq!(items[3], Value::Null);
    }

    #[test]
    fn test_output_coercion() {
        let enum_list = OutputShape::of(&SchemaType::list_of(SchemaType::Enum(Arc::new(EnumType {
            name: "Color".into(),
            description: None,
            values: vec!["RED".into()],
        }))));
        assert_eq!(
            enum_list.coerce(Value::List(vec![Value::String("RED".into())])),
            Value::List(vec![Value::Enum(Name::new("RED"))])
        );

        let id = OutputShape::of(&SchemaType::Scalar(ScalarType::Id));
        assert_eq!(id.coerce(Value::Number(7.into())), Value::String("7".into()));
    }

    #[test]
    fn test_null_results_settle() {
        let list = OutputShape::of(&SchemaType::list_of(SchemaType::Scalar(ScalarType::String)));
        assert_eq!(settle(Some(Value::Null), &list, false), None);
        assert_eq!(settle(None, &list, false), None);
        assert_eq!(
            settle(Some(Value::Null), &list, true),
            Some(Value::List(Vec::new()))
        );
        assert_eq!(
            settle(Some(Value::String("x".into())), &OutputShape::Plain, false),
            Some(Value::String("x".into()))
        );
    }

    #[test]
    fn test_collector_detects_collisions() {
        let mut collector = TypeCollector::default();
        let first = SchemaType::Object(Arc::new(ObjectType::new("Person")));
        let second = SchemaType::Object(Arc::new(ObjectType::new("Person")));

        collector.visit(&first, "app::a::Person").unwrap();
        collector.visit(&first, "again").unwrap();
        let err = collector.visit(&second, "app::b::Person").unwrap_err();
        assert!(matches!(err, SchemaError::NameCollision { ref name, .. } if name == "Person"));
    }

    #[test]
    fn test_unresolved_reference() {
        let mut holder = ObjectType::new("Holder");
        holder.fields.push(FieldDefinition::property(
            "ghost",
            "ghost",
            SchemaType::Reference("Ghost".into()),
        ));

        let mut collector = TypeCollector::default();
        collector
            .visit(&SchemaType::Object(Arc::new(holder)), "root")
            .unwrap();
        assert!(matches!(
            collector.check_references(),
            Err(SchemaError::Assembly(_))
        ));
    }
}
