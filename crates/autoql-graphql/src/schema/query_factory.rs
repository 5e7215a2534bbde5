//! Fields for marked methods.

use std::collections::HashMap;
use std::sync::Arc;

use autoql_core::{ClassDef, Instance, MethodDef, MethodMarker, TypeDescriptor};
use tracing::{trace, warn};

use super::object_mapper::ObjectMapper;
use super::types::{ArgumentDefinition, FieldDefinition, FieldResolver};
use crate::error::SchemaError;
use crate::fetchers::FetcherRequest;

/// Where the generated fields are attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldScope {
    /// Root query or mutation fields; unmappable methods abort the build.
    Root,
    /// Fields of a composite type; unmappable methods are skipped.
    Member,
}

/// Builds one field per method of `owner` carrying `marker`, in declaration order.
///
/// `target` is the service instance the root fields are bound to. `bindings`
/// substitutes type variables of generic owners.
pub fn build_fields(
    mapper: &mut ObjectMapper,
    owner: &ClassDef,
    target: Option<Instance>,
    marker: MethodMarker,
    scope: FieldScope,
    bindings: &HashMap<String, TypeDescriptor>,
) -> Result<Vec<FieldDefinition>, SchemaError> {
    let mut fields = Vec::new();
    for method in owner.methods_marked(marker) {
        match build_field(mapper, owner, method, target.clone(), bindings) {
            Ok(field) => fields.push(field),
            Err(err) if scope == FieldScope::Member && err.is_not_mappable() => {
                warn!(
                    class = %owner.path(),
                    method = method.name(),
                    error = %err,
                    "Skipping unmappable method"
                );
            }
            Err(err) => return Err(err),
        }
    }
    Ok(fields)
}

fn build_field(
    mapper: &mut ObjectMapper,
    owner: &ClassDef,
    method: &MethodDef,
    target: Option<Instance>,
    bindings: &HashMap<String, TypeDescriptor>,
) -> Result<FieldDefinition, SchemaError> {
    trace!(class = %owner.path(), method = method.name(), "Building method field");
    let ty = mapper.get_output_type(&method.returns().substitute(bindings))?;

    let mut arguments = Vec::with_capacity(method.params().len());
    for param in method.params() {
        arguments.push(ArgumentDefinition {
            name: param.name().to_string(),
            ty: mapper.get_input_type(&param.descriptor().substitute(bindings))?,
            required: param.is_required(),
            default: param.default().cloned(),
            description: param.description_text().map(str::to_string),
        });
    }

    let ctx = Arc::clone(mapper.context());
    let request = FetcherRequest::method(owner, method, target, Arc::clone(&ctx.converter));
    let fetcher = ctx.fetchers.create(&request)?;

    Ok(FieldDefinition {
        name: method.exposed_name().to_string(),
        ty,
        non_null: false,
        description: method.description_text().map(str::to_string),
        arguments,
        resolver: FieldResolver::Fetcher(fetcher),
        source: None,
        materialize_list: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchemaConfig;
    use crate::fetchers::DefaultDataFetcherFactory;
    use crate::schema::mappers::MapperRegistry;
    use crate::schema::naming::SimpleNamingStrategy;
    use crate::schema::object_mapper::MapperContext;
    use autoql_core::{ClassRegistry, JsonTypeConverter, ParamDef};
    use serde_json::json;

    fn mapper(classes: ClassRegistry) -> ObjectMapper {
        let config = SchemaConfig::default();
        ObjectMapper::new(Arc::new(MapperContext {
            classes: Arc::new(classes),
            mappers: MapperRegistry::builtin(&config),
            naming: Arc::new(SimpleNamingStrategy),
            fetchers: Arc::new(DefaultDataFetcherFactory::new()),
            converter: Arc::new(JsonTypeConverter),
            config,
        }))
    }

    fn service() -> ClassDef {
        ClassDef::object("app::Service")
            .method(
                MethodDef::query("greet", TypeDescriptor::string())
                    .param(ParamDef::new("name", TypeDescriptor::string()).required())
                    .param(ParamDef::new("times", TypeDescriptor::i64()).default_value(1))
                    .handler(|_, _| Ok(json!("hi"))),
            )
            .method(MethodDef::mutation("reset", TypeDescriptor::boolean()))
            .method(MethodDef::query("broken", TypeDescriptor::named("app::Missing")))
    }

    #[test]
    fn test_member_scope_skips_unmappable() {
        let class = service();
        let mut mapper = mapper(ClassRegistry::new());

        let fields = build_fields(
            &mut mapper,
            &class,
            None,
            MethodMarker::Query,
            FieldScope::Member,
            &HashMap::new(),
        )
        .unwrap();
        assert_eq!(fields.len(), 1);

        let greet = &fields[0];
        assert_eq!(greet.name, "greet");
        assert_eq!(greet.arguments.len(), 2);
        assert!(greet.arguments[0].required);
        assert_eq!(greet.arguments[1].ty.name(), Some("Int"));
        assert_eq!(greet.arguments[1].default, Some(json!(1)));
    }

    #[test]
    fn test_root_scope_fails_on_unmappable() {
        let class = service();
        let mut mapper = mapper(ClassRegistry::new());

        let err = build_fields(
            &mut mapper,
            &class,
            None,
            MethodMarker::Query,
            FieldScope::Root,
            &HashMap::new(),
        )
        .unwrap_err();
        assert!(err.is_not_mappable());
    }

    #[test]
    fn test_marker_selects_methods() {
        let class = service();
        let mut mapper = mapper(ClassRegistry::new());

        let fields = build_fields(
            &mut mapper,
            &class,
            None,
            MethodMarker::Mutation,
            FieldScope::Root,
            &HashMap::new(),
        )
        .unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name, "reset");
    }
}
