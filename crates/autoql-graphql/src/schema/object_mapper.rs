//! Recursive descriptor-to-schema-type mapping.
//!
//! [`ObjectMapper`] owns the output and input caches of one build. Every named
//! type is written ahead into its cache as a [`SchemaType::Reference`] before its
//! fields are mapped, so self-referential and mutually recursive types resolve
//! to a reference instead of recursing forever.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use autoql_core::{
    ClassDef, ClassRegistry, MemberDef, MethodMarker, RawType, TypeConverter, TypeDescriptor,
};
use indexmap::IndexMap;
use tracing::{debug, trace, warn};

use super::cache::TypeCache;
use super::mappers::MapperRegistry;
use super::naming::NamingStrategy;
use super::node::NODE_ID_FIELD;
use super::query_factory::{self, FieldScope};
use super::types::{
    EnumType, FieldDefinition, FieldResolver, InputField, InputObjectType, InterfaceField,
    InterfaceType, NODE_INTERFACE, ObjectType, ScalarType, SchemaType,
};
use crate::config::SchemaConfig;
use crate::error::SchemaError;
use crate::fetchers::{DataFetcherFactory, FetcherRequest};

/// Collaborators shared by every mapping step of a build.
pub struct MapperContext {
    pub classes: Arc<ClassRegistry>,
    pub mappers: MapperRegistry,
    pub naming: Arc<dyn NamingStrategy>,
    pub fetchers: Arc<dyn DataFetcherFactory>,
    pub converter: Arc<dyn TypeConverter>,
    pub config: SchemaConfig,
}

/// Type variable bindings of `class` instantiated as `descriptor`.
fn bindings_for(class: &ClassDef, descriptor: &TypeDescriptor) -> HashMap<String, TypeDescriptor> {
    class
        .type_params()
        .iter()
        .cloned()
        .zip(descriptor.args().iter().cloned())
        .collect()
}

/// A member that becomes a field, with its type arguments substituted.
struct ExposedMember<'c> {
    owner: &'c ClassDef,
    member: &'c MemberDef,
    descriptor: TypeDescriptor,
}

/// Exposed members of `descriptor` and its superclasses.
///
/// A subclass member shadows a superclass member with the same field name.
fn exposed_members<'c>(
    classes: &'c ClassRegistry,
    descriptor: &TypeDescriptor,
) -> Vec<ExposedMember<'c>> {
    let mut seen = HashSet::new();
    let mut members = Vec::new();
    for (owner_descriptor, owner) in classes.ancestors(descriptor) {
        let bindings = bindings_for(owner, &owner_descriptor);
        for member in owner.members() {
            if !member.is_exposed() {
                trace!(member = member.name(), "Skipping hidden member");
                continue;
            }
            if !seen.insert(member.field_name()) {
                continue;
            }
            members.push(ExposedMember {
                owner,
                member,
                descriptor: member.descriptor().substitute(&bindings),
            });
        }
    }
    members
}

/// Maps type descriptors to output and input schema types.
pub struct ObjectMapper {
    ctx: Arc<MapperContext>,
    output: TypeCache,
    input: TypeCache,
    node_interface: Option<SchemaType>,
    node_types: IndexMap<TypeDescriptor, String>,
}

impl ObjectMapper {
    pub fn new(ctx: Arc<MapperContext>) -> Self {
        Self {
            ctx,
            output: TypeCache::new(),
            input: TypeCache::new(),
            node_interface: None,
            node_types: IndexMap::new(),
        }
    }

    pub fn context(&self) -> &Arc<MapperContext> {
        &self.ctx
    }

    pub fn classes(&self) -> &ClassRegistry {
        &self.ctx.classes
    }

    pub fn config(&self) -> &SchemaConfig {
        &self.ctx.config
    }

    /// Schema name of `descriptor` under the configured naming strategy.
    pub fn type_name(&self, descriptor: &TypeDescriptor) -> String {
        self.ctx.naming.type_name(descriptor, &self.ctx.classes)
    }

    pub fn output_cache(&self) -> &TypeCache {
        &self.output
    }

    pub fn input_cache(&self) -> &TypeCache {
        &self.input
    }

    /// Node classes mapped so far, with their object type names.
    pub fn node_types(&self) -> &IndexMap<TypeDescriptor, String> {
        &self.node_types
    }

    /// Writes a pending reference ahead of building the output type `name`.
    fn reserve_output(&mut self, descriptor: &TypeDescriptor, name: &str) {
        self.output
            .put(descriptor.clone(), SchemaType::Reference(name.to_string()));
    }

    /// Writes a pending reference ahead of building the input type `name`.
    fn reserve_input(&mut self, descriptor: &TypeDescriptor, name: &str) {
        self.input
            .put(descriptor.clone(), SchemaType::Reference(name.to_string()));
    }

    /// Maps `descriptor` to an output type.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::NotMappable` when no mapper, built-in rule or
    /// registered class applies.
    pub fn get_output_type(&mut self, descriptor: &TypeDescriptor) -> Result<SchemaType, SchemaError> {
        if let Some(cached) = self.output.get(descriptor) {
            return Ok(cached.clone());
        }
        trace!(descriptor = %descriptor, "Mapping output type");

        if let Some(mapper) = self.ctx.mappers.exact(descriptor.raw()).cloned() {
            let ty = mapper.output_type(descriptor, self)?;
            return Ok(self.output.put(descriptor.clone(), ty));
        }

        if descriptor.is_parameterized() {
            let Some(mapper) = self.ctx.mappers.interface_for(descriptor).cloned() else {
                return Err(SchemaError::not_mappable(
                    descriptor,
                    "no mapper handles this parameterized type",
                ));
            };
            let ty = mapper.output_type(descriptor, self)?;
            return Ok(self.output.put(descriptor.clone(), ty));
        }

        let ty = match descriptor.raw() {
            RawType::Bool => SchemaType::Scalar(ScalarType::Boolean),
            RawType::I32 => SchemaType::Scalar(ScalarType::Int),
            RawType::I64 => SchemaType::Scalar(ScalarType::Long),
            RawType::F32 | RawType::F64 => SchemaType::Scalar(ScalarType::Float),
            RawType::String => SchemaType::Scalar(ScalarType::String),
            RawType::Named(path) => {
                let classes = Arc::clone(&self.ctx.classes);
                let Some(class) = classes.get(path) else {
                    return Err(SchemaError::not_mappable(descriptor, "class is not registered"));
                };
                if !class.is_enum() {
                    return self.build_object(descriptor);
                }
                SchemaType::Enum(Arc::new(EnumType {
                    name: self.type_name(descriptor),
                    description: class.description_text().map(str::to_string),
                    values: class.constants().to_vec(),
                }))
            }
            _ => {
                return Err(SchemaError::not_mappable(
                    descriptor,
                    "no mapper or built-in rule applies",
                ));
            }
        };
        Ok(self.output.put(descriptor.clone(), ty))
    }

    /// Builds an object type from the members and query methods of the class
    /// behind `descriptor` and its superclasses.
    pub fn build_object(&mut self, descriptor: &TypeDescriptor) -> Result<SchemaType, SchemaError> {
        let classes = Arc::clone(&self.ctx.classes);
        let chain = classes.ancestors(descriptor);
        let Some(&(_, class)) = chain.first() else {
            return Err(SchemaError::not_mappable(descriptor, "class is not registered"));
        };

        let name = self.type_name(descriptor);
        self.reserve_output(descriptor, &name);
        debug!(type_name = %name, descriptor = %descriptor, "Building object type");

        let mut fields: Vec<FieldDefinition> = Vec::new();
        for exposed in exposed_members(&classes, descriptor) {
            match self.member_field(&exposed) {
                Ok(field) => fields.push(field),
                Err(err) if err.is_not_mappable() => {
                    warn!(type_name = %name, member = exposed.member.name(), error = %err, "Skipping unmappable member");
                }
                Err(err) => return Err(err),
            }
        }

        for (owner_descriptor, owner) in &chain {
            let bindings = bindings_for(owner, owner_descriptor);
            let methods = query_factory::build_fields(
                self,
                owner,
                None,
                MethodMarker::Query,
                FieldScope::Member,
                &bindings,
            )?;
            for field in methods {
                if fields.iter().any(|existing| existing.name == field.name) {
                    trace!(type_name = %name, field = %field.name, "Field already defined by a subclass");
                    continue;
                }
                fields.push(field);
            }
        }

        let mut object = ObjectType::new(name);
        object.description = class.description_text().map(str::to_string);

        if let Some(id_member) = class.node_id() {
            self.node_interface();
            let shadowed = fields
                .iter()
                .position(|field| field.name == NODE_ID_FIELD)
                .map(|index| fields.remove(index));
            let mut id = FieldDefinition::property(NODE_ID_FIELD, id_member, SchemaType::Scalar(ScalarType::Id));
            id.non_null = true;
            // Input mirrors keep the member's own type for `id`.
            id.source = shadowed.and_then(|field| field.source);
            fields.insert(0, id);
            object.interfaces.push(NODE_INTERFACE.to_string());
            self.node_types.insert(descriptor.clone(), object.name.clone());
        }
        object.fields = fields;

        Ok(self
            .output
            .put(descriptor.clone(), SchemaType::Object(Arc::new(object))))
    }

    fn member_field(&mut self, exposed: &ExposedMember<'_>) -> Result<FieldDefinition, SchemaError> {
        let ty = self.get_output_type(&exposed.descriptor)?;
        let member = exposed.member;

        let resolver = match member.fetcher_key() {
            Some(_) => {
                let request = FetcherRequest::member(
                    exposed.owner,
                    member,
                    Arc::clone(&self.ctx.converter),
                );
                FieldResolver::Fetcher(self.ctx.fetchers.create(&request)?)
            }
            None => FieldResolver::Property {
                key: member.name().to_string(),
            },
        };

        Ok(FieldDefinition {
            name: member.field_name().to_string(),
            materialize_list: ty.is_list(),
            ty,
            non_null: false,
            description: member.description_text().map(str::to_string),
            arguments: Vec::new(),
            resolver,
            source: Some(exposed.descriptor.clone()),
        })
    }

    /// Maps `descriptor` to an input type.
    ///
    /// Object types are mirrored into input objects named with the configured
    /// suffix. Wide integers narrow to `Int` on the input side.
    pub fn get_input_type(&mut self, descriptor: &TypeDescriptor) -> Result<SchemaType, SchemaError> {
        if let Some(cached) = self.input.get(descriptor) {
            return Ok(cached.clone());
        }
        trace!(descriptor = %descriptor, "Mapping input type");

        if let Some(mapper) = self.ctx.mappers.exact(descriptor.raw()).cloned() {
            let ty = mapper.input_type(descriptor, self)?;
            return Ok(self.input.put(descriptor.clone(), ty));
        }

        if descriptor.is_parameterized() {
            let Some(mapper) = self.ctx.mappers.interface_for(descriptor).cloned() else {
                return Err(SchemaError::not_mappable(
                    descriptor,
                    "no mapper handles this parameterized type",
                ));
            };
            let ty = mapper.input_type(descriptor, self)?;
            return Ok(self.input.put(descriptor.clone(), ty));
        }

        self.derive_input(descriptor)
    }

    /// Derives the input counterpart of the output type of `descriptor`.
    pub fn derive_input(&mut self, descriptor: &TypeDescriptor) -> Result<SchemaType, SchemaError> {
        let ty = match self.get_output_type(descriptor)? {
            SchemaType::Scalar(ScalarType::Long) => SchemaType::Scalar(ScalarType::Int),
            scalar @ SchemaType::Scalar(_) => scalar,
            enumeration @ SchemaType::Enum(_) => enumeration,
            SchemaType::Object(object) => {
                let name = format!("{}{}", object.name, self.ctx.config.input_suffix);
                let members = object
                    .fields
                    .iter()
                    .filter_map(|field| {
                        let source = field.source.clone()?;
                        Some((field.name.clone(), source, field.description.clone()))
                    })
                    .collect();
                return self.mirror_object(descriptor, name, members);
            }
            SchemaType::Reference(output_name) => {
                let name = format!("{output_name}{}", self.ctx.config.input_suffix);
                let classes = Arc::clone(&self.ctx.classes);
                let members = exposed_members(&classes, descriptor)
                    .into_iter()
                    .map(|exposed| {
                        (
                            exposed.member.field_name().to_string(),
                            exposed.descriptor,
                            exposed.member.description_text().map(str::to_string),
                        )
                    })
                    .collect();
                return self.mirror_object(descriptor, name, members);
            }
            other => {
                return Err(SchemaError::Mapping(format!(
                    "output type {} of {descriptor} has no input counterpart",
                    other.base_name()
                )));
            }
        };
        Ok(self.input.put(descriptor.clone(), ty))
    }

    fn mirror_object(
        &mut self,
        descriptor: &TypeDescriptor,
        name: String,
        members: Vec<(String, TypeDescriptor, Option<String>)>,
    ) -> Result<SchemaType, SchemaError> {
        self.reserve_input(descriptor, &name);

        let mut fields = Vec::with_capacity(members.len());
        for (field_name, member_descriptor, description) in members {
            match self.get_input_type(&member_descriptor) {
                Ok(ty) => fields.push(InputField {
                    name: field_name,
                    ty,
                    description,
                }),
                Err(err) if err.is_not_mappable() => {
                    warn!(type_name = %name, field = %field_name, error = %err, "Skipping unmappable input field");
                }
                Err(err) => return Err(err),
            }
        }

        let input = InputObjectType {
            name,
            description: None,
            fields,
        };
        Ok(self
            .input
            .put(descriptor.clone(), SchemaType::InputObject(Arc::new(input))))
    }

    /// The shared `Node` interface, created on first use.
    pub fn node_interface(&mut self) -> SchemaType {
        self.node_interface
            .get_or_insert_with(|| {
                SchemaType::Interface(Arc::new(InterfaceType {
                    name: NODE_INTERFACE.to_string(),
                    description: Some("An object with a global identity".to_string()),
                    fields: vec![InterfaceField {
                        name: NODE_ID_FIELD.to_string(),
                        ty: SchemaType::Scalar(ScalarType::Id),
                        non_null: true,
                    }],
                }))
            })
            .clone()
    }

    /// The `Node` interface, if any node type was mapped.
    pub fn node_interface_if_used(&self) -> Option<&SchemaType> {
        self.node_interface.as_ref()
    }
}

impl std::fmt::Debug for ObjectMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectMapper")
            .field("output", &self.output.len())
            .field("input", &self.input.len())
            .field("node_types", &self.node_types)
            .finish()
    }
}
