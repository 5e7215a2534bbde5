//! Type mappers and the mapper registry.
//!
//! Exact mappers are keyed by raw type; a later registration for the same raw
//! type replaces the earlier one. Interface mappers are matched in
//! registration order by [`TypeMapper::handles_type`]; the first match wins.
//! Exact mappers are always consulted first.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use autoql_core::{RawType, TypeDescriptor, TypePath};
use tracing::debug;

use super::object_mapper::ObjectMapper;
use super::types::{
    FieldDefinition, InputField, InputObjectType, ObjectType, ScalarType, SchemaType,
};
use crate::config::{DateFormat, SchemaConfig};
use crate::error::SchemaError;

/// Converts a descriptor into output and input schema types.
pub trait TypeMapper: Send + Sync {
    /// Predicate consulted for interface mappers.
    fn handles_type(&self, _descriptor: &TypeDescriptor) -> bool {
        true
    }

    fn output_type(
        &self,
        descriptor: &TypeDescriptor,
        mapper: &mut ObjectMapper,
    ) -> Result<SchemaType, SchemaError>;

    fn input_type(
        &self,
        descriptor: &TypeDescriptor,
        mapper: &mut ObjectMapper,
    ) -> Result<SchemaType, SchemaError>;
}

/// Registry of exact and interface mappers.
#[derive(Clone, Default)]
pub struct MapperRegistry {
    exact: HashMap<RawType, Arc<dyn TypeMapper>>,
    interface: Vec<Arc<dyn TypeMapper>>,
}

impl MapperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in mappers: value-type scalars and the container interface mappers.
    pub fn builtin(config: &SchemaConfig) -> Self {
        let mut registry = Self::new();

        for raw in [
            RawType::BigDecimal,
            RawType::BigInteger,
            RawType::Time,
            RawType::Uri,
            RawType::TimeZone,
            RawType::Money,
        ] {
            registry.register_exact(raw, Arc::new(ScalarMapper::both(ScalarType::String)));
        }

        let date = match config.date_format {
            DateFormat::EpochMillis => ScalarMapper::both(ScalarType::Long),
            DateFormat::Iso8601 => ScalarMapper::both(ScalarType::String),
        };
        registry.register_exact(RawType::Date, Arc::new(date));
        registry.register_exact(RawType::DateTime, Arc::new(date));

        registry.register_interface(Arc::new(OptionalMapper));
        registry.register_interface(Arc::new(CollectionMapper));
        registry.register_interface(Arc::new(ArrayMapper));
        registry.register_interface(Arc::new(EnumMapMapper));
        registry
    }

    /// Registers an exact mapper, returning the one it replaces.
    pub fn register_exact(
        &mut self,
        raw: RawType,
        mapper: Arc<dyn TypeMapper>,
    ) -> Option<Arc<dyn TypeMapper>> {
        let replaced = self.exact.insert(raw.clone(), mapper);
        if replaced.is_some() {
            debug!(raw_type = %raw, "Replaced exact type mapper");
        }
        replaced
    }

    /// Appends an interface mapper.
    pub fn register_interface(&mut self, mapper: Arc<dyn TypeMapper>) {
        self.interface.push(mapper);
    }

    pub fn exact(&self, raw: &RawType) -> Option<&Arc<dyn TypeMapper>> {
        self.exact.get(raw)
    }

    /// The first interface mapper that handles `descriptor`.
    pub fn interface_for(&self, descriptor: &TypeDescriptor) -> Option<&Arc<dyn TypeMapper>> {
        self.interface
            .iter()
            .find(|mapper| mapper.handles_type(descriptor))
    }

    /// Combines custom mappers with the built-ins.
    ///
    /// Custom exact mappers replace built-in ones for the same raw type; custom
    /// interface mappers are consulted before the built-in ones.
    pub fn merged(custom: &MapperRegistry, builtins: MapperRegistry) -> Self {
        let mut merged = builtins;
        for (raw, mapper) in &custom.exact {
            merged.register_exact(raw.clone(), Arc::clone(mapper));
        }
        let builtin_interfaces = std::mem::take(&mut merged.interface);
        merged.interface = custom
            .interface
            .iter()
            .cloned()
            .chain(builtin_interfaces)
            .collect();
        merged
    }

    pub fn exact_len(&self) -> usize {
        self.exact.len()
    }

    pub fn interface_len(&self) -> usize {
        self.interface.len()
    }
}

impl std::fmt::Debug for MapperRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapperRegistry")
            .field("exact", &self.exact.keys().collect::<Vec<_>>())
            .field("interface", &self.interface.len())
            .finish()
    }
}

fn type_argument<'a>(
    descriptor: &'a TypeDescriptor,
    index: usize,
) -> Result<&'a TypeDescriptor, SchemaError> {
    descriptor
        .arg(index)
        .ok_or_else(|| SchemaError::not_mappable(descriptor, "missing type argument"))
}

/// Maps a value type to fixed output and input scalars.
#[derive(Debug, Clone, Copy)]
pub struct ScalarMapper {
    output: ScalarType,
    input: ScalarType,
}

impl ScalarMapper {
    pub fn new(output: ScalarType, input: ScalarType) -> Self {
        Self { output, input }
    }

    /// Same scalar in both directions.
    pub fn both(scalar: ScalarType) -> Self {
        Self::new(scalar, scalar)
    }
}

impl TypeMapper for ScalarMapper {
    fn output_type(
        &self,
        _descriptor: &TypeDescriptor,
        _mapper: &mut ObjectMapper,
    ) -> Result<SchemaType, SchemaError> {
        Ok(SchemaType::Scalar(self.output))
    }

    fn input_type(
        &self,
        _descriptor: &TypeDescriptor,
        _mapper: &mut ObjectMapper,
    ) -> Result<SchemaType, SchemaError> {
        Ok(SchemaType::Scalar(self.input))
    }
}

/// `Optional<T>` maps to whatever `T` maps to.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionalMapper;

impl TypeMapper for OptionalMapper {
    fn handles_type(&self, descriptor: &TypeDescriptor) -> bool {
        *descriptor.raw() == RawType::Optional
    }

    fn output_type(
        &self,
        descriptor: &TypeDescriptor,
        mapper: &mut ObjectMapper,
    ) -> Result<SchemaType, SchemaError> {
        mapper.get_output_type(type_argument(descriptor, 0)?)
    }

    fn input_type(
        &self,
        descriptor: &TypeDescriptor,
        mapper: &mut ObjectMapper,
    ) -> Result<SchemaType, SchemaError> {
        mapper.get_input_type(type_argument(descriptor, 0)?)
    }
}

/// `List<T>` and `Set<T>` map to a list of `T`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectionMapper;

impl TypeMapper for CollectionMapper {
    fn handles_type(&self, descriptor: &TypeDescriptor) -> bool {
        descriptor.raw().is_collection()
    }

    fn output_type(
        &self,
        descriptor: &TypeDescriptor,
        mapper: &mut ObjectMapper,
    ) -> Result<SchemaType, SchemaError> {
        let element = mapper.get_output_type(type_argument(descriptor, 0)?)?;
        Ok(SchemaType::list_of(element))
    }

    fn input_type(
        &self,
        descriptor: &TypeDescriptor,
        mapper: &mut ObjectMapper,
    ) -> Result<SchemaType, SchemaError> {
        let element = mapper.get_input_type(type_argument(descriptor, 0)?)?;
        Ok(SchemaType::list_of(element))
    }
}

/// `Array<T>` maps to a list of its component type.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayMapper;

impl TypeMapper for ArrayMapper {
    fn handles_type(&self, descriptor: &TypeDescriptor) -> bool {
        *descriptor.raw() == RawType::Array
    }

    fn output_type(
        &self,
        descriptor: &TypeDescriptor,
        mapper: &mut ObjectMapper,
    ) -> Result<SchemaType, SchemaError> {
        let component = mapper.get_output_type(type_argument(descriptor, 0)?)?;
        Ok(SchemaType::list_of(component))
    }

    fn input_type(
        &self,
        descriptor: &TypeDescriptor,
        mapper: &mut ObjectMapper,
    ) -> Result<SchemaType, SchemaError> {
        let component = mapper.get_input_type(type_argument(descriptor, 0)?)?;
        Ok(SchemaType::list_of(component))
    }
}

/// `Map<E, V>` with an enumeration key maps to an object with one `V`-typed
/// field per constant of `E`, named `Map_<E>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnumMapMapper;

impl EnumMapMapper {
    /// Constants of the key enumeration, and the object name.
    fn layout(
        descriptor: &TypeDescriptor,
        mapper: &ObjectMapper,
    ) -> Result<(Vec<String>, String), SchemaError> {
        let key = type_argument(descriptor, 0)?;
        type_argument(descriptor, 1)?;
        let class = mapper
            .classes()
            .get_for(key)
            .filter(|class| class.is_enum())
            .ok_or_else(|| {
                SchemaError::not_mappable(descriptor, "map keys must be an enumeration")
            })?;
        let name = format!(
            "{}_{}",
            descriptor.raw().simple_name(),
            mapper.type_name(key)
        );
        Ok((class.constants().to_vec(), name))
    }
}

impl TypeMapper for EnumMapMapper {
    fn handles_type(&self, descriptor: &TypeDescriptor) -> bool {
        *descriptor.raw() == RawType::Map
    }

    fn output_type(
        &self,
        descriptor: &TypeDescriptor,
        mapper: &mut ObjectMapper,
    ) -> Result<SchemaType, SchemaError> {
        let (constants, name) = Self::layout(descriptor, mapper)?;
        let value = mapper.get_output_type(type_argument(descriptor, 1)?)?;
        let mut object = ObjectType::new(name);
        object.fields = constants
            .iter()
            .map(|constant| FieldDefinition::property(constant, constant, value.clone()))
            .collect();
        Ok(SchemaType::Object(Arc::new(object)))
    }

    fn input_type(
        &self,
        descriptor: &TypeDescriptor,
        mapper: &mut ObjectMapper,
    ) -> Result<SchemaType, SchemaError> {
        let (constants, name) = Self::layout(descriptor, mapper)?;
        let name = format!("{name}{}", mapper.config().input_suffix);
        let value = mapper.get_input_type(type_argument(descriptor, 1)?)?;
        let fields = constants
            .into_iter()
            .map(|constant| InputField {
                name: constant,
                ty: value.clone(),
                description: None,
            })
            .collect();
        Ok(SchemaType::InputObject(Arc::new(InputObjectType {
            name,
            description: None,
            fields,
        })))
    }
}

/// Maps instantiations of generic application classes (e.g. `Page<Item>`) by
/// walking the class members with the type arguments substituted.
#[derive(Debug, Clone, Default)]
pub struct GenericObjectMapper {
    paths: HashSet<TypePath>,
}

impl GenericObjectMapper {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<TypePath>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }
}

impl TypeMapper for GenericObjectMapper {
    fn handles_type(&self, descriptor: &TypeDescriptor) -> bool {
        descriptor
            .class_path()
            .is_some_and(|path| self.paths.contains(path))
    }

    fn output_type(
        &self,
        descriptor: &TypeDescriptor,
        mapper: &mut ObjectMapper,
    ) -> Result<SchemaType, SchemaError> {
        mapper.build_object(descriptor)
    }

    fn input_type(
        &self,
        descriptor: &TypeDescriptor,
        mapper: &mut ObjectMapper,
    ) -> Result<SchemaType, SchemaError> {
        mapper.derive_input(descriptor)
    }
}
