//! Schema type model produced by the mapping process.
//!
//! The model is independent of the GraphQL engine; it is turned into
//! async-graphql dynamic types only at assembly time. Named types are shared
//! through `Arc`s so that a cached type can be compared by identity.

use std::sync::Arc;

use autoql_core::TypeDescriptor;
use serde_json::Value;

use crate::fetchers::DataFetcher;
use crate::schema::node::NodeResolver;

/// Name of the custom 64-bit integer scalar.
pub const LONG_SCALAR: &str = "Long";

/// Name of the shared global-identity interface.
pub const NODE_INTERFACE: &str = "Node";

/// Name of the placeholder field added to empty types.
pub const PLACEHOLDER_FIELD: &str = "_placeholder";

/// Scalar types known to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Int,
    Long,
    Float,
    String,
    Boolean,
    Id,
}

impl ScalarType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Int => "Int",
            Self::Long => LONG_SCALAR,
            Self::Float => "Float",
            Self::String => "String",
            Self::Boolean => "Boolean",
            Self::Id => "ID",
        }
    }

    /// Whether the scalar is part of every GraphQL schema.
    pub fn is_builtin(&self) -> bool {
        !matches!(self, Self::Long)
    }
}

/// A mapped schema type.
#[derive(Debug, Clone)]
pub enum SchemaType {
    Scalar(ScalarType),
    Enum(Arc<EnumType>),
    Object(Arc<ObjectType>),
    InputObject(Arc<InputObjectType>),
    List(Box<SchemaType>),
    Interface(Arc<InterfaceType>),
    /// Placeholder for a named type whose construction is still in progress.
    Reference(String),
}

impl SchemaType {
    pub fn list_of(inner: SchemaType) -> Self {
        Self::List(Box::new(inner))
    }

    /// The name of a named type (or reference); `None` for lists.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Scalar(scalar) => Some(scalar.name()),
            Self::Enum(ty) => Some(&ty.name),
            Self::Object(ty) => Some(&ty.name),
            Self::InputObject(ty) => Some(&ty.name),
            Self::Interface(ty) => Some(&ty.name),
            Self::Reference(name) => Some(name),
            Self::List(_) => None,
        }
    }

    /// The innermost named type's name.
    pub fn base_name(&self) -> &str {
        match self {
            Self::List(inner) => inner.base_name(),
            other => other.name().unwrap_or_default(),
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Self::Reference(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    pub fn as_object(&self) -> Option<&Arc<ObjectType>> {
        match self {
            Self::Object(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn as_input_object(&self) -> Option<&Arc<InputObjectType>> {
        match self {
            Self::InputObject(ty) => Some(ty),
            _ => None,
        }
    }

    /// Identity comparison: named types are equal only if they are the same allocation.
    pub fn same_as(&self, other: &SchemaType) -> bool {
        match (self, other) {
            (Self::Scalar(a), Self::Scalar(b)) => a == b,
            (Self::Enum(a), Self::Enum(b)) => Arc::ptr_eq(a, b),
            (Self::Object(a), Self::Object(b)) => Arc::ptr_eq(a, b),
            (Self::InputObject(a), Self::InputObject(b)) => Arc::ptr_eq(a, b),
            (Self::Interface(a), Self::Interface(b)) => Arc::ptr_eq(a, b),
            (Self::List(a), Self::List(b)) => a.same_as(b),
            (Self::Reference(a), Self::Reference(b)) => a == b,
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnumType {
    pub name: String,
    pub description: Option<String>,
    pub values: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ObjectType {
    pub name: String,
    pub description: Option<String>,
    pub fields: Vec<FieldDefinition>,
    /// Names of implemented interfaces.
    pub interfaces: Vec<String>,
}

impl ObjectType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields: Vec::new(),
            interfaces: Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|field| field.name.as_str()).collect()
    }
}

#[derive(Debug, Clone)]
pub struct InputObjectType {
    pub name: String,
    pub description: Option<String>,
    pub fields: Vec<InputField>,
}

impl InputObjectType {
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|field| field.name.as_str()).collect()
    }

    pub fn field(&self, name: &str) -> Option<&InputField> {
        self.fields.iter().find(|field| field.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct InputField {
    pub name: String,
    pub ty: SchemaType,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct InterfaceType {
    pub name: String,
    pub description: Option<String>,
    pub fields: Vec<InterfaceField>,
}

#[derive(Debug, Clone)]
pub struct InterfaceField {
    pub name: String,
    pub ty: SchemaType,
    pub non_null: bool,
}

/// How a field obtains its value at execution time.
#[derive(Clone)]
pub enum FieldResolver {
    /// Reads `key` from the parent object.
    Property { key: String },
    /// Delegates to a data fetcher.
    Fetcher(Arc<dyn DataFetcher>),
    /// The root `node(id:)` lookup.
    Node(Arc<NodeResolver>),
}

impl std::fmt::Debug for FieldResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Property { key } => f.debug_struct("Property").field("key", key).finish(),
            Self::Fetcher(_) => f.write_str("Fetcher(..)"),
            Self::Node(_) => f.write_str("Node(..)"),
        }
    }
}

/// A field argument.
#[derive(Debug, Clone)]
pub struct ArgumentDefinition {
    pub name: String,
    pub ty: SchemaType,
    pub required: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
}

/// A field of an object type.
#[derive(Debug, Clone)]
pub struct FieldDefinition {
    pub name: String,
    pub ty: SchemaType,
    pub non_null: bool,
    pub description: Option<String>,
    pub arguments: Vec<ArgumentDefinition>,
    pub resolver: FieldResolver,
    /// Declared member type; set for member-derived fields, which are mirrored into input types.
    pub source: Option<TypeDescriptor>,
    /// Serialize a missing or null value as an empty list.
    pub materialize_list: bool,
}

impl FieldDefinition {
    /// A nullable field reading `key` from the parent object.
    pub fn property(name: impl Into<String>, key: impl Into<String>, ty: SchemaType) -> Self {
        Self {
            name: name.into(),
            ty,
            non_null: false,
            description: None,
            arguments: Vec::new(),
            resolver: FieldResolver::Property { key: key.into() },
            source: None,
            materialize_list: false,
        }
    }

    /// A nullable field resolved by a data fetcher.
    pub fn fetched(name: impl Into<String>, ty: SchemaType, fetcher: Arc<dyn DataFetcher>) -> Self {
        Self {
            name: name.into(),
            ty,
            non_null: false,
            description: None,
            arguments: Vec::new(),
            resolver: FieldResolver::Fetcher(fetcher),
            source: None,
            materialize_list: false,
        }
    }

    /// Renders the field type in SDL notation, e.g. `[String]` or `ID!`.
    pub fn type_signature(&self) -> String {
        let base = render(&self.ty);
        if self.non_null { format!("{base}!") } else { base }
    }
}

fn render(ty: &SchemaType) -> String {
    match ty {
        SchemaType::List(inner) => format!("[{}]", render(inner)),
        other => other.name().unwrap_or_default().to_string(),
    }
}
