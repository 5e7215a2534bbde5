//! Runtime type descriptors.
//!
//! A [`TypeDescriptor`] is a structural handle to a type: a [`RawType`] plus an
//! ordered list of type arguments. Two descriptors built independently for
//! `List<String>` compare and hash equal, which makes descriptors usable as
//! cache keys during schema generation.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Separator between the segments of a [`TypePath`].
pub const PATH_SEPARATOR: &str = "::";

/// Fully qualified path of an application class, e.g. `app::model::Person`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypePath(String);

impl TypePath {
    /// Creates a path without validating it.
    ///
    /// Paths are validated when the owning class is registered.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Parses and validates a path.
    ///
    /// Every segment must be a valid identifier (`[_a-zA-Z][_a-zA-Z0-9]*`).
    pub fn parse(path: &str) -> Result<Self> {
        if path.is_empty() || !path.split(PATH_SEPARATOR).all(is_identifier) {
            return Err(CoreError::invalid_type_path(path));
        }
        Ok(Self(path.to_string()))
    }

    /// Returns the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The last segment of the path.
    pub fn simple_name(&self) -> &str {
        self.0.rsplit(PATH_SEPARATOR).next().unwrap_or(&self.0)
    }

    /// Everything before the last segment, or `""` for single-segment paths.
    pub fn namespace(&self) -> &str {
        match self.0.rfind(PATH_SEPARATOR) {
            Some(idx) => &self.0[..idx],
            None => "",
        }
    }

    /// Iterates over the segments of the path.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(PATH_SEPARATOR)
    }

    /// Checks whether this path lives inside `namespace` (directly or nested).
    ///
    /// The empty namespace contains every path.
    pub fn is_in(&self, namespace: &str) -> bool {
        if namespace.is_empty() {
            return true;
        }
        let own = self.namespace();
        own == namespace
            || own
                .strip_prefix(namespace)
                .is_some_and(|rest| rest.starts_with(PATH_SEPARATOR))
    }
}

impl From<&str> for TypePath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for TypePath {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

impl fmt::Display for TypePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        }
        _ => false,
    }
}

/// The raw (unparameterized) part of a type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RawType {
    Bool,
    I32,
    I64,
    F32,
    F64,
    String,
    /// Nullable wrapper around its single type argument.
    Optional,
    List,
    Set,
    /// Fixed-size sequence of its single component type.
    Array,
    /// Key/value map; the first type argument is the key type.
    Map,
    BigDecimal,
    BigInteger,
    Date,
    DateTime,
    Time,
    Uri,
    TimeZone,
    Money,
    /// An application class registered in a [`ClassRegistry`](crate::ClassRegistry).
    Named(TypePath),
    /// A type variable declared by a generic class.
    Var(String),
}

impl RawType {
    /// The simple name of the raw type, as used by naming strategies.
    pub fn simple_name(&self) -> &str {
        match self {
            Self::Bool => "Boolean",
            Self::I32 => "Int",
            Self::I64 => "Long",
            Self::F32 | Self::F64 => "Float",
            Self::String => "String",
            Self::Optional => "Optional",
            Self::List => "List",
            Self::Set => "Set",
            Self::Array => "Array",
            Self::Map => "Map",
            Self::BigDecimal => "BigDecimal",
            Self::BigInteger => "BigInteger",
            Self::Date => "Date",
            Self::DateTime => "DateTime",
            Self::Time => "Time",
            Self::Uri => "Uri",
            Self::TimeZone => "TimeZone",
            Self::Money => "Money",
            Self::Named(path) => path.simple_name(),
            Self::Var(name) => name,
        }
    }

    /// Checks if this is one of the scalar primitives (numbers, strings, booleans).
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Self::Bool | Self::I32 | Self::I64 | Self::F32 | Self::F64 | Self::String
        )
    }

    /// Checks if this raw type holds an ordered or unordered collection of one element type.
    pub fn is_collection(&self) -> bool {
        matches!(self, Self::List | Self::Set)
    }

    /// Returns the class path for application classes.
    pub fn as_path(&self) -> Option<&TypePath> {
        match self {
            Self::Named(path) => Some(path),
            _ => None,
        }
    }
}

impl fmt::Display for RawType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("bool"),
            Self::I32 => f.write_str("i32"),
            Self::I64 => f.write_str("i64"),
            Self::F32 => f.write_str("f32"),
            Self::F64 => f.write_str("f64"),
            Self::Named(path) => write!(f, "{path}"),
            other => f.write_str(other.simple_name()),
        }
    }
}

/// Structural descriptor of a runtime type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    raw: RawType,
    args: Vec<TypeDescriptor>,
}

impl TypeDescriptor {
    /// A descriptor without type arguments.
    pub fn new(raw: RawType) -> Self {
        Self {
            raw,
            args: Vec::new(),
        }
    }

    /// A parameterized descriptor, e.g. `Pair<String, Int>`.
    pub fn parameterized(raw: RawType, args: impl IntoIterator<Item = TypeDescriptor>) -> Self {
        Self {
            raw,
            args: args.into_iter().collect(),
        }
    }

    pub fn boolean() -> Self {
        Self::new(RawType::Bool)
    }

    pub fn i32() -> Self {
        Self::new(RawType::I32)
    }

    pub fn i64() -> Self {
        Self::new(RawType::I64)
    }

    pub fn f32() -> Self {
        Self::new(RawType::F32)
    }

    pub fn f64() -> Self {
        Self::new(RawType::F64)
    }

    pub fn string() -> Self {
        Self::new(RawType::String)
    }

    /// An application class.
    pub fn named(path: impl Into<TypePath>) -> Self {
        Self::new(RawType::Named(path.into()))
    }

    /// A type variable of a generic class.
    pub fn var(name: impl Into<String>) -> Self {
        Self::new(RawType::Var(name.into()))
    }

    pub fn optional(inner: TypeDescriptor) -> Self {
        Self::parameterized(RawType::Optional, [inner])
    }

    pub fn list_of(element: TypeDescriptor) -> Self {
        Self::parameterized(RawType::List, [element])
    }

    pub fn set_of(element: TypeDescriptor) -> Self {
        Self::parameterized(RawType::Set, [element])
    }

    pub fn array_of(component: TypeDescriptor) -> Self {
        Self::parameterized(RawType::Array, [component])
    }

    pub fn map_of(key: TypeDescriptor, value: TypeDescriptor) -> Self {
        Self::parameterized(RawType::Map, [key, value])
    }

    /// The raw part of this descriptor.
    pub fn raw(&self) -> &RawType {
        &self.raw
    }

    /// The type arguments, in declaration order.
    pub fn args(&self) -> &[TypeDescriptor] {
        &self.args
    }

    /// The type argument at `index`, if any.
    pub fn arg(&self, index: usize) -> Option<&TypeDescriptor> {
        self.args.get(index)
    }

    /// Whether this descriptor carries type arguments.
    pub fn is_parameterized(&self) -> bool {
        !self.args.is_empty()
    }

    /// The class path, for application classes.
    pub fn class_path(&self) -> Option<&TypePath> {
        self.raw.as_path()
    }

    /// Whether a type variable occurs anywhere in this descriptor.
    pub fn contains_vars(&self) -> bool {
        matches!(self.raw, RawType::Var(_)) || self.args.iter().any(Self::contains_vars)
    }

    /// Replaces type variables using `bindings`.
    ///
    /// Unbound variables are kept as they are.
    pub fn substitute(&self, bindings: &HashMap<String, TypeDescriptor>) -> TypeDescriptor {
        if let RawType::Var(name) = &self.raw
            && let Some(bound) = bindings.get(name)
        {
            return bound.clone();
        }
        Self {
            raw: self.raw.clone(),
            args: self.args.iter().map(|arg| arg.substitute(bindings)).collect(),
        }
    }
}

impl From<RawType> for TypeDescriptor {
    fn from(raw: RawType) -> Self {
        Self::new(raw)
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)?;
        if !self.args.is_empty() {
            f.write_str("<")?;
            for (idx, arg) in self.args.iter().enumerate() {
                if idx > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{arg}")?;
            }
            f.write_str(">")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_structural_equality() {
        let a = TypeDescriptor::list_of(TypeDescriptor::string());
        let b = TypeDescriptor::parameterized(RawType::List, [TypeDescriptor::string()]);
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
        assert!(!set.contains(&TypeDescriptor::list_of(TypeDescriptor::i32())));
    }

    #[test]
    fn test_type_path_parts() {
        let path = TypePath::new("app::model::Person");
        assert_eq!(path.simple_name(), "Person");
        assert_eq!(path.namespace(), "app::model");
        assert_eq!(path.segments().count(), 3);

        let bare = TypePath::new("Person");
        assert_eq!(bare.simple_name(), "Person");
        assert_eq!(bare.namespace(), "");
    }

    #[test]
    fn test_type_path_namespace_membership() {
        let path = TypePath::new("app::model::Person");
        assert!(path.is_in("app"));
        assert!(path.is_in("app::model"));
        assert!(path.is_in(""));
        assert!(!path.is_in("ap"));
        assert!(!path.is_in("app::mod"));
        assert!(!path.is_in("other"));
    }

    #[test]
    fn test_type_path_validation() {
        assert!(TypePath::parse("app::Person").is_ok());
        assert!(TypePath::parse("_private::T1").is_ok());
        assert!(TypePath::parse("").is_err());
        assert!(TypePath::parse("app::").is_err());
        assert!(TypePath::parse("1app::Person").is_err());
        assert!(TypePath::parse("app.Person").is_err());
    }

    #[test]
    fn test_display() {
        let d = TypeDescriptor::map_of(
            TypeDescriptor::named("app::Color"),
            TypeDescriptor::list_of(TypeDescriptor::i64()),
        );
        assert_eq!(d.to_string(), "Map<app::Color, List<i64>>");
    }

    #[test]
    fn test_substitute_type_variables() {
        let generic = TypeDescriptor::list_of(TypeDescriptor::var("T"));
        assert!(generic.contains_vars());

        let mut bindings = HashMap::new();
        bindings.insert("T".to_string(), TypeDescriptor::named("app::Item"));

        let concrete = generic.substitute(&bindings);
        assert_eq!(
            concrete,
            TypeDescriptor::list_of(TypeDescriptor::named("app::Item"))
        );
        assert!(!concrete.contains_vars());
    }

    #[test]
    fn test_raw_simple_names() {
        assert_eq!(RawType::I32.simple_name(), "Int");
        assert_eq!(RawType::I64.simple_name(), "Long");
        assert_eq!(RawType::F64.simple_name(), "Float");
        assert_eq!(
            RawType::Named(TypePath::new("app::Item")).simple_name(),
            "Item"
        );
        assert!(RawType::String.is_primitive());
        assert!(!RawType::BigDecimal.is_primitive());
    }
}
