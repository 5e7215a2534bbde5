//! Reflection-free type model for AutoQL.
//!
//! Applications describe their types once at startup in a [`ClassRegistry`]:
//! members, methods (with query/mutation markers), parameters and superclass
//! chains. The schema generator in `autoql-graphql` walks this model instead of
//! inspecting types at runtime.
//!
//! # Example
//!
//! ```
//! use autoql_core::{ClassDef, ClassRegistry, MemberDef, TypeDescriptor};
//!
//! let mut registry = ClassRegistry::new();
//! registry
//!     .register(
//!         ClassDef::object("app::Person")
//!             .member(MemberDef::new("name", TypeDescriptor::string()))
//!             .member(MemberDef::new("age", TypeDescriptor::i32())),
//!     )
//!     .unwrap();
//!
//! let person = registry.get(&"app::Person".into()).unwrap();
//! assert_eq!(person.members().len(), 2);
//! ```

pub mod class;
pub mod convert;
pub mod descriptor;
pub mod error;
pub mod invoke;
pub mod scanner;

pub use class::{
    ClassDef, ClassKind, ClassRegistry, MemberDef, MethodDef, MethodMarker, ParamDef, TypeMarker,
};
pub use convert::{ConversionError, JsonTypeConverter, TypeConverter};
pub use descriptor::{RawType, TypeDescriptor, TypePath};
pub use error::{CoreError, Result};
pub use invoke::{Arguments, Instance, InvocationError, MethodHandle, Receiver};
pub use scanner::MarkerScanner;
