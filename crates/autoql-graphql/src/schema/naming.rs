//! Type naming strategies.
//!
//! Names are used as identity downstream, so every strategy must be pure: the
//! same descriptor always yields the same name.

use autoql_core::{ClassRegistry, RawType, TypeDescriptor};

/// Suffix that the Relay strategy keeps at the end of parameterized names.
pub const CONNECTION_SUFFIX: &str = "Connection";

/// Computes schema type names for descriptors.
pub trait NamingStrategy: Send + Sync {
    fn type_name(&self, descriptor: &TypeDescriptor, classes: &ClassRegistry) -> String;
}

/// The rename marker if present, else the simple name of the raw type.
fn base_name(descriptor: &TypeDescriptor, classes: &ClassRegistry) -> String {
    match classes.get_for(descriptor) {
        Some(class) => class.display_name().to_string(),
        None => descriptor.raw().simple_name().to_string(),
    }
}

fn append_args(
    mut name: String,
    descriptor: &TypeDescriptor,
    classes: &ClassRegistry,
    strategy: &dyn NamingStrategy,
) -> String {
    for arg in descriptor.args() {
        name.push('_');
        name.push_str(&strategy.type_name(arg, classes));
    }
    name
}

/// Simple names: `Pair<String, Int>` becomes `Pair_String_Int`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleNamingStrategy;

impl NamingStrategy for SimpleNamingStrategy {
    fn type_name(&self, descriptor: &TypeDescriptor, classes: &ClassRegistry) -> String {
        append_args(base_name(descriptor, classes), descriptor, classes, self)
    }
}

/// Relay-style names: type arguments of `...Connection` types are spliced in
/// before the suffix, so `Connection<User>` becomes `UserConnection`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelayNamingStrategy;

impl NamingStrategy for RelayNamingStrategy {
    fn type_name(&self, descriptor: &TypeDescriptor, classes: &ClassRegistry) -> String {
        let base = base_name(descriptor, classes);
        match base.strip_suffix(CONNECTION_SUFFIX) {
            Some(prefix) if descriptor.is_parameterized() => {
                let mut name = prefix.to_string();
                for arg in descriptor.args() {
                    name.push_str(&self.type_name(arg, classes));
                }
                name.push_str(CONNECTION_SUFFIX);
                name
            }
            _ => append_args(base, descriptor, classes, self),
        }
    }
}

/// Namespace-qualified names: `app::model::Person` becomes `app_model_Person`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullNamingStrategy;

impl NamingStrategy for FullNamingStrategy {
    fn type_name(&self, descriptor: &TypeDescriptor, classes: &ClassRegistry) -> String {
        let base = base_name(descriptor, classes);
        let qualified = match descriptor.raw() {
            RawType::Named(path) if !path.namespace().is_empty() => {
                let namespace = path.namespace().replace("::", "_");
                format!("{namespace}_{base}")
            }
            _ => base,
        };
        append_args(qualified, descriptor, classes, self)
    }
}
