//! Class metadata and the class registry.
//!
//! A [`ClassDef`] describes an application type the way the schema generator
//! sees it: its members (properties), its methods (some of them marked as
//! query or mutation entry points), its superclass and its generic parameters.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde_json::Value;

use crate::descriptor::{TypeDescriptor, TypePath};
use crate::error::{CoreError, Result};
use crate::invoke::{Arguments, InvocationError, MethodHandle, Receiver};

/// What kind of type a class is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Object,
    Enum,
}

/// Marker that exposes a method as a root (or member) field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodMarker {
    Query,
    Mutation,
}

/// Class-level markers used for discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeMarker {
    /// The class is a type mapper to be registered as a custom mapper.
    TypeMapper,
    /// The class is a service whose marked methods become root fields.
    QuerySource,
}

/// A property of a class.
#[derive(Debug, Clone)]
pub struct MemberDef {
    name: String,
    descriptor: TypeDescriptor,
    is_static: bool,
    is_enclosing: bool,
    ignored: bool,
    rename: Option<String>,
    description: Option<String>,
    fetcher: Option<String>,
}

impl MemberDef {
    pub fn new(name: impl Into<String>, descriptor: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            descriptor,
            is_static: false,
            is_enclosing: false,
            ignored: false,
            rename: None,
            description: None,
            fetcher: None,
        }
    }

    /// Marks the member as static (class-level); static members are never exposed.
    pub fn static_member(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Marks the member as the compiler-generated link to an enclosing instance.
    pub fn enclosing(mut self) -> Self {
        self.is_enclosing = true;
        self
    }

    /// Excludes the member from the schema.
    pub fn ignore(mut self) -> Self {
        self.ignored = true;
        self
    }

    /// Exposes the member under a different field name.
    pub fn rename(mut self, name: impl Into<String>) -> Self {
        self.rename = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Resolves the member through the named custom data fetcher.
    pub fn fetcher(mut self, key: impl Into<String>) -> Self {
        self.fetcher = Some(key.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The field name in the schema.
    pub fn field_name(&self) -> &str {
        self.rename.as_deref().unwrap_or(&self.name)
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    pub fn description_text(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn fetcher_key(&self) -> Option<&str> {
        self.fetcher.as_deref()
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn is_enclosing(&self) -> bool {
        self.is_enclosing
    }

    pub fn is_ignored(&self) -> bool {
        self.ignored
    }

    /// Whether the member contributes a field.
    pub fn is_exposed(&self) -> bool {
        !self.is_static && !self.is_enclosing && !self.ignored
    }
}

/// A declared method parameter.
#[derive(Debug, Clone)]
pub struct ParamDef {
    name: String,
    descriptor: TypeDescriptor,
    default: Option<Value>,
    required: bool,
    description: Option<String>,
}

impl ParamDef {
    pub fn new(name: impl Into<String>, descriptor: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            descriptor,
            default: None,
            required: false,
            description: None,
        }
    }

    /// Marks the argument as non-null in the schema.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Value substituted when the client passes null or omits the argument.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn description_text(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// A method of a class.
#[derive(Debug, Clone)]
pub struct MethodDef {
    name: String,
    marker: Option<MethodMarker>,
    field_name: Option<String>,
    returns: TypeDescriptor,
    params: Vec<ParamDef>,
    handle: MethodHandle,
    fetcher: Option<String>,
    description: Option<String>,
}

impl MethodDef {
    /// A method without a marker; it is never exposed.
    pub fn plain(name: impl Into<String>, returns: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            marker: None,
            field_name: None,
            returns,
            params: Vec::new(),
            handle: MethodHandle::unbound(),
            fetcher: None,
            description: None,
        }
    }

    /// A method exposed as a query field.
    pub fn query(name: impl Into<String>, returns: TypeDescriptor) -> Self {
        Self {
            marker: Some(MethodMarker::Query),
            ..Self::plain(name, returns)
        }
    }

    /// A method exposed as a mutation field.
    pub fn mutation(name: impl Into<String>, returns: TypeDescriptor) -> Self {
        Self {
            marker: Some(MethodMarker::Mutation),
            ..Self::plain(name, returns)
        }
    }

    pub fn param(mut self, param: ParamDef) -> Self {
        self.params.push(param);
        self
    }

    /// Overrides the field name (defaults to the method name).
    pub fn field_name(mut self, name: impl Into<String>) -> Self {
        self.field_name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Resolves the field through the named custom data fetcher.
    pub fn fetcher(mut self, key: impl Into<String>) -> Self {
        self.fetcher = Some(key.into());
        self
    }

    /// Binds the method body.
    pub fn handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(Receiver<'_>, &Arguments) -> std::result::Result<Value, InvocationError>
            + Send
            + Sync
            + 'static,
    {
        self.handle = MethodHandle::new(handler);
        self
    }

    /// Binds a method body invoked on a service instance of type `T`.
    pub fn handler_on<T, F>(mut self, handler: F) -> Self
    where
        T: std::any::Any,
        F: Fn(&T, &Arguments) -> std::result::Result<Value, InvocationError>
            + Send
            + Sync
            + 'static,
    {
        self.handle = MethodHandle::on(handler);
        self
    }

    /// Binds a method body invoked on the resolved parent value.
    pub fn handler_on_source<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Value, &Arguments) -> std::result::Result<Value, InvocationError>
            + Send
            + Sync
            + 'static,
    {
        self.handle = MethodHandle::on_source(handler);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The field name in the schema.
    pub fn exposed_name(&self) -> &str {
        self.field_name.as_deref().unwrap_or(&self.name)
    }

    pub fn marker(&self) -> Option<MethodMarker> {
        self.marker
    }

    pub fn is_marked(&self, marker: MethodMarker) -> bool {
        self.marker == Some(marker)
    }

    pub fn returns(&self) -> &TypeDescriptor {
        &self.returns
    }

    pub fn params(&self) -> &[ParamDef] {
        &self.params
    }

    pub fn handle(&self) -> &MethodHandle {
        &self.handle
    }

    pub fn fetcher_key(&self) -> Option<&str> {
        self.fetcher.as_deref()
    }

    pub fn description_text(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Metadata of an application class.
#[derive(Debug, Clone)]
pub struct ClassDef {
    path: TypePath,
    kind: ClassKind,
    members: Vec<MemberDef>,
    methods: Vec<MethodDef>,
    superclass: Option<TypeDescriptor>,
    type_params: Vec<String>,
    constants: Vec<String>,
    rename: Option<String>,
    description: Option<String>,
    node_id: Option<String>,
    markers: Vec<TypeMarker>,
}

impl ClassDef {
    fn with_kind(path: impl Into<TypePath>, kind: ClassKind) -> Self {
        Self {
            path: path.into(),
            kind,
            members: Vec::new(),
            methods: Vec::new(),
            superclass: None,
            type_params: Vec::new(),
            constants: Vec::new(),
            rename: None,
            description: None,
            node_id: None,
            markers: Vec::new(),
        }
    }

    /// A composite class.
    pub fn object(path: impl Into<TypePath>) -> Self {
        Self::with_kind(path, ClassKind::Object)
    }

    /// An enumeration with the given constants, in declaration order.
    pub fn enumeration<I, S>(path: impl Into<TypePath>, constants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut class = Self::with_kind(path, ClassKind::Enum);
        class.constants = constants.into_iter().map(Into::into).collect();
        class
    }

    pub fn member(mut self, member: MemberDef) -> Self {
        self.members.push(member);
        self
    }

    pub fn method(mut self, method: MethodDef) -> Self {
        self.methods.push(method);
        self
    }

    /// Sets the superclass. Type arguments may reference this class's type parameters.
    pub fn extends(mut self, superclass: TypeDescriptor) -> Self {
        self.superclass = Some(superclass);
        self
    }

    /// Declares a generic type parameter.
    pub fn type_param(mut self, name: impl Into<String>) -> Self {
        self.type_params.push(name.into());
        self
    }

    /// Overrides the simple name used by naming strategies.
    pub fn rename(mut self, name: impl Into<String>) -> Self {
        self.rename = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Marks instances as globally identifiable by the named member.
    pub fn node(mut self, id_member: impl Into<String>) -> Self {
        self.node_id = Some(id_member.into());
        self
    }

    pub fn marker(mut self, marker: TypeMarker) -> Self {
        if !self.markers.contains(&marker) {
            self.markers.push(marker);
        }
        self
    }

    pub fn path(&self) -> &TypePath {
        &self.path
    }

    pub fn kind(&self) -> ClassKind {
        self.kind
    }

    pub fn is_enum(&self) -> bool {
        self.kind == ClassKind::Enum
    }

    pub fn members(&self) -> &[MemberDef] {
        &self.members
    }

    pub fn methods(&self) -> &[MethodDef] {
        &self.methods
    }

    pub fn superclass(&self) -> Option<&TypeDescriptor> {
        self.superclass.as_ref()
    }

    pub fn type_params(&self) -> &[String] {
        &self.type_params
    }

    pub fn constants(&self) -> &[String] {
        &self.constants
    }

    pub fn renamed(&self) -> Option<&str> {
        self.rename.as_deref()
    }

    /// The simple name, honoring a rename.
    pub fn display_name(&self) -> &str {
        self.rename
            .as_deref()
            .unwrap_or_else(|| self.path.simple_name())
    }

    pub fn description_text(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// The member holding the global identity, for node classes.
    pub fn node_id(&self) -> Option<&str> {
        self.node_id.as_deref()
    }

    pub fn is_node(&self) -> bool {
        self.node_id.is_some()
    }

    pub fn has_marker(&self, marker: TypeMarker) -> bool {
        self.markers.contains(&marker)
    }

    pub fn member_named(&self, name: &str) -> Option<&MemberDef> {
        self.members.iter().find(|member| member.name() == name)
    }

    /// Methods carrying `marker`, in declaration order.
    pub fn methods_marked(&self, marker: MethodMarker) -> impl Iterator<Item = &MethodDef> {
        self.methods
            .iter()
            .filter(move |method| method.is_marked(marker))
    }

    fn validate(&self) -> Result<()> {
        TypePath::parse(self.path.as_str())?;
        if self.is_enum() && self.constants.is_empty() {
            return Err(CoreError::invalid_class(
                self.path.as_str(),
                "enumeration declares no constants",
            ));
        }
        let mut seen = HashSet::new();
        for member in &self.members {
            if !seen.insert(member.name()) {
                return Err(CoreError::invalid_class(
                    self.path.as_str(),
                    format!("member {} declared more than once", member.name()),
                ));
            }
        }
        if let Some(id) = &self.node_id
            && self.member_named(id).is_none()
        {
            return Err(CoreError::invalid_class(
                self.path.as_str(),
                format!("node identity member {id} is not declared"),
            ));
        }
        Ok(())
    }
}

/// Registry of every class known to the schema generator.
#[derive(Debug, Clone, Default)]
pub struct ClassRegistry {
    classes: IndexMap<TypePath, ClassDef>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a class, validating its path and definition.
    pub fn register(&mut self, class: ClassDef) -> Result<()> {
        class.validate()?;
        if self.classes.contains_key(class.path()) {
            return Err(CoreError::DuplicateClass(class.path().to_string()));
        }
        tracing::debug!(class = %class.path(), "Registered class");
        self.classes.insert(class.path().clone(), class);
        Ok(())
    }

    /// Builder-style registration.
    pub fn with(mut self, class: ClassDef) -> Result<Self> {
        self.register(class)?;
        Ok(self)
    }

    pub fn get(&self, path: &TypePath) -> Option<&ClassDef> {
        self.classes.get(path)
    }

    /// Looks up a class, failing if it was never registered.
    pub fn class(&self, path: &TypePath) -> Result<&ClassDef> {
        self.get(path)
            .ok_or_else(|| CoreError::unknown_class(path.as_str()))
    }

    /// The class behind a descriptor, for application classes.
    pub fn get_for(&self, descriptor: &TypeDescriptor) -> Option<&ClassDef> {
        descriptor.class_path().and_then(|path| self.get(path))
    }

    pub fn is_enum(&self, descriptor: &TypeDescriptor) -> bool {
        self.get_for(descriptor).is_some_and(ClassDef::is_enum)
    }

    /// The class of `descriptor` followed by its superclass chain, with type
    /// arguments substituted at every step.
    ///
    /// Stops at unregistered superclasses and at cycles.
    pub fn ancestors(&self, descriptor: &TypeDescriptor) -> Vec<(TypeDescriptor, &ClassDef)> {
        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut current = descriptor.clone();

        while let Some(class) = self.get_for(&current) {
            if !visited.insert(class.path().clone()) {
                break;
            }
            let parent = class.superclass().map(|parent| {
                let bindings: HashMap<_, _> = class
                    .type_params()
                    .iter()
                    .cloned()
                    .zip(current.args().iter().cloned())
                    .collect();
                parent.substitute(&bindings)
            });
            chain.push((current, class));
            match parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        chain
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassDef> {
        self.classes.values()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
