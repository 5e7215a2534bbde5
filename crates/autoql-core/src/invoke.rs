//! Method invocation handles.
//!
//! Exposed methods carry a [`MethodHandle`]: a type-erased closure that receives
//! the call [`Receiver`] and the positional [`Arguments`] and returns a JSON
//! value. Results are plain `serde_json::Value`s so that resolved objects can be
//! walked by property name downstream.

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// A shared, type-erased service instance that query methods are invoked on.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Errors raised while invoking an exposed method.
#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("missing argument at position {index}")]
    MissingArgument { index: usize },

    #[error("argument at position {index} could not be decoded: {source}")]
    InvalidArgument {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("receiver is not a {expected}")]
    WrongReceiver { expected: &'static str },

    #[error("method has no handler bound")]
    Unbound,

    #[error("result could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("{0}")]
    Failed(String),
}

impl InvocationError {
    /// Create a new Failed error
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// The object a method is invoked on.
#[derive(Clone, Copy)]
pub enum Receiver<'a> {
    /// A registered service instance.
    Target(&'a (dyn Any + Send + Sync)),
    /// The already-resolved parent value (for methods attached to a composite type).
    Source(&'a Value),
    /// Static invocation.
    None,
}

impl<'a> Receiver<'a> {
    /// Downcasts a target receiver.
    pub fn downcast<T: Any>(&self) -> Option<&'a T> {
        match *self {
            Self::Target(target) => target.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// The parent value, for source receivers.
    pub fn source(&self) -> Option<&'a Value> {
        match *self {
            Self::Source(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Debug for Receiver<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Target(_) => f.write_str("Receiver::Target(..)"),
            Self::Source(value) => f.debug_tuple("Receiver::Source").field(value).finish(),
            Self::None => f.write_str("Receiver::None"),
        }
    }
}

/// Positional arguments of an invocation, already converted to the declared parameter types.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments(Vec<Value>);

impl Arguments {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// The argument at `index`, failing if the position is absent.
    pub fn value(&self, index: usize) -> Result<&Value, InvocationError> {
        self.0
            .get(index)
            .ok_or(InvocationError::MissingArgument { index })
    }

    /// Decodes the argument at `index` into `T`.
    pub fn parse<T: DeserializeOwned>(&self, index: usize) -> Result<T, InvocationError> {
        let value = self.value(index)?;
        serde_json::from_value(value.clone())
            .map_err(|source| InvocationError::InvalidArgument { index, source })
    }

    /// Decodes the argument at `index`, mapping absent or null arguments to `None`.
    pub fn parse_opt<T: DeserializeOwned>(
        &self,
        index: usize,
    ) -> Result<Option<T>, InvocationError> {
        match self.0.get(index) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.parse(index).map(Some),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Vec<Value> {
        self.0
    }
}

impl From<Vec<Value>> for Arguments {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

type HandlerFn = dyn Fn(Receiver<'_>, &Arguments) -> Result<Value, InvocationError> + Send + Sync;

/// A callable bound to an exposed method.
#[derive(Clone)]
pub struct MethodHandle(Arc<HandlerFn>);

impl MethodHandle {
    /// Wraps an arbitrary handler.
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(Receiver<'_>, &Arguments) -> Result<Value, InvocationError> + Send + Sync + 'static,
    {
        Self(Arc::new(handler))
    }

    /// A handler invoked on a service instance of type `T`.
    pub fn on<T, F>(handler: F) -> Self
    where
        T: Any,
        F: Fn(&T, &Arguments) -> Result<Value, InvocationError> + Send + Sync + 'static,
    {
        Self::new(move |receiver, args| {
            let target = receiver
                .downcast::<T>()
                .ok_or(InvocationError::WrongReceiver {
                    expected: type_name::<T>(),
                })?;
            handler(target, args)
        })
    }

    /// A handler invoked on the resolved parent value.
    pub fn on_source<F>(handler: F) -> Self
    where
        F: Fn(&Value, &Arguments) -> Result<Value, InvocationError> + Send + Sync + 'static,
    {
        Self::new(move |receiver, args| {
            let source = receiver.source().ok_or(InvocationError::WrongReceiver {
                expected: "resolved parent value",
            })?;
            handler(source, args)
        })
    }

    /// A handler that always fails with [`InvocationError::Unbound`].
    pub fn unbound() -> Self {
        Self::new(|_, _| Err(InvocationError::Unbound))
    }

    pub fn invoke(&self, receiver: Receiver<'_>, args: &Arguments) -> Result<Value, InvocationError> {
        (self.0)(receiver, args)
    }
}

impl fmt::Debug for MethodHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MethodHandle(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Greeter {
        greeting: &'static str,
    }

    #[test]
    fn test_invoke_on_target() {
        let handle = MethodHandle::on(|greeter: &Greeter, args: &Arguments| {
            let name: String = args.parse(0)?;
            Ok(json!(format!("{}, {}", greeter.greeting, name)))
        });

        let greeter = Greeter { greeting: "Hello" };
        let args = Arguments::new(vec![json!("Ann")]);
        let result = handle.invoke(Receiver::Target(&greeter), &args).unwrap();
        assert_eq!(result, json!("Hello, Ann"));
    }

    #[test]
    fn test_wrong_receiver() {
        let handle = MethodHandle::on(|_: &Greeter, _| Ok(Value::Null));
        let err = handle
            .invoke(Receiver::Target(&42_u32), &Arguments::default())
            .unwrap_err();
        assert!(matches!(err, InvocationError::WrongReceiver { .. }));

        let err = handle
            .invoke(Receiver::None, &Arguments::default())
            .unwrap_err();
        assert!(matches!(err, InvocationError::WrongReceiver { .. }));
    }

    #[test]
    fn test_invoke_on_source() {
        let handle = MethodHandle::on_source(|person, _| Ok(person["name"].clone()));
        let person = json!({ "name": "Ann" });
        let result = handle
            .invoke(Receiver::Source(&person), &Arguments::default())
            .unwrap();
        assert_eq!(result, json!("Ann"));
    }

    #[test]
    fn test_argument_decoding() {
        let args = Arguments::new(vec![json!(5), Value::Null]);
        assert_eq!(args.parse::<i32>(0).unwrap(), 5);
        assert_eq!(args.parse_opt::<i32>(1).unwrap(), None);
        assert_eq!(args.parse_opt::<i32>(7).unwrap(), None);
        assert!(matches!(
            args.parse::<String>(0),
            Err(InvocationError::InvalidArgument { index: 0, .. })
        ));
        assert!(matches!(
            args.value(3),
            Err(InvocationError::MissingArgument { index: 3 })
        ));
    }

    #[test]
    fn test_unbound_handle() {
        let err = MethodHandle::unbound()
            .invoke(Receiver::None, &Arguments::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "method has no handler bound");
    }
}
