use std::sync::Arc;

use autoql_core::{Arguments, Instance, MethodHandle, Receiver, TypeConverter, TypeDescriptor};
use serde_json::Value;
use tracing::trace;

use super::{DataFetcher, FetchEnvironment};
use crate::error::ResolveError;

#[derive(Debug, Clone)]
struct BoundParam {
    name: String,
    descriptor: TypeDescriptor,
    default: Option<Value>,
}

/// Invokes a bound method with converted arguments.
///
/// Parameters are bound once with [`add_param`](Self::add_param), in declaration
/// order. Invocation is stateless after that: every call assembles its own
/// argument list.
pub struct MethodDataFetcher {
    field_name: String,
    target: Option<Instance>,
    handle: MethodHandle,
    converter: Arc<dyn TypeConverter>,
    params: Vec<BoundParam>,
}

impl MethodDataFetcher {
    pub fn new(
        field_name: impl Into<String>,
        target: Option<Instance>,
        handle: MethodHandle,
        converter: Arc<dyn TypeConverter>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            target,
            handle,
            converter,
            params: Vec::new(),
        }
    }

    /// Binds the next declared parameter.
    pub fn add_param(
        &mut self,
        name: impl Into<String>,
        descriptor: TypeDescriptor,
        default: Option<Value>,
    ) {
        self.params.push(BoundParam {
            name: name.into(),
            descriptor,
            default,
        });
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Names of the bound parameters, in binding order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|param| param.name.as_str())
    }

    fn convert(&self, param: &BoundParam, raw: Value) -> Result<Value, ResolveError> {
        self.converter
            .convert(&param.descriptor, raw)
            .map_err(|source| ResolveError::Conversion {
                argument: param.name.clone(),
                source,
            })
    }
}

impl DataFetcher for MethodDataFetcher {
    fn fetch(&self, env: &dyn FetchEnvironment) -> Result<Option<Value>, ResolveError> {
        if env.field_name() != self.field_name {
            return Ok(None);
        }

        let mut values = Vec::with_capacity(self.params.len());
        for param in &self.params {
            let raw = env.argument(&param.name).unwrap_or(Value::Null);
            let mut value = self.convert(param, raw)?;
            if value.is_null()
                && let Some(default) = &param.default
            {
                value = self.convert(param, default.clone())?;
            }
            values.push(value);
        }

        let receiver = match (&self.target, env.source()) {
            (Some(target), _) => Receiver::Target(&**target),
            (None, Some(source)) => Receiver::Source(source),
            (None, None) => Receiver::None,
        };

        trace!(field = %self.field_name, args = values.len(), "Invoking bound method");
        self.handle
            .invoke(receiver, &Arguments::new(values))
            .map(Some)
            .map_err(|source| ResolveError::Invocation {
                field: self.field_name.clone(),
                source,
            })
    }
}

impl std::fmt::Debug for MethodDataFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodDataFetcher")
            .field("field_name", &self.field_name)
            .field("has_target", &self.target.is_some())
            .field("params", &self.params)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetchers::StaticEnvironment;
    use autoql_core::{InvocationError, JsonTypeConverter};
    use serde_json::json;
    use std::sync::Mutex;

    struct Greeter;

    fn repeat_fetcher(calls: Arc<Mutex<Vec<Vec<Value>>>>) -> MethodDataFetcher {
        let handle = MethodHandle::new(move |_, args| {
            calls.lock().unwrap().push(args.iter().cloned().collect());
            let word: String = args.parse(0)?;
            let times: usize = args.parse(1)?;
            Ok(json!(word.repeat(times)))
        });
        let mut fetcher =
            MethodDataFetcher::new("repeat", None, handle, Arc::new(JsonTypeConverter));
        fetcher.add_param("word", TypeDescriptor::string(), None);
        fetcher.add_param("times", TypeDescriptor::i32(), Some(json!(2)));
        fetcher
    }

    #[test]
    fn test_default_substituted_when_absent() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let fetcher = repeat_fetcher(Arc::clone(&calls));

        let env = StaticEnvironment::new("repeat").with_argument("word", json!("ab"));
        let result = fetcher.fetch(&env).unwrap();
        assert_eq!(result, Some(json!("abab")));
        assert_eq!(calls.lock().unwrap()[0], vec![json!("ab"), json!(2)]);
    }

    #[test]
    fn test_explicit_value_wins_over_default() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let fetcher = repeat_fetcher(Arc::clone(&calls));

        let env = StaticEnvironment::new("repeat")
            .with_argument("word", json!("x"))
            .with_argument("times", json!(3));
        assert_eq!(fetcher.fetch(&env).unwrap(), Some(json!("xxx")));
        assert_eq!(calls.lock().unwrap()[0], vec![json!("x"), json!(3)]);
    }

    #[test]
    fn test_foreign_field_is_a_no_op() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let fetcher = repeat_fetcher(Arc::clone(&calls));

        let env = StaticEnvironment::new("other");
        assert_eq!(fetcher.fetch(&env).unwrap(), None);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_conversion_failure() {
        let fetcher = repeat_fetcher(Arc::new(Mutex::new(Vec::new())));
        let env = StaticEnvironment::new("repeat")
            .with_argument("word", json!("x"))
            .with_argument("times", json!("many"));

        let err = fetcher.fetch(&env).unwrap_err();
        assert!(matches!(err, ResolveError::Conversion { ref argument, .. } if argument == "times"));
    }

    #[test]
    fn test_invocation_failure_propagates() {
        let handle = MethodHandle::new(|_, _| Err(InvocationError::failed("boom")));
        let fetcher = MethodDataFetcher::new("fail", None, handle, Arc::new(JsonTypeConverter));

        let err = fetcher.fetch(&StaticEnvironment::new("fail")).unwrap_err();
        assert!(matches!(err, ResolveError::Invocation { .. }));
        assert_eq!(err.to_string(), "Failed to invoke fail: boom");
    }

    #[test]
    fn test_receiver_selection() {
        let handle = MethodHandle::new(|receiver, _| {
            Ok(json!(match receiver {
                Receiver::Target(target) if target.is::<Greeter>() => "target",
                Receiver::Target(_) => "other target",
                Receiver::Source(_) => "source",
                Receiver::None => "none",
            }))
        });

        let bound = MethodDataFetcher::new(
            "who",
            Some(Arc::new(Greeter)),
            handle.clone(),
            Arc::new(JsonTypeConverter),
        );
        let unbound = MethodDataFetcher::new("who", None, handle, Arc::new(JsonTypeConverter));

        let with_source = StaticEnvironment::new("who").with_source(json!({ "name": "Ann" }));
        assert_eq!(bound.fetch(&with_source).unwrap(), Some(json!("target")));
        assert_eq!(unbound.fetch(&with_source).unwrap(), Some(json!("source")));
        assert_eq!(
            unbound.fetch(&StaticEnvironment::new("who")).unwrap(),
            Some(json!("none"))
        );
    }
}
