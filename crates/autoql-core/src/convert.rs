//! Argument conversion.
//!
//! Raw argument values arrive as JSON. Before a method is invoked each value
//! is converted to the parameter's declared [`TypeDescriptor`] by a
//! [`TypeConverter`].

use serde_json::{Map, Value};
use thiserror::Error;

use crate::descriptor::{RawType, TypeDescriptor};

/// Errors raised when a value does not fit its declared type.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: &'static str },

    #[error("{value} does not fit in {target}")]
    OutOfRange { value: String, target: &'static str },
}

impl ConversionError {
    fn mismatch(expected: &TypeDescriptor, found: &Value) -> Self {
        Self::TypeMismatch {
            expected: expected.to_string(),
            found: kind_of(found),
        }
    }
}

/// Converts a raw value to a declared type.
pub trait TypeConverter: Send + Sync {
    fn convert(&self, target: &TypeDescriptor, raw: Value) -> Result<Value, ConversionError>;
}

impl<F> TypeConverter for F
where
    F: Fn(&TypeDescriptor, Value) -> Result<Value, ConversionError> + Send + Sync,
{
    fn convert(&self, target: &TypeDescriptor, raw: Value) -> Result<Value, ConversionError> {
        self(target, raw)
    }
}

/// Default converter: coerces JSON scalars and walks containers.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTypeConverter;

impl TypeConverter for JsonTypeConverter {
    fn convert(&self, target: &TypeDescriptor, raw: Value) -> Result<Value, ConversionError> {
        if raw.is_null() {
            return Ok(Value::Null);
        }

        match target.raw() {
            RawType::Bool => match raw {
                Value::Bool(_) => Ok(raw),
                other => Err(ConversionError::mismatch(target, &other)),
            },
            RawType::I32 => {
                let value = integer(target, &raw)?;
                i32::try_from(value)
                    .map(Value::from)
                    .map_err(|_| ConversionError::OutOfRange {
                        value: value.to_string(),
                        target: "i32",
                    })
            }
            RawType::I64 => integer(target, &raw).map(Value::from),
            RawType::F32 | RawType::F64 => match raw.as_f64() {
                Some(value) => Ok(Value::from(value)),
                None => Err(ConversionError::mismatch(target, &raw)),
            },
            RawType::String
            | RawType::Time
            | RawType::Uri
            | RawType::TimeZone
            | RawType::Money => match raw {
                Value::String(_) => Ok(raw),
                other => Err(ConversionError::mismatch(target, &other)),
            },
            RawType::BigDecimal | RawType::BigInteger => match raw {
                Value::String(_) => Ok(raw),
                Value::Number(number) => Ok(Value::String(number.to_string())),
                other => Err(ConversionError::mismatch(target, &other)),
            },
            RawType::Date | RawType::DateTime => match raw {
                Value::String(_) | Value::Number(_) => Ok(raw),
                other => Err(ConversionError::mismatch(target, &other)),
            },
            RawType::Optional => match target.arg(0) {
                Some(inner) => self.convert(inner, raw),
                None => Ok(raw),
            },
            RawType::List | RawType::Set | RawType::Array => match raw {
                Value::Array(items) => {
                    let Some(element) = target.arg(0) else {
                        return Ok(Value::Array(items));
                    };
                    items
                        .into_iter()
                        .map(|item| self.convert(element, item))
                        .collect::<Result<Vec<_>, _>>()
                        .map(Value::Array)
                }
                other => Err(ConversionError::mismatch(target, &other)),
            },
            RawType::Map => match raw {
                Value::Object(entries) => {
                    let Some(value_type) = target.arg(1) else {
                        return Ok(Value::Object(entries));
                    };
                    entries
                        .into_iter()
                        .map(|(key, value)| Ok((key, self.convert(value_type, value)?)))
                        .collect::<Result<Map<_, _>, ConversionError>>()
                        .map(Value::Object)
                }
                other => Err(ConversionError::mismatch(target, &other)),
            },
            RawType::Named(_) | RawType::Var(_) => Ok(raw),
        }
    }
}

fn integer(target: &TypeDescriptor, raw: &Value) -> Result<i64, ConversionError> {
    match raw {
        Value::Number(number) => {
            if let Some(value) = number.as_i64() {
                Ok(value)
            } else if number.is_u64() {
                Err(ConversionError::OutOfRange {
                    value: number.to_string(),
                    target: "i64",
                })
            } else {
                Err(ConversionError::mismatch(target, raw))
            }
        }
        other => Err(ConversionError::mismatch(target, other)),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
