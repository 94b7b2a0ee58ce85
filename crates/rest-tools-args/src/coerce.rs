//! Type coercion for raw argument values.
//!
//! Raw values arrive either as strings (query arguments) or as arbitrary JSON
//! values (JSON-body arguments). [`qualify`] casts a raw value to an
//! [`ArgType`] and then enforces the argument's choices.

use crate::{ArgumentError, ArgumentResult};
use serde_json::{Number, Value};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Signature of a caller-supplied coercion.
pub type CustomCoercion = dyn Fn(&Value) -> Result<Value, String> + Send + Sync;

/// Target type of an argument.
#[derive(Clone)]
pub enum ArgType {
    /// Text. Non-string JSON values are rendered as text.
    String,
    /// Signed 64-bit integer.
    Integer,
    /// 64-bit float.
    Float,
    /// Permissive boolean: only falsy spellings are `false`.
    Boolean,
    /// Sequence. A string becomes its characters.
    List,
    /// JSON object.
    Dict,
    /// Caller-supplied coercion. `Err` is reported as an invalid type.
    Custom(Arc<CustomCoercion>),
}

impl ArgType {
    /// Wraps a closure as a custom coercion.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    /// Casts `raw` to this type.
    ///
    /// # Errors
    ///
    /// Returns the cast failure as text. The caller decides how to report it.
    pub fn cast(&self, raw: &Value) -> Result<Value, String> {
        match self {
            Self::String => Ok(Value::String(to_text(raw))),
            Self::Integer => to_integer(raw).map(Value::from),
            Self::Float => to_float(raw).and_then(|f| {
                Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| format!("could not convert to float: {raw}"))
            }),
            Self::Boolean => Ok(Value::Bool(to_bool(raw))),
            Self::List => to_list(raw).map(Value::Array),
            Self::Dict => match raw {
                Value::Object(_) => Ok(raw.clone()),
                other => Err(format!("cannot convert {} to dict", kind(other))),
            },
            Self::Custom(f) => f(raw),
        }
    }
}

impl fmt::Debug for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "String"),
            Self::Integer => write!(f, "Integer"),
            Self::Float => write!(f, "Float"),
            Self::Boolean => write!(f, "Boolean"),
            Self::List => write!(f, "List"),
            Self::Dict => write!(f, "Dict"),
            Self::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Casts `raw` to `arg_type` (if any) and checks it against `choices`.
///
/// # Errors
///
/// - [`ArgumentError::InvalidType`] if the cast fails
/// - [`ArgumentError::NotInChoices`] if `choices` is non-empty and the cast
///   value is not among them
/// - [`ArgumentError::Internal`] if a custom coercion panics
///
/// # Example
///
/// ```rust
/// use rest_tools_args::{qualify, ArgType};
/// use serde_json::json;
///
/// let v = qualify("limit", Some(&ArgType::Integer), &[], &json!("10")).unwrap();
/// assert_eq!(v, json!(10));
///
/// let v = qualify("flag", Some(&ArgType::Boolean), &[], &json!("No")).unwrap();
/// assert_eq!(v, json!(false));
/// ```
pub fn qualify(
    name: &str,
    arg_type: Option<&ArgType>,
    choices: &[Value],
    raw: &Value,
) -> ArgumentResult<Value> {
    let value = match arg_type {
        None => raw.clone(),
        Some(ty @ ArgType::Custom(_)) => {
            match panic::catch_unwind(AssertUnwindSafe(|| ty.cast(raw))) {
                Ok(result) => result.map_err(|e| ArgumentError::invalid_type(name, e))?,
                Err(payload) => {
                    return Err(ArgumentError::internal(format!(
                        "custom coercion for '{name}' panicked: {}",
                        panic_message(payload.as_ref())
                    )))
                }
            }
        }
        Some(ty) => ty
            .cast(raw)
            .map_err(|e| ArgumentError::invalid_type(name, e))?,
    };

    if !choices.is_empty() && !choices.iter().any(|choice| same_value(choice, &value)) {
        return Err(ArgumentError::not_in_choices(name, value, choices.to_vec()));
    }

    Ok(value)
}

/// JSON equality with numbers compared by value, so `1.0` matches `1`.
#[allow(clippy::float_cmp)]
fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                x == y
            } else if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                x == y
            } else {
                x.as_f64() == y.as_f64()
            }
        }
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| same_value(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| same_value(x, y)))
        }
        _ => a == b,
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

fn to_text(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_integer(raw: &Value) -> Result<i64, String> {
    match raw {
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|e| format!("invalid integer '{s}': {e}")),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i)
            } else {
                // u64 beyond i64, or a float
                match n.as_f64() {
                    Some(f) if f.is_finite() && f.trunc() >= i64::MIN as f64 && f.trunc() <= i64::MAX as f64 => {
                        #[allow(clippy::cast_possible_truncation)]
                        Ok(f.trunc() as i64)
                    }
                    _ => Err(format!("integer out of range: {n}")),
                }
            }
        }
        Value::Bool(b) => Ok(i64::from(*b)),
        other => Err(format!("cannot convert {} to integer", kind(other))),
    }
}

fn to_float(raw: &Value) -> Result<f64, String> {
    match raw {
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid float '{s}': {e}")),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| format!("cannot convert {n} to float")),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        other => Err(format!("cannot convert {} to float", kind(other))),
    }
}

/// Permissive truthiness: `null`, `false`, numeric zero and the strings
/// `false`/`0`/`no`/`""` (any case) are false, everything else is true.
fn to_bool(raw: &Value) -> bool {
    match raw {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => {
            let s = s.to_ascii_lowercase();
            !matches!(s.as_str(), "false" | "0" | "no" | "")
        }
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn to_list(raw: &Value) -> Result<Vec<Value>, String> {
    match raw {
        Value::String(s) => Ok(s.chars().map(|c| Value::String(c.to_string())).collect()),
        Value::Array(items) => Ok(items.clone()),
        Value::Object(map) => Ok(map.keys().cloned().map(Value::String).collect()),
        other => Err(format!("{} is not iterable", kind(other))),
    }
}
