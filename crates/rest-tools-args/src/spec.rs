//! Argument specifications.

use crate::ArgType;
use serde_json::Value;

/// Where an [`ArgumentHandler`](crate::ArgumentHandler) reads raw values from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentSource {
    /// URL query string. Keys may repeat.
    QueryArguments,
    /// Request body, which must be a JSON object.
    JsonBodyArguments,
}

impl std::fmt::Display for ArgumentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QueryArguments => write!(f, "query"),
            Self::JsonBodyArguments => write!(f, "json-body"),
        }
    }
}

/// Specification of a single named argument.
///
/// Built with a chain of setters and handed to
/// [`ArgumentHandler::add_argument`](crate::ArgumentHandler::add_argument),
/// which checks it for consistency.
///
/// An argument without a default is required unless stated otherwise; an
/// argument with a default is optional unless stated otherwise.
///
/// # Example
///
/// ```rust
/// use rest_tools_args::{ArgType, ArgumentSpec};
/// use serde_json::json;
///
/// let spec = ArgumentSpec::new("limit")
///     .default(json!(10))
///     .arg_type(ArgType::Integer)
///     .choices([json!(10), json!(50), json!(100)]);
///
/// assert!(!spec.is_required());
/// assert_eq!(spec.default_value(), Some(&json!(10)));
/// ```
#[derive(Debug, Clone)]
pub struct ArgumentSpec {
    name: String,
    default: Option<Value>,
    required: Option<bool>,
    arg_type: Option<ArgType>,
    choices: Vec<Value>,
    repeatable: bool,
}

impl ArgumentSpec {
    /// Starts a specification with no default, no type and no choices.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
            required: None,
            arg_type: None,
            choices: Vec::new(),
            repeatable: false,
        }
    }

    /// Sets the value used when the argument is absent. `Value::Null` is a
    /// real default, distinct from having none.
    pub fn default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// States explicitly whether the argument is required.
    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    /// Sets the type raw values are cast to.
    pub fn arg_type(mut self, arg_type: ArgType) -> Self {
        self.arg_type = Some(arg_type);
        self
    }

    /// Restricts cast values to the given set.
    pub fn choices<I>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        self.choices = choices.into_iter().collect();
        self
    }

    /// Collects every occurrence into a sequence.
    pub fn repeatable(mut self) -> Self {
        self.repeatable = true;
        self
    }

    /// Argument name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Default value, if any.
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Whether absence is an error.
    pub fn is_required(&self) -> bool {
        self.required.unwrap_or(self.default.is_none())
    }

    /// Target type, if any.
    pub fn type_tag(&self) -> Option<&ArgType> {
        self.arg_type.as_ref()
    }

    /// Permitted values; empty means unrestricted.
    pub fn permitted(&self) -> &[Value] {
        &self.choices
    }

    /// Whether occurrences are collected into a sequence.
    pub fn is_repeatable(&self) -> bool {
        self.repeatable
    }

    /// Error text if this specification cannot be registered.
    pub(crate) fn misconfiguration(&self) -> Option<String> {
        if self.name.is_empty() {
            return Some("argument name must not be empty".to_string());
        }
        if self.default.is_none() && self.required == Some(false) {
            return Some(format!(
                "Argument '{}' marked as not required but no default was provided.",
                self.name
            ));
        }
        None
    }
}
