//! The argument handler: registration and resolution.

use crate::{
    qualify, ArgumentError, ArgumentResult, ArgumentSource, ArgumentSpec, RawArguments,
    RequestContext,
};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Argument parsing, defaulting, and casting for one endpoint.
///
/// Works like a command-line argument parser, but over the query string or
/// JSON body of a request. Register every accepted argument with
/// [`add_argument`](Self::add_argument), then call
/// [`parse_args`](Self::parse_args) per request.
///
/// Resolution collects every missing and every unrecognized argument before
/// failing, so a client sees all of them in one response.
///
/// # Example
///
/// ```rust
/// use rest_tools_args::{ArgType, ArgumentHandler, ArgumentSource, ArgumentSpec, RequestContext};
/// use http::Uri;
/// use serde_json::json;
///
/// let mut handler = ArgumentHandler::new(ArgumentSource::QueryArguments);
/// handler.add_argument(ArgumentSpec::new("name")).unwrap();
/// handler
///     .add_argument(ArgumentSpec::new("limit").default(json!(10)).arg_type(ArgType::Integer))
///     .unwrap();
///
/// let ctx = RequestContext::builder()
///     .uri(Uri::from_static("/users?name=alice&limit=5"))
///     .build();
///
/// let args = handler.parse_args(&ctx).unwrap();
/// assert_eq!(args.get("name"), Some(&json!("alice")));
/// assert_eq!(args.get_as::<i64>("limit").unwrap(), Some(5));
/// ```
#[derive(Debug, Clone)]
pub struct ArgumentHandler {
    source: ArgumentSource,
    specs: IndexMap<String, ArgumentSpec>,
}

impl ArgumentHandler {
    /// Creates a handler reading from `source`.
    #[must_use]
    pub fn new(source: ArgumentSource) -> Self {
        Self {
            source,
            specs: IndexMap::new(),
        }
    }

    /// Returns the argument source.
    #[must_use]
    pub fn source(&self) -> ArgumentSource {
        self.source
    }

    /// Registers an argument.
    ///
    /// # Errors
    ///
    /// Returns [`ArgumentError::Config`] if the argument is marked optional
    /// without a default, or if the name is already registered.
    pub fn add_argument(&mut self, spec: ArgumentSpec) -> ArgumentResult<&mut Self> {
        if let Some(message) = spec.misconfiguration() {
            return Err(ArgumentError::config(message));
        }
        if self.specs.contains_key(spec.name()) {
            return Err(ArgumentError::config(format!(
                "Argument '{}' is already registered.",
                spec.name()
            )));
        }

        self.specs.insert(spec.name().to_string(), spec);
        Ok(self)
    }

    /// Iterates over registered specifications in registration order.
    pub fn specs(&self) -> impl Iterator<Item = &ArgumentSpec> {
        self.specs.values()
    }

    /// Extracts, validates and casts the arguments of a request.
    ///
    /// # Errors
    ///
    /// Returns a client error (status 400) when the body is malformed, a value
    /// has the wrong type or is not an allowed choice, required arguments are
    /// missing, or unknown arguments are present, in that order of precedence.
    pub fn parse_args(&self, ctx: &RequestContext) -> ArgumentResult<ParsedArguments> {
        let raw = RawArguments::from_request(self.source, ctx)?;
        self.parse_raw(&raw)
    }

    /// Validates and casts already-extracted arguments.
    ///
    /// # Errors
    ///
    /// See [`parse_args`](Self::parse_args).
    pub fn parse_raw(&self, raw: &RawArguments) -> ArgumentResult<ParsedArguments> {
        let mut parsed = IndexMap::with_capacity(self.specs.len());
        let mut missing = Vec::new();

        for (name, spec) in &self.specs {
            let occurrences = raw.get(name).unwrap_or_default();

            if occurrences.is_empty() {
                if spec.is_required() {
                    missing.push(name.clone());
                } else {
                    // not required implies a default
                    let default = spec.default_value().cloned().unwrap_or(Value::Null);
                    parsed.insert(name.clone(), default);
                }
                continue;
            }

            let mut values = occurrences
                .iter()
                .map(|value| qualify(name, spec.type_tag(), spec.permitted(), value))
                .collect::<ArgumentResult<Vec<_>>>()?;

            let value = if spec.is_repeatable() || values.len() > 1 {
                Value::Array(values)
            } else {
                values.remove(0)
            };
            parsed.insert(name.clone(), value);
        }

        if !missing.is_empty() {
            tracing::debug!(source = %self.source, missing = ?missing, "required arguments missing");
            return Err(ArgumentError::MissingRequired { names: missing });
        }

        let unrecognized: Vec<String> = raw
            .names()
            .filter(|name| !self.specs.contains_key(*name))
            .map(String::from)
            .collect();
        if !unrecognized.is_empty() {
            tracing::debug!(source = %self.source, unrecognized = ?unrecognized, "unrecognized arguments");
            return Err(ArgumentError::Unrecognized {
                names: unrecognized,
            });
        }

        Ok(ParsedArguments { values: parsed })
    }
}

/// Validated, cast arguments keyed by name, in registration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedArguments {
    values: IndexMap<String, Value>,
}

impl ParsedArguments {
    /// Returns the value of `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Returns the value of `name` deserialized as `T`.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the value does not fit `T`; that is a
    /// mismatch between the registered type and the caller's expectation.
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> ArgumentResult<Option<T>> {
        self.values
            .get(name)
            .map(|v| {
                serde_json::from_value(v.clone())
                    .map_err(|e| ArgumentError::internal(format!("argument '{name}': {e}")))
            })
            .transpose()
    }

    /// Deserializes all arguments into a struct.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the arguments do not fit `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> ArgumentResult<T> {
        let object: Map<String, Value> = self
            .values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        serde_json::from_value(Value::Object(object)).map_err(ArgumentError::internal)
    }

    /// Returns true if `name` was resolved.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Iterates over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of resolved arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if nothing was resolved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Consumes the arguments, returning the underlying map.
    #[must_use]
    pub fn into_inner(self) -> IndexMap<String, Value> {
        self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ArgType;
    use serde::Deserialize;
    use serde_json::json;

    fn raw(pairs: &[(&str, Value)]) -> RawArguments {
        pairs.iter().map(|(k, v)| (*k, v.clone())).collect()
    }

    #[test]
    fn test_add_argument_rejects_optional_without_default() {
        let mut handler = ArgumentHandler::new(ArgumentSource::QueryArguments);
        let err = handler
            .add_argument(ArgumentSpec::new("foo").required(false))
            .unwrap_err();

        assert!(matches!(err, ArgumentError::Config { .. }));
        assert_eq!(handler.specs().count(), 0);
    }

    #[test]
    fn test_add_argument_rejects_duplicates() {
        let mut handler = ArgumentHandler::new(ArgumentSource::QueryArguments);
        handler.add_argument(ArgumentSpec::new("foo")).unwrap();
        let err = handler.add_argument(ArgumentSpec::new("foo")).unwrap_err();

        assert!(err.to_string().contains("already registered"));
    }

    #[test]
    fn test_add_argument_chains() {
        let mut handler = ArgumentHandler::new(ArgumentSource::QueryArguments);
        handler
            .add_argument(ArgumentSpec::new("a"))
            .unwrap()
            .add_argument(ArgumentSpec::new("b"))
            .unwrap();

        let names: Vec<_> = handler.specs().map(ArgumentSpec::name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_missing_reported_in_registration_order() {
        let mut handler = ArgumentHandler::new(ArgumentSource::QueryArguments);
        handler.add_argument(ArgumentSpec::new("reqd")).unwrap();
        handler.add_argument(ArgumentSpec::new("foo")).unwrap();
        handler.add_argument(ArgumentSpec::new("bar")).unwrap();

        let err = handler.parse_raw(&raw(&[("foo", json!("val"))])).unwrap_err();
        assert_eq!(err.to_string(), "the following arguments are required: reqd, bar");
    }

    #[test]
    fn test_missing_takes_priority_over_unrecognized() {
        let mut handler = ArgumentHandler::new(ArgumentSource::QueryArguments);
        handler.add_argument(ArgumentSpec::new("reqd")).unwrap();

        let err = handler.parse_raw(&raw(&[("xtra", json!("1"))])).unwrap_err();
        assert!(matches!(err, ArgumentError::MissingRequired { .. }));
    }

    #[test]
    fn test_invalid_type_takes_priority_over_missing() {
        let mut handler = ArgumentHandler::new(ArgumentSource::QueryArguments);
        handler.add_argument(ArgumentSpec::new("reqd")).unwrap();
        handler
            .add_argument(ArgumentSpec::new("foo").arg_type(ArgType::Integer))
            .unwrap();

        let err = handler.parse_raw(&raw(&[("foo", json!("hank"))])).unwrap_err();
        assert_eq!(err.to_string(), "argument foo: invalid type");
    }

    #[test]
    fn test_unrecognized_first_seen_order() {
        let mut handler = ArgumentHandler::new(ArgumentSource::QueryArguments);
        handler.add_argument(ArgumentSpec::new("reqd")).unwrap();
        handler.add_argument(ArgumentSpec::new("foo")).unwrap();

        let err = handler
            .parse_raw(&raw(&[
                ("foo", json!("val")),
                ("reqd", json!("2")),
                ("xtra", json!("1")),
                ("another", json!("True")),
                ("another", json!("False")),
            ]))
            .unwrap_err();
        assert_eq!(err.to_string(), "unrecognized arguments: xtra, another");
    }

    #[test]
    fn test_repeatable_single_occurrence_is_sequence() {
        let mut handler = ArgumentHandler::new(ArgumentSource::JsonBodyArguments);
        handler
            .add_argument(ArgumentSpec::new("ids").arg_type(ArgType::Integer).repeatable())
            .unwrap();

        let args = handler.parse_raw(&raw(&[("ids", json!("7"))])).unwrap();
        assert_eq!(args.get("ids"), Some(&json!([7])));
    }

    #[test]
    fn test_duplicates_without_repeatable_become_sequence() {
        let mut handler = ArgumentHandler::new(ArgumentSource::QueryArguments);
        handler.add_argument(ArgumentSpec::new("tag")).unwrap();

        let args = handler
            .parse_raw(&raw(&[("tag", json!("a")), ("tag", json!("b"))]))
            .unwrap();
        assert_eq!(args.get("tag"), Some(&json!(["a", "b"])));
    }

    #[test]
    fn test_default_is_not_cast() {
        let mut handler = ArgumentHandler::new(ArgumentSource::QueryArguments);
        handler
            .add_argument(
                ArgumentSpec::new("limit")
                    .default(json!("ten"))
                    .arg_type(ArgType::Integer),
            )
            .unwrap();

        let args = handler.parse_raw(&RawArguments::new()).unwrap();
        assert_eq!(args.get("limit"), Some(&json!("ten")));
    }

    #[test]
    fn test_required_with_default_still_required() {
        let mut handler = ArgumentHandler::new(ArgumentSource::QueryArguments);
        handler
            .add_argument(ArgumentSpec::new("foo").default(json!(1)).required(true))
            .unwrap();

        assert!(handler.parse_raw(&RawArguments::new()).is_err());
    }

    #[test]
    fn test_parsed_arguments_accessors() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Params {
            name: String,
            limit: i64,
            verbose: bool,
        }

        let mut handler = ArgumentHandler::new(ArgumentSource::QueryArguments);
        handler.add_argument(ArgumentSpec::new("name")).unwrap();
        handler
            .add_argument(ArgumentSpec::new("limit").arg_type(ArgType::Integer))
            .unwrap();
        handler
            .add_argument(
                ArgumentSpec::new("verbose")
                    .default(json!(false))
                    .arg_type(ArgType::Boolean),
            )
            .unwrap();

        let args = handler
            .parse_raw(&raw(&[("limit", json!("5")), ("name", json!("alice"))]))
            .unwrap();

        assert_eq!(args.len(), 3);
        assert!(args.contains("verbose"));
        assert_eq!(args.get_as::<i64>("limit").unwrap(), Some(5));
        assert_eq!(args.get_as::<i64>("absent").unwrap(), None);
        assert!(args.get_as::<i64>("name").is_err());
        assert_eq!(
            args.iter().map(|(k, _)| k).collect::<Vec<_>>(),
            vec!["name", "limit", "verbose"]
        );
        assert_eq!(
            args.deserialize::<Params>().unwrap(),
            Params {
                name: "alice".into(),
                limit: 5,
                verbose: false,
            }
        );
    }
}
