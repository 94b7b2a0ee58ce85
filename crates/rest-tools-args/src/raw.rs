//! Raw argument extraction from query strings and JSON bodies.

use crate::error::{BODY_NOT_DICT, BODY_NOT_JSON};
use crate::{ArgumentError, ArgumentResult, ArgumentSource, RequestContext};
use indexmap::IndexMap;
use serde_json::Value;

/// Raw, uncast arguments keyed by name, in first-seen order.
///
/// Query strings may repeat a key, so every name maps to one or more values.
/// Values taken from a JSON body always come one per name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawArguments {
    values: IndexMap<String, Vec<Value>>,
}

impl RawArguments {
    /// Creates an empty set of arguments.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one occurrence of `name`.
    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.values.entry(name.into()).or_default().push(value);
    }

    /// Parses a URL query string. Blank values are kept.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the query string cannot be decoded.
    pub fn from_query(query: &str) -> ArgumentResult<Self> {
        let pairs: Vec<(String, String)> =
            serde_urlencoded::from_str(query).map_err(ArgumentError::internal)?;

        let mut raw = Self::new();
        for (name, value) in pairs {
            raw.push(name, Value::String(value));
        }
        Ok(raw)
    }

    /// Parses a request body that must hold a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`ArgumentError::MalformedBody`] if the body is not JSON or is
    /// JSON but not an object.
    pub fn from_json_body(body: &[u8]) -> ArgumentResult<Self> {
        let decoded: Value = serde_json::from_slice(body)
            .map_err(|_| ArgumentError::malformed_body(BODY_NOT_JSON))?;

        let Value::Object(map) = decoded else {
            return Err(ArgumentError::malformed_body(BODY_NOT_DICT));
        };

        let mut raw = Self::new();
        for (name, value) in map {
            raw.push(name, value);
        }
        Ok(raw)
    }

    /// Extracts the arguments of `ctx` from the given source.
    ///
    /// # Errors
    ///
    /// See [`RawArguments::from_query`] and [`RawArguments::from_json_body`].
    pub fn from_request(source: ArgumentSource, ctx: &RequestContext) -> ArgumentResult<Self> {
        match source {
            ArgumentSource::QueryArguments => Self::from_query(ctx.query_string().unwrap_or("")),
            ArgumentSource::JsonBodyArguments => Self::from_json_body(ctx.body()),
        }
    }

    /// Returns every occurrence of `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[Value]> {
        self.values.get(name).map(Vec::as_slice)
    }

    /// Iterates over names in first-seen order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Number of distinct names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if there are no arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for RawArguments {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut raw = Self::new();
        for (name, value) in iter {
            raw.push(name, value);
        }
        raw
    }
}
