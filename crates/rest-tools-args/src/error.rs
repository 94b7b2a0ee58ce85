//! Argument-handling error types.
//!
//! Every failure the [`ArgumentHandler`](crate::ArgumentHandler) can raise is an
//! [`ArgumentError`]. Client-caused failures carry the exact reason text that is
//! sent back with the HTTP 400 response; registration mistakes are reported as
//! [`ArgumentError::Config`] and never depend on the request.

use http::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Result type alias using [`ArgumentError`].
pub type ArgumentResult<T> = Result<T, ArgumentError>;

/// Reason sent when a JSON-body request cannot be decoded.
pub const BODY_NOT_JSON: &str = "requests body is not JSON-encoded";

/// Reason sent when a JSON-body request decodes to something other than an object.
pub const BODY_NOT_DICT: &str = "JSON-encoded requests body must be a 'dict'";

/// Error raised while registering or resolving arguments.
///
/// The `Display` text of each request-dependent variant is the client-facing
/// reason, so it can be placed into a response as-is.
///
/// # Example
///
/// ```rust
/// use rest_tools_args::ArgumentError;
/// use http::StatusCode;
///
/// let err = ArgumentError::missing(["reqd", "bar"]);
/// assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
/// assert_eq!(err.to_string(), "the following arguments are required: reqd, bar");
/// ```
#[derive(Debug, Error)]
pub enum ArgumentError {
    /// The handler was configured incorrectly (programmer error).
    #[error("{message}")]
    Config {
        /// Error message.
        message: String,
    },

    /// One or more required arguments were absent.
    #[error("the following arguments are required: {}", .names.join(", "))]
    MissingRequired {
        /// Missing names, in registration order.
        names: Vec<String>,
    },

    /// One or more arguments were supplied that were never registered.
    #[error("unrecognized arguments: {}", .names.join(", "))]
    Unrecognized {
        /// Unknown names, in first-seen order.
        names: Vec<String>,
    },

    /// A value could not be cast to the argument's type.
    #[error("argument {name}: invalid type")]
    InvalidType {
        /// Argument name.
        name: String,
        /// Underlying cast failure. Logged, never sent to the client.
        details: String,
    },

    /// A value was cast but is not one of the permitted choices.
    #[error("argument {name}: invalid choice: {value} (choose from {})", join_values(.choices))]
    NotInChoices {
        /// Argument name.
        name: String,
        /// The cast value.
        value: Value,
        /// The permitted values.
        choices: Vec<Value>,
    },

    /// The request body could not be turned into a set of arguments.
    #[error("{reason}")]
    MalformedBody {
        /// Client-facing reason.
        reason: &'static str,
    },

    /// Something unexpected went wrong. Only the timestamp leaves the process.
    #[error("unknown argument-handling error ({timestamp})")]
    Internal {
        /// Correlation key, also written to the error log.
        timestamp: String,
    },
}

fn join_values(values: &[Value]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl ArgumentError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a missing-arguments error.
    pub fn missing<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::MissingRequired {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates an unrecognized-arguments error.
    pub fn unrecognized<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Unrecognized {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates an invalid-type error.
    pub fn invalid_type(name: impl Into<String>, details: impl Into<String>) -> Self {
        Self::InvalidType {
            name: name.into(),
            details: details.into(),
        }
    }

    /// Creates a not-in-choices error.
    pub fn not_in_choices(name: impl Into<String>, value: Value, choices: Vec<Value>) -> Self {
        Self::NotInChoices {
            name: name.into(),
            value,
            choices,
        }
    }

    /// Creates a malformed-body error.
    pub fn malformed_body(reason: &'static str) -> Self {
        Self::MalformedBody { reason }
    }

    /// Creates an internal error, logging `details` under a fresh timestamp.
    ///
    /// The returned error only exposes the timestamp, so the log line is the
    /// one place the details can be found.
    pub fn internal(details: impl std::fmt::Display) -> Self {
        let now = chrono::Utc::now();
        let timestamp = format!(
            "{}.{:06}",
            now.timestamp(),
            now.timestamp_subsec_micros()
        );
        tracing::error!(
            timestamp = %timestamp,
            error = %details,
            "unknown argument-handling error"
        );
        Self::Internal { timestamp }
    }

    /// Returns the HTTP status code for this error.
    ///
    /// Every request-dependent failure is a 400. Configuration errors are
    /// server bugs and map to 500.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Config { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Returns the error code suitable for error envelopes.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "ARGUMENT_CONFIG_ERROR",
            Self::MissingRequired { .. } => "MISSING_ARGUMENT",
            Self::Unrecognized { .. } => "UNRECOGNIZED_ARGUMENT",
            Self::InvalidType { .. } => "INVALID_TYPE",
            Self::NotInChoices { .. } => "INVALID_CHOICE",
            Self::MalformedBody { .. } => "MALFORMED_BODY",
            Self::Internal { .. } => "ARGUMENT_HANDLING_ERROR",
        }
    }

    /// Returns the argument name the error is about, if it is about one.
    #[must_use]
    pub fn argument(&self) -> Option<&str> {
        match self {
            Self::InvalidType { name, .. } | Self::NotInChoices { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Returns true if the client caused this error.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Config { .. } | Self::Internal { .. })
    }
}
