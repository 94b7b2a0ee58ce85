//! Translation of argument errors into HTTP rejections.
//!
//! An [`ArgumentRejection`] is what a server sends back when
//! [`ArgumentHandler::parse_args`](crate::ArgumentHandler::parse_args) fails:
//! a status code plus the fixed-format reason, rendered as a JSON envelope.
//!
//! | Failure | Reason |
//! |---------|--------|
//! | Missing required | `the following arguments are required: a, b` |
//! | Unknown names | `unrecognized arguments: x, y` |
//! | Bad cast | `argument foo: invalid type` |
//! | Not a choice | `argument foo: invalid choice: 3 (choose from 0, 1, 2)` |
//! | Anything else | `unknown argument-handling error (<timestamp>)` |

use crate::ArgumentError;
use bytes::Bytes;
use http::{header, HeaderValue, Response, StatusCode};
use serde::Serialize;
use std::fmt;

/// An HTTP error built from an [`ArgumentError`].
///
/// # Example
///
/// ```rust
/// use rest_tools_args::{ArgumentError, ArgumentRejection};
/// use http::StatusCode;
///
/// let rejection = ArgumentRejection::from(ArgumentError::missing(["reqd"]));
///
/// assert_eq!(rejection.status(), StatusCode::BAD_REQUEST);
/// assert_eq!(rejection.to_string(), "HTTP 400: the following arguments are required: reqd");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentRejection {
    status: StatusCode,
    code: &'static str,
    reason: String,
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    code: &'a str,
    message: &'a str,
}

impl ArgumentRejection {
    /// Returns the status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Returns the client-facing reason.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Builds the HTTP response with a JSON error envelope.
    #[must_use]
    pub fn into_response(self) -> Response<Bytes> {
        let envelope = ErrorEnvelope {
            code: self.code,
            message: &self.reason,
        };
        // a struct of two strings always serializes
        let body = serde_json::to_vec(&envelope).unwrap_or_default();

        let mut response = Response::new(Bytes::from(body));
        *response.status_mut() = self.status;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response
    }
}

impl From<ArgumentError> for ArgumentRejection {
    fn from(err: ArgumentError) -> Self {
        if let ArgumentError::InvalidType { name, details } = &err {
            tracing::debug!(argument = %name, details = %details, "argument has invalid type");
        }
        Self {
            status: err.status_code(),
            code: err.error_code(),
            reason: err.to_string(),
        }
    }
}

impl fmt::Display for ArgumentRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}: {}", self.status.as_u16(), self.reason)
    }
}

impl std::error::Error for ArgumentRejection {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_invalid_type_rejection() {
        let rejection = ArgumentRejection::from(ArgumentError::invalid_type(
            "foo",
            "invalid digit found in string",
        ));

        assert_eq!(rejection.status(), StatusCode::BAD_REQUEST);
        assert_eq!(rejection.code(), "INVALID_TYPE");
        assert_eq!(rejection.to_string(), "HTTP 400: argument foo: invalid type");
    }

    #[test]
    fn test_rejection_response_envelope() {
        let response =
            ArgumentRejection::from(ArgumentError::unrecognized(["xtra", "another"])).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );

        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(
            body,
            json!({
                "code": "UNRECOGNIZED_ARGUMENT",
                "message": "unrecognized arguments: xtra, another",
            })
        );
    }

    #[test]
    fn test_internal_rejection_carries_only_timestamp() {
        let rejection = ArgumentRejection::from(ArgumentError::internal("secret detail"));

        assert_eq!(rejection.status(), StatusCode::BAD_REQUEST);
        assert!(rejection.reason().starts_with("unknown argument-handling error ("));
        assert!(!rejection.reason().contains("secret"));
    }

    #[test]
    fn test_config_rejection_is_500() {
        let rejection = ArgumentRejection::from(ArgumentError::config("oops"));
        assert_eq!(rejection.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
