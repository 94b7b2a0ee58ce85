//! Error types for the REST client.

use thiserror::Error;

/// REST client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Error message.
        message: String,
    },

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, decoded lossily.
        body: String,
    },

    /// Transport failure from the underlying HTTP client.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Response body was not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (certificate and config files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Neither a valid access token nor a usable refresh token is held.
    #[error("No token available")]
    NoToken,

    /// OpenID discovery or token validation failure.
    #[error("OpenID error: {message}")]
    OpenId {
        /// Error message.
        message: String,
    },

    /// Failure building the runtime for a blocking request.
    #[error("Runtime error: {message}")]
    Runtime {
        /// Error message.
        message: String,
    },
}

impl ClientError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a status error.
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    /// Create an OpenID error.
    pub fn openid(message: impl Into<String>) -> Self {
        Self::OpenId {
            message: message.into(),
        }
    }

    /// Create a runtime error.
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime {
            message: message.into(),
        }
    }

    /// HTTP status of the failed response, if the server answered.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the server answered 404.
    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }

    /// Get the error category for logging.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::Status { .. } => "status",
            Self::Request(_) => "request",
            Self::Json(_) => "json",
            Self::Io(_) => "io",
            Self::NoToken => "no_token",
            Self::OpenId { .. } => "openid",
            Self::Runtime { .. } => "runtime",
        }
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
