//! # rest-tools
//!
//! Building blocks for JSON REST services and their clients:
//!
//! - [`args`]: declare the arguments an endpoint accepts and resolve them
//!   from the query string or a JSON-object body, with defaults, type
//!   coercion, choices and fixed-format `400` messages
//! - [`client`]: a JSON REST client with retries, TLS client certificates
//!   and OpenID token refresh
//! - [`telemetry`]: structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rest_tools::prelude::*;
//! use serde_json::json;
//!
//! // server side
//! let mut handler = ArgumentHandler::new(ArgumentSource::QueryArguments);
//! handler.add_argument(ArgumentSpec::new("limit").default(json!(10)).arg_type(ArgType::Integer))?;
//! let args = handler.parse_args(&RequestContext::from(request))?;
//!
//! // client side
//! let client = RestClient::new(ClientConfig::new("https://api.example.org"))?;
//! let page = client.request(Method::GET, "/items", Some(&json!({"limit": 5}))).await?;
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Request argument handling.
pub use rest_tools_args as args;

/// JSON REST client.
pub use rest_tools_client as client;

/// Logging setup.
pub use rest_tools_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// ```rust
/// use rest_tools::prelude::*;
/// ```
pub mod prelude {
    pub use rest_tools_args::{
        ArgType, ArgumentError, ArgumentHandler, ArgumentRejection, ArgumentSource,
        ArgumentSpec, ParsedArguments, RequestContext,
    };

    pub use rest_tools_client::{
        ClientConfig, ClientError, Method, OpenIdRestClient, RestClient,
    };

    pub use rest_tools_telemetry::{init_logging, LogConfig};
}
