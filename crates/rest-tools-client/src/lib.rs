//! JSON REST client.
//!
//! [`RestClient`] talks to one base address: arguments go in the query
//! string for `GET`/`HEAD` and as a JSON object body otherwise, and
//! responses come back as [`serde_json::Value`]. Transport failures and
//! `500`/`502`/`503`/`504` responses are retried with exponential backoff
//! (see [`RetryPolicy`]).
//!
//! [`OpenIdRestClient`] adds an access token that is refreshed through the
//! OAuth2 refresh-token grant whenever it stops validating.
//!
//! # Example
//!
//! ```rust,no_run
//! use rest_tools_client::{ClientConfig, Method, RestClient};
//! use serde_json::json;
//!
//! # async fn run() -> rest_tools_client::ClientResult<()> {
//! let config = ClientConfig::builder()
//!     .address("https://api.example.org")
//!     .token("secret")
//!     .build()?;
//! let client = RestClient::new(config)?;
//!
//! let dataset = client
//!     .request(Method::POST, "/datasets", Some(&json!({"name": "run-42"})))
//!     .await?;
//! println!("{dataset}");
//! # Ok(())
//! # }
//! ```
//!
//! Configuration can also come from a file and the environment:
//!
//! ```rust,ignore
//! let config = ClientConfig::from_file("client.toml")?.with_env_overrides();
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod client;
pub mod config;
pub mod error;
pub mod openid;
pub mod retry;

pub use client::RestClient;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{ClientError, ClientResult};
pub use openid::{OpenIdAuth, OpenIdRestClient, ProviderMetadata};
pub use retry::{RetryPolicy, RETRY_STATUSES};

/// Re-exported so callers can name methods without depending on `reqwest`.
pub use reqwest::Method;
