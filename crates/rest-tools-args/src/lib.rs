//! # rest-tools-args
//!
//! Argument parsing, defaulting, and casting for REST endpoints.
//!
//! An [`ArgumentHandler`] is declared once per endpoint with the arguments it
//! accepts, much like a command-line argument parser, and then resolves those
//! arguments from either the query string or a JSON-object body:
//!
//! | Source | Raw values | Duplicates |
//! |--------|------------|------------|
//! | [`ArgumentSource::QueryArguments`] | strings | allowed, collected into a sequence |
//! | [`ArgumentSource::JsonBodyArguments`] | any JSON value | impossible |
//!
//! ## Example
//!
//! ```rust
//! use rest_tools_args::{
//!     ArgType, ArgumentHandler, ArgumentRejection, ArgumentSource, ArgumentSpec, RequestContext,
//! };
//! use http::Uri;
//! use serde_json::json;
//!
//! let mut handler = ArgumentHandler::new(ArgumentSource::JsonBodyArguments);
//! handler.add_argument(ArgumentSpec::new("dataset")).unwrap();
//! handler
//!     .add_argument(
//!         ArgumentSpec::new("priority")
//!             .default(json!(0))
//!             .arg_type(ArgType::Integer)
//!             .choices([json!(0), json!(1), json!(2)]),
//!     )
//!     .unwrap();
//!
//! let ctx = RequestContext::builder()
//!     .uri(Uri::from_static("/jobs"))
//!     .body(r#"{"priority": "3"}"#)
//!     .build();
//!
//! let rejection = ArgumentRejection::from(handler.parse_args(&ctx).unwrap_err());
//! assert_eq!(
//!     rejection.reason(),
//!     "argument priority: invalid choice: 3 (choose from 0, 1, 2)"
//! );
//! ```
//!
//! ## Error Handling
//!
//! Every failure is an [`ArgumentError`]. Missing and unrecognized arguments
//! are collected across the whole request before failing. Convert an error
//! into an [`ArgumentRejection`] to get the HTTP response.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod coerce;
mod context;
mod error;
mod handler;
mod raw;
mod rejection;
mod spec;

pub use coerce::{qualify, ArgType, CustomCoercion};
pub use context::{RequestContext, RequestContextBuilder};
pub use error::{ArgumentError, ArgumentResult, BODY_NOT_DICT, BODY_NOT_JSON};
pub use handler::{ArgumentHandler, ParsedArguments};
pub use raw::RawArguments;
pub use rejection::ArgumentRejection;
pub use spec::{ArgumentSource, ArgumentSpec};
