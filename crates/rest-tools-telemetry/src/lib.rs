//! Logging setup for rest-tools.
//!
//! Everything in the workspace logs through `tracing`; this crate installs
//! the subscriber that decides where those events go.
//!
//! ```rust,ignore
//! use rest_tools_telemetry::{init_logging, LogConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging(&LogConfig::development())?;
//!     tracing::debug!("ready");
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, LogConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
