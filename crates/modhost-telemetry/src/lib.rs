//! modhost Telemetry - Logging setup for the modhost pluggable module host.
//!
//! The kernel logs through `tracing` with structured fields and one span per
//! structural change or dispatch. This crate installs the global subscriber
//! that renders them.
//!
//! # Example
//!
//! ```rust,no_run
//! use modhost_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), modhost_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Json)
//!     .with_directive("modhost_kernel=debug");
//!
//! setup_logging(&config)?;
//! tracing::info!("host starting");
//! # Ok(())
//! # }
//! ```
//!
//! With the `config` feature, a [`LogConfig`] can be built from the
//! `[logging]` section of a loaded `modhost_config::Config`.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, Rolling, SpanEvents, setup_logging};
