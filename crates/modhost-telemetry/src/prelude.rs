//! Prelude module - commonly used types for convenient import.
//!
//! Use `use modhost_telemetry::prelude::*;` to import all essential types.

// Errors
pub use crate::{TelemetryError, TelemetryResult};

// Logging configuration
pub use crate::{LogConfig, LogFormat, LogTarget, Rolling, SpanEvents};

// Setup
pub use crate::setup_logging;
