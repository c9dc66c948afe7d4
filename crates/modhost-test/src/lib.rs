//! modhost Test - Shared test utilities for the modhost module host.
//!
//! This crate provides scripted mock modules, catalog and host fixtures,
//! access-control helpers and log capture for use as a dev-dependency.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! modhost-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use modhost_core::Caller;
//! use modhost_test::{counter_module, op, test_host};
//! use serde_json::json;
//!
//! #[test]
//! fn test_counter() {
//!     let mut host = test_host();
//!     host.install_module(&Caller::Host, counter_module("counter").into_module(), json!(null))
//!         .unwrap();
//!     let count = host.dispatch(&Caller::Host, &op("increment"), json!(null)).unwrap();
//!     assert_eq!(count, json!(1));
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod harness;
pub mod mocks;

pub use fixtures::*;
pub use harness::*;
pub use mocks::*;
