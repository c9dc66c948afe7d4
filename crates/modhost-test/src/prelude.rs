//! Prelude module - commonly used types for convenient import.
//!
//! Use `use modhost_test::prelude::*;` to import all test helpers.

pub use crate::fixtures::*;
pub use crate::harness::*;
pub use crate::mocks::*;
