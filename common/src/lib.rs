//! Shared building blocks for the load harness.
//!
//! This crate holds the error taxonomy and the time helpers used by the
//! option framework, the engine and the driver.

pub mod error;
pub mod time;

pub use error::{ErrorCategory, ErrorContext, LoadError, Result};
pub use time::{current_timestamp_millis, format_clock, format_hms};
