//! Task scheduling
//!
//! Flows are executed as per-partition tasks on a local rayon thread pool.

pub mod local_scheduler;

pub use local_scheduler::*;
