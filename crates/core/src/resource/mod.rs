//! Cached remote resources.

/// Cache cell with expiry and single-flight guard.
pub mod timed;

pub use timed::{ProcessStatus, ResourceSnapshot, SkipReason, TimedResource};
