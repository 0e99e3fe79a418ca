//! Command-line interface

pub mod args;
pub mod watch;

pub use args::Args;

use thiserror::Error;

/// Invocation error: exits with the usage code instead of the generic
/// failure code. Detected by downcast, not by matching on error text.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct UsageError(pub String);
