//! Structured error types for leakscope
//!
//! Using thiserror for automatic Display implementation and error chaining.

use thiserror::Error;

/// Whole-snapshot ingestion failure.
///
/// Individual malformed goroutine blocks are skipped and counted, never
/// surfaced as errors; a `ParseError` means the entire capture was unusable
/// for this cycle. The driver decides whether to retry.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("snapshot blob is empty")]
    EmptyInput,

    #[error("no valid goroutine records in snapshot ({skipped} malformed blocks skipped)")]
    NoValidRecords { skipped: usize },
}

/// Invalid detector configuration.
///
/// Raised once at construction time; the engine never re-validates at
/// runtime.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("fingerprint_depth must be at least 1, got {0}")]
    FingerprintDepth(usize),

    #[error("min_samples must be at least 1, got {0}")]
    MinSamples(usize),

    #[error("grow_threshold must be positive and finite, got {0}")]
    GrowThreshold(f64),

    #[error("retention_window must be non-zero")]
    RetentionWindow,

    #[error("max_samples must be at least min_samples ({min_samples}), got {max_samples}")]
    MaxSamples { max_samples: usize, min_samples: usize },
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("failed to serialize findings: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
