//! Domain types providing compile-time safety and self-documentation
//!
//! These newtype wrappers prevent common bugs like passing a raw count where
//! a timestamp is expected, and make function signatures more expressive.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Goroutine ID as printed in a runtime stack dump
///
/// Assigned by the observed runtime. NOT stable across snapshots: the same
/// logical leak shows up under fresh IDs every capture, which is exactly why
/// grouping happens by call site rather than by ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GoroutineId(pub u64);

impl fmt::Display for GoroutineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "goroutine#{}", self.0)
    }
}

/// Stable call-site fingerprint
///
/// Derived from the blocking state plus a bounded, normalized symbol prefix
/// of the stack. Two records with the same key are "the same bug".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SiteKey(String);

impl SiteKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Get the key as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SiteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Capture timestamp in milliseconds since the Unix epoch
///
/// Only ordering and differences matter to the engine; the external capture
/// mechanism decides what clock the dumps were taken on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Convert a `SystemTime` (e.g. a dump file's mtime) into a timestamp.
    ///
    /// Times before the epoch clamp to zero.
    #[must_use]
    pub fn from_system_time(t: SystemTime) -> Self {
        let millis = t
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        Timestamp(millis)
    }

    /// Milliseconds since the epoch
    #[must_use]
    pub fn as_millis(self) -> u64 {
        self.0
    }

    /// Elapsed time since an earlier timestamp (zero if `earlier` is newer)
    #[must_use]
    pub fn saturating_since(self, earlier: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }

    /// Offset this timestamp forward by a duration
    #[must_use]
    pub fn advanced_by(self, d: Duration) -> Self {
        let millis = u64::try_from(d.as_millis()).unwrap_or(u64::MAX);
        Timestamp(self.0.saturating_add(millis))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        #[allow(clippy::cast_precision_loss)]
        let secs = self.0 as f64 / 1000.0;
        write!(f, "{secs:.3}s")
    }
}
