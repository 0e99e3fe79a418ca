//! Detector configuration
//!
//! All tunables in one place, validated once at engine construction.
//! Defaults follow the conservative side: no verdict before three samples,
//! single-digit steady blocking never alerts.

use std::time::Duration;

use crate::domain::ConfigError;
use crate::fingerprint::DEFAULT_DEPTH;

/// Tunables for the leak detection engine.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Stack frames participating in a fingerprint (`D`)
    pub fingerprint_depth: usize,
    /// Minimum samples before any verdict
    pub min_samples: usize,
    /// Absolute blocked-count floor below which a site never classifies as
    /// Growing, whatever its slope
    pub min_count: u64,
    /// Growth slope threshold in counts per sampling interval (`τ_grow`)
    pub grow_threshold: f64,
    /// How long a formerly-growing site must stay at zero before it
    /// downgrades to Transient (`G`). Workload-dependent; tune it.
    pub grace_period: Duration,
    /// Wall-clock retention window for samples (`W`)
    pub retention_window: Duration,
    /// Hard cap on retained samples per site
    pub max_samples: usize,
    /// Include Stable sites in reports
    pub include_stable: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            fingerprint_depth: DEFAULT_DEPTH,
            min_samples: 3,
            min_count: 10,
            grow_threshold: 1.0,
            grace_period: Duration::from_secs(60),
            retention_window: Duration::from_secs(3600),
            max_samples: 120,
            include_stable: false,
        }
    }
}

impl DetectorConfig {
    /// Validate threshold combinations. Fatal at startup, never at runtime.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fingerprint_depth < 1 {
            return Err(ConfigError::FingerprintDepth(self.fingerprint_depth));
        }
        if self.min_samples < 1 {
            return Err(ConfigError::MinSamples(self.min_samples));
        }
        if !self.grow_threshold.is_finite() || self.grow_threshold <= 0.0 {
            return Err(ConfigError::GrowThreshold(self.grow_threshold));
        }
        if self.retention_window.is_zero() {
            return Err(ConfigError::RetentionWindow);
        }
        if self.max_samples < self.min_samples {
            return Err(ConfigError::MaxSamples {
                max_samples: self.max_samples,
                min_samples: self.min_samples,
            });
        }
        Ok(())
    }
}
