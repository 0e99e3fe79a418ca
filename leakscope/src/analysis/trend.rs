//! Trend classification of site time series
//!
//! Rules, in order, first match wins:
//!
//! 1. **Insufficient-Data** — fewer than `min_samples` points; no snap
//!    judgments on noise.
//! 2. **Transient** — the population drained to zero and the decline was
//!    monotonic. A site whose retained history shows a growing phase must
//!    additionally sit at zero for the grace period before downgrading;
//!    anything else would oscillate between Growing and Transient.
//! 3. **Growing** — regression slope at or above `grow_threshold` AND the
//!    current count at or above the absolute `min_count` floor. The floor
//!    suppresses single-digit steady background blocking.
//! 4. **Stable** — everything else. Explicitly not an error condition.
//!
//! The classifier is a pure function of one series: the "formerly growing"
//! judgment for rule 2 is derived from the retained samples themselves, not
//! from remembered verdicts, so repeated passes over identical state give
//! identical answers.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::config::DetectorConfig;
use crate::domain::Timestamp;
use crate::tracker::SiteTimeSeries;

/// Verdict for one call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Classification {
    Growing,
    Stable,
    Transient,
    InsufficientData,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Classification::Growing => "growing",
            Classification::Stable => "stable",
            Classification::Transient => "transient",
            Classification::InsufficientData => "insufficient-data",
        };
        write!(f, "{s}")
    }
}

/// Classifier output for one site.
#[derive(Debug, Clone, Copy)]
pub struct Assessment {
    pub classification: Classification,
    /// Least-squares regression slope, counts per sampling interval
    pub slope: f64,
}

/// Classifies site time series. Stateless; cheap to copy.
#[derive(Debug, Clone, Copy)]
pub struct TrendClassifier {
    min_samples: usize,
    min_count: u64,
    grow_threshold: f64,
    grace_period: Duration,
}

impl TrendClassifier {
    #[must_use]
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            min_samples: config.min_samples,
            min_count: config.min_count,
            grow_threshold: config.grow_threshold,
            grace_period: config.grace_period,
        }
    }

    /// Classify one series. Reads the series, never mutates it.
    #[must_use]
    pub fn classify(&self, series: &SiteTimeSeries) -> Assessment {
        let samples = series.samples();
        let counts: Vec<u64> = samples.iter().map(|&(_, c)| c).collect();
        let slope = least_squares_slope(&counts);

        if counts.len() < self.min_samples {
            return Assessment { classification: Classification::InsufficientData, slope };
        }

        if self.is_transient(samples, &counts) {
            return Assessment { classification: Classification::Transient, slope };
        }

        let current = *counts.last().unwrap_or(&0);
        if slope >= self.grow_threshold && current >= self.min_count {
            return Assessment { classification: Classification::Growing, slope };
        }

        Assessment { classification: Classification::Stable, slope }
    }

    /// Rule 2: drained to zero, monotonic decline, grace period honored for
    /// sites that were growing before they drained.
    fn is_transient(&self, samples: &[(Timestamp, u64)], counts: &[u64]) -> bool {
        let n = counts.len();
        if counts[n - 1] != 0 || !counts.iter().any(|&c| c > 0) {
            return false;
        }

        // Non-increasing over the last min_samples points
        let tail = &counts[n - self.min_samples..];
        if tail.windows(2).any(|w| w[1] > w[0]) {
            return false;
        }

        // Start of the trailing zero run
        let zero_start = counts.iter().rposition(|&c| c > 0).map_or(0, |p| p + 1);

        // Did the pre-drain history look like a leak? Judged from the series
        // itself so the classifier stays pure.
        let prefix = &counts[..zero_start];
        let formerly_growing = prefix.len() >= 2
            && least_squares_slope(prefix) >= self.grow_threshold
            && prefix.iter().copied().max().unwrap_or(0) >= self.min_count;

        if !formerly_growing {
            return true;
        }

        let zero_span = samples[n - 1].0.saturating_since(samples[zero_start].0);
        zero_span >= self.grace_period
    }
}

/// Ordinary least-squares slope over sample index, in counts per interval.
///
/// Regressing over index rather than wall-clock time keeps the slope
/// comparable to `grow_threshold` ("units per sampling interval") even when
/// capture intervals jitter. Returns 0 for fewer than two points.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn least_squares_slope(counts: &[u64]) -> f64 {
    let n = counts.len();
    if n < 2 {
        return 0.0;
    }
    let n_f = n as f64;
    let mean_x = (n_f - 1.0) / 2.0;
    let mean_y = counts.iter().map(|&c| c as f64).sum::<f64>() / n_f;

    let mut cov = 0.0;
    let mut var = 0.0;
    for (i, &c) in counts.iter().enumerate() {
        let dx = i as f64 - mean_x;
        cov += dx * (c as f64 - mean_y);
        var += dx * dx;
    }
    cov / var
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SiteKey, Timestamp};
    use crate::tracker::PopulationTracker;

    /// Build a series from evenly spaced counts (1s interval).
    fn series(counts: &[u64]) -> SiteTimeSeries {
        series_spaced(counts, 1_000)
    }

    fn series_spaced(counts: &[u64], interval_ms: u64) -> SiteTimeSeries {
        let mut tracker = PopulationTracker::new(Duration::from_secs(86_400), 1_024);
        let site = SiteKey::new("send|test.site");
        for (i, &c) in counts.iter().enumerate() {
            tracker.update(&site, c, Timestamp(i as u64 * interval_ms));
        }
        tracker.get_series(&site).unwrap().clone()
    }

    fn classifier() -> TrendClassifier {
        TrendClassifier::new(&DetectorConfig::default())
    }

    #[test]
    fn test_insufficient_data_below_min_samples() {
        let a = classifier().classify(&series(&[5, 9]));
        assert_eq!(a.classification, Classification::InsufficientData);
    }

    #[test]
    fn test_growing_site_scenario() {
        // Rising slope, count past the floor
        let a = classifier().classify(&series(&[5, 5, 5, 12, 25, 40]));
        assert_eq!(a.classification, Classification::Growing);
        assert!(a.slope >= 1.0, "slope was {}", a.slope);
    }

    #[test]
    fn test_transient_scenario() {
        // Briefly nonzero, drained on its own: the rendezvous case
        let a = classifier().classify(&series(&[0, 2, 2, 2, 0]));
        assert_eq!(a.classification, Classification::Transient);
    }

    #[test]
    fn test_stable_scenario() {
        // Flat and above the floor: the absolute count alone never alerts
        let a = classifier().classify(&series(&[50, 51, 49, 50, 50]));
        assert_eq!(a.classification, Classification::Stable);
        assert!(a.slope.abs() < 1.0);
    }

    #[test]
    fn test_small_steady_population_is_stable() {
        let a = classifier().classify(&series(&[3, 3, 3, 3]));
        assert_eq!(a.classification, Classification::Stable);
    }

    #[test]
    fn test_growth_below_floor_is_not_growing() {
        // Perfect +1/interval slope but count never reaches min_count
        let a = classifier().classify(&series(&[1, 2, 3, 4, 5]));
        assert_eq!(a.classification, Classification::Stable);
    }

    #[test]
    fn test_formerly_growing_site_waits_out_grace_period() {
        let cfg = DetectorConfig {
            grace_period: Duration::from_secs(10),
            ..DetectorConfig::default()
        };
        let c = TrendClassifier::new(&cfg);

        // Grew past the floor, then drained 1s ago: grace not yet served
        let a = c.classify(&series_spaced(&[5, 15, 30, 0, 0], 1_000));
        assert_ne!(a.classification, Classification::Transient);

        // Same shape with zeros spanning 15s: downgrade allowed
        let a = c.classify(&series_spaced(&[5, 15, 30, 0, 0], 15_000));
        assert_eq!(a.classification, Classification::Transient);
    }

    #[test]
    fn test_non_monotonic_drain_is_not_transient() {
        // Bounced back up right before hitting zero
        let a = classifier().classify(&series(&[4, 2, 0, 6, 0]));
        assert_ne!(a.classification, Classification::Transient);
    }

    #[test]
    fn test_slope_of_flat_series_is_zero() {
        assert!(least_squares_slope(&[7, 7, 7, 7]).abs() < f64::EPSILON);
        assert!(least_squares_slope(&[7]).abs() < f64::EPSILON);
    }

    #[test]
    fn test_slope_of_linear_series() {
        let slope = least_squares_slope(&[0, 2, 4, 6, 8]);
        assert!((slope - 2.0).abs() < 1e-9);
    }
}
