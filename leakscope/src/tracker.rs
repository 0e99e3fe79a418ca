//! Per-site blocked-population tracking
//!
//! The tracker owns one time series per call site: `(timestamp, count)`
//! samples, oldest first, bounded by a wall-clock retention window and a
//! sample cap. It is the only mutable state in the engine, and it must not
//! itself accumulate unbounded history — that would be the very failure
//! class this tool detects.
//!
//! Series are kept in a `BTreeMap` so every iteration order downstream
//! (classification passes, reports) is deterministic.

use std::collections::BTreeMap;
use std::time::Duration;

use log::debug;

use crate::domain::{SiteKey, Timestamp};

/// Time series of observed blocked-counts for one call site.
///
/// Owned exclusively by [`PopulationTracker`]; the classifier reads it but
/// never mutates it.
#[derive(Debug, Clone)]
pub struct SiteTimeSeries {
    /// `(timestamp, count)` pairs, strictly increasing in timestamp
    samples: Vec<(Timestamp, u64)>,
    first_seen: Timestamp,
    last_seen: Timestamp,
}

impl SiteTimeSeries {
    fn new(ts: Timestamp, count: u64) -> Self {
        Self { samples: vec![(ts, count)], first_seen: ts, last_seen: ts }
    }

    /// Retained samples, oldest first.
    #[must_use]
    pub fn samples(&self) -> &[(Timestamp, u64)] {
        &self.samples
    }

    /// Timestamp of the first sample ever recorded for this site (survives
    /// eviction of the sample itself).
    #[must_use]
    pub fn first_seen(&self) -> Timestamp {
        self.first_seen
    }

    /// Timestamp of the newest sample.
    #[must_use]
    pub fn last_seen(&self) -> Timestamp {
        self.last_seen
    }

    /// Count from the newest sample, 0 for an empty series.
    #[must_use]
    pub fn current_count(&self) -> u64 {
        self.samples.last().map_or(0, |&(_, c)| c)
    }

    /// Record one sample. Idempotent per timestamp: a repeated update for an
    /// already-present timestamp replaces that sample. Out-of-order
    /// timestamps (older than the newest, not matching any existing sample)
    /// are dropped — the capture mechanism abandoned that cycle.
    fn record(&mut self, ts: Timestamp, count: u64) {
        if let Some(pos) = self.samples.iter().position(|&(t, _)| t == ts) {
            self.samples[pos].1 = count;
            return;
        }
        if ts < self.last_seen {
            debug!("dropping out-of-order sample at {ts} (last seen {})", self.last_seen);
            return;
        }
        self.samples.push((ts, count));
        self.last_seen = ts;
    }

    /// Evict samples older than `retention` (relative to the newest sample)
    /// and trim to `max_samples` newest entries.
    fn evict(&mut self, retention: Duration, max_samples: usize) {
        let newest = self.last_seen;
        self.samples.retain(|&(t, _)| newest.saturating_since(t) <= retention);
        if self.samples.len() > max_samples {
            let excess = self.samples.len() - max_samples;
            self.samples.drain(..excess);
        }
    }

    /// True once nothing in the retained window is worth keeping: no samples
    /// at all, or only zero counts (the population vanished for the whole
    /// window).
    fn is_drained(&self) -> bool {
        self.samples.iter().all(|&(_, c)| c == 0)
    }
}

/// Maintains one [`SiteTimeSeries`] per known call site.
#[derive(Debug)]
pub struct PopulationTracker {
    series: BTreeMap<SiteKey, SiteTimeSeries>,
    retention: Duration,
    max_samples: usize,
}

impl PopulationTracker {
    #[must_use]
    pub fn new(retention: Duration, max_samples: usize) -> Self {
        Self { series: BTreeMap::new(), retention, max_samples }
    }

    /// Record one sample for one site. See [`SiteTimeSeries::record`] for
    /// the idempotence and ordering rules.
    pub fn update(&mut self, site: &SiteKey, count: u64, ts: Timestamp) {
        match self.series.get_mut(site) {
            Some(series) => series.record(ts, count),
            None => {
                self.series.insert(site.clone(), SiteTimeSeries::new(ts, count));
            }
        }
        if let Some(series) = self.series.get_mut(site) {
            series.evict(self.retention, self.max_samples);
        }
    }

    /// Fold a full snapshot's per-site counts into the tracker.
    ///
    /// Sites known to the tracker but absent from `counts` receive an
    /// implicit 0 — their blocked population vanished, which is what lets a
    /// previously-growing site reclassify as resolved. Series that stayed at
    /// zero for the whole retained window are removed entirely.
    pub fn record_snapshot(&mut self, counts: &BTreeMap<SiteKey, u64>, ts: Timestamp) {
        let absent: Vec<SiteKey> =
            self.series.keys().filter(|k| !counts.contains_key(*k)).cloned().collect();
        for site in &absent {
            self.update(site, 0, ts);
        }
        for (site, &count) in counts {
            self.update(site, count, ts);
        }

        let drained: Vec<SiteKey> = self
            .series
            .iter()
            .filter(|(_, s)| s.is_drained())
            .map(|(k, _)| k.clone())
            .collect();
        for site in drained {
            debug!("removing drained site {site}");
            self.series.remove(&site);
        }
    }

    /// Series for one site, if it is still tracked.
    #[must_use]
    pub fn get_series(&self, site: &SiteKey) -> Option<&SiteTimeSeries> {
        self.series.get(site)
    }

    /// All known site keys, in deterministic (lexicographic) order.
    pub fn sites(&self) -> impl Iterator<Item = &SiteKey> {
        self.series.keys()
    }

    /// Iterate all (site, series) pairs in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = (&SiteKey, &SiteTimeSeries)> {
        self.series.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.series.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
