//! Detection engine façade
//!
//! Wires parser → fingerprinter → tracker → classifier → reporter into two
//! entry points: [`LeakDetector::ingest`] (one snapshot in) and
//! [`LeakDetector::scan`] (findings out).
//!
//! The engine performs no scheduling and starts no tasks of its own; an
//! external driver decides when to capture. It is safe to call `ingest`
//! from a capture thread while `scan` runs on an analysis thread: all
//! mutable state sits behind one mutex, and (parse → fingerprint → update)
//! is a single atomic step per snapshot, so a scan always observes a
//! consistent, fully-updated set of series.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use log::{debug, warn};

use crate::analysis::TrendClassifier;
use crate::config::DetectorConfig;
use crate::domain::{ConfigError, ParseError, SiteKey, Timestamp};
use crate::fingerprint::Fingerprinter;
use crate::parser;
use crate::report::{Finding, Reporter};
use crate::snapshot::{BlockState, Frame};
use crate::tracker::PopulationTracker;

/// Per-cycle ingestion summary, in the spirit of the per-state tallies a
/// profile dump analysis prints.
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestStats {
    /// Valid records extracted from the snapshot
    pub records: usize,
    /// Malformed blocks dropped
    pub skipped_records: usize,
    /// Records blocked on channel send
    pub blocked_on_send: usize,
    /// Records blocked on channel receive
    pub blocked_on_receive: usize,
    /// Distinct call sites observed in this snapshot
    pub sites: usize,
}

/// Display metadata kept per site: one exemplar stack plus the worst wait
/// annotation seen. Refreshed on every snapshot the site appears in.
#[derive(Debug, Clone)]
struct SiteExemplar {
    state: BlockState,
    stack: Vec<Frame>,
    created_at: Option<Frame>,
    max_wait_minutes: Option<u64>,
}

/// Mutable engine state: everything a scan must observe atomically.
#[derive(Debug)]
struct EngineState {
    tracker: PopulationTracker,
    exemplars: BTreeMap<SiteKey, SiteExemplar>,
}

/// The leak detection engine.
pub struct LeakDetector {
    config: DetectorConfig,
    fingerprinter: Fingerprinter,
    classifier: TrendClassifier,
    reporter: Reporter,
    state: Mutex<EngineState>,
}

impl LeakDetector {
    /// Build an engine from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for invalid threshold combinations; never
    /// fails after construction.
    pub fn new(config: DetectorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            fingerprinter: Fingerprinter::new(config.fingerprint_depth),
            classifier: TrendClassifier::new(&config),
            reporter: Reporter::new(config.include_stable),
            state: Mutex::new(EngineState {
                tracker: PopulationTracker::new(config.retention_window, config.max_samples),
                exemplars: BTreeMap::new(),
            }),
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Ingest one snapshot blob captured at `timestamp`.
    ///
    /// Parsing and fingerprinting happen outside the lock; folding the
    /// per-site counts into the tracker is the atomic step. An abandoned
    /// capture cycle that never reaches this call leaves every series
    /// untouched — no sample is not the same as a zero sample.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when the blob yielded zero valid records. The
    /// cycle is simply lost; prior findings remain valid.
    pub fn ingest(&self, raw: &str, timestamp: Timestamp) -> Result<IngestStats, ParseError> {
        let parsed = parser::parse(raw, timestamp)?;
        if parsed.skipped_records > 0 {
            warn!("snapshot at {timestamp}: skipped {} malformed blocks", parsed.skipped_records);
        }

        let snapshot = parsed.snapshot;
        let mut counts: BTreeMap<SiteKey, u64> = BTreeMap::new();
        let mut exemplars: BTreeMap<SiteKey, SiteExemplar> = BTreeMap::new();

        for record in snapshot.blocked_records() {
            let site = self.fingerprinter.fingerprint(record);
            *counts.entry(site.clone()).or_insert(0) += 1;

            let exemplar = exemplars.entry(site).or_insert_with(|| SiteExemplar {
                state: record.state,
                stack: record.stack.clone(),
                created_at: record.created_at.clone(),
                max_wait_minutes: None,
            });
            if record.wait_minutes > exemplar.max_wait_minutes {
                exemplar.max_wait_minutes = record.wait_minutes;
            }
        }

        let stats = IngestStats {
            records: snapshot.records.len(),
            skipped_records: parsed.skipped_records,
            blocked_on_send: snapshot.count_in_state(BlockState::BlockedOnSend),
            blocked_on_receive: snapshot.count_in_state(BlockState::BlockedOnReceive),
            sites: counts.len(),
        };
        debug!(
            "snapshot at {timestamp}: {} records, {} sites, send={} recv={}",
            stats.records, stats.sites, stats.blocked_on_send, stats.blocked_on_receive
        );

        let mut state = self.lock_state();
        state.tracker.record_snapshot(&counts, timestamp);
        for (site, exemplar) in exemplars {
            // Carry the worst wait annotation across snapshots
            let merged_wait = state
                .exemplars
                .get(&site)
                .and_then(|prev| prev.max_wait_minutes)
                .max(exemplar.max_wait_minutes);
            state
                .exemplars
                .insert(site, SiteExemplar { max_wait_minutes: merged_wait, ..exemplar });
        }
        // Exemplars for sites the tracker dropped would otherwise linger
        let live: Vec<SiteKey> = state.tracker.sites().cloned().collect();
        state.exemplars.retain(|site, _| live.binary_search(site).is_ok());

        Ok(stats)
    }

    /// Classify every tracked site and produce the ordered findings.
    pub fn scan(&self) -> Vec<Finding> {
        let state = self.lock_state();
        let mut findings = Vec::with_capacity(state.tracker.len());

        for (site, series) in state.tracker.iter() {
            let assessment = self.classifier.classify(series);
            let (record_state, stack, created_at, wait) = match state.exemplars.get(site) {
                Some(e) => {
                    (e.state, e.stack.clone(), e.created_at.clone(), e.max_wait_minutes)
                }
                // Site tracked but exemplar missing (only possible for
                // series created through direct tracker use in tests)
                None => (BlockState::Other, Vec::new(), None, None),
            };

            findings.push(Finding::new(
                site.clone(),
                record_state,
                assessment,
                series.current_count(),
                series.first_seen(),
                stack,
                created_at,
                wait,
            ));
        }
        drop(state);

        self.reporter.report(findings)
    }

    /// Number of call sites currently tracked.
    #[must_use]
    pub fn tracked_sites(&self) -> usize {
        self.lock_state().tracker.len()
    }

    /// A poisoned lock means a panic mid-update on another thread; the
    /// tracker state is still structurally valid (every mutation is a whole
    /// sample replacement), so recover the guard rather than propagate.
    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Classification;
    use std::fmt::Write as _;

    /// Render a dump with `n` goroutines blocked sending at the same site.
    fn dump_with_senders(n: usize) -> String {
        let mut out = String::new();
        for i in 0..n {
            let _ = write!(
                out,
                "goroutine {} [chan send]:\nmain.fetch.func1(0x{:x})\n\t/app/main.go:53 +0x34\nmain.fetch(0x1)\n\t/app/main.go:48 +0x20\ncreated by main.fetch in goroutine 1\n\t/app/main.go:50 +0x8c\n\n",
                i + 10,
                0x1400 + i,
            );
        }
        out
    }

    fn detector() -> LeakDetector {
        LeakDetector::new(DetectorConfig::default()).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let cfg = DetectorConfig { min_samples: 0, ..DetectorConfig::default() };
        assert!(LeakDetector::new(cfg).is_err());
    }

    #[test]
    fn test_ingest_groups_identical_sites() {
        let d = detector();
        let stats = d.ingest(&dump_with_senders(25), Timestamp(1_000)).unwrap();
        assert_eq!(stats.records, 25);
        assert_eq!(stats.blocked_on_send, 25);
        assert_eq!(stats.sites, 1);
        assert_eq!(d.tracked_sites(), 1);
    }

    #[test]
    fn test_growing_population_surfaces_as_finding() {
        let d = detector();
        for (i, n) in [5usize, 5, 5, 12, 25, 40].into_iter().enumerate() {
            d.ingest(&dump_with_senders(n), Timestamp(i as u64 * 1_000)).unwrap();
        }
        let findings = d.scan();
        assert_eq!(findings.len(), 1);
        let f = &findings[0];
        assert_eq!(f.classification, Classification::Growing);
        assert_eq!(f.current_count, 40);
        assert_eq!(f.state, BlockState::BlockedOnSend);
        assert!(f.site.as_str().starts_with("send|main.fetch.func1"));
        assert_eq!(f.representative_stack.len(), 2);
        assert_eq!(f.created_at.as_ref().unwrap().symbol, "main.fetch");
    }

    #[test]
    fn test_drained_site_produces_no_finding() {
        let d = detector();
        for (i, n) in [0usize, 2, 2, 2, 0].into_iter().enumerate() {
            let ts = Timestamp(i as u64 * 1_000);
            if n == 0 {
                // A capture with no blocked goroutines still needs a valid
                // record for the snapshot to parse
                d.ingest("goroutine 1 [running]:\nmain.main()\n\t/app/main.go:10 +0x1\n", ts)
                    .unwrap();
            } else {
                d.ingest(&dump_with_senders(n), ts).unwrap();
            }
        }
        assert!(d.scan().is_empty());
    }

    #[test]
    fn test_parse_error_leaves_state_untouched() {
        let d = detector();
        d.ingest(&dump_with_senders(5), Timestamp(1_000)).unwrap();
        let before = d.tracked_sites();

        assert!(d.ingest("garbage\nnot a dump\n", Timestamp(2_000)).is_err());
        assert_eq!(d.tracked_sites(), before);
    }

    #[test]
    fn test_scan_is_deterministic() {
        let d = detector();
        for (i, n) in [15usize, 30, 60].into_iter().enumerate() {
            d.ingest(&dump_with_senders(n), Timestamp(i as u64 * 1_000)).unwrap();
        }
        let a = d.scan();
        let b = d.scan();
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.site, y.site);
            assert_eq!(x.severity, y.severity);
            assert_eq!(x.current_count, y.current_count);
        }
    }

    #[test]
    fn test_wait_annotation_carries_worst_case() {
        // The worst wait seen across snapshots sticks, even after captures
        // with a smaller annotation
        let d = LeakDetector::new(DetectorConfig {
            include_stable: true,
            min_samples: 2,
            min_count: 1,
            ..DetectorConfig::default()
        })
        .unwrap();
        for (i, dump) in [
            "goroutine 7 [chan send, 3 minutes]:\nmain.f()\n\t/a.go:1 +0x1\n",
            "goroutine 8 [chan send, 9 minutes]:\nmain.f()\n\t/a.go:1 +0x1\n",
            "goroutine 9 [chan send, 1 minutes]:\nmain.f()\n\t/a.go:1 +0x1\n",
        ]
        .iter()
        .enumerate()
        {
            d.ingest(dump, Timestamp(i as u64 * 1_000)).unwrap();
        }
        let findings = d.scan();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].max_wait_minutes, Some(9));
    }
}
