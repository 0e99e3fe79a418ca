//! # leakscope - Goroutine Leak Detection Engine
//!
//! leakscope turns periodic goroutine stack dumps from a running Go service
//! into ranked leak findings. It groups blocked goroutines by their blocking
//! call site and flags sites whose blocked population keeps growing across
//! snapshots — separating true leaks from benign steady-state blocking
//! (idle worker pools) and transient contention (slow rendezvous that
//! eventually drains).
//!
//! ## Architecture Overview
//!
//! ```text
//! dump blob + timestamp
//!         │
//!         ▼
//! ┌──────────────┐   records   ┌───────────────┐   (site, count)
//! │    Parser    │────────────▶│ Fingerprinter │────────────────┐
//! └──────────────┘             └───────────────┘                │
//!                                                               ▼
//! ┌──────────────┐   findings  ┌──────────────┐   series  ┌──────────┐
//! │   Reporter   │◀────────────│  Classifier  │◀──────────│ Tracker  │
//! └──────────────┘             └──────────────┘           └──────────┘
//! ```
//!
//! One snapshot flows parser → fingerprinter → tracker as a single atomic
//! update; classification re-reads every tracked series and the reporter
//! emits a deterministically ordered findings sequence.
//!
//! ## Module Structure
//!
//! - [`parser`]: Go runtime goroutine dump grammar → structured records
//! - [`fingerprint`]: stable call-site identity from noisy stacks
//! - [`tracker`]: bounded per-site time series of blocked counts
//! - [`analysis`]: Growing / Stable / Transient / Insufficient-Data verdicts
//! - [`report`]: severity ranking and deterministic findings output
//! - [`export`]: findings as JSON for alerting collaborators
//! - [`engine`]: the [`engine::LeakDetector`] façade tying it all together
//! - [`config`]: tunables, validated once at startup
//! - [`domain`]: newtypes and error taxonomy
//! - [`cli`]: argument parsing and the directory watch loop
//!
//! ## Scheduling Model
//!
//! The engine is a pure state machine over sequential calls: the host
//! decides *when* to capture, leakscope decides *what it means*. `ingest`
//! and `scan` may be called from different threads; the single internal
//! mutex guarantees a scan never observes a half-applied snapshot.
//!
//! ## Typical Usage
//!
//! ```no_run
//! use leakscope::config::DetectorConfig;
//! use leakscope::domain::Timestamp;
//! use leakscope::engine::LeakDetector;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let detector = LeakDetector::new(DetectorConfig::default())?;
//! let dump = std::fs::read_to_string("goroutines.txt")?;
//! detector.ingest(&dump, Timestamp(0))?;
//! for finding in detector.scan() {
//!     println!("{} {} count={}", finding.severity, finding.site, finding.current_count);
//! }
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;
pub mod export;
pub mod fingerprint;
pub mod parser;
pub mod report;
pub mod snapshot;
pub mod tracker;
