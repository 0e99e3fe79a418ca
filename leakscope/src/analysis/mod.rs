//! Trend analysis for tracked call sites
//!
//! Decides, per site, whether the blocked population is growing (leak
//! candidate), stable (benign steady state such as an idle worker pool), or
//! transient (drained on its own — the rendezvous case naive detectors flag
//! as a leak).

pub mod trend;

pub use trend::{Assessment, Classification, TrendClassifier};
