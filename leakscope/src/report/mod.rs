//! Leak findings and report assembly
//!
//! Renders classifier output into ranked, human-actionable findings. The
//! ordering contract is deterministic — severity descending, current count
//! descending, site key ascending — so identical engine state always
//! produces byte-identical reports. That determinism is what makes alert
//! output diffable across runs.

use std::cmp::Reverse;
use std::fmt::Write as _;

use crate::analysis::{Assessment, Classification};
use crate::domain::{SiteKey, Timestamp};
use crate::snapshot::{BlockState, Frame};

/// Ordered severity scale.
///
/// Exposed as a scale rather than a raw score so thresholds can be tuned
/// without renumbering callers. Derived `Ord` follows declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Derive severity from count magnitude and slope. Monotonically
    /// increasing in both.
    #[must_use]
    pub fn from_count_and_slope(current_count: u64, slope: f64) -> Self {
        if current_count >= 1_000 || slope >= 50.0 {
            Severity::Critical
        } else if current_count >= 200 || slope >= 10.0 {
            Severity::High
        } else if current_count >= 50 || slope >= 3.0 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One ranked finding. Recomputed fresh on every classification pass; no
/// identity persists across passes beyond the site key.
#[derive(Debug, Clone)]
pub struct Finding {
    pub site: SiteKey,
    pub state: BlockState,
    pub classification: Classification,
    pub severity: Severity,
    /// Blocked population at the newest sample
    pub current_count: u64,
    /// Counts per sampling interval
    pub slope: f64,
    pub first_seen: Timestamp,
    /// One exemplar stack kept for display
    pub representative_stack: Vec<Frame>,
    /// Spawn site of the exemplar, if the dump had one
    pub created_at: Option<Frame>,
    /// Longest wait-duration annotation observed for this site
    pub max_wait_minutes: Option<u64>,
}

impl Finding {
    /// Assemble a finding from classifier output and site metadata.
    /// Severity derivation lives here, on the reporting side of the seam.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        site: SiteKey,
        state: BlockState,
        assessment: Assessment,
        current_count: u64,
        first_seen: Timestamp,
        representative_stack: Vec<Frame>,
        created_at: Option<Frame>,
        max_wait_minutes: Option<u64>,
    ) -> Self {
        Self {
            site,
            state,
            classification: assessment.classification,
            severity: Severity::from_count_and_slope(current_count, assessment.slope),
            current_count,
            slope: assessment.slope,
            first_seen,
            representative_stack,
            created_at,
            max_wait_minutes,
        }
    }
}

/// Filters and orders findings for delivery.
#[derive(Debug, Clone, Copy)]
pub struct Reporter {
    include_stable: bool,
}

impl Reporter {
    #[must_use]
    pub fn new(include_stable: bool) -> Self {
        Self { include_stable }
    }

    /// Produce the ordered findings sequence.
    ///
    /// Growing sites always appear; Stable sites only behind the verbosity
    /// flag. Transient and Insufficient-Data sites are suppressed from
    /// output but remain tracked. Delivery (paging, storage) is the
    /// caller's concern.
    #[must_use]
    pub fn report(&self, mut findings: Vec<Finding>) -> Vec<Finding> {
        findings.retain(|f| match f.classification {
            Classification::Growing => true,
            Classification::Stable => self.include_stable,
            Classification::Transient | Classification::InsufficientData => false,
        });
        findings.sort_by(|a, b| {
            Reverse(a.severity)
                .cmp(&Reverse(b.severity))
                .then(Reverse(a.current_count).cmp(&Reverse(b.current_count)))
                .then(a.site.cmp(&b.site))
        });
        findings
    }
}

/// Render findings as a plain-text report.
#[must_use]
pub fn render_text(findings: &[Finding]) -> String {
    if findings.is_empty() {
        return "no leak candidates\n".to_string();
    }

    let mut out = String::new();
    for f in findings {
        let _ = writeln!(
            out,
            "[{}] {} {} count={} slope={:+.2}/sample first_seen={}",
            f.severity, f.classification, f.site, f.current_count, f.slope, f.first_seen
        );
        if let Some(minutes) = f.max_wait_minutes {
            let _ = writeln!(out, "    blocked up to {minutes} minutes");
        }
        for frame in &f.representative_stack {
            let _ = writeln!(out, "    {}", frame.symbol);
            let _ = writeln!(out, "        {}:{}", frame.file, frame.line);
        }
        if let Some(created) = &f.created_at {
            let _ = writeln!(out, "    created by {}", created.symbol);
            let _ = writeln!(out, "        {}:{}", created.file, created.line);
        }
    }
    out
}
