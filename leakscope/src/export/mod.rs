//! Findings export
//!
//! Serializes a findings report to JSON for forwarding to an alerting
//! collaborator or archiving next to the dump files. Field names are
//! camelCase to match the typical dashboards consuming this output.

use std::collections::BTreeMap;
use std::io::Write;

use serde::Serialize;

use crate::domain::ExportError;
use crate::report::Finding;
use crate::snapshot::Frame;

/// JSON shape of one stack frame.
#[derive(Debug, Serialize)]
struct FrameJson {
    symbol: String,
    file: String,
    line: u32,
}

impl From<&Frame> for FrameJson {
    fn from(f: &Frame) -> Self {
        Self { symbol: f.symbol.clone(), file: f.file.clone(), line: f.line }
    }
}

/// JSON shape of one finding.
#[derive(Debug, Serialize)]
struct FindingJson {
    #[serde(rename = "siteKey")]
    site_key: String,
    state: String,
    classification: String,
    severity: String,
    #[serde(rename = "currentCount")]
    current_count: u64,
    /// Counts per sampling interval
    slope: f64,
    #[serde(rename = "firstSeenMillis")]
    first_seen_millis: u64,
    stack: Vec<FrameJson>,
    #[serde(rename = "createdBy", skip_serializing_if = "Option::is_none")]
    created_by: Option<FrameJson>,
    #[serde(rename = "maxWaitMinutes", skip_serializing_if = "Option::is_none")]
    max_wait_minutes: Option<u64>,
}

/// JSON container for a whole report.
#[derive(Debug, Serialize)]
struct ReportJson {
    #[serde(rename = "generatedAtMillis")]
    generated_at_millis: u64,
    /// Finding count per severity label, for dashboards that only want the
    /// headline numbers
    #[serde(rename = "severityTotals")]
    severity_totals: BTreeMap<String, usize>,
    findings: Vec<FindingJson>,
}

/// Write a findings report as pretty-printed JSON.
///
/// The findings keep the reporter's ordering; combined with the sorted
/// severity totals this makes the output byte-identical for identical
/// input.
///
/// # Errors
///
/// Returns [`ExportError`] on serialization or write failure.
pub fn write_findings<W: Write>(
    findings: &[Finding],
    generated_at_millis: u64,
    mut writer: W,
) -> Result<(), ExportError> {
    let mut severity_totals: BTreeMap<String, usize> = BTreeMap::new();
    for f in findings {
        *severity_totals.entry(f.severity.label().to_string()).or_insert(0) += 1;
    }

    let report = ReportJson {
        generated_at_millis,
        severity_totals,
        findings: findings
            .iter()
            .map(|f| FindingJson {
                site_key: f.site.as_str().to_string(),
                state: f.state.token().to_string(),
                classification: f.classification.to_string(),
                severity: f.severity.label().to_string(),
                current_count: f.current_count,
                slope: f.slope,
                first_seen_millis: f.first_seen.as_millis(),
                stack: f.representative_stack.iter().map(FrameJson::from).collect(),
                created_by: f.created_at.as_ref().map(FrameJson::from),
                max_wait_minutes: f.max_wait_minutes,
            })
            .collect(),
    };

    serde_json::to_writer_pretty(&mut writer, &report)?;
    writer.write_all(b"\n")?;
    Ok(())
}
