//! Report compilation.
//!
//! Derives a narrative and tabular findings log from the current bookmark
//! set. The generation timestamp is an explicit input, so output is
//! byte-identical across calls given the same bookmarks and timestamp.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::Bookmark;
use crate::timecode::format_timecode;

/// Visual clarity label bucketed from confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Clarity {
    High,
    Moderate,
    Low,
}

impl Clarity {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence > 0.9 {
            Clarity::High
        } else if confidence > 0.7 {
            Clarity::Moderate
        } else {
            Clarity::Low
        }
    }
}

impl std::fmt::Display for Clarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Clarity::High => "high",
            Clarity::Moderate => "moderate",
            Clarity::Low => "low",
        };
        write!(f, "{}", s)
    }
}

/// One row of the tabular findings log.
#[derive(Debug, Clone, Serialize)]
pub struct ReportRow {
    pub timecode: String,
    pub end_timecode: String,
    pub summary: String,
    pub clarity: Clarity,
    pub confidence: f64,
}

/// A compiled case report.
#[derive(Debug, Clone, Serialize)]
pub struct CaseReport {
    pub evidence_name: String,
    pub generated_at: DateTime<Utc>,
    pub narrative: String,
    pub table: Vec<ReportRow>,
}

impl CaseReport {
    /// Render the report as markdown for export.
    pub fn render_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# Findings Report: {}\n\n", self.evidence_name));
        out.push_str(&format!(
            "Generated: {}\n\n",
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        out.push_str("## Narrative\n\n");
        out.push_str(&self.narrative);
        out.push_str("\n\n## Findings Log\n\n");
        out.push_str("| Time | End | Finding | Visual Clarity |\n");
        out.push_str("|------|-----|---------|----------------|\n");
        for row in &self.table {
            out.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                row.timecode, row.end_timecode, row.summary, row.clarity
            ));
        }
        out
    }
}

/// Compile a report from the current bookmark set.
///
/// Bookmarks are sorted by `from_time` ascending; the input order does not
/// affect the output.
pub fn compile_report(
    evidence_name: &str,
    bookmarks: &[Bookmark],
    generated_at: DateTime<Utc>,
) -> CaseReport {
    let mut sorted: Vec<&Bookmark> = bookmarks.iter().collect();
    sorted.sort_by(|a, b| a.from_time.total_cmp(&b.from_time));

    let narrative = if sorted.is_empty() {
        format!(
            "Review of the evidence video \"{}\" produced no saved findings.",
            evidence_name
        )
    } else {
        let mut text = format!(
            "Review of the evidence video \"{}\" identified {} saved finding(s) of interest.",
            evidence_name,
            sorted.len()
        );
        for bookmark in &sorted {
            text.push_str(&format!(
                " At {}, {}.",
                format_timecode(bookmark.from_time),
                bookmark.summary.trim_end_matches('.')
            ));
        }
        text
    };

    let table = sorted
        .iter()
        .map(|b| ReportRow {
            timecode: format_timecode(b.from_time),
            end_timecode: format_timecode(b.to_time),
            summary: b.summary.clone(),
            clarity: Clarity::from_confidence(b.confidence),
            confidence: b.confidence,
        })
        .collect();

    CaseReport {
        evidence_name: evidence_name.to_string(),
        generated_at,
        narrative,
        table,
    }
}
