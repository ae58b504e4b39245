//! Serializable pattern report
//!
//! The report is the engine's produced interface: a timestamped summary
//! plus the four pattern lists as [`PatternRecord`] rows. It serializes
//! to JSON with serde and round-trips.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::PatternRecord;

/// How many patterns each pipeline kept.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PatternCounts {
    pub tool_sequences: usize,
    pub prompt_prefixes: usize,
    pub prompt_phrases: usize,
    pub file_access: usize,
}

/// Scope of the run and per-pipeline pattern counts.
///
/// `total_sessions_analyzed` and `total_projects` reflect the same
/// project/since scoping the pipelines used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_sessions_analyzed: usize,
    pub total_projects: usize,
    pub patterns_found: PatternCounts,
}

/// The four pattern lists of one report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatternSet {
    pub tool_sequences: Vec<PatternRecord>,
    pub prompt_prefixes: Vec<PatternRecord>,
    pub prompt_phrases: Vec<PatternRecord>,
    pub file_access: Vec<PatternRecord>,
}

impl PatternSet {
    /// All records across the four lists, in report order.
    pub fn iter(&self) -> impl Iterator<Item = &PatternRecord> {
        self.tool_sequences
            .iter()
            .chain(self.prompt_prefixes.iter())
            .chain(self.prompt_phrases.iter())
            .chain(self.file_access.iter())
    }

    /// Total number of records in the report.
    pub fn len(&self) -> usize {
        self.tool_sequences.len()
            + self.prompt_prefixes.len()
            + self.prompt_phrases.len()
            + self.file_access.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of one detection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternReport {
    /// When the report was generated
    pub generated_at: DateTime<Utc>,
    /// Run scope and pattern counts
    pub summary: ReportSummary,
    /// Detected patterns by kind
    pub patterns: PatternSet,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PatternKind, RawPattern};

    fn sample_report() -> PatternReport {
        let mut p = RawPattern::new(PatternKind::FileAccess, "~/proj/config.py");
        p.observe("s1", "alpha", None, "Read: /home/dev/proj/config.py");
        p.observe("s2", "alpha", None, "Edit: /home/dev/proj/config.py");

        PatternReport {
            generated_at: Utc::now(),
            summary: ReportSummary {
                total_sessions_analyzed: 2,
                total_projects: 1,
                patterns_found: PatternCounts {
                    file_access: 1,
                    ..PatternCounts::default()
                },
            },
            patterns: PatternSet {
                file_access: vec![p.to_record()],
                ..PatternSet::default()
            },
        }
    }

    #[test]
    fn report_serializes_with_expected_shape() {
        let report = sample_report();
        let value = serde_json::to_value(&report).unwrap();

        assert!(value.get("generated_at").is_some());
        assert_eq!(value["summary"]["total_sessions_analyzed"], 2);
        assert_eq!(value["summary"]["patterns_found"]["file_access"], 1);
        assert_eq!(value["summary"]["patterns_found"]["tool_sequences"], 0);
        let rows = value["patterns"]["file_access"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["pattern_type"], "file_access");
        assert_eq!(rows[0]["pattern_key"], "~/proj/config.py");
        assert_eq!(rows[0]["session_count"], 2);
    }

    #[test]
    fn report_round_trips_through_json() {
        let report = sample_report();
        let json = serde_json::to_string_pretty(&report).unwrap();
        let back: PatternReport = serde_json::from_str(&json).unwrap();

        assert_eq!(back.summary.total_sessions_analyzed, 2);
        assert_eq!(back.patterns.file_access.len(), 1);
        assert_eq!(back.patterns.file_access[0].occurrences, 2);
        assert_eq!(back.generated_at, report.generated_at);
    }

    #[test]
    fn pattern_set_iterates_all_lists() {
        let report = sample_report();
        assert_eq!(report.patterns.len(), 1);
        assert!(!report.patterns.is_empty());
        assert_eq!(report.patterns.iter().count(), 1);
    }
}
