//! Pattern classification support.
//!
//! Deciding what a detected pattern should become (a reusable skill, a
//! docs note, a lifecycle hook) is a judgment call delegated to an LLM
//! behind [`ClassifierClient`]. Everything around that call lives here:
//! the category/scope/confidence vocabulary, heuristic fallbacks for when
//! no LLM is available, prompt construction, and response parsing. The
//! response parser is deliberately forgiving: models rename keys and
//! invent values, so unrecognized fields fall back instead of failing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::detect::report::PatternReport;
use crate::error::{Error, Result};
use crate::types::{PatternKind, PatternRecord};

const CLASSIFICATION_PROMPT: &str = "You are reviewing recurring behavior patterns mined from recorded AI coding-assistant sessions. For each pattern, decide what kind of automation it suggests and how widely it applies. Return strict JSON: an object with a \"classifications\" array whose items carry pattern_key, pattern_type, category (one of \"skill\", \"docs\", \"hook\"), scope (\"global\", \"project:{name}\", or \"subdir:{path}\"), confidence (\"high\", \"medium\", \"low\"), reasoning, suggested_name, and suggested_content.";

// ============================================
// Vocabulary
// ============================================

/// What kind of automation a pattern suggests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutomationCategory {
    /// A reusable command macro
    Skill,
    /// A documentation snippet worth pinning
    Docs,
    /// A lifecycle hook
    Hook,
}

impl AutomationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            AutomationCategory::Skill => "skill",
            AutomationCategory::Docs => "docs",
            AutomationCategory::Hook => "hook",
        }
    }
}

impl std::str::FromStr for AutomationCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "skill" => Ok(AutomationCategory::Skill),
            "docs" => Ok(AutomationCategory::Docs),
            "hook" => Ok(AutomationCategory::Hook),
            _ => Err(format!("unknown automation category: {}", s)),
        }
    }
}

/// Where a suggested automation should live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Applies everywhere
    Global,
    /// Applies to one project
    Project(String),
    /// Applies below one directory
    Subdir(String),
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Global => write!(f, "global"),
            Scope::Project(name) => write!(f, "project:{}", name),
            Scope::Subdir(path) => write!(f, "subdir:{}", path),
        }
    }
}

impl std::str::FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s == "global" {
            return Ok(Scope::Global);
        }
        if let Some(name) = s.strip_prefix("project:") {
            return Ok(Scope::Project(name.to_string()));
        }
        if let Some(path) = s.strip_prefix("subdir:") {
            return Ok(Scope::Subdir(path.to_string()));
        }
        Err(format!("unknown scope: {}", s))
    }
}

impl Serialize for Scope {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Scope {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// How much evidence backs a classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

impl std::str::FromStr for Confidence {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "high" => Ok(Confidence::High),
            "medium" => Ok(Confidence::Medium),
            "low" => Ok(Confidence::Low),
            _ => Err(format!("unknown confidence: {}", s)),
        }
    }
}

/// A pattern with its classification attached
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedPattern {
    pub record: PatternRecord,
    pub category: AutomationCategory,
    pub scope: Scope,
    pub confidence: Confidence,
    pub reasoning: String,
    pub suggested_name: String,
    pub suggested_content: String,
}

// ============================================
// Heuristics
// ============================================

/// Recommended scope when no LLM judgment is available.
///
/// A pattern spanning at least `global_threshold` of all projects is
/// global; a single-project pattern scopes to that project. The
/// heuristics never produce [`Scope::Subdir`]; only an LLM response does.
pub fn compute_scope(
    record: &PatternRecord,
    total_projects: usize,
    global_threshold: f64,
) -> Scope {
    if total_projects == 0 {
        return Scope::Global;
    }

    let share = record.project_count as f64 / total_projects as f64;
    if share >= global_threshold {
        return Scope::Global;
    }

    if record.project_count == 1 {
        if let Some(name) = record.projects.first() {
            return Scope::Project(name.clone());
        }
    }

    // Several projects but below the global share: stay global rather
    // than picking one arbitrarily.
    Scope::Global
}

/// Evidence-based confidence tiers.
pub fn compute_confidence(record: &PatternRecord) -> Confidence {
    if record.occurrences >= 10 && record.session_count >= 5 && record.project_count >= 2 {
        return Confidence::High;
    }
    if record.occurrences >= 5 && record.session_count >= 3 {
        return Confidence::Medium;
    }
    Confidence::Low
}

// ============================================
// LLM round trip
// ============================================

/// LLM completion interface for classification.
pub trait ClassifierClient: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<String>;
}

/// Outcome of one classification round trip.
///
/// `prompt_hash` lets callers skip re-classification when the pattern set
/// has not changed; `raw_response` is kept for debugging.
#[derive(Debug, Clone)]
pub struct ClassificationRun {
    pub classified: Vec<ClassifiedPattern>,
    pub prompt_hash: String,
    pub raw_response: String,
}

/// Classifies detected patterns through a [`ClassifierClient`].
pub struct PatternClassifier<'a> {
    client: &'a dyn ClassifierClient,
    global_threshold: f64,
}

impl<'a> PatternClassifier<'a> {
    pub fn new(client: &'a dyn ClassifierClient, global_threshold: f64) -> Self {
        Self {
            client,
            global_threshold,
        }
    }

    /// Send every pattern in `report` for classification and parse the
    /// response.
    pub fn classify(&self, report: &PatternReport) -> Result<ClassificationRun> {
        let records_by_key: BTreeMap<String, PatternRecord> = report
            .patterns
            .iter()
            .map(|r| (r.pattern_key.clone(), r.clone()))
            .collect();

        let prompt = build_classification_prompt(report, self.global_threshold)?;
        let mut hasher = Sha256::new();
        hasher.update(prompt.as_bytes());
        let prompt_hash = hex::encode(hasher.finalize());

        let raw_response = self.client.complete(&prompt)?;
        let value = parse_response_json(&raw_response)?;
        let classified = parse_classification_response(&value, &records_by_key);

        Ok(ClassificationRun {
            classified,
            prompt_hash,
            raw_response,
        })
    }
}

/// Assemble the classification prompt for a report.
///
/// Patterns are flattened across kinds and inlined as JSON, most
/// frequent first, so truncation by the model hits the long tail.
pub fn build_classification_prompt(report: &PatternReport, global_threshold: f64) -> Result<String> {
    let mut records: Vec<&PatternRecord> = report.patterns.iter().collect();
    records.sort_by(|a, b| b.occurrences.cmp(&a.occurrences));
    let patterns_json = serde_json::to_string_pretty(&records)?;

    Ok(format!(
        "{CLASSIFICATION_PROMPT}\n\n\
         {count} patterns detected across {projects} projects, {range}. \
         Treat a pattern as global when it spans at least {threshold}% of projects.\n\n\
         Patterns:\n```json\n{patterns_json}\n```\n\nReturn only JSON.",
        count = records.len(),
        projects = report.summary.total_projects,
        range = date_range(report),
        threshold = (global_threshold * 100.0) as u32,
    ))
}

/// Human-readable date range of the report's patterns, or "unknown".
fn date_range(report: &PatternReport) -> String {
    let first = report.patterns.iter().filter_map(|r| r.first_seen).min();
    let last = report.patterns.iter().filter_map(|r| r.last_seen).max();
    match (first, last) {
        (Some(first), Some(last)) => format!(
            "{} to {}",
            first.format("%Y-%m-%d"),
            last.format("%Y-%m-%d")
        ),
        _ => "unknown".to_string(),
    }
}

fn parse_response_json(raw: &str) -> Result<serde_json::Value> {
    match serde_json::from_str(raw) {
        Ok(value) => Ok(value),
        Err(_) => {
            let extracted = extract_json_object(raw)?;
            serde_json::from_str(&extracted).map_err(Error::from)
        }
    }
}

fn extract_json_object(raw: &str) -> Result<String> {
    let start = raw.find('{').ok_or_else(|| {
        Error::Llm("classification response did not contain a JSON object".to_string())
    })?;
    let end = raw.rfind('}').ok_or_else(|| {
        Error::Llm("classification response did not contain a JSON object".to_string())
    })?;
    if end <= start {
        return Err(Error::Llm(
            "classification response JSON bounds are invalid".to_string(),
        ));
    }
    Ok(raw[start..=end].to_string())
}

/// Turn a parsed response into classified patterns.
///
/// Each item's `pattern_key` is resolved against the report exactly,
/// then by containment either way (models trim and embellish keys). An
/// unresolvable item still classifies under a placeholder record when it
/// names a valid pattern type; otherwise it is dropped with a warning.
/// Category, scope, and confidence values that fail to parse fall back
/// to docs/global/low.
pub fn parse_classification_response(
    value: &serde_json::Value,
    records_by_key: &BTreeMap<String, PatternRecord>,
) -> Vec<ClassifiedPattern> {
    let items = value
        .get("classifications")
        .and_then(|c| c.as_array())
        .cloned()
        .unwrap_or_default();

    let mut results = Vec::new();
    for item in &items {
        let pattern_key = item
            .get("pattern_key")
            .and_then(|k| k.as_str())
            .unwrap_or("");

        let record = resolve_record(pattern_key, records_by_key)
            .or_else(|| placeholder_record(item, pattern_key));
        let Some(record) = record else {
            warn!(pattern_key, "dropping classification for unknown pattern");
            continue;
        };

        let category = str_field(item, "category")
            .parse()
            .unwrap_or(AutomationCategory::Docs);
        let scope = str_field(item, "scope").parse().unwrap_or(Scope::Global);
        let confidence = str_field(item, "confidence")
            .parse()
            .unwrap_or(Confidence::Low);

        results.push(ClassifiedPattern {
            record,
            category,
            scope,
            confidence,
            reasoning: str_field(item, "reasoning").to_string(),
            suggested_name: str_field(item, "suggested_name").to_string(),
            suggested_content: str_field(item, "suggested_content").to_string(),
        });
    }
    results
}

fn str_field<'v>(item: &'v serde_json::Value, key: &str) -> &'v str {
    item.get(key).and_then(|v| v.as_str()).unwrap_or("")
}

fn resolve_record(
    key: &str,
    records_by_key: &BTreeMap<String, PatternRecord>,
) -> Option<PatternRecord> {
    if let Some(record) = records_by_key.get(key) {
        return Some(record.clone());
    }
    if key.is_empty() {
        return None;
    }
    records_by_key
        .iter()
        .find(|(stored, _)| stored.contains(key) || key.contains(stored.as_str()))
        .map(|(_, record)| record.clone())
}

fn placeholder_record(item: &serde_json::Value, pattern_key: &str) -> Option<PatternRecord> {
    let kind: PatternKind = item.get("pattern_type")?.as_str()?.parse().ok()?;
    Some(PatternRecord {
        pattern_type: kind,
        pattern_key: pattern_key.to_string(),
        occurrences: item.get("occurrences").and_then(|o| o.as_u64()).unwrap_or(0),
        sessions: Vec::new(),
        session_count: 0,
        projects: Vec::new(),
        project_count: 0,
        first_seen: None,
        last_seen: None,
        examples: Vec::new(),
    })
}
