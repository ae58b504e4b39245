//! Core domain types for habitua
//!
//! These types represent the session archive the engine reads and the
//! pattern values it produces.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Project** | A codebase/directory that sessions are recorded against |
//! | **Session** | One recorded conversation between a person and an AI coding assistant |
//! | **Message** | A conversation turn within a session (user or assistant) |
//! | **ToolCall** | One tool invocation made by the assistant during a session |
//! | **Pattern** | A recurring behavior aggregated across sessions (tool sequence, prompt prefix, prompt phrase, file access) |
//! | **Occurrence** | A single sighting of a pattern in one session |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ============================================
// Sessions
// ============================================

/// A recorded assistant session.
///
/// Sessions arrive through a [`crate::store::SessionStore`]; the engine only
/// relies on `id`, `project`, and `started_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier for this session
    pub id: String,
    /// Name of the project the session ran in
    pub project: String,
    /// Working directory of the session, when recorded
    pub cwd: Option<String>,
    /// When the session started
    pub started_at: DateTime<Utc>,
    /// When the session ended (if known)
    pub ended_at: Option<DateTime<Utc>>,
}

// ============================================
// Messages
// ============================================

/// Role of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// The person driving the session
    User,
    /// The coding assistant
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl std::str::FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            _ => Err(format!("unknown message role: {}", s)),
        }
    }
}

/// A conversation turn within a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier for this message
    pub id: String,
    /// Session this message belongs to
    pub session_id: String,
    /// Who authored the turn
    pub role: MessageRole,
    /// Timestamp of the turn, when recorded
    pub timestamp: Option<DateTime<Utc>>,
    /// Text content (empty when the turn carried none)
    pub content: String,
}

// ============================================
// Tool Calls
// ============================================

/// One tool invocation recorded during a session.
///
/// `input_json` is kept as raw text because archives contain malformed
/// records; parsing happens at the point of use and degrades instead of
/// failing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this call
    pub id: String,
    /// Session this call belongs to
    pub session_id: String,
    /// Name of the tool invoked ("Bash", "Read", "Edit", ...)
    pub tool_name: String,
    /// JSON-encoded input arguments, as captured
    pub input_json: String,
    /// Timestamp of the call, when recorded
    pub timestamp: Option<DateTime<Utc>>,
}

// ============================================
// Patterns
// ============================================

/// The four kinds of recurring behavior the engine detects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// Repeated n-grams of normalized tool invocations
    ToolSequence,
    /// Repeated openings of user prompts
    PromptPrefix,
    /// Repeated word n-grams inside user prompts
    PromptPhrase,
    /// Files touched by read/edit/write tools across sessions
    FileAccess,
}

impl PatternKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternKind::ToolSequence => "tool_sequence",
            PatternKind::PromptPrefix => "prompt_prefix",
            PatternKind::PromptPhrase => "prompt_phrase",
            PatternKind::FileAccess => "file_access",
        }
    }
}

impl std::fmt::Display for PatternKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PatternKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tool_sequence" => Ok(PatternKind::ToolSequence),
            "prompt_prefix" => Ok(PatternKind::PromptPrefix),
            "prompt_phrase" => Ok(PatternKind::PromptPhrase),
            "file_access" => Ok(PatternKind::FileAccess),
            _ => Err(format!("unknown pattern kind: {}", s)),
        }
    }
}

/// Maximum number of example snippets kept per pattern
pub const MAX_EXAMPLES: usize = 3;

/// Accumulator for one pattern while a pipeline scans sessions.
///
/// Session and project ids live in `BTreeSet`s so serialized output is
/// sorted without an extra pass and iteration order is deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPattern {
    /// Which pipeline produced this pattern
    pub kind: PatternKind,
    /// Canonical display key ("git-status → git-diff → git-add", ...)
    pub pattern_key: String,
    /// Total sightings across all scanned sessions
    pub occurrences: u64,
    /// Distinct sessions the pattern appeared in
    pub sessions: BTreeSet<String>,
    /// Distinct projects the pattern appeared in
    pub projects: BTreeSet<String>,
    /// Earliest sighting with a known timestamp
    pub first_seen: Option<DateTime<Utc>>,
    /// Latest sighting with a known timestamp
    pub last_seen: Option<DateTime<Utc>>,
    /// Up to [`MAX_EXAMPLES`] raw snippets illustrating the pattern
    pub examples: Vec<String>,
}

impl RawPattern {
    /// Create an empty accumulator for `kind` under `key`.
    pub fn new(kind: PatternKind, key: impl Into<String>) -> Self {
        Self {
            kind,
            pattern_key: key.into(),
            occurrences: 0,
            sessions: BTreeSet::new(),
            projects: BTreeSet::new(),
            first_seen: None,
            last_seen: None,
            examples: Vec::new(),
        }
    }

    /// Record one sighting of this pattern.
    ///
    /// Timestamps only widen the seen-range when present; examples stop
    /// accumulating once [`MAX_EXAMPLES`] are stored.
    pub fn observe(
        &mut self,
        session_id: &str,
        project: &str,
        timestamp: Option<DateTime<Utc>>,
        example: &str,
    ) {
        self.occurrences += 1;
        self.sessions.insert(session_id.to_string());
        self.projects.insert(project.to_string());

        if let Some(ts) = timestamp {
            self.first_seen = Some(match self.first_seen {
                Some(seen) => seen.min(ts),
                None => ts,
            });
            self.last_seen = Some(match self.last_seen {
                Some(seen) => seen.max(ts),
                None => ts,
            });
        }

        if self.examples.len() < MAX_EXAMPLES {
            self.examples.push(example.to_string());
        }
    }

    /// Produce the serializable report row for this pattern.
    pub fn to_record(&self) -> PatternRecord {
        PatternRecord {
            pattern_type: self.kind,
            pattern_key: self.pattern_key.clone(),
            occurrences: self.occurrences,
            sessions: self.sessions.iter().cloned().collect(),
            session_count: self.sessions.len(),
            projects: self.projects.iter().cloned().collect(),
            project_count: self.projects.len(),
            first_seen: self.first_seen,
            last_seen: self.last_seen,
            // Merged patterns can carry more than MAX_EXAMPLES; the record
            // never does.
            examples: self.examples.iter().take(MAX_EXAMPLES).cloned().collect(),
        }
    }
}

/// One pattern as it appears in a report.
///
/// `sessions` and `projects` are sorted ascending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternRecord {
    /// Which pipeline produced this pattern
    pub pattern_type: PatternKind,
    /// Canonical display key
    pub pattern_key: String,
    /// Total sightings across all scanned sessions
    pub occurrences: u64,
    /// Sorted distinct session ids
    pub sessions: Vec<String>,
    /// Number of distinct sessions
    pub session_count: usize,
    /// Sorted distinct project names
    pub projects: Vec<String>,
    /// Number of distinct projects
    pub project_count: usize,
    /// Earliest sighting with a known timestamp
    pub first_seen: Option<DateTime<Utc>>,
    /// Latest sighting with a known timestamp
    pub last_seen: Option<DateTime<Utc>>,
    /// Up to [`MAX_EXAMPLES`] raw snippets
    pub examples: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn observe_accumulates_counts_and_sets() {
        let mut p = RawPattern::new(PatternKind::FileAccess, "~/src/main.rs");
        p.observe("s1", "alpha", Some(ts(9)), "Read: /home/u/src/main.rs");
        p.observe("s1", "alpha", Some(ts(10)), "Edit: /home/u/src/main.rs");
        p.observe("s2", "beta", None, "Read: /home/u/src/main.rs");

        assert_eq!(p.occurrences, 3);
        assert_eq!(p.sessions.len(), 2);
        assert_eq!(p.projects.len(), 2);
        assert_eq!(p.first_seen, Some(ts(9)));
        assert_eq!(p.last_seen, Some(ts(10)));
    }

    #[test]
    fn observe_widens_range_only_with_timestamps() {
        let mut p = RawPattern::new(PatternKind::PromptPrefix, "fix the build");
        p.observe("s1", "alpha", None, "fix the build please");
        assert_eq!(p.first_seen, None);
        assert_eq!(p.last_seen, None);

        p.observe("s2", "alpha", Some(ts(12)), "fix the build again");
        assert_eq!(p.first_seen, Some(ts(12)));
        assert_eq!(p.last_seen, Some(ts(12)));

        // An earlier sighting moves first_seen back without touching last_seen.
        p.observe("s3", "alpha", Some(ts(8)), "fix the build now");
        assert_eq!(p.first_seen, Some(ts(8)));
        assert_eq!(p.last_seen, Some(ts(12)));
    }

    #[test]
    fn observe_caps_examples() {
        let mut p = RawPattern::new(PatternKind::PromptPhrase, "run the test suite again");
        for i in 0..5 {
            p.observe("s1", "alpha", None, &format!("example {}", i));
        }
        assert_eq!(p.examples.len(), MAX_EXAMPLES);
        assert_eq!(p.occurrences, 5);
        assert_eq!(p.examples[0], "example 0");
    }

    #[test]
    fn to_record_sorts_sessions_and_projects() {
        let mut p = RawPattern::new(PatternKind::FileAccess, "~/config.py");
        p.observe("s-zulu", "zeta", None, "Read: config.py");
        p.observe("s-alpha", "alpha", None, "Read: config.py");

        let record = p.to_record();
        assert_eq!(record.sessions, vec!["s-alpha", "s-zulu"]);
        assert_eq!(record.projects, vec!["alpha", "zeta"]);
        assert_eq!(record.session_count, 2);
        assert_eq!(record.project_count, 2);
    }

    #[test]
    fn record_round_trips_through_json() {
        let mut p = RawPattern::new(PatternKind::ToolSequence, "git-status → git-diff → git-add");
        p.observe("s1", "alpha", Some(ts(9)), "git-status → git-diff → git-add");
        p.observe("s2", "beta", Some(ts(11)), "git-status → git-diff → git-add");

        let record = p.to_record();
        let json = serde_json::to_string(&record).unwrap();
        let back: PatternRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(back.pattern_type, PatternKind::ToolSequence);
        assert_eq!(back.pattern_key, record.pattern_key);
        assert_eq!(back.occurrences, 2);
        assert_eq!(back.sessions, record.sessions);
        assert_eq!(back.first_seen, record.first_seen);
    }

    #[test]
    fn pattern_kind_string_round_trip() {
        for kind in [
            PatternKind::ToolSequence,
            PatternKind::PromptPrefix,
            PatternKind::PromptPhrase,
            PatternKind::FileAccess,
        ] {
            let parsed: PatternKind = kind.as_str().parse().unwrap();
            assert_eq!(parsed, kind);
        }
        assert!("tool_sequences".parse::<PatternKind>().is_err());
    }
}
