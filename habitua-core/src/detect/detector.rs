//! Pattern detection pipelines
//!
//! [`PatternDetector`] runs four pipelines over a scoped set of sessions:
//! tool sequences, prompt prefixes, prompt phrases, and file access. Each
//! pipeline aggregates windows into [`RawPattern`] accumulators keyed by
//! their canonical form, drops candidates below the occurrence and
//! session thresholds, and (for tool sequences) merges overlapping
//! windows into longer workflows.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::Utc;
use tracing::{debug, info};

use crate::config::DetectorConfig;
use crate::detect::merge::{merge_overlapping_sequences, SEQUENCE_SEPARATOR};
use crate::detect::ngram::{extract_phrase_ngrams, extract_prompt_prefix, extract_tool_sequences};
use crate::detect::normalize::normalize_file_path;
use crate::detect::report::{PatternCounts, PatternReport, PatternSet, ReportSummary};
use crate::error::Result;
use crate::store::SessionStore;
use crate::types::{MessageRole, PatternKind, RawPattern, Session, ToolCall};

/// Tools whose calls count as file access.
const FILE_TOOLS: &[&str] = &["Read", "Edit", "Write"];

/// Minimum prompt length (in characters) for prefix detection.
const MIN_PROMPT_CHARS: usize = 10;

/// Minimum token count for a prefix to be a meaningful opening.
const MIN_PREFIX_TOKENS: usize = 3;

/// Example snippets are cut at this many characters.
const EXAMPLE_MAX_CHARS: usize = 100;

/// Raw patterns from all four pipelines, before report assembly.
#[derive(Debug, Clone, Default)]
pub struct DetectedPatterns {
    pub tool_sequences: Vec<RawPattern>,
    pub prompt_prefixes: Vec<RawPattern>,
    pub prompt_phrases: Vec<RawPattern>,
    pub file_access: Vec<RawPattern>,
}

/// Runs detection pipelines against a session archive.
pub struct PatternDetector<'a> {
    store: &'a dyn SessionStore,
    config: DetectorConfig,
}

impl<'a> PatternDetector<'a> {
    pub fn new(store: &'a dyn SessionStore, config: DetectorConfig) -> Self {
        Self { store, config }
    }

    /// Sessions in scope for this run: optionally restricted to one
    /// project, optionally floored by start time.
    fn scoped_sessions(&self) -> Result<Vec<Session>> {
        let sessions = match &self.config.project {
            Some(project) => self.store.get_sessions_by_project(project)?,
            None => self.store.get_all_sessions()?,
        };
        let sessions: Vec<Session> = match self.config.since {
            Some(since) => sessions
                .into_iter()
                .filter(|s| s.started_at >= since)
                .collect(),
            None => sessions,
        };
        Ok(sessions)
    }

    /// Drop candidates below the occurrence or session thresholds.
    fn retain_qualifying<K: Ord>(&self, patterns: BTreeMap<K, RawPattern>) -> BTreeMap<K, RawPattern> {
        patterns
            .into_iter()
            .filter(|(_, p)| {
                p.occurrences >= self.config.min_occurrences
                    && p.sessions.len() >= self.config.min_sessions
            })
            .collect()
    }

    /// Repeated tool-call n-grams, merged where adjacent windows overlap.
    ///
    /// Every window counts, including repeats within one session. The
    /// observation timestamp is the session start, since individual calls
    /// in a window may disagree.
    pub fn detect_tool_sequences(&self) -> Result<Vec<RawPattern>> {
        let sessions = self.scoped_sessions()?;
        let mut sequences: BTreeMap<Vec<String>, RawPattern> = BTreeMap::new();

        for session in &sessions {
            let calls = self.store.get_session_tool_calls(&session.id)?;
            for window in extract_tool_sequences(&calls, self.config.sequence_window) {
                let example = window.join(SEQUENCE_SEPARATOR);
                let pattern = sequences.entry(window).or_insert_with_key(|key| {
                    RawPattern::new(PatternKind::ToolSequence, key.join(SEQUENCE_SEPARATOR))
                });
                pattern.observe(
                    &session.id,
                    &session.project,
                    Some(session.started_at),
                    &example,
                );
            }
        }

        let qualifying = self.retain_qualifying(sequences);
        let merged = merge_overlapping_sequences(qualifying, self.config.merge_overlap_ratio);
        debug!(patterns = merged.len(), "tool sequence detection finished");
        Ok(merged)
    }

    /// Repeated openings of user prompts.
    ///
    /// Prompts shorter than [`MIN_PROMPT_CHARS`] characters and prefixes
    /// under [`MIN_PREFIX_TOKENS`] tokens are ignored. Every qualifying
    /// message counts, repeats within a session included.
    pub fn detect_prompt_prefixes(&self) -> Result<Vec<RawPattern>> {
        let sessions = self.scoped_sessions()?;
        let mut prefixes: BTreeMap<String, RawPattern> = BTreeMap::new();

        for session in &sessions {
            let messages = self.store.get_session_messages(&session.id)?;
            for message in &messages {
                if message.role != MessageRole::User {
                    continue;
                }
                if message.content.chars().count() < MIN_PROMPT_CHARS {
                    continue;
                }
                let prefix = extract_prompt_prefix(&message.content, self.config.prefix_tokens);
                if prefix.split_whitespace().count() < MIN_PREFIX_TOKENS {
                    continue;
                }
                let example = truncate_example(&message.content);
                let pattern = prefixes
                    .entry(prefix)
                    .or_insert_with_key(|key| RawPattern::new(PatternKind::PromptPrefix, key.clone()));
                pattern.observe(&session.id, &session.project, message.timestamp, &example);
            }
        }

        let kept = self.retain_qualifying(prefixes);
        debug!(patterns = kept.len(), "prompt prefix detection finished");
        Ok(kept.into_values().collect())
    }

    /// Repeated word n-grams inside user prompts.
    ///
    /// A phrase counts once per message regardless of repetition inside
    /// that message; separate messages in the same session all count.
    pub fn detect_prompt_phrases(&self) -> Result<Vec<RawPattern>> {
        let sessions = self.scoped_sessions()?;
        let mut phrases: BTreeMap<Vec<String>, RawPattern> = BTreeMap::new();

        for session in &sessions {
            let messages = self.store.get_session_messages(&session.id)?;
            for message in &messages {
                if message.role != MessageRole::User || message.content.is_empty() {
                    continue;
                }
                let mut seen_in_message: HashSet<Vec<String>> = HashSet::new();
                let example = truncate_example(&message.content);
                for phrase in extract_phrase_ngrams(&message.content, self.config.phrase_window) {
                    if !seen_in_message.insert(phrase.clone()) {
                        continue;
                    }
                    let pattern = phrases.entry(phrase).or_insert_with_key(|key| {
                        RawPattern::new(PatternKind::PromptPhrase, key.join(" "))
                    });
                    pattern.observe(&session.id, &session.project, message.timestamp, &example);
                }
            }
        }

        let kept = self.retain_qualifying(phrases);
        debug!(patterns = kept.len(), "prompt phrase detection finished");
        Ok(kept.into_values().collect())
    }

    /// Files repeatedly touched by Read/Edit/Write across sessions.
    ///
    /// Each normalized path counts at most once per session; a skipped
    /// repeat contributes nothing, examples and timestamps included.
    pub fn detect_file_access(&self) -> Result<Vec<RawPattern>> {
        let sessions = self.scoped_sessions()?;
        let mut files: BTreeMap<String, RawPattern> = BTreeMap::new();

        for session in &sessions {
            let calls = self.store.get_session_tool_calls(&session.id)?;
            let mut seen_in_session: HashSet<String> = HashSet::new();
            for call in &calls {
                if !FILE_TOOLS.contains(&call.tool_name.as_str()) {
                    continue;
                }
                let Some(file_path) = extract_file_path(call) else {
                    continue;
                };
                let normalized = normalize_file_path(&file_path);
                if !seen_in_session.insert(normalized.clone()) {
                    continue;
                }
                let example = format!("{}: {}", call.tool_name, file_path);
                let pattern = files
                    .entry(normalized)
                    .or_insert_with_key(|key| RawPattern::new(PatternKind::FileAccess, key.clone()));
                pattern.observe(&session.id, &session.project, call.timestamp, &example);
            }
        }

        let kept = self.retain_qualifying(files);
        debug!(patterns = kept.len(), "file access detection finished");
        Ok(kept.into_values().collect())
    }

    /// Run all four pipelines.
    pub fn detect_all(&self) -> Result<DetectedPatterns> {
        info!(
            project = self.config.project.as_deref().unwrap_or("all"),
            "running pattern detection"
        );
        Ok(DetectedPatterns {
            tool_sequences: self.detect_tool_sequences()?,
            prompt_prefixes: self.detect_prompt_prefixes()?,
            prompt_phrases: self.detect_prompt_phrases()?,
            file_access: self.detect_file_access()?,
        })
    }

    /// Run all pipelines and assemble the serializable report.
    pub fn build_report(&self) -> Result<PatternReport> {
        let detected = self.detect_all()?;
        let sessions = self.scoped_sessions()?;
        let projects: BTreeSet<&str> = sessions.iter().map(|s| s.project.as_str()).collect();
        info!(
            sessions = sessions.len(),
            projects = projects.len(),
            "detection run complete"
        );

        Ok(PatternReport {
            generated_at: Utc::now(),
            summary: ReportSummary {
                total_sessions_analyzed: sessions.len(),
                total_projects: projects.len(),
                patterns_found: PatternCounts {
                    tool_sequences: detected.tool_sequences.len(),
                    prompt_prefixes: detected.prompt_prefixes.len(),
                    prompt_phrases: detected.prompt_phrases.len(),
                    file_access: detected.file_access.len(),
                },
            },
            patterns: PatternSet {
                tool_sequences: records(&detected.tool_sequences),
                prompt_prefixes: records(&detected.prompt_prefixes),
                prompt_phrases: records(&detected.prompt_phrases),
                file_access: records(&detected.file_access),
            },
        })
    }
}

fn records(patterns: &[RawPattern]) -> Vec<crate::types::PatternRecord> {
    patterns.iter().map(RawPattern::to_record).collect()
}

/// File path from a tool call's input, when present and non-empty.
fn extract_file_path(call: &ToolCall) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(&call.input_json).ok()?;
    let path = value.get("file_path")?.as_str()?;
    if path.is_empty() {
        return None;
    }
    Some(path.to_string())
}

/// Cut an example snippet at [`EXAMPLE_MAX_CHARS`] characters.
fn truncate_example(content: &str) -> String {
    if content.chars().count() > EXAMPLE_MAX_CHARS {
        let head: String = content.chars().take(EXAMPLE_MAX_CHARS).collect();
        format!("{}...", head)
    } else {
        content.to_string()
    }
}
