//! Greedy merge of overlapping tool sequences
//!
//! Adjacent windows of one longer workflow show up as separate n-grams
//! (`a b c` and `b c d` from the run `a b c d`). The merge walks
//! candidates from most to least frequent and fuses each with the first
//! other candidate that chains onto it in either orientation, provided
//! their occurrence counts are within a ratio of each other. One level
//! only: a fused sequence is never fed back in as a candidate.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::types::{PatternKind, RawPattern};

/// Separator between elements of a sequence pattern key.
pub const SEQUENCE_SEPARATOR: &str = " → ";

/// Fuse overlapping sequence candidates and emit final patterns.
///
/// Candidates arrive keyed by their element list; the `BTreeMap` order
/// breaks occurrence-count ties, so results are deterministic. For each
/// unconsumed candidate in descending-count order, the first other
/// unconsumed candidate that chains onto it (the suffix of one matching
/// the prefix of the other, shortest overlap first) with
/// `min(count) / max(count) >= min_overlap_ratio` is fused with it:
/// elements concatenated past the overlap, occurrences `min`, sessions
/// and projects unioned, seen-range widened over the known bounds,
/// examples concatenated. Candidates that never merge are emitted once,
/// unchanged, with their joined key.
pub fn merge_overlapping_sequences(
    sequences: BTreeMap<Vec<String>, RawPattern>,
    min_overlap_ratio: f64,
) -> Vec<RawPattern> {
    if sequences.is_empty() {
        return Vec::new();
    }

    let mut entries: Vec<(Vec<String>, RawPattern)> = sequences.into_iter().collect();
    entries.sort_by(|a, b| b.1.occurrences.cmp(&a.1.occurrences));

    let mut merged = Vec::with_capacity(entries.len());
    let mut used = vec![false; entries.len()];

    for i in 0..entries.len() {
        if used[i] {
            continue;
        }
        match find_merge_partner(&entries, &used, i, min_overlap_ratio) {
            Some(fusion) => {
                merged.push(fuse(
                    &entries[fusion.head],
                    &entries[fusion.tail],
                    fusion.overlap_len,
                ));
                used[fusion.head] = true;
                used[fusion.tail] = true;
            }
            None => {
                let (seq, pattern) = &entries[i];
                let mut pattern = pattern.clone();
                pattern.pattern_key = seq.join(SEQUENCE_SEPARATOR);
                merged.push(pattern);
                used[i] = true;
            }
        }
    }

    merged
}

/// An ordered pair of candidates to fuse: `head`'s last `overlap_len`
/// elements equal `tail`'s first `overlap_len` elements.
struct Fusion {
    head: usize,
    tail: usize,
    overlap_len: usize,
}

/// First unconsumed candidate that chains onto entry `i` in either
/// orientation with compatible counts.
fn find_merge_partner(
    entries: &[(Vec<String>, RawPattern)],
    used: &[bool],
    i: usize,
    min_overlap_ratio: f64,
) -> Option<Fusion> {
    let (seq, pattern) = &entries[i];

    for (j, (other_seq, other_pattern)) in entries.iter().enumerate() {
        if j == i || used[j] {
            continue;
        }
        if !counts_compatible(
            pattern.occurrences,
            other_pattern.occurrences,
            min_overlap_ratio,
        ) {
            continue;
        }
        if let Some(overlap_len) = overlap_length(seq, other_seq) {
            return Some(Fusion {
                head: i,
                tail: j,
                overlap_len,
            });
        }
        if let Some(overlap_len) = overlap_length(other_seq, seq) {
            return Some(Fusion {
                head: j,
                tail: i,
                overlap_len,
            });
        }
    }
    None
}

/// Shortest length at which `head` ends with what `tail` starts with.
/// Full containment is not an overlap.
fn overlap_length(head: &[String], tail: &[String]) -> Option<usize> {
    for overlap_len in 1..head.len() {
        if overlap_len > tail.len() {
            break;
        }
        if head[head.len() - overlap_len..] == tail[..overlap_len] {
            return Some(overlap_len);
        }
    }
    None
}

fn counts_compatible(a: u64, b: u64, min_ratio: f64) -> bool {
    let max = a.max(b);
    if max == 0 {
        return false;
    }
    (a.min(b) as f64) / (max as f64) >= min_ratio
}

fn fuse(
    entry: &(Vec<String>, RawPattern),
    other_entry: &(Vec<String>, RawPattern),
    overlap_len: usize,
) -> RawPattern {
    let (seq, pattern) = entry;
    let (other_seq, other_pattern) = other_entry;

    let mut elements = seq.clone();
    elements.extend(other_seq[overlap_len..].iter().cloned());

    let mut sessions = pattern.sessions.clone();
    sessions.extend(other_pattern.sessions.iter().cloned());
    let mut projects = pattern.projects.clone();
    projects.extend(other_pattern.projects.iter().cloned());

    let mut examples = pattern.examples.clone();
    examples.extend(other_pattern.examples.iter().cloned());

    RawPattern {
        kind: PatternKind::ToolSequence,
        pattern_key: elements.join(SEQUENCE_SEPARATOR),
        occurrences: pattern.occurrences.min(other_pattern.occurrences),
        sessions,
        projects,
        first_seen: earliest(pattern.first_seen, other_pattern.first_seen),
        last_seen: latest(pattern.last_seen, other_pattern.last_seen),
        examples,
    }
}

/// Earlier of two optional timestamps; a missing bound is ignored.
fn earliest(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Later of two optional timestamps; a missing bound is ignored.
fn latest(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn seq(elements: &[&str]) -> Vec<String> {
        elements.iter().map(|e| e.to_string()).collect()
    }

    fn candidate(
        elements: &[&str],
        occurrences: u64,
        sessions: &[&str],
        projects: &[&str],
    ) -> (Vec<String>, RawPattern) {
        let mut pattern = RawPattern::new(PatternKind::ToolSequence, "");
        pattern.occurrences = occurrences;
        pattern.sessions = sessions.iter().map(|s| s.to_string()).collect();
        pattern.projects = projects.iter().map(|p| p.to_string()).collect();
        (seq(elements), pattern)
    }

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn overlapping_sequences_with_similar_counts_merge() {
        let sequences: BTreeMap<_, _> = [
            candidate(&["a", "b", "c"], 10, &["s1"], &["alpha"]),
            candidate(&["b", "c", "d"], 10, &["s2"], &["alpha"]),
        ]
        .into_iter()
        .collect();

        let merged = merge_overlapping_sequences(sequences, 0.5);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].pattern_key, "a → b → c → d");
        assert_eq!(merged[0].occurrences, 10);
    }

    #[test]
    fn dissimilar_counts_stay_separate() {
        let sequences: BTreeMap<_, _> = [
            candidate(&["a", "b", "c"], 10, &["s1"], &["alpha"]),
            candidate(&["b", "c", "d"], 2, &["s2"], &["alpha"]),
        ]
        .into_iter()
        .collect();

        let merged = merge_overlapping_sequences(sequences, 0.5);
        assert_eq!(merged.len(), 2);
        // Most frequent first.
        assert_eq!(merged[0].pattern_key, "a → b → c");
        assert_eq!(merged[1].pattern_key, "b → c → d");
    }

    #[test]
    fn non_overlapping_sequences_stay_separate() {
        let sequences: BTreeMap<_, _> = [
            candidate(&["a", "b", "c"], 5, &["s1"], &["alpha"]),
            candidate(&["x", "y", "z"], 5, &["s2"], &["alpha"]),
        ]
        .into_iter()
        .collect();

        assert_eq!(merge_overlapping_sequences(sequences, 0.5).len(), 2);
    }

    #[test]
    fn merged_pattern_takes_minimum_count_and_unions_sets() {
        let mut first = candidate(&["a", "b", "c"], 10, &["s1", "s2"], &["alpha"]);
        first.1.first_seen = Some(ts(3));
        first.1.last_seen = Some(ts(5));
        first.1.examples = vec!["a → b → c".to_string()];

        let mut second = candidate(&["b", "c", "d"], 6, &["s2", "s3"], &["beta"]);
        second.1.last_seen = Some(ts(9));
        second.1.examples = vec!["b → c → d".to_string()];

        let sequences: BTreeMap<_, _> = [first, second].into_iter().collect();
        let merged = merge_overlapping_sequences(sequences, 0.5);

        assert_eq!(merged.len(), 1);
        let fused = &merged[0];
        assert_eq!(fused.occurrences, 6);
        assert_eq!(
            fused.sessions.iter().cloned().collect::<Vec<_>>(),
            vec!["s1", "s2", "s3"]
        );
        assert_eq!(fused.projects.len(), 2);
        // Missing first_seen on one side does not erase the known bound.
        assert_eq!(fused.first_seen, Some(ts(3)));
        assert_eq!(fused.last_seen, Some(ts(9)));
        assert_eq!(fused.examples.len(), 2);
    }

    #[test]
    fn fused_sequences_do_not_merge_again() {
        let sequences: BTreeMap<_, _> = [
            candidate(&["a", "b", "c"], 10, &["s1"], &["alpha"]),
            candidate(&["b", "c", "d"], 10, &["s2"], &["alpha"]),
            candidate(&["c", "d", "e"], 10, &["s3"], &["alpha"]),
        ]
        .into_iter()
        .collect();

        let merged = merge_overlapping_sequences(sequences, 0.5);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].pattern_key, "a → b → c → d");
        assert_eq!(merged[1].pattern_key, "c → d → e");
    }

    #[test]
    fn shortest_overlap_wins() {
        // Both a 1-element and a 2-element overlap exist; the fused key
        // keeps five elements, which only the 1-element overlap produces.
        let sequences: BTreeMap<_, _> = [
            candidate(&["a", "a", "a"], 8, &["s1"], &["alpha"]),
            candidate(&["a", "a", "b"], 8, &["s2"], &["alpha"]),
        ]
        .into_iter()
        .collect();

        let merged = merge_overlapping_sequences(sequences, 0.5);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].pattern_key, "a → a → a → a → b");
    }

    #[test]
    fn merge_is_insensitive_to_candidate_order() {
        // The downstream window sorts first here; the overlap is found by
        // checking the other orientation, and the fused element order
        // still follows the workflow.
        let sequences: BTreeMap<_, _> = [
            candidate(&["z", "m", "n"], 4, &["s1"], &["alpha"]),
            candidate(&["m", "n", "o"], 4, &["s2"], &["alpha"]),
        ]
        .into_iter()
        .collect();

        let merged = merge_overlapping_sequences(sequences, 0.5);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].pattern_key, "z → m → n → o");
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(merge_overlapping_sequences(BTreeMap::new(), 0.5).is_empty());
    }

    #[test]
    fn single_candidate_passes_through_with_joined_key() {
        let sequences: BTreeMap<_, _> =
            [candidate(&["git-status", "git-diff", "git-add"], 4, &["s1"], &["alpha"])]
                .into_iter()
                .collect();

        let merged = merge_overlapping_sequences(sequences, 0.5);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].pattern_key, "git-status → git-diff → git-add");
        assert_eq!(merged[0].occurrences, 4);
    }
}
