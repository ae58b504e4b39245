//! Sliding-window extraction
//!
//! Pipelines reduce a session to fixed-length windows: tool-call n-grams
//! ordered by timestamp, prompt opening tokens, and word n-grams inside
//! prompts. Aggregation over the windows happens in the detector.

use crate::detect::normalize::{normalize_prompt, normalize_tool_name};
use crate::types::ToolCall;

/// Every length-`n` window of normalized tool names, in timestamp order.
///
/// The sort is stable and calls without a timestamp sort first. Sessions
/// with fewer than `n` calls produce nothing.
pub fn extract_tool_sequences(calls: &[ToolCall], n: usize) -> Vec<Vec<String>> {
    if n == 0 || calls.len() < n {
        return Vec::new();
    }

    let mut ordered: Vec<&ToolCall> = calls.iter().collect();
    ordered.sort_by_key(|call| call.timestamp);

    let tools: Vec<String> = ordered.into_iter().map(normalize_tool_name).collect();
    tools.windows(n).map(|window| window.to_vec()).collect()
}

/// The first `n_tokens` tokens of a normalized prompt, space-joined.
///
/// Shorter prompts yield what they have; `n_tokens == 0` yields an empty
/// string.
pub fn extract_prompt_prefix(text: &str, n_tokens: usize) -> String {
    normalize_prompt(text)
        .split_whitespace()
        .take(n_tokens)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Every length-`n` word window of a normalized prompt.
pub fn extract_phrase_ngrams(text: &str, n: usize) -> Vec<Vec<String>> {
    let normalized = normalize_prompt(text);
    let words: Vec<&str> = normalized.split_whitespace().collect();
    if n == 0 || words.len() < n {
        return Vec::new();
    }
    words
        .windows(n)
        .map(|window| window.iter().map(|w| w.to_string()).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn ts(minute: u32) -> Option<DateTime<Utc>> {
        Some(Utc.with_ymd_and_hms(2025, 6, 1, 9, minute, 0).unwrap())
    }

    fn call(tool: &str, input_json: &str, timestamp: Option<DateTime<Utc>>) -> ToolCall {
        ToolCall {
            id: format!("t-{}", tool),
            session_id: "s1".to_string(),
            tool_name: tool.to_string(),
            input_json: input_json.to_string(),
            timestamp,
        }
    }

    #[test]
    fn four_calls_yield_two_trigram_windows() {
        let calls = vec![
            call("Read", "{}", ts(1)),
            call("Edit", "{}", ts(2)),
            call("Write", "{}", ts(3)),
            call("Bash", r#"{"command": "git status"}"#, ts(4)),
        ];

        let windows = extract_tool_sequences(&calls, 3);
        assert_eq!(
            windows,
            vec![
                vec!["Read", "Edit", "Write"],
                vec!["Edit", "Write", "Bash:git-status"],
            ]
        );
    }

    #[test]
    fn too_few_calls_yield_nothing() {
        let calls = vec![call("Read", "{}", ts(1)), call("Edit", "{}", ts(2))];
        assert!(extract_tool_sequences(&calls, 3).is_empty());
        assert!(extract_tool_sequences(&[], 3).is_empty());
    }

    #[test]
    fn windows_follow_timestamp_order_not_input_order() {
        let calls = vec![
            call("Write", "{}", ts(30)),
            call("Read", "{}", ts(10)),
            call("Edit", "{}", ts(20)),
        ];
        let windows = extract_tool_sequences(&calls, 3);
        assert_eq!(windows, vec![vec!["Read", "Edit", "Write"]]);
    }

    #[test]
    fn missing_timestamps_sort_first() {
        let calls = vec![
            call("Edit", "{}", ts(5)),
            call("Read", "{}", None),
            call("Write", "{}", ts(6)),
        ];
        let windows = extract_tool_sequences(&calls, 3);
        assert_eq!(windows, vec![vec!["Read", "Edit", "Write"]]);
    }

    #[test]
    fn prefix_takes_leading_tokens_of_normalized_text() {
        assert_eq!(
            extract_prompt_prefix("Help me fix this bug in the parser", 5),
            "help me fix this bug"
        );
    }

    #[test]
    fn prefix_of_short_prompt_is_whole_prompt() {
        assert_eq!(extract_prompt_prefix("fix this", 5), "fix this");
    }

    #[test]
    fn zero_token_prefix_is_empty() {
        assert_eq!(extract_prompt_prefix("fix this bug now", 0), "");
    }

    #[test]
    fn phrase_ngrams_slide_over_words() {
        let phrases = extract_phrase_ngrams("please run the test suite again", 5);
        assert_eq!(
            phrases,
            vec![
                vec!["please", "run", "the", "test", "suite"],
                vec!["run", "the", "test", "suite", "again"],
            ]
        );
    }

    #[test]
    fn short_prompts_yield_no_phrases() {
        assert!(extract_phrase_ngrams("too short", 5).is_empty());
        assert!(extract_phrase_ngrams("", 5).is_empty());
    }
}
