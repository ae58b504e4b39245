//! Pattern detection
//!
//! The detection layer turns a session archive into a report of recurring
//! behaviors. It is organized as a small pipeline:
//!
//! 1. [`normalize`] folds noisy raw records into canonical keys
//! 2. [`ngram`] reduces sessions to fixed-length windows
//! 3. [`detector`] aggregates windows across sessions and applies the
//!    occurrence/session thresholds
//! 4. [`merge`] fuses overlapping tool sequences into longer workflows
//! 5. [`report`] assembles the serializable result
//!
//! Everything is synchronous and deterministic: the same archive and
//! configuration always produce the same patterns in the same order.

pub mod detector;
pub mod merge;
pub mod ngram;
pub mod normalize;
pub mod report;

pub use detector::{DetectedPatterns, PatternDetector};
pub use merge::{merge_overlapping_sequences, SEQUENCE_SEPARATOR};
pub use ngram::{extract_phrase_ngrams, extract_prompt_prefix, extract_tool_sequences};
pub use normalize::{
    normalize_command, normalize_file_path, normalize_prompt, normalize_tool_name,
    SUBCOMMAND_TOOLS,
};
pub use report::{PatternCounts, PatternReport, PatternSet, ReportSummary};
