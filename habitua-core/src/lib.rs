//! # habitua-core
//!
//! Core library for habitua - a pattern detection engine for recorded AI
//! coding-assistant sessions.
//!
//! This library provides:
//! - Domain types for sessions, messages, tool calls, and patterns
//! - A storage abstraction over session archives
//! - Detection pipelines for tool sequences, prompt prefixes, prompt
//!   phrases, and file access habits
//! - LLM-backed classification of detected patterns
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! Detection runs in five steps over a [`store::SessionStore`]:
//! - **Normalize:** raw tool calls and prompts become canonical keys
//! - **Extract:** sliding windows produce candidate n-grams
//! - **Aggregate:** candidates accumulate occurrences across sessions
//! - **Filter:** thresholds drop one-off noise
//! - **Merge:** overlapping tool sequences fuse into longer workflows
//!
//! ## Example
//!
//! ```rust,no_run
//! use habitua_core::{Config, MemoryStore, PatternDetector};
//!
//! // Load configuration
//! let config = Config::load().expect("failed to load config");
//!
//! // Detect patterns over an archive of recorded sessions
//! let store = MemoryStore::new();
//! let detector = PatternDetector::new(&store, config.detector.clone());
//! let report = detector.build_report().expect("detection failed");
//! println!("{} sessions analyzed", report.summary.total_sessions_analyzed);
//! ```

// Re-export commonly used items at the crate root
pub use classify::{ClassifiedPattern, ClassifierClient, PatternClassifier};
pub use config::Config;
pub use detect::{PatternDetector, PatternReport};
pub use error::{Error, Result};
pub use store::{MemoryStore, SessionStore};
pub use types::*;

// Public modules
pub mod classify;
pub mod config;
pub mod detect;
pub mod error;
pub mod logging;
pub mod store;
pub mod types;
