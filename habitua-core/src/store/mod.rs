//! Session storage interface
//!
//! The engine never talks to a concrete backend. It consumes sessions,
//! messages, and tool calls through [`SessionStore`], so any archive
//! (SQLite, JSONL import, a test fixture) can drive detection by
//! implementing four queries.

pub mod memory;

pub use memory::MemoryStore;

use crate::error::Result;
use crate::types::{Message, Session, ToolCall};

/// Read access to a session archive.
///
/// Backends are fallible; errors propagate to the caller rather than being
/// absorbed by the detection pipelines.
pub trait SessionStore: Send + Sync {
    /// All sessions in the archive.
    fn get_all_sessions(&self) -> Result<Vec<Session>>;

    /// Sessions recorded against one project.
    fn get_sessions_by_project(&self, project: &str) -> Result<Vec<Session>>;

    /// Tool calls for one session, in stored order.
    fn get_session_tool_calls(&self, session_id: &str) -> Result<Vec<ToolCall>>;

    /// Messages for one session, in stored order.
    fn get_session_messages(&self, session_id: &str) -> Result<Vec<Message>>;
}
