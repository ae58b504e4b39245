//! In-memory session archive
//!
//! A [`MemoryStore`] holds a materialized snapshot of sessions, messages,
//! and tool calls. It backs every test in this crate and serves callers
//! that assemble sessions from some external source before running
//! detection.

use std::collections::HashMap;

use crate::error::Result;
use crate::store::SessionStore;
use crate::types::{Message, Session, ToolCall};

/// Snapshot-backed [`SessionStore`] implementation.
///
/// Rows are returned in insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: Vec<Session>,
    messages: HashMap<String, Vec<Message>>,
    tool_calls: HashMap<String, Vec<ToolCall>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session to the snapshot.
    pub fn insert_session(&mut self, session: Session) {
        self.sessions.push(session);
    }

    /// Add a message under its session.
    pub fn insert_message(&mut self, message: Message) {
        self.messages
            .entry(message.session_id.clone())
            .or_default()
            .push(message);
    }

    /// Add a tool call under its session.
    pub fn insert_tool_call(&mut self, call: ToolCall) {
        self.tool_calls
            .entry(call.session_id.clone())
            .or_default()
            .push(call);
    }

    /// Number of sessions in the snapshot.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

impl SessionStore for MemoryStore {
    fn get_all_sessions(&self) -> Result<Vec<Session>> {
        Ok(self.sessions.clone())
    }

    fn get_sessions_by_project(&self, project: &str) -> Result<Vec<Session>> {
        Ok(self
            .sessions
            .iter()
            .filter(|s| s.project == project)
            .cloned()
            .collect())
    }

    fn get_session_tool_calls(&self, session_id: &str) -> Result<Vec<ToolCall>> {
        Ok(self.tool_calls.get(session_id).cloned().unwrap_or_default())
    }

    fn get_session_messages(&self, session_id: &str) -> Result<Vec<Message>> {
        Ok(self.messages.get(session_id).cloned().unwrap_or_default())
    }
}
