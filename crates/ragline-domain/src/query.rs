//! Query module - the unit of work flowing through the pipeline

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::time::now_millis;

/// Unique identifier for a query based on UUIDv7
///
/// UUIDv7 gives chronological sortability, so trace and evaluation records
/// keyed by query id can be ordered by issue time without a second column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct QueryId(u128);

impl QueryId {
    /// Generate a new UUIDv7-based QueryId
    ///
    /// # Examples
    ///
    /// ```
    /// use ragline_domain::QueryId;
    ///
    /// let id = QueryId::new();
    /// assert!(id.value() > 0);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create a QueryId from a raw u128 value
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse a QueryId from its hyphenated string form
    ///
    /// # Examples
    ///
    /// ```
    /// use ragline_domain::QueryId;
    ///
    /// let id = QueryId::new();
    /// let parsed = QueryId::from_string(&id.to_string()).unwrap();
    /// assert_eq!(id, parsed);
    /// ```
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid query id '{}': {}", s, e))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }

    /// Millisecond timestamp embedded in the UUIDv7 (top 48 bits)
    pub fn timestamp(&self) -> u64 {
        (self.0 >> 80) as u64
    }
}

impl Default for QueryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

impl From<QueryId> for String {
    fn from(id: QueryId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for QueryId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        QueryId::from_string(&value)
    }
}

/// One prior question/answer exchange in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// The user's earlier question
    pub question: String,
    /// The answer that was given
    pub answer: String,
}

impl ConversationTurn {
    /// Create a new turn
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// An incoming question
///
/// Created once per request and never mutated afterwards; every stage
/// borrows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Unique identifier
    pub id: QueryId,

    /// The question text
    pub text: String,

    /// Conversation the question belongs to, if the caller tracks one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,

    /// Prior turns, oldest first
    #[serde(default)]
    pub history: Vec<ConversationTurn>,

    /// When the query was issued (Unix milliseconds)
    pub issued_at: u64,
}

impl Query {
    /// Create a query with a fresh id and no history
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: QueryId::new(),
            text: text.into(),
            conversation_id: None,
            history: Vec::new(),
            issued_at: now_millis(),
        }
    }

    /// Attach conversation history (oldest turn first)
    pub fn with_history(mut self, history: Vec<ConversationTurn>) -> Self {
        self.history = history;
        self
    }

    /// Attach a conversation id
    pub fn with_conversation_id(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    /// The most recent `n` turns of history, oldest first
    pub fn recent_history(&self, n: usize) -> &[ConversationTurn] {
        let start = self.history.len().saturating_sub(n);
        &self.history[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_id_chronological() {
        let id1 = QueryId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = QueryId::new();

        assert!(id1 < id2);
        assert!(id1.timestamp() <= id2.timestamp());
    }

    #[test]
    fn test_query_id_invalid_string() {
        assert!(QueryId::from_string("not-a-uuid").is_err());
        assert!(QueryId::from_string("").is_err());
    }

    #[test]
    fn test_query_id_serializes_as_string() {
        let id = QueryId::from_value(42);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));

        let back: QueryId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_recent_history_window() {
        let query = Query::new("q").with_history(vec![
            ConversationTurn::new("a", "1"),
            ConversationTurn::new("b", "2"),
            ConversationTurn::new("c", "3"),
        ]);

        let recent = query.recent_history(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].question, "b");
        assert_eq!(recent[1].question, "c");

        assert_eq!(query.recent_history(10).len(), 3);
        assert!(query.recent_history(0).is_empty());
    }

    #[test]
    fn test_query_builder() {
        let query = Query::new("What is RAG?").with_conversation_id("conv-1");
        assert_eq!(query.text, "What is RAG?");
        assert_eq!(query.conversation_id.as_deref(), Some("conv-1"));
        assert!(query.history.is_empty());
        assert!(query.issued_at > 0);
    }
}
