//! Query lifecycle states

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of a query in the orchestrator's state machine
///
/// ```text
/// Received → Retrieving → Assembling → Generating → Completed
///                 │                         │
///                 └──────────► Failed ◄─────┘
/// ```
///
/// `Completed` and `Failed` are terminal: no transition leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryState {
    /// Accepted, not yet dispatched
    Received,

    /// Embedding the question and searching the index
    Retrieving,

    /// Deduplicating and budgeting evidence
    Assembling,

    /// Waiting on the generation provider
    Generating,

    /// Answer delivered
    Completed,

    /// Ended with an error (including cancellation and timeouts)
    Failed,
}

impl QueryState {
    /// Get the state name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryState::Received => "received",
            QueryState::Retrieving => "retrieving",
            QueryState::Assembling => "assembling",
            QueryState::Generating => "generating",
            QueryState::Completed => "completed",
            QueryState::Failed => "failed",
        }
    }

    /// Parse a state from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "received" => Some(QueryState::Received),
            "retrieving" => Some(QueryState::Retrieving),
            "assembling" => Some(QueryState::Assembling),
            "generating" => Some(QueryState::Generating),
            "completed" => Some(QueryState::Completed),
            "failed" => Some(QueryState::Failed),
            _ => None,
        }
    }

    /// Whether no transition leaves this state
    pub fn is_terminal(&self) -> bool {
        matches!(self, QueryState::Completed | QueryState::Failed)
    }

    /// Whether `self → next` is an allowed transition
    pub fn can_transition_to(&self, next: QueryState) -> bool {
        use QueryState::*;
        matches!(
            (self, next),
            (Received, Retrieving)
                | (Retrieving, Assembling)
                | (Retrieving, Failed)
                | (Assembling, Generating)
                | (Generating, Completed)
                | (Generating, Failed)
        )
    }
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for QueryState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid query state: {}", s))
    }
}
