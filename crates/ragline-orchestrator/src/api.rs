//! Caller-facing request and response types
//!
//! These are the types an HTTP layer would (de)serialise. They carry no
//! behaviour of their own.

use crate::QueryFailure;
use ragline_domain::{
    AssembledContext, ConversationTurn, ErrorKind, EvidenceChunk, FinishReason, Metadata,
    MetadataFilter, QueryId,
};
use ragline_store::IndexInfo;
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// An incoming question
///
/// # Examples
///
/// ```
/// use ragline_orchestrator::QueryRequest;
///
/// let request: QueryRequest = serde_json::from_str(r#"{"question": "what is RAG"}"#).unwrap();
/// assert!(request.include_sources);
/// assert!(!request.enable_evaluation);
/// assert!(request.history.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The question to answer
    pub question: String,

    /// Conversation this question belongs to, passed through to traces
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,

    /// Earlier turns, oldest first
    #[serde(default)]
    pub history: Vec<ConversationTurn>,

    /// Conjunctive metadata pre-filter
    #[serde(default)]
    pub filters: MetadataFilter,

    /// Chunks to retrieve; the configured default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,

    /// Include the evidence used in the response
    #[serde(default = "default_true")]
    pub include_sources: bool,

    /// Score this answer in the background
    #[serde(default)]
    pub enable_evaluation: bool,
}

impl QueryRequest {
    /// A plain question with default options
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            conversation_id: None,
            history: Vec::new(),
            filters: MetadataFilter::default(),
            top_k: None,
            include_sources: true,
            enable_evaluation: false,
        }
    }

    /// Set the conversation history
    pub fn with_history(mut self, history: Vec<ConversationTurn>) -> Self {
        self.history = history;
        self
    }

    /// Set the metadata filter
    pub fn with_filters(mut self, filters: MetadataFilter) -> Self {
        self.filters = filters;
        self
    }

    /// Ask for a specific number of chunks
    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = Some(k);
        self
    }

    /// Opt in to background evaluation
    pub fn with_evaluation(mut self, enabled: bool) -> Self {
        self.enable_evaluation = enabled;
        self
    }

    /// Opt in or out of sources in the response
    pub fn with_sources(mut self, include: bool) -> Self {
        self.include_sources = include;
        self
    }
}

/// Evidence reported back to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    /// Chunk identifier, as cited in the answer
    pub chunk_id: String,
    /// Owning document
    pub source_document_id: String,
    /// Chunk text
    pub content: String,
    /// Chunk metadata
    pub metadata: Metadata,
    /// Retrieval similarity
    pub score: f32,
}

impl From<&EvidenceChunk> for SourceDocument {
    fn from(chunk: &EvidenceChunk) -> Self {
        Self {
            chunk_id: chunk.chunk_id.clone(),
            source_document_id: chunk.source_document_id.clone(),
            content: chunk.text.clone(),
            metadata: chunk.metadata.clone(),
            score: chunk.embedding_score,
        }
    }
}

/// A completed answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Identifier shared with trace and evaluation records
    pub query_id: QueryId,
    /// The question as asked
    pub question: String,
    /// Answer text
    pub answer: String,
    /// Chunk ids cited by the answer, all present in `sources`' context
    pub citations: Vec<String>,
    /// Why generation stopped
    pub finish_reason: FinishReason,
    /// Evidence used, when requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<SourceDocument>>,
    /// Wall time from receipt to completion
    pub processing_time_ms: u64,
    /// Whether the token budget left evidence out
    pub truncated_context: bool,
}

impl QueryResponse {
    pub(crate) fn sources_from(context: &AssembledContext) -> Vec<SourceDocument> {
        context.chunks.iter().map(SourceDocument::from).collect()
    }
}

/// Stable error body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable snake_case kind, see [`ErrorKind`]
    pub error: String,
    /// Human-readable message
    pub message: String,
}

impl ErrorResponse {
    /// Build from a kind and message
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            error: kind.as_str().to_string(),
            message: message.into(),
        }
    }
}

/// One event of a streamed query
///
/// Streams yield `fragment` events and end with exactly one `completed` or
/// `failed` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryEvent {
    /// Next piece of answer text
    Fragment {
        /// 0-based, contiguous
        index: usize,
        /// Text of this piece
        text: String,
    },
    /// The answer is complete
    Completed {
        /// Full response, as `answer` would return it
        response: QueryResponse,
    },
    /// The query failed
    Failed {
        /// Stable error body
        error: ErrorResponse,
        /// Text streamed before the failure
        #[serde(default, skip_serializing_if = "Option::is_none")]
        partial_answer: Option<String>,
    },
}

impl QueryEvent {
    /// Whether this event ends the stream
    pub fn is_terminal(&self) -> bool {
        !matches!(self, QueryEvent::Fragment { .. })
    }

    pub(crate) fn failed(failure: &QueryFailure) -> Self {
        QueryEvent::Failed {
            error: failure.to_response(),
            partial_answer: failure.partial_answer.clone(),
        }
    }
}

/// Readiness report for health probes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Readiness {
    /// Whether queries can be served
    pub ready: bool,
    /// Whether every index store answered its health check
    pub index_healthy: bool,
    /// Description of each reachable index
    pub indexes: Vec<IndexInfo>,
}
