//! Ragline Domain Layer
//!
//! Core value types shared by every stage of the retrieval-augmented query
//! pipeline. This crate performs no I/O and depends only on `uuid` and
//! `serde`; infrastructure (index stores, providers, sinks) lives in the
//! other crates and speaks in these types.
//!
//! ## Key Concepts
//!
//! - **Query**: an immutable user question plus optional conversation history
//! - **EvidenceChunk**: a retrieved span of a source document with its score
//! - **AssembledContext**: the bounded, de-duplicated evidence given to the model
//! - **Answer**: generated text, validated citations and a finish reason
//! - **QueryState**: the per-request state machine
//!   (`Received → Retrieving → Assembling → Generating → Completed | Failed`)
//! - **TraceRecord**: one write-once observability record per stage entered
//! - **EvaluationResult**: offline quality scores for a finished answer
//! - **ErrorKind**: the stable, caller-visible error taxonomy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod answer;
pub mod chunk;
pub mod context;
pub mod error_kind;
pub mod evaluation;
pub mod query;
pub mod retry;
pub mod state;
pub mod time;
pub mod trace;
pub mod traits;

// Re-exports for convenience
pub use answer::{Answer, AnswerFragment, FinishReason};
pub use chunk::{EvidenceChunk, Metadata, MetadataFilter};
pub use context::AssembledContext;
pub use error_kind::ErrorKind;
pub use evaluation::{EvaluationResult, Metric};
pub use query::{ConversationTurn, Query, QueryId};
pub use retry::RetryPolicy;
pub use state::QueryState;
pub use trace::{AttributeValue, TraceRecord};
pub use traits::Retryable;
