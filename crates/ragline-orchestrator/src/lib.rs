//! Ragline Query Orchestrator
//!
//! Entry point of the pipeline. A query moves through
//! `Received → Retrieving → Assembling → Generating → Completed`, or to
//! `Failed` from any non-terminal stage, and every stage emits one trace
//! record.
//!
//! # Guarantees
//!
//! - One request deadline spans all stages; retrieval also has a
//!   per-attempt limit and retries transient failures with backoff
//! - Cancelling the caller's token, or dropping a [`QueryStream`], stops
//!   every in-flight stage
//! - Evaluation is handed off without blocking; a full queue drops the job
//! - Failures carry a stable [`ErrorKind`](ragline_domain::ErrorKind) and
//!   never expose provider payloads
//!
//! # Examples
//!
//! ```
//! use ragline_llm::MockProvider;
//! use ragline_orchestrator::{QueryOrchestrator, QueryRequest, RaglineConfig};
//! use ragline_store::{HashingEmbeddingModel, MemoryIndex};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let orchestrator = QueryOrchestrator::from_config(
//!     &RaglineConfig::default(),
//!     Arc::new(HashingEmbeddingModel::new(64)),
//!     Arc::new(MockProvider::new("unused")),
//! )
//! .with_store("docs", Arc::new(MemoryIndex::new("docs")));
//!
//! // Nothing indexed, so the answer declines without calling the provider
//! let response = orchestrator
//!     .answer(QueryRequest::new("Where is Atlantis?"), &CancellationToken::new())
//!     .await
//!     .unwrap();
//! assert!(response.citations.is_empty());
//! assert_eq!(response.sources, Some(vec![]));
//! # });
//! ```

#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod error;
mod lifecycle;
pub mod orchestrator;
pub mod stream;

pub use api::{ErrorResponse, QueryEvent, QueryRequest, QueryResponse, Readiness, SourceDocument};
pub use config::{ConfigError, OrchestratorConfig, RaglineConfig};
pub use error::QueryFailure;
pub use orchestrator::QueryOrchestrator;
pub use stream::QueryStream;
