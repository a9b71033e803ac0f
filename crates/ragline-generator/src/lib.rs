//! Ragline Generation Coordinator
//!
//! Turns a question plus assembled context into a grounded answer.
//!
//! # Responsibilities
//!
//! - Build the prompt deterministically (instructions, history, tagged
//!   context, question)
//! - Call the provider under a timeout, retrying transient failures with
//!   exponential backoff
//! - Stream fragments in order, stopping the provider as soon as the
//!   consumer cancels or goes away
//! - Keep only citations that point into the assembled context
//!
//! # Examples
//!
//! ```
//! use ragline_domain::{AssembledContext, EvidenceChunk, Query};
//! use ragline_generator::{GenerationCoordinator, GeneratorConfig};
//! use ragline_llm::MockProvider;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let provider = Arc::new(MockProvider::new("Paris [source:c1] [source:c9]"));
//! let coordinator = GenerationCoordinator::new(GeneratorConfig::default(), provider);
//!
//! let ctx = AssembledContext {
//!     chunks: vec![EvidenceChunk::new("c1", "geo", "Paris is the capital of France.", 0.9)],
//!     total_token_count: 8,
//!     truncated: false,
//! };
//! let answer = coordinator
//!     .generate(&Query::new("What is the capital of France?"), &ctx, &CancellationToken::new())
//!     .await
//!     .unwrap();
//!
//! assert_eq!(answer.citations(), ["c1".to_string()]);
//! # });
//! ```

#![warn(missing_docs)]

pub mod citations;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod prompt;
pub mod stream;

pub use citations::{extract_citations, validate_citations};
pub use config::{EmptyContextPolicy, GeneratorConfig, DEFAULT_DECLINE_MESSAGE};
pub use coordinator::GenerationCoordinator;
pub use error::GeneratorError;
pub use prompt::PromptBuilder;
pub use stream::{AnswerStream, StreamEvent};
