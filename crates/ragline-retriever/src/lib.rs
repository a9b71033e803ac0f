//! Ragline Retriever
//!
//! Turns a question into ranked evidence: the question is embedded once,
//! every configured index is searched concurrently, and the merged hits are
//! put into a canonical order that depends only on the hit set.
//!
//! # Ordering
//!
//! 1. Similarity score, descending
//! 2. Document recency, newer first (unknown dates sort as oldest)
//! 3. Chunk id, lexicographic
//!
//! Ranks are assigned 1..n after truncation to `k`.
//!
//! The retriever makes a single attempt. Retry and timeout policy belong to
//! the caller, which can ask the returned error whether it is transient.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod retriever;

pub use config::RetrieverConfig;
pub use error::RetrieverError;
pub use retriever::{sort_evidence, Retriever};
