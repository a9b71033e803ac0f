//! Ragline Context Assembler
//!
//! Turns ranked evidence into the bounded context handed to the model.
//!
//! # Pipeline
//!
//! ```text
//! ranked chunks → deduplicate → greedy token budget → AssembledContext
//! ```
//!
//! - **Deduplication** drops repeated chunk ids and near-identical chunks of
//!   the same document, keeping the highest-scoring instance.
//! - **Budgeting** includes survivors in rank order and stops at the first
//!   chunk that would overflow the budget.
//!
//! Assembly is pure: the same input always gives the same context.

#![warn(missing_docs)]

pub mod assembler;
pub mod config;
pub mod dedup;
pub mod tokens;

pub use assembler::{AssemblyStats, ContextAssembler};
pub use config::{AssemblerConfig, TokenizerKind};
pub use dedup::{deduplicate, text_similarity};
pub use tokens::{CharRatioCounter, TokenCounter, WordCounter};
