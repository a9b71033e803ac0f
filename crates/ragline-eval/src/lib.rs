//! Ragline Evaluation Harness
//!
//! Grades finished answers with a judge model on three metrics:
//! groundedness, relevance and faithfulness.
//!
//! # Usage
//!
//! - [`EvaluationHarness::score`] for one answer, [`EvaluationHarness::score_batch`]
//!   for offline runs
//! - [`EvaluationQueue`] + [`EvaluationWorker`] to score live traffic in the
//!   background; the request path only ever calls the non-blocking
//!   [`EvaluationQueue::offer`]
//! - [`EvaluationSink`]s receive results ([`JsonlEvaluationSink`],
//!   [`MemoryEvaluationSink`])
//!
//! # Examples
//!
//! ```
//! use ragline_domain::{Answer, AssembledContext, FinishReason, Query};
//! use ragline_eval::{EvaluationHarness, EvaluatorConfig};
//! use ragline_llm::MockProvider;
//! use std::sync::Arc;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let harness = EvaluationHarness::new(EvaluatorConfig::default(), Arc::new(MockProvider::new("0.8")));
//! let answer = Answer::new("I don't know.", vec![], FinishReason::Complete, 1);
//!
//! let result = harness
//!     .score(&Query::new("Where is Atlantis?"), &AssembledContext::empty(), &answer)
//!     .await
//!     .unwrap();
//! assert_eq!(result.relevance, 0.8);
//! # });
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod harness;
pub mod judge;
pub mod metrics;
pub mod sink;
pub mod worker;

pub use config::EvaluatorConfig;
pub use error::EvalError;
pub use harness::{EvaluationHarness, EvaluationJob};
pub use judge::{judge_prompt, parse_score};
pub use metrics::EvaluationMetrics;
pub use sink::{EvaluationSink, JsonlEvaluationSink, MemoryEvaluationSink};
pub use worker::{EvaluationQueue, EvaluationWorker};
