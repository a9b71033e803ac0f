//! LLM-as-judge scoring

use crate::judge::{judge_prompt, parse_score};
use crate::{EvalError, EvaluatorConfig};
use futures::stream::{self, StreamExt};
use ragline_domain::time::now_millis;
use ragline_domain::{Answer, AssembledContext, EvaluationResult, Metric, Query, Retryable};
use ragline_llm::GenerationProvider;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::timeout;

/// Everything needed to score one finished answer
#[derive(Debug, Clone)]
pub struct EvaluationJob {
    /// The question
    pub query: Query,
    /// Evidence the answer was generated from
    pub context: AssembledContext,
    /// The answer to grade
    pub answer: Answer,
}

impl EvaluationJob {
    /// Bundle a query, its context and its answer
    pub fn new(query: Query, context: AssembledContext, answer: Answer) -> Self {
        Self {
            query,
            context,
            answer,
        }
    }
}

/// Scores answers with a judge model
///
/// Never part of the live request path; callers reach it through an
/// [`EvaluationQueue`](crate::EvaluationQueue) or in batch.
#[derive(Clone)]
pub struct EvaluationHarness {
    config: EvaluatorConfig,
    judge: Arc<dyn GenerationProvider>,
}

impl EvaluationHarness {
    /// Create a harness around a judge provider
    pub fn new(config: EvaluatorConfig, judge: Arc<dyn GenerationProvider>) -> Self {
        Self { config, judge }
    }

    /// Get the configuration
    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Name of the judge model
    pub fn judge_model(&self) -> &str {
        self.judge.model_name()
    }

    /// Score one answer on every metric
    ///
    /// The three judge calls run concurrently; the first failure fails the
    /// whole evaluation.
    pub async fn score(
        &self,
        query: &Query,
        context: &AssembledContext,
        answer: &Answer,
    ) -> Result<EvaluationResult, EvalError> {
        let started = Instant::now();

        let (groundedness, relevance, faithfulness) = tokio::try_join!(
            self.judge_metric(Metric::Groundedness, judge_prompt(Metric::Groundedness, query, context, answer)),
            self.judge_metric(Metric::Relevance, judge_prompt(Metric::Relevance, query, context, answer)),
            self.judge_metric(Metric::Faithfulness, judge_prompt(Metric::Faithfulness, query, context, answer)),
        )?;

        let elapsed = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let result = EvaluationResult::new(
            query.id,
            groundedness,
            relevance,
            faithfulness,
            now_millis(),
            elapsed,
        );

        if self.config.log_results {
            tracing::info!(
                query_id = %result.query_id,
                groundedness = result.groundedness,
                relevance = result.relevance,
                faithfulness = result.faithfulness,
                evaluation_time_ms = result.evaluation_time_ms,
                "Evaluation completed"
            );
        }
        Ok(result)
    }

    /// Score a job
    pub async fn score_job(&self, job: &EvaluationJob) -> Result<EvaluationResult, EvalError> {
        self.score(&job.query, &job.context, &job.answer).await
    }

    /// Score many jobs, up to `batch_concurrency` at a time
    ///
    /// Results come back in input order.
    pub async fn score_batch(&self, jobs: &[EvaluationJob]) -> Vec<Result<EvaluationResult, EvalError>> {
        stream::iter(jobs)
            .map(|job| self.score_job(job))
            .buffered(self.config.batch_concurrency.max(1))
            .collect()
            .await
    }

    /// One judge call with timeout and retries
    async fn judge_metric(&self, metric: Metric, prompt: String) -> Result<f64, EvalError> {
        let policy = &self.config.retry;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let reply = match timeout(self.config.judge_timeout(), self.judge.complete(&prompt)).await {
                Err(_) => {
                    return Err(EvalError::JudgeTimeout {
                        metric,
                        timeout_ms: self.config.judge_timeout_ms,
                    })
                }
                Ok(Ok(reply)) => reply,
                Ok(Err(e)) if e.is_transient() && policy.allows_retry_after(attempt) => {
                    let delay = policy.delay_after(attempt);
                    tracing::debug!(%metric, attempt, delay_ms = delay.as_millis() as u64, error = %e, "Retrying judge");
                    tokio::time::sleep(delay).await;
                    continue;
                }
                Ok(Err(e)) => {
                    return Err(EvalError::Judge {
                        metric,
                        attempts: attempt,
                        message: e.to_string(),
                    })
                }
            };

            return parse_score(&reply).ok_or_else(|| EvalError::UnparseableScore {
                metric,
                reply: reply.chars().take(80).collect(),
            });
        }
    }
}
