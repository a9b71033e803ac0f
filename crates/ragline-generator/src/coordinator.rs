//! Generation coordination: retries, timeouts, streaming, citations

use crate::citations::{extract_citations, validate_citations};
use crate::stream::{AnswerStream, StreamEvent};
use crate::{EmptyContextPolicy, GeneratorConfig, GeneratorError, PromptBuilder};
use futures::StreamExt;
use ragline_domain::{
    AnswerFragment, Answer, AssembledContext, FinishReason, Query, Retryable,
};
use ragline_llm::{FragmentStream, GenerationProvider, LlmError};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

type EventSender = mpsc::Sender<Result<StreamEvent, GeneratorError>>;

/// How the first pull of a freshly opened provider stream went
enum Opening {
    Fragment(String),
    Ended,
}

/// Coordinates one provider on behalf of many queries
///
/// Cheap to clone; the provider is shared.
#[derive(Clone)]
pub struct GenerationCoordinator {
    config: GeneratorConfig,
    provider: Arc<dyn GenerationProvider>,
    prompts: PromptBuilder,
}

impl GenerationCoordinator {
    /// Create a coordinator for `provider`
    pub fn new(config: GeneratorConfig, provider: Arc<dyn GenerationProvider>) -> Self {
        let prompts = PromptBuilder::new(config.decline_message.clone(), config.max_history_turns);
        Self {
            config,
            provider,
            prompts,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Name of the underlying model
    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Prompt for `query`, or `None` when the empty-context policy declines
    fn prompt_for(&self, query: &Query, context: &AssembledContext) -> Option<String> {
        if !context.is_empty() {
            return Some(self.prompts.build(query, context));
        }
        match self.config.empty_context {
            EmptyContextPolicy::Decline => None,
            EmptyContextPolicy::GeneralKnowledge => Some(self.prompts.build_general(query)),
        }
    }

    /// Generate a complete answer
    ///
    /// # Errors
    ///
    /// - [`GeneratorError::Timeout`] when an attempt exceeds `timeout_ms`
    /// - [`GeneratorError::Unavailable`] when transient failures exhaust the
    ///   retry policy
    /// - [`GeneratorError::Rejected`] on a non-transient provider failure
    /// - [`GeneratorError::Cancelled`] when `cancel` fires
    pub async fn generate(
        &self,
        query: &Query,
        context: &AssembledContext,
        cancel: &CancellationToken,
    ) -> Result<Answer, GeneratorError> {
        let started = Instant::now();

        let Some(prompt) = self.prompt_for(query, context) else {
            debug!(query_id = %query.id, "Empty context, declining");
            return Ok(self.decline(started));
        };

        let provider = Arc::clone(&self.provider);
        let (text, _) = self
            .with_retries(cancel, || {
                let provider = Arc::clone(&provider);
                let prompt = prompt.clone();
                async move { provider.complete(&prompt).await }
            })
            .await?;

        let (text, finish_reason) = match self.config.max_answer_chars {
            Some(limit) if text.chars().count() > limit => {
                (text.chars().take(limit).collect(), FinishReason::Truncated)
            }
            _ => (text, FinishReason::Complete),
        };

        Ok(self.finish(query, context, text, finish_reason, started))
    }

    /// Start a streamed answer
    ///
    /// Production runs on a spawned task and stops as soon as `cancel`
    /// fires or the returned stream is dropped. Retries only happen before
    /// the first fragment is delivered.
    pub fn generate_stream(
        &self,
        query: Query,
        context: AssembledContext,
        cancel: CancellationToken,
    ) -> AnswerStream {
        let (sender, receiver) = mpsc::channel(self.config.stream_buffer.max(1));
        let token = cancel.child_token();
        let stream = AnswerStream::new(receiver, token.clone().drop_guard());

        let coordinator = self.clone();
        tokio::spawn(async move {
            coordinator.produce(query, context, token, sender).await;
        });
        stream
    }

    async fn produce(
        self,
        query: Query,
        context: AssembledContext,
        cancel: CancellationToken,
        sender: EventSender,
    ) {
        let started = Instant::now();

        let Some(prompt) = self.prompt_for(&query, &context) else {
            let answer = self.decline(started);
            let fragment = AnswerFragment {
                index: 0,
                text: answer.text().to_string(),
            };
            if deliver(&sender, &cancel, Ok(StreamEvent::Fragment(fragment))).await {
                deliver(&sender, &cancel, Ok(StreamEvent::Finished(answer))).await;
            }
            return;
        };

        let provider = Arc::clone(&self.provider);
        let opened = self
            .with_retries(&cancel, || {
                let provider = Arc::clone(&provider);
                let prompt = prompt.clone();
                async move { open_stream(provider.as_ref(), &prompt).await }
            })
            .await;

        let ((mut fragments, opening), deadline) = match opened {
            Ok(opened) => opened,
            Err(e) => {
                deliver(&sender, &cancel, Err(e)).await;
                return;
            }
        };

        let mut text = String::new();
        let mut index = 0usize;
        let mut finish_reason = FinishReason::Complete;
        let mut next = match opening {
            Opening::Fragment(piece) => Some(piece),
            Opening::Ended => None,
        };

        while let Some(piece) = next.take() {
            let (piece, cut) = self.clip(&text, piece);
            if !piece.is_empty() {
                text.push_str(&piece);
                let fragment = AnswerFragment { index, text: piece };
                if !deliver(&sender, &cancel, Ok(StreamEvent::Fragment(fragment))).await {
                    debug!(query_id = %query.id, fragments = index, "Consumer gone, stopping generation");
                    return;
                }
                index += 1;
            }
            if cut {
                finish_reason = FinishReason::Truncated;
                break;
            }

            next = match self.pull(&mut fragments, &cancel, deadline).await {
                Ok(next) => next,
                Err(e) => {
                    warn!(query_id = %query.id, error = %e, fragments = index, "Stream ended early");
                    deliver(&sender, &cancel, Err(e)).await;
                    return;
                }
            };
        }
        drop(fragments);

        let answer = self.finish(&query, &context, text, finish_reason, started);
        deliver(&sender, &cancel, Ok(StreamEvent::Finished(answer))).await;
    }

    /// Pull the next provider fragment under the attempt deadline
    async fn pull(
        &self,
        fragments: &mut FragmentStream,
        cancel: &CancellationToken,
        deadline: Instant,
    ) -> Result<Option<String>, GeneratorError> {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GeneratorError::Cancelled),
            next = timeout_at(deadline, fragments.next()) => next,
        };
        match next {
            Err(_) => Err(GeneratorError::Timeout {
                timeout_ms: self.config.timeout_ms,
            }),
            Ok(None) => Ok(None),
            Ok(Some(Ok(piece))) => Ok(Some(piece)),
            Ok(Some(Err(e))) => Err(classify(e, 1)),
        }
    }

    /// Cut `piece` so the answer stays within `max_answer_chars`
    fn clip(&self, so_far: &str, piece: String) -> (String, bool) {
        let Some(limit) = self.config.max_answer_chars else {
            return (piece, false);
        };
        let remaining = limit.saturating_sub(so_far.chars().count());
        if piece.chars().count() <= remaining {
            (piece, false)
        } else {
            (piece.chars().take(remaining).collect(), true)
        }
    }

    /// Run `attempt` under the retry policy
    ///
    /// Each attempt gets its own `timeout_ms` deadline, which is returned
    /// with the successful value. Timeouts are never retried; backoff sleeps
    /// end early on cancellation.
    async fn with_retries<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut attempt_fn: F,
    ) -> Result<(T, Instant), GeneratorError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let policy = &self.config.retry;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let deadline = Instant::now() + self.config.timeout();

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(GeneratorError::Cancelled),
                outcome = timeout_at(deadline, attempt_fn()) => outcome,
            };

            let error = match outcome {
                Ok(Ok(value)) => return Ok((value, deadline)),
                Ok(Err(e)) => e,
                Err(_) => {
                    warn!(attempt, timeout_ms = self.config.timeout_ms, "Generation attempt timed out");
                    return Err(GeneratorError::Timeout {
                        timeout_ms: self.config.timeout_ms,
                    });
                }
            };

            if !error.is_transient() || !policy.allows_retry_after(attempt) {
                warn!(attempt, error = %error, "Generation failed");
                return Err(classify(error, attempt));
            }

            let delay = policy.delay_after(attempt);
            info!(attempt, delay_ms = delay.as_millis() as u64, error = %error, "Retrying generation");
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(GeneratorError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    fn decline(&self, started: Instant) -> Answer {
        Answer::new(
            self.config.decline_message.clone(),
            Vec::new(),
            FinishReason::Complete,
            elapsed_ms(started),
        )
    }

    /// Validate citations and freeze the answer
    fn finish(
        &self,
        query: &Query,
        context: &AssembledContext,
        text: String,
        finish_reason: FinishReason,
        started: Instant,
    ) -> Answer {
        let (citations, dropped) = validate_citations(extract_citations(&text), context);
        if !dropped.is_empty() {
            warn!(query_id = %query.id, dropped = ?dropped, "Dropped citations outside the context");
        }
        let answer = Answer::new(text, citations, finish_reason, elapsed_ms(started));
        debug!(
            query_id = %query.id,
            chars = answer.text().len(),
            citations = answer.citations().len(),
            finish_reason = %answer.finish_reason(),
            latency_ms = answer.latency_ms(),
            "Answer generated"
        );
        answer
    }
}

/// Open a provider stream and wait for its first item
async fn open_stream(
    provider: &dyn GenerationProvider,
    prompt: &str,
) -> Result<(FragmentStream, Opening), LlmError> {
    let mut fragments = provider.complete_stream(prompt).await?;
    match fragments.next().await {
        Some(Ok(piece)) => Ok((fragments, Opening::Fragment(piece))),
        Some(Err(e)) => Err(e),
        None => Ok((fragments, Opening::Ended)),
    }
}

fn classify(error: LlmError, attempts: u32) -> GeneratorError {
    if error.is_transient() {
        GeneratorError::Unavailable {
            attempts,
            message: error.to_string(),
        }
    } else {
        GeneratorError::Rejected(error.to_string())
    }
}

/// Send an event unless the consumer cancelled or went away
async fn deliver(
    sender: &EventSender,
    cancel: &CancellationToken,
    event: Result<StreamEvent, GeneratorError>,
) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        sent = sender.send(event) => sent.is_ok(),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
