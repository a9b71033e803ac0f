//! The query pipeline

use crate::api::{QueryEvent, QueryRequest, QueryResponse, Readiness};
use crate::lifecycle::{Attributes, Lifecycle};
use crate::stream::QueryStream;
use crate::{OrchestratorConfig, QueryFailure, RaglineConfig};
use ragline_assembler::ContextAssembler;
use ragline_domain::{
    Answer, AssembledContext, ErrorKind, EvidenceChunk, MetadataFilter, Query, QueryState,
    Retryable,
};
use ragline_eval::{EvaluationJob, EvaluationQueue};
use ragline_generator::{GenerationCoordinator, StreamEvent};
use ragline_llm::GenerationProvider;
use ragline_retriever::Retriever;
use ragline_store::{EmbeddingModel, IndexStore};
use ragline_trace::{NoopTraceSink, TraceSink};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{sleep, sleep_until, timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// One query in flight
struct Run {
    query: Query,
    started: Instant,
    deadline: Instant,
    lifecycle: Lifecycle,
}

/// Drives queries through retrieval, assembly and generation
///
/// Cheap to clone; every clone shares the same stores, providers and sinks.
/// Each query runs independently; nothing mutable is shared between
/// queries.
#[derive(Clone)]
pub struct QueryOrchestrator {
    config: OrchestratorConfig,
    retriever: Retriever,
    assembler: Arc<ContextAssembler>,
    generator: GenerationCoordinator,
    trace: Arc<dyn TraceSink>,
    evaluation: Option<EvaluationQueue>,
}

impl QueryOrchestrator {
    /// Assemble an orchestrator from its stages
    pub fn new(
        config: OrchestratorConfig,
        retriever: Retriever,
        assembler: ContextAssembler,
        generator: GenerationCoordinator,
    ) -> Self {
        Self {
            config,
            retriever,
            assembler: Arc::new(assembler),
            generator,
            trace: Arc::new(NoopTraceSink),
            evaluation: None,
        }
    }

    /// Build every stage from one configuration document
    ///
    /// Index stores are attached afterwards with [`Self::with_store`].
    pub fn from_config(
        config: &RaglineConfig,
        embedder: Arc<dyn EmbeddingModel>,
        provider: Arc<dyn GenerationProvider>,
    ) -> Self {
        Self::new(
            config.orchestrator.clone(),
            Retriever::new(config.retrieval.clone(), embedder),
            ContextAssembler::new(config.assembly.clone()),
            GenerationCoordinator::new(config.generation.clone(), provider),
        )
    }

    /// Attach an index store
    pub fn with_store(mut self, name: impl Into<String>, store: Arc<dyn IndexStore>) -> Self {
        self.retriever = self.retriever.with_store(name, store);
        self
    }

    /// Send trace records to `sink`
    pub fn with_trace_sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.trace = sink;
        self
    }

    /// Offer completed answers that asked for evaluation to `queue`
    pub fn with_evaluation_queue(mut self, queue: EvaluationQueue) -> Self {
        self.evaluation = Some(queue);
        self
    }

    /// Get the configuration
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Check a request and turn it into a [`Query`]
    ///
    /// # Errors
    ///
    /// [`ErrorKind::InvalidQuery`](ragline_domain::ErrorKind::InvalidQuery)
    /// when the question is blank or too long, or `top_k` is 0.
    pub fn validate_request(&self, request: &QueryRequest) -> Result<Query, QueryFailure> {
        let question = request.question.trim();
        if question.is_empty() {
            return Err(QueryFailure::invalid("Question cannot be empty"));
        }
        if question.chars().count() > self.config.max_question_chars {
            return Err(QueryFailure::invalid(format!(
                "Question exceeds {} characters",
                self.config.max_question_chars
            )));
        }
        if request.top_k == Some(0) {
            return Err(QueryFailure::invalid("top_k must be greater than 0"));
        }

        let mut query = Query::new(question).with_history(request.history.clone());
        if let Some(conversation_id) = &request.conversation_id {
            query = query.with_conversation_id(conversation_id.clone());
        }
        Ok(query)
    }

    /// Answer a question
    ///
    /// # Errors
    ///
    /// Returns a [`QueryFailure`] whose `kind` says which stage failed.
    pub async fn answer(
        &self,
        request: QueryRequest,
        cancel: &CancellationToken,
    ) -> Result<QueryResponse, QueryFailure> {
        let query = self.validate_request(&request)?;
        let mut run = self.begin(query);

        let context = self.prepare(&mut run, &request, cancel).await?;

        let generation_cancel = cancel.child_token();
        let _stop_generation = generation_cancel.clone().drop_guard();
        let outcome = self
            .race(
                cancel,
                run.deadline,
                self.generator.generate(&run.query, &context, &generation_cancel),
            )
            .await
            .and_then(|generated| generated.map_err(|e| QueryFailure::from_generation(&e)));

        match outcome {
            Ok(answer) => Ok(self.finish(&mut run, &request, context, answer)),
            Err(failure) => {
                self.fail(&mut run, vec![], &failure);
                Err(failure)
            }
        }
    }

    /// Answer a question as a stream of events
    ///
    /// The pipeline runs on a spawned task. Cancelling `cancel` or dropping
    /// the returned stream stops it and the query fails as cancelled.
    ///
    /// # Errors
    ///
    /// Invalid requests are rejected here, before anything is spawned.
    pub fn answer_stream(
        &self,
        request: QueryRequest,
        cancel: CancellationToken,
    ) -> Result<QueryStream, QueryFailure> {
        let query = self.validate_request(&request)?;
        let (sender, receiver) = mpsc::channel(self.config.stream_buffer.max(1));
        let token = cancel.child_token();
        let stream = QueryStream::new(query.id, receiver, token.clone().drop_guard());

        let orchestrator = self.clone();
        tokio::spawn(async move {
            orchestrator.run_stream(query, request, token, sender).await;
        });
        Ok(stream)
    }

    /// Report whether queries can be served
    pub async fn readiness(&self) -> Readiness {
        let (index_healthy, indexes) =
            tokio::join!(self.retriever.health_check(), self.retriever.index_info());
        Readiness {
            ready: index_healthy,
            index_healthy,
            indexes,
        }
    }

    fn begin(&self, query: Query) -> Run {
        info!(
            query_id = %query.id,
            question_chars = query.text.chars().count(),
            history_turns = query.history.len(),
            "Query received"
        );
        let started = Instant::now();
        Run {
            lifecycle: Lifecycle::start(query.id, Arc::clone(&self.trace)),
            query,
            started,
            deadline: started + self.config.request_timeout(),
        }
    }

    /// Retrieving and Assembling; leaves the query in Generating
    async fn prepare(
        &self,
        run: &mut Run,
        request: &QueryRequest,
        cancel: &CancellationToken,
    ) -> Result<AssembledContext, QueryFailure> {
        run.lifecycle.advance(
            QueryState::Retrieving,
            vec![
                ("question_chars", run.query.text.chars().count().into()),
                ("history_turns", run.query.history.len().into()),
            ],
        );

        let k = self.retriever.config().effective_k(request.top_k);
        let mut attempts = 0u32;
        let retrieved = self
            .retrieve_with_retries(
                &run.query,
                k,
                &request.filters,
                cancel,
                run.deadline,
                &mut attempts,
            )
            .await;
        let chunks = match retrieved {
            Ok(chunks) => chunks,
            Err(failure) => {
                self.fail(run, vec![("attempts", attempts.into()), ("k", k.into())], &failure);
                return Err(failure);
            }
        };

        run.lifecycle.advance(
            QueryState::Assembling,
            vec![
                ("attempts", attempts.into()),
                ("k", k.into()),
                ("chunks_retrieved", chunks.len().into()),
            ],
        );

        let (context, stats) = self.assembler.assemble_configured(&chunks);
        debug!(
            query_id = %run.query.id,
            chunks_used = context.len(),
            tokens = context.total_token_count,
            truncated = context.truncated,
            "Context assembled"
        );

        run.lifecycle.advance(
            QueryState::Generating,
            vec![
                ("chunks_used", context.len().into()),
                ("tokens", context.total_token_count.into()),
                ("truncated", context.truncated.into()),
                ("duplicates_removed", stats.duplicates_removed.into()),
                ("dropped_by_budget", stats.dropped_by_budget.into()),
            ],
        );
        Ok(context)
    }

    /// Retrieval under the per-attempt timeout and the retry policy
    async fn retrieve_with_retries(
        &self,
        query: &Query,
        k: usize,
        filters: &MetadataFilter,
        cancel: &CancellationToken,
        deadline: Instant,
        attempts: &mut u32,
    ) -> Result<Vec<EvidenceChunk>, QueryFailure> {
        let policy = &self.config.retrieval_retry;
        loop {
            *attempts += 1;
            let attempt = *attempts;

            let outcome = self
                .race(
                    cancel,
                    deadline,
                    timeout(
                        self.config.retrieval_timeout(),
                        self.retriever.retrieve(&query.text, k, filters),
                    ),
                )
                .await?;

            let failure = match outcome {
                Ok(Ok(chunks)) => {
                    debug!(query_id = %query.id, attempt, chunks = chunks.len(), "Retrieved");
                    return Ok(chunks);
                }
                Ok(Err(e)) if !e.is_transient() => {
                    warn!(query_id = %query.id, attempt, error = %e, "Retrieval failed");
                    return Err(QueryFailure::from_retrieval(&e, attempt));
                }
                Ok(Err(e)) => {
                    warn!(query_id = %query.id, attempt, error = %e, "Retrieval attempt failed");
                    QueryFailure::from_retrieval(&e, attempt)
                }
                Err(_) => {
                    warn!(
                        query_id = %query.id,
                        attempt,
                        timeout_ms = self.config.retrieval_timeout_ms,
                        "Retrieval attempt timed out"
                    );
                    QueryFailure::new(
                        ErrorKind::RetrievalUnavailable,
                        format!(
                            "Index did not respond within {}ms after {} attempt(s)",
                            self.config.retrieval_timeout_ms, attempt
                        ),
                    )
                }
            };

            if !policy.allows_retry_after(attempt) {
                return Err(failure);
            }
            let delay = policy.delay_after(attempt);
            debug!(query_id = %query.id, attempt, delay_ms = delay.as_millis() as u64, "Retrying retrieval");
            self.race(cancel, deadline, sleep(delay)).await?;
        }
    }

    /// Run `fut` unless the caller cancels or the request deadline passes
    async fn race<T>(
        &self,
        cancel: &CancellationToken,
        deadline: Instant,
        fut: impl Future<Output = T>,
    ) -> Result<T, QueryFailure> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(QueryFailure::cancelled()),
            _ = sleep_until(deadline) => Err(QueryFailure::timed_out(self.config.request_timeout_ms)),
            out = fut => Ok(out),
        }
    }

    async fn run_stream(
        self,
        query: Query,
        request: QueryRequest,
        cancel: CancellationToken,
        sender: mpsc::Sender<QueryEvent>,
    ) {
        let mut run = self.begin(query);

        let context = match self.prepare(&mut run, &request, &cancel).await {
            Ok(context) => context,
            Err(failure) => {
                let _ = sender.send(QueryEvent::failed(&failure)).await;
                return;
            }
        };

        let mut answer_stream =
            self.generator
                .generate_stream(run.query.clone(), context.clone(), cancel.child_token());
        let mut partial = String::new();
        let mut fragments = 0usize;

        let outcome = loop {
            let event = match self.race(&cancel, run.deadline, answer_stream.next_event()).await {
                Err(failure) => break Err(failure),
                Ok(None) => break Err(QueryFailure::cancelled()),
                Ok(Some(Err(e))) => break Err(QueryFailure::from_generation(&e)),
                Ok(Some(Ok(StreamEvent::Finished(answer)))) => break Ok(answer),
                Ok(Some(Ok(StreamEvent::Fragment(fragment)))) => fragment,
            };

            partial.push_str(&event.text);
            fragments += 1;
            let event = QueryEvent::Fragment {
                index: event.index,
                text: event.text,
            };
            match self.race(&cancel, run.deadline, sender.send(event)).await {
                Ok(Ok(())) => {}
                Ok(Err(_)) => break Err(QueryFailure::cancelled()),
                Err(failure) => break Err(failure),
            }
        };
        drop(answer_stream);

        match outcome {
            Ok(answer) => {
                let response = self.finish(&mut run, &request, context, answer);
                let _ = sender.send(QueryEvent::Completed { response }).await;
            }
            Err(failure) => {
                let failure = failure.with_partial_answer(partial);
                self.fail(&mut run, vec![("fragments", fragments.into())], &failure);
                // waits for the consumer to make room; a dropped stream ends it
                let _ = sender.send(QueryEvent::failed(&failure)).await;
            }
        }
    }

    /// Generating → Completed, evaluation hand-off and response
    fn finish(
        &self,
        run: &mut Run,
        request: &QueryRequest,
        context: AssembledContext,
        answer: Answer,
    ) -> QueryResponse {
        let processing_time_ms = u64::try_from(run.started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let stage: Attributes = vec![
            ("answer_chars", answer.text().chars().count().into()),
            ("citations", answer.citations().len().into()),
            ("finish_reason", answer.finish_reason().as_str().into()),
            ("generation_ms", answer.latency_ms().into()),
        ];
        let outcome: Attributes = vec![
            ("finish_reason", answer.finish_reason().as_str().into()),
            ("processing_time_ms", processing_time_ms.into()),
        ];
        run.lifecycle.complete(stage, outcome);

        info!(
            query_id = %run.query.id,
            finish_reason = %answer.finish_reason(),
            citations = answer.citations().len(),
            processing_time_ms,
            "Query completed"
        );

        let response = QueryResponse {
            query_id: run.query.id,
            question: run.query.text.clone(),
            answer: answer.text().to_string(),
            citations: answer.citations().to_vec(),
            finish_reason: answer.finish_reason(),
            sources: request
                .include_sources
                .then(|| QueryResponse::sources_from(&context)),
            processing_time_ms,
            truncated_context: context.truncated,
        };

        if request.enable_evaluation {
            match &self.evaluation {
                Some(queue) => {
                    queue.offer(EvaluationJob::new(run.query.clone(), context, answer));
                }
                None => debug!(query_id = %run.query.id, "Evaluation requested but not enabled"),
            }
        }
        response
    }

    /// Current stage → Failed
    fn fail(&self, run: &mut Run, stage: Attributes, failure: &QueryFailure) {
        run.lifecycle.fail(stage, failure.kind);
        error!(
            query_id = %run.query.id,
            kind = %failure.kind,
            message = %failure.message,
            "Query failed"
        );
    }
}
