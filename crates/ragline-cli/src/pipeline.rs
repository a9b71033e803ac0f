//! Wiring from CLI configuration to a running pipeline.

use crate::config::{Config, EmbedderKind};
use crate::error::Result;
use ragline_eval::{
    EvaluationHarness, EvaluationMetrics, EvaluationSink, EvaluationWorker, MemoryEvaluationSink,
};
use ragline_llm::{GenerationProvider, OllamaProvider};
use ragline_orchestrator::QueryOrchestrator;
use ragline_store::{EmbeddingModel, HashingEmbeddingModel, OllamaEmbeddingModel, SqliteIndex};
use ragline_trace::{TraceMetrics, TraceWorker};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// A configured orchestrator plus its background workers
pub struct Pipeline {
    orchestrator: QueryOrchestrator,
    shutdown: CancellationToken,
    trace: JoinHandle<TraceMetrics>,
    evaluation: Option<JoinHandle<EvaluationMetrics>>,
    results: MemoryEvaluationSink,
}

impl Pipeline {
    /// Open the index, connect the providers and start the trace worker
    pub fn start(config: &Config) -> Result<Self> {
        Self::build(config, None)
    }

    /// Like [`Pipeline::start`], also scoring answers that ask for it
    ///
    /// Results go to `sink` as well as to [`Pipeline::results`].
    pub fn start_with_evaluation(
        config: &Config,
        sink: Option<Box<dyn EvaluationSink>>,
    ) -> Result<Self> {
        Self::build(config, Some(sink))
    }

    fn build(config: &Config, evaluation: Option<Option<Box<dyn EvaluationSink>>>) -> Result<Self> {
        let providers = &config.providers;
        let embedder: Arc<dyn EmbeddingModel> = match providers.embedder {
            EmbedderKind::Ollama => Arc::new(OllamaEmbeddingModel::new(
                &providers.ollama_url,
                &providers.embedding_model,
                providers.embedding_dimension,
            )?),
            EmbedderKind::Hashing => {
                Arc::new(HashingEmbeddingModel::new(providers.embedding_dimension))
            }
        };
        let generator: Arc<dyn GenerationProvider> = Arc::new(
            OllamaProvider::new(&providers.ollama_url, &providers.model)?
                .with_temperature(providers.temperature),
        );

        let index_path = config.index_path()?;
        if let Some(parent) = index_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let index = SqliteIndex::open(&index_path)?;
        debug!(index = %index_path.display(), "Index opened");

        let shutdown = CancellationToken::new();
        let (trace_sink, trace_worker) = TraceWorker::from_config(&config.pipeline.trace)?;
        let trace = tokio::spawn(trace_worker.run(shutdown.clone()));

        let mut orchestrator = QueryOrchestrator::from_config(&config.pipeline, embedder, generator)
            .with_store("default", Arc::new(index))
            .with_trace_sink(Arc::new(trace_sink));

        let results = MemoryEvaluationSink::new();
        let evaluation = match evaluation {
            Some(extra_sink) if config.pipeline.evaluation.enabled => {
                let judge_model = config
                    .pipeline
                    .evaluation
                    .judge_model
                    .as_deref()
                    .unwrap_or_else(|| providers.judge_model());
                let judge: Arc<dyn GenerationProvider> =
                    Arc::new(OllamaProvider::new(&providers.ollama_url, judge_model)?);
                let harness = EvaluationHarness::new(config.pipeline.evaluation.clone(), judge);

                let (queue, mut worker) = EvaluationWorker::from_harness(harness)?;
                worker = worker.with_sink(Box::new(results.clone()));
                if let Some(sink) = extra_sink {
                    worker = worker.with_sink(sink);
                }
                orchestrator = orchestrator.with_evaluation_queue(queue);
                info!(judge = judge_model, "Evaluation enabled");
                Some(tokio::spawn(worker.run(CancellationToken::new())))
            }
            _ => None,
        };

        Ok(Self {
            orchestrator,
            shutdown,
            trace,
            evaluation,
            results,
        })
    }

    /// The configured orchestrator
    pub fn orchestrator(&self) -> &QueryOrchestrator {
        &self.orchestrator
    }

    /// Evaluation results recorded so far
    pub fn results(&self) -> &MemoryEvaluationSink {
        &self.results
    }

    /// Wait for queued evaluations, then stop the trace worker
    pub async fn finish(self) -> (TraceMetrics, Option<EvaluationMetrics>) {
        // the evaluation worker stops once the orchestrator's queue handle is gone
        drop(self.orchestrator);
        let evaluation = match self.evaluation {
            Some(handle) => handle.await.ok(),
            None => None,
        };

        self.shutdown.cancel();
        let trace = self.trace.await.unwrap_or_default();
        (trace, evaluation)
    }
}
