//! Background evaluation off the live request path

use crate::{
    EvalError, EvaluationHarness, EvaluationJob, EvaluationMetrics, EvaluationSink,
    JsonlEvaluationSink,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

/// Non-blocking handle for offering finished answers to the worker
///
/// Clones feed the same worker.
#[derive(Debug, Clone)]
pub struct EvaluationQueue {
    sender: mpsc::Sender<EvaluationJob>,
    dropped: Arc<AtomicU64>,
}

impl EvaluationQueue {
    /// Offer a job without waiting
    ///
    /// Returns `false` when the job was dropped because the queue is full
    /// or the worker has stopped.
    pub fn offer(&self, job: EvaluationJob) -> bool {
        match self.sender.try_send(job) {
            Ok(()) => true,
            Err(TrySendError::Full(job)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(query_id = %job.query.id, "Evaluation queue full, job dropped");
                false
            }
            Err(TrySendError::Closed(job)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(query_id = %job.query.id, "Evaluation worker stopped, job dropped");
                false
            }
        }
    }

    /// Jobs dropped so far
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Drains an [`EvaluationQueue`], scoring one job at a time
///
/// Scoring failures are logged and counted, never propagated.
pub struct EvaluationWorker {
    receiver: mpsc::Receiver<EvaluationJob>,
    harness: EvaluationHarness,
    sinks: Vec<Box<dyn EvaluationSink>>,
    metrics: EvaluationMetrics,
    dropped: Arc<AtomicU64>,
}

impl EvaluationWorker {
    /// Create a queue and a worker with no sinks
    pub fn channel(harness: EvaluationHarness) -> (EvaluationQueue, EvaluationWorker) {
        let (sender, receiver) = mpsc::channel(harness.config().queue_capacity.max(1));
        let dropped = Arc::new(AtomicU64::new(0));
        let queue = EvaluationQueue {
            sender,
            dropped: Arc::clone(&dropped),
        };
        let worker = EvaluationWorker {
            receiver,
            harness,
            sinks: Vec::new(),
            metrics: EvaluationMetrics::new(),
            dropped,
        };
        (queue, worker)
    }

    /// Create a queue and a worker writing to the configured output file
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the output file
    /// cannot be opened.
    pub fn from_harness(harness: EvaluationHarness) -> Result<(EvaluationQueue, EvaluationWorker), EvalError> {
        harness.config().validate().map_err(EvalError::Config)?;
        let output = harness.config().output_path.clone();
        let (queue, mut worker) = Self::channel(harness);
        if let Some(path) = output {
            worker = worker.with_sink(Box::new(JsonlEvaluationSink::open(path)?));
        }
        Ok((queue, worker))
    }

    /// Add a sink
    pub fn with_sink(mut self, sink: Box<dyn EvaluationSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Get the current metrics
    pub fn metrics(&self) -> &EvaluationMetrics {
        &self.metrics
    }

    /// Run until `shutdown` fires or every queue handle is dropped
    ///
    /// Jobs still queued at shutdown are abandoned. Returns the final
    /// metrics.
    pub async fn run(mut self, shutdown: CancellationToken) -> EvaluationMetrics {
        tracing::info!(
            judge = self.harness.judge_model(),
            sinks = self.sinks.len(),
            "Evaluation worker started"
        );

        loop {
            let job = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                job = self.receiver.recv() => match job {
                    Some(job) => job,
                    None => break,
                },
            };

            let outcome = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    tracing::debug!(query_id = %job.query.id, "Shutdown during evaluation");
                    break;
                }
                outcome = self.harness.score_job(&job) => outcome,
            };
            self.handle(&job, outcome);
        }

        self.receiver.close();
        let mut abandoned = 0u64;
        while self.receiver.try_recv().is_ok() {
            abandoned += 1;
        }
        self.metrics.dropped = self.dropped.load(Ordering::Relaxed) + abandoned;
        tracing::info!("Evaluation worker stopped. Final metrics:\n{}", self.metrics.summary());
        self.metrics
    }

    fn handle(&mut self, job: &EvaluationJob, outcome: Result<ragline_domain::EvaluationResult, EvalError>) {
        match outcome {
            Ok(result) => {
                self.metrics.record_result(&result);
                for sink in &mut self.sinks {
                    if let Err(e) = sink.record(&result) {
                        tracing::warn!(query_id = %result.query_id, error = %e, "Failed to store evaluation result");
                    }
                }
            }
            Err(e) => {
                self.metrics.record_failure();
                tracing::warn!(query_id = %job.query.id, error = %e, "Evaluation failed");
            }
        }
    }
}
