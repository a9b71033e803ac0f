//! Background worker draining buffered trace records

use crate::{
    ChannelTraceSink, JsonlExporter, LogExporter, TraceConfig, TraceError, TraceExporter,
    TraceMetrics,
};
use ragline_domain::TraceRecord;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Exporters plus the counters kept while feeding them
struct Pipeline {
    exporters: Vec<Box<dyn TraceExporter>>,
    metrics: TraceMetrics,
}

impl Pipeline {
    fn handle(&mut self, record: TraceRecord) {
        self.metrics.record(&record);
        let mut ok = true;
        for exporter in &mut self.exporters {
            if let Err(e) = exporter.export(&record) {
                ok = false;
                self.metrics.export_failures += 1;
                tracing::warn!(exporter = exporter.name(), query_id = %record.query_id, error = %e, "Trace export failed");
            }
        }
        if ok {
            self.metrics.exported += 1;
        }
    }

    fn flush(&mut self) {
        for exporter in &mut self.exporters {
            if let Err(e) = exporter.flush() {
                self.metrics.export_failures += 1;
                tracing::warn!(exporter = exporter.name(), error = %e, "Trace flush failed");
            }
        }
    }
}

/// Drains a [`ChannelTraceSink`] and forwards records to exporters
///
/// Records are exported in the order they were emitted.
///
/// # Examples
///
/// ```
/// use ragline_domain::{QueryId, QueryState, TraceRecord};
/// use ragline_trace::{TraceConfig, TraceSink, TraceWorker};
/// use tokio_util::sync::CancellationToken;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let (sink, worker) = TraceWorker::channel(&TraceConfig::default());
/// let shutdown = CancellationToken::new();
/// let handle = tokio::spawn(worker.run(shutdown.clone()));
///
/// sink.emit(TraceRecord::new(QueryId::new(), QueryState::Received, 1, 1));
/// shutdown.cancel();
///
/// let metrics = handle.await.unwrap();
/// assert_eq!(metrics.total_records(), 1);
/// # });
/// ```
pub struct TraceWorker {
    receiver: mpsc::Receiver<TraceRecord>,
    pipeline: Pipeline,
    dropped: Arc<AtomicU64>,
    flush_interval: Duration,
}

impl TraceWorker {
    /// Create a sink and a worker with no exporters
    pub fn channel(config: &TraceConfig) -> (ChannelTraceSink, TraceWorker) {
        let (sender, receiver) = mpsc::channel(config.buffer_capacity.max(1));
        let dropped = Arc::new(AtomicU64::new(0));
        let sink = ChannelTraceSink::new(sender, Arc::clone(&dropped));
        let worker = TraceWorker {
            receiver,
            pipeline: Pipeline {
                exporters: Vec::new(),
                metrics: TraceMetrics::new(),
            },
            dropped,
            flush_interval: config.flush_interval(),
        };
        (sink, worker)
    }

    /// Create a sink and a worker with the exporters `config` asks for
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the JSONL file
    /// cannot be opened.
    pub fn from_config(config: &TraceConfig) -> Result<(ChannelTraceSink, TraceWorker), TraceError> {
        config.validate().map_err(TraceError::Config)?;
        let (sink, mut worker) = Self::channel(config);
        if config.log_records {
            worker = worker.with_exporter(Box::new(LogExporter));
        }
        if let Some(path) = &config.jsonl_path {
            worker = worker.with_exporter(Box::new(JsonlExporter::open(path)?));
        }
        Ok((sink, worker))
    }

    /// Add an exporter
    pub fn with_exporter(mut self, exporter: Box<dyn TraceExporter>) -> Self {
        self.pipeline.exporters.push(exporter);
        self
    }

    /// Number of exporters attached
    pub fn exporter_count(&self) -> usize {
        self.pipeline.exporters.len()
    }

    /// Get the current metrics
    pub fn metrics(&self) -> &TraceMetrics {
        &self.pipeline.metrics
    }

    /// Run until `shutdown` fires or every sink is dropped
    ///
    /// Records already buffered at shutdown are still exported. Returns the
    /// final metrics.
    pub async fn run(mut self, shutdown: CancellationToken) -> TraceMetrics {
        let mut ticker = interval(self.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            exporters = self.pipeline.exporters.len(),
            flush_interval_ms = self.flush_interval.as_millis() as u64,
            "Trace worker started"
        );

        loop {
            tokio::select! {
                biased;
                received = self.receiver.recv() => match received {
                    Some(record) => self.pipeline.handle(record),
                    None => {
                        tracing::debug!("All trace sinks dropped");
                        break;
                    }
                },
                _ = shutdown.cancelled() => {
                    tracing::debug!("Shutdown requested, draining trace buffer");
                    self.receiver.close();
                    while let Some(record) = self.receiver.recv().await {
                        self.pipeline.handle(record);
                    }
                    break;
                }
                _ = ticker.tick() => self.pipeline.flush(),
            }
        }

        self.pipeline.flush();
        let mut metrics = self.pipeline.metrics;
        metrics.dropped = self.dropped.load(Ordering::Relaxed);
        tracing::info!("Trace worker stopped. Final metrics:\n{}", metrics.summary());
        metrics
    }
}
