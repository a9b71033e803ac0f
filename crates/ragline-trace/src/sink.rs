//! Trace sinks

use ragline_domain::{QueryId, QueryState, TraceRecord};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc::{self, error::TrySendError};

/// Destination for trace records
///
/// `emit` must not block and must not fail; a sink that cannot keep up
/// drops records instead.
pub trait TraceSink: Send + Sync {
    /// Hand a finished record to the sink
    fn emit(&self, record: TraceRecord);
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTraceSink;

impl TraceSink for NoopTraceSink {
    fn emit(&self, _record: TraceRecord) {}
}

/// Keeps records in memory
///
/// Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryTraceSink {
    records: Arc<Mutex<Vec<TraceRecord>>>,
}

impl MemoryTraceSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record, in emission order
    pub fn records(&self) -> Vec<TraceRecord> {
        self.lock().clone()
    }

    /// Records of one query, in emission order
    pub fn records_for(&self, query_id: QueryId) -> Vec<TraceRecord> {
        self.lock()
            .iter()
            .filter(|r| r.query_id == query_id)
            .cloned()
            .collect()
    }

    /// Stages recorded for one query, in emission order
    pub fn stages_for(&self, query_id: QueryId) -> Vec<QueryState> {
        self.records_for(query_id).iter().map(|r| r.stage).collect()
    }

    /// Number of records held
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Forget every record
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<TraceRecord>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TraceSink for MemoryTraceSink {
    fn emit(&self, record: TraceRecord) {
        self.lock().push(record);
    }
}

/// Buffers records into a bounded channel drained by a
/// [`TraceWorker`](crate::TraceWorker)
///
/// Clones feed the same channel. Records arriving while the buffer is full,
/// or after the worker has stopped, are dropped and counted.
#[derive(Debug, Clone)]
pub struct ChannelTraceSink {
    sender: mpsc::Sender<TraceRecord>,
    dropped: Arc<AtomicU64>,
}

impl ChannelTraceSink {
    pub(crate) fn new(sender: mpsc::Sender<TraceRecord>, dropped: Arc<AtomicU64>) -> Self {
        Self { sender, dropped }
    }

    /// Records dropped so far
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl TraceSink for ChannelTraceSink {
    fn emit(&self, record: TraceRecord) {
        match self.sender.try_send(record) {
            Ok(()) => {}
            Err(TrySendError::Full(record)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(query_id = %record.query_id, stage = %record.stage, "Trace buffer full, record dropped");
            }
            Err(TrySendError::Closed(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

impl<T: TraceSink + ?Sized> TraceSink for Arc<T> {
    fn emit(&self, record: TraceRecord) {
        (**self).emit(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u128, stage: QueryState) -> TraceRecord {
        TraceRecord::new(QueryId::from_value(id), stage, 1, 2)
    }

    #[test]
    fn test_memory_sink_filters_by_query() {
        let sink = MemoryTraceSink::new();
        sink.emit(record(1, QueryState::Received));
        sink.emit(record(2, QueryState::Received));
        sink.emit(record(1, QueryState::Retrieving));

        assert_eq!(sink.len(), 3);
        assert_eq!(
            sink.stages_for(QueryId::from_value(1)),
            vec![QueryState::Received, QueryState::Retrieving]
        );
        sink.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn test_channel_sink_drops_when_full() {
        let (sender, mut receiver) = mpsc::channel(2);
        let sink = ChannelTraceSink::new(sender, Arc::new(AtomicU64::new(0)));

        for _ in 0..5 {
            sink.emit(record(1, QueryState::Received));
        }
        assert_eq!(sink.dropped(), 3);
        assert!(receiver.try_recv().is_ok());
        assert!(receiver.try_recv().is_ok());
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_channel_sink_counts_after_close() {
        let (sender, receiver) = mpsc::channel(4);
        let sink = ChannelTraceSink::new(sender, Arc::new(AtomicU64::new(0)));
        drop(receiver);

        sink.emit(record(1, QueryState::Received));
        assert_eq!(sink.dropped(), 1);
    }

    #[test]
    fn test_noop_sink_through_arc() {
        let sink: Arc<dyn TraceSink> = Arc::new(NoopTraceSink);
        sink.emit(record(1, QueryState::Completed));
    }
}
