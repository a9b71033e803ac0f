//! Trace worker integration tests

use ragline_domain::{QueryId, QueryState, TraceRecord};
use ragline_trace::{TraceConfig, TraceError, TraceExporter, TraceSink, TraceWorker};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Exporter that keeps what it receives
#[derive(Clone, Default)]
struct Collecting {
    records: Arc<Mutex<Vec<TraceRecord>>>,
    flushes: Arc<Mutex<usize>>,
}

impl TraceExporter for Collecting {
    fn name(&self) -> &str {
        "collecting"
    }

    fn export(&mut self, record: &TraceRecord) -> Result<(), TraceError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), TraceError> {
        *self.flushes.lock().unwrap() += 1;
        Ok(())
    }
}

/// Exporter that always fails
struct Broken;

impl TraceExporter for Broken {
    fn name(&self) -> &str {
        "broken"
    }

    fn export(&mut self, _record: &TraceRecord) -> Result<(), TraceError> {
        Err(TraceError::Config("unavailable".into()))
    }
}

fn stages() -> Vec<QueryState> {
    vec![
        QueryState::Received,
        QueryState::Retrieving,
        QueryState::Assembling,
        QueryState::Generating,
        QueryState::Completed,
    ]
}

#[tokio::test]
async fn test_records_exported_in_emission_order() {
    let collecting = Collecting::default();
    let (sink, worker) = TraceWorker::channel(&TraceConfig::default());
    let worker = worker.with_exporter(Box::new(collecting.clone()));
    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(worker.run(shutdown.clone()));

    let id = QueryId::new();
    for (i, stage) in stages().into_iter().enumerate() {
        sink.emit(TraceRecord::new(id, stage, i as u64, i as u64 + 1));
    }
    shutdown.cancel();
    let metrics = handle.await.unwrap();

    let seen: Vec<_> = collecting
        .records
        .lock()
        .unwrap()
        .iter()
        .map(|r| r.stage)
        .collect();
    assert_eq!(seen, stages());
    assert_eq!(metrics.total_records(), 5);
    assert_eq!(metrics.completed(), 1);
    assert_eq!(metrics.exported, 5);
    assert!(*collecting.flushes.lock().unwrap() >= 1);
}

#[tokio::test]
async fn test_full_buffer_drops_are_reported() {
    let config = TraceConfig {
        buffer_capacity: 2,
        log_records: false,
        ..TraceConfig::default()
    };
    let (sink, worker) = TraceWorker::channel(&config);
    let id = QueryId::new();

    // Worker not running yet, so only two records fit
    for stage in stages() {
        sink.emit(TraceRecord::new(id, stage, 0, 0));
    }
    assert_eq!(sink.dropped(), 3);

    drop(sink);
    let metrics = worker.run(CancellationToken::new()).await;
    assert_eq!(metrics.total_records(), 2);
    assert_eq!(metrics.dropped, 3);
}

#[tokio::test]
async fn test_failing_exporter_does_not_stop_others() {
    let collecting = Collecting::default();
    let (sink, worker) = TraceWorker::channel(&TraceConfig::default());
    let worker = worker
        .with_exporter(Box::new(Broken))
        .with_exporter(Box::new(collecting.clone()));

    sink.emit(TraceRecord::new(QueryId::new(), QueryState::Failed, 3, 4));
    drop(sink);
    let metrics = worker.run(CancellationToken::new()).await;

    assert_eq!(collecting.records.lock().unwrap().len(), 1);
    assert_eq!(metrics.export_failures, 1);
    assert_eq!(metrics.exported, 0);
    assert_eq!(metrics.failed(), 1);
}

#[tokio::test]
async fn test_jsonl_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trace.jsonl");
    let config = TraceConfig {
        log_records: false,
        jsonl_path: Some(path.clone()),
        ..TraceConfig::default()
    };
    let (sink, worker) = TraceWorker::from_config(&config).unwrap();

    let id = QueryId::new();
    sink.emit(TraceRecord::new(id, QueryState::Received, 1, 1));
    sink.emit(TraceRecord::new(id, QueryState::Retrieving, 1, 7).with_attribute("attempts", 1u32));
    drop(sink);
    worker.run(CancellationToken::new()).await;

    let content = std::fs::read_to_string(&path).unwrap();
    let records: Vec<TraceRecord> = content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].query_id, id);
    assert_eq!(records[1].duration_ms(), 6);
}
