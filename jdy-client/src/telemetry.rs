//! Best-effort request telemetry.
//!
//! Every request attempt, success or failure, produces a
//! [`RequestRecord`]. Records are handed to an optional [`RequestObserver`]
//! through a bounded queue drained by one background task, so a slow or
//! broken observer can neither delay a request nor change its outcome.
//! When the queue is full the record is dropped.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

const QUEUE_CAPACITY: usize = 256;

/// What the executor observed for one request attempt.
#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub method: String,
    pub url: String,
    /// Truncated to the configured telemetry body limit.
    pub request_body: Option<String>,
    pub response_body: Option<String>,
    /// `None` when the transport failed before a response arrived.
    pub status: Option<u16>,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
}

/// Receives request records off the caller's critical path.
pub trait RequestObserver: Send + Sync + 'static {
    fn on_request(&self, record: &RequestRecord);
}

impl<F> RequestObserver for F
where
    F: Fn(&RequestRecord) + Send + Sync + 'static,
{
    fn on_request(&self, record: &RequestRecord) {
        self(record)
    }
}

/// Fire-and-forget channel to the observer worker.
pub(crate) struct TelemetrySink {
    tx: mpsc::Sender<RequestRecord>,
    /// Worker state until first use; the drain task is spawned lazily so
    /// the client can be constructed outside a runtime.
    seed: Mutex<Option<WorkerSeed>>,
}

struct WorkerSeed {
    rx: mpsc::Receiver<RequestRecord>,
    observer: Arc<dyn RequestObserver>,
}

impl TelemetrySink {
    pub(crate) fn new(observer: Arc<dyn RequestObserver>) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        Self {
            tx,
            seed: Mutex::new(Some(WorkerSeed { rx, observer })),
        }
    }

    /// Enqueues a record without blocking; drops it under back-pressure.
    pub(crate) fn emit(&self, record: RequestRecord) {
        let seed = self.seed.lock().ok().and_then(|mut guard| guard.take());
        if let Some(WorkerSeed { mut rx, observer }) = seed {
            tokio::spawn(async move {
                while let Some(record) = rx.recv().await {
                    observer.on_request(&record);
                }
            });
        }
        if self.tx.try_send(record).is_err() {
            debug!("telemetry queue full; dropping request record");
        }
    }
}
