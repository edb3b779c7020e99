//! Batch buffer and flush scheduling.
//!
//! `BatchProcessor` decouples high-frequency record ingestion from the
//! comparatively expensive network export. Records accumulate in a queue; a
//! background worker flushes a batch when the queue reaches the configured
//! size or when the delay timer fires, whichever comes first. Shutdown
//! drains whatever remains as one final batch.
//!
//! The queue is the only state shared between the ingestion path and the
//! flush path. It is guarded by a short-lived mutex that is never held
//! across an await, so an export in flight can never block `enqueue`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::config::Configuration;

use super::exporter::{EventExporter, ExportResult};
use super::models::EventRecord;

/// Flush thresholds for one processor.
#[derive(Debug, Clone, Copy)]
pub struct BatchConfig {
    /// Queue size that triggers an immediate flush; also the batch size cap.
    pub max_batch_size: usize,
    /// Maximum time a record may sit unflushed.
    pub max_wait_time: Duration,
}

impl BatchConfig {
    pub fn from_configuration(config: &Configuration) -> Self {
        Self {
            max_batch_size: config.max_queue_size.max(1),
            max_wait_time: Duration::from_millis(config.max_wait_time.max(1)),
        }
    }
}

struct Shared {
    queue: Mutex<Vec<EventRecord>>,
    notify: Notify,
    accepting: AtomicBool,
    max_batch_size: usize,
}

/// Accumulates records and flushes them to an exporter on size or time
/// triggers, with a forced final flush on shutdown.
pub struct BatchProcessor {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl BatchProcessor {
    /// Start a processor and its background worker.
    pub fn new(exporter: Arc<dyn EventExporter>, config: BatchConfig) -> Self {
        let shared = Arc::new(Shared {
            queue: Mutex::new(Vec::new()),
            notify: Notify::new(),
            accepting: AtomicBool::new(true),
            max_batch_size: config.max_batch_size.max(1),
        });
        let worker = tokio::spawn(run_worker(
            Arc::clone(&shared),
            exporter,
            config.max_wait_time,
        ));
        Self {
            shared,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Append a record to the pending queue.
    ///
    /// Synchronous and non-blocking beyond a short critical section. Records
    /// offered after shutdown began are dropped.
    pub fn enqueue(&self, record: EventRecord) {
        if !self.shared.accepting.load(Ordering::Acquire) {
            tracing::debug!(
                event_type = %record.event_type,
                "record dropped: processor is shut down"
            );
            return;
        }

        let len = {
            let mut queue = self.shared.queue.lock();
            queue.push(record);
            queue.len()
        };
        if len >= self.shared.max_batch_size {
            self.shared.notify.notify_one();
        }
    }

    /// Number of records currently waiting for a flush.
    pub fn pending(&self) -> usize {
        self.shared.queue.lock().len()
    }

    /// Stop intake, flush everything still buffered as one final batch, and
    /// release the worker. Idempotent.
    pub async fn shutdown(&self) {
        self.shared.accepting.store(false, Ordering::Release);
        self.shared.notify.notify_one();

        let worker = self.worker.lock().take();
        if let Some(handle) = worker {
            if let Err(err) = handle.await {
                tracing::error!(%err, "batch worker terminated abnormally");
            }
        }
    }
}

async fn run_worker(
    shared: Arc<Shared>,
    exporter: Arc<dyn EventExporter>,
    max_wait_time: Duration,
) {
    let first_tick = tokio::time::Instant::now() + max_wait_time;
    let mut ticker = tokio::time::interval_at(first_tick, max_wait_time);

    loop {
        if !shared.accepting.load(Ordering::Acquire) {
            break;
        }
        tokio::select! {
            _ = ticker.tick() => {
                let batch = detach_all(&shared);
                if !batch.is_empty() {
                    export_batch(exporter.as_ref(), batch).await;
                }
            }
            _ = shared.notify.notified() => {
                while let Some(batch) = detach_full(&shared) {
                    export_batch(exporter.as_ref(), batch).await;
                }
            }
        }
    }

    let remaining = detach_all(&shared);
    if !remaining.is_empty() {
        export_batch(exporter.as_ref(), remaining).await;
    }
    exporter.shutdown();
}

/// Detach exactly one full batch, if the queue holds one.
fn detach_full(shared: &Shared) -> Option<Vec<EventRecord>> {
    let mut queue = shared.queue.lock();
    if queue.len() >= shared.max_batch_size {
        Some(queue.drain(..shared.max_batch_size).collect())
    } else {
        None
    }
}

/// Detach the entire queue contents.
fn detach_all(shared: &Shared) -> Vec<EventRecord> {
    std::mem::take(&mut *shared.queue.lock())
}

async fn export_batch(exporter: &dyn EventExporter, batch: Vec<EventRecord>) {
    let events = batch.len();
    match exporter.export(batch).await {
        ExportResult::Success => tracing::debug!(events, "batch flushed"),
        ExportResult::Failure => {
            tracing::error!(events, "batch export failed, records dropped");
        }
    }
}
