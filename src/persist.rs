//! Background persistence of finalized measurements.
//!
//! The reconciler hands each finalized record to a [`PersistSink`] and moves
//! on. [`PersistQueue`] runs every save as its own task against the backend,
//! retrying transient failures with backoff. Outcomes are only logged.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use backon::Retryable;
use bodywatch_adapters::{AdapterError, MeasurementSink, RetryPolicy};
use bodywatch_types::SaveMeasurement;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{error, info, warn};

/// Accepts finalized measurements for persistence without blocking.
pub trait PersistSink: Send + Debug {
    fn submit(&self, request: SaveMeasurement);
}

/// Persistence queue backed by a tokio worker.
#[derive(Debug)]
pub struct PersistQueue {
    sender: Option<mpsc::UnboundedSender<SaveMeasurement>>,
    worker: JoinHandle<()>,
}

impl PersistQueue {
    /// Spawn the worker. Must be called inside a tokio runtime.
    pub fn spawn(sink: Arc<dyn MeasurementSink>, policy: RetryPolicy) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<SaveMeasurement>();

        let worker = tokio::spawn(async move {
            let mut saves = JoinSet::new();
            loop {
                tokio::select! {
                    request = rx.recv() => match request {
                        Some(request) => {
                            saves.spawn(save_with_retry(sink.clone(), policy.clone(), request));
                        }
                        None => break,
                    },
                    Some(_) = saves.join_next(), if !saves.is_empty() => {}
                }
            }
            // Intake closed: let in-flight saves finish.
            while saves.join_next().await.is_some() {}
        });

        Self {
            sender: Some(tx),
            worker,
        }
    }

    /// Stop accepting requests and wait for in-flight saves to finish.
    pub async fn close(mut self) {
        self.sender.take();
        if let Err(e) = (&mut self.worker).await {
            if !e.is_cancelled() {
                error!(error = %e, "persist worker failed");
            }
        }
    }

    /// A sink that feeds this queue.
    ///
    /// `close()` waits until every handle is dropped as well.
    pub fn handle(&self) -> PersistHandle {
        PersistHandle {
            sender: self.sender.clone(),
        }
    }

    /// Cancel the worker and every pending save.
    pub fn abort(&self) {
        self.worker.abort();
    }
}

impl PersistSink for PersistQueue {
    fn submit(&self, request: SaveMeasurement) {
        enqueue(self.sender.as_ref(), request);
    }
}

/// Cloneable submission handle for a [`PersistQueue`].
#[derive(Debug, Clone)]
pub struct PersistHandle {
    sender: Option<mpsc::UnboundedSender<SaveMeasurement>>,
}

impl PersistSink for PersistHandle {
    fn submit(&self, request: SaveMeasurement) {
        enqueue(self.sender.as_ref(), request);
    }
}

fn enqueue(sender: Option<&mpsc::UnboundedSender<SaveMeasurement>>, request: SaveMeasurement) {
    let Some(sender) = sender else {
        warn!("persist queue closed, dropping measurement");
        return;
    };
    if sender.send(request).is_err() {
        warn!("persist worker gone, dropping measurement");
    }
}

/// Save one measurement, retrying transient failures per `policy`.
///
/// Returns whether the save eventually succeeded.
async fn save_with_retry(
    sink: Arc<dyn MeasurementSink>,
    policy: RetryPolicy,
    request: SaveMeasurement,
) -> bool {
    let mut attempts = 0u32;
    let result = (|| {
        attempts += 1;
        sink.save(&request)
    })
    .retry(policy.backoff())
    .when(AdapterError::is_transient)
    .notify(|e: &AdapterError, delay: Duration| {
        warn!(error = %e, ?delay, "save failed, retrying");
    })
    .await;

    match result {
        Ok(()) => {
            info!(user_id = request.user_id, attempts, "measurement saved");
            true
        }
        Err(e) if e.is_transient() => {
            error!(error = %e, attempts, "giving up on measurement save");
            false
        }
        Err(e) => {
            error!(error = %e, "measurement save rejected");
            false
        }
    }
}

/// Sink that keeps submissions in memory.
///
/// Used for offline runs; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    submitted: Arc<Mutex<Vec<SaveMeasurement>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submitted(&self) -> Vec<SaveMeasurement> {
        self.submitted.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.submitted.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.submitted.lock().is_empty()
    }
}

impl PersistSink for RecordingSink {
    fn submit(&self, request: SaveMeasurement) {
        self.submitted.lock().push(request);
    }
}
