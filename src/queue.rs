use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use crate::job::JobId;

/// Error returned when enqueueing after every worker-side receiver is gone.
#[derive(Debug, Error)]
#[error("job queue is closed")]
pub struct QueueClosed;

/// Bounded FIFO of job identifiers: the hand-off between producers and the
/// worker pool.
///
/// The queue carries identifiers only, never full records; workers re-fetch
/// the authoritative record from storage before acting on a delivery.
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<JobId>,
}

/// Worker-side end of the queue, shared by every worker in the pool.
#[derive(Clone)]
pub struct JobReceiver {
    rx: Arc<Mutex<mpsc::Receiver<JobId>>>,
}

impl JobQueue {
    /// Create a queue holding at most `capacity` identifiers.
    pub fn bounded(capacity: usize) -> (Self, JobReceiver) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self { tx },
            JobReceiver {
                rx: Arc::new(Mutex::new(rx)),
            },
        )
    }

    /// Push an identifier onto the queue.
    ///
    /// Blocks while the queue is at capacity and returns once the identifier
    /// has been buffered or taken by a waiting worker. Duplicates are not
    /// detected: keeping one identifier out of flight twice at the same time
    /// is the caller's responsibility.
    pub async fn enqueue(&self, id: JobId) -> Result<(), QueueClosed> {
        debug!(job_id = %id, "Enqueueing job");
        self.tx.send(id).await.map_err(|_| QueueClosed)
    }
}

impl JobReceiver {
    /// Wait for the next identifier. Returns `None` once the queue is closed
    /// and drained.
    pub async fn recv(&self) -> Option<JobId> {
        self.rx.lock().await.recv().await
    }
}
