use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::executor::JobExecutor;
use crate::job::{JobId, JobStatus, MAX_RETRIES};
use crate::queue::{JobQueue, JobReceiver};
use crate::storage::{JobUpdate, Storage, StorageError};

/// Worker that processes jobs delivered through the queue
pub(crate) struct Worker {
    id: usize,
    storage: Arc<dyn Storage>,
    executor: Arc<dyn JobExecutor>,
    queue: JobQueue,
    receiver: JobReceiver,
    op_timeout: Duration,
}

impl Worker {
    pub(crate) fn new(
        id: usize,
        storage: Arc<dyn Storage>,
        executor: Arc<dyn JobExecutor>,
        queue: JobQueue,
        receiver: JobReceiver,
        op_timeout: Duration,
    ) -> Self {
        Self {
            id,
            storage,
            executor,
            queue,
            receiver,
            op_timeout,
        }
    }

    /// Run the worker until shutdown is signaled
    pub(crate) async fn run(&self, shutdown: CancellationToken) {
        info!(worker = self.id, "Worker started");

        loop {
            tokio::select! {
                // The stop signal wins over a ready delivery.
                biased;
                _ = shutdown.cancelled() => {
                    info!(worker = self.id, "Worker shutting down");
                    break;
                }
                next = self.receiver.recv() => {
                    match next {
                        Some(id) => self.process(id).await,
                        None => {
                            info!(worker = self.id, "Queue closed, worker exiting");
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Drive a single delivery through the job lifecycle.
    ///
    /// Every failure is handled here: logged, never surfaced to the
    /// submitter. A bad job cannot take the worker down.
    pub(crate) async fn process(&self, id: JobId) {
        // One deadline bounds every store call of this attempt.
        let deadline = Instant::now() + self.op_timeout;

        let job = match store_call(deadline, self.storage.find_by_id(&id)).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                warn!(job_id = %id, "No record for dequeued job, dropping delivery");
                return;
            }
            Err(e) => {
                error!(job_id = %id, error = %e, "Failed to fetch job");
                return;
            }
        };

        let processing = JobUpdate {
            status: JobStatus::Processing,
            retry_count: None,
        };
        if let Err(e) = store_call(deadline, self.storage.update_fields(&id, processing)).await {
            error!(job_id = %id, error = %e, "Failed to mark job processing");
            return;
        }

        info!(job_id = %id, job_type = %job.job_type, worker = self.id, "Processing job");

        match self.executor.execute(&job).await {
            Ok(()) => {
                let completed = JobUpdate {
                    status: JobStatus::Completed,
                    retry_count: None,
                };
                if let Err(e) =
                    store_call(deadline, self.storage.update_fields(&id, completed)).await
                {
                    error!(job_id = %id, error = %e, "Failed to mark job completed");
                    return;
                }

                info!(job_id = %id, "Completed job");
            }
            Err(e) => {
                let retries = job.retry_count + 1;
                warn!(job_id = %id, retries, error = %e, "Job failed");

                let failed = JobUpdate {
                    status: JobStatus::Failed,
                    retry_count: Some(retries),
                };
                if let Err(e) = store_call(deadline, self.storage.update_fields(&id, failed)).await
                {
                    // The retry decision below still uses the in-memory count.
                    error!(job_id = %id, error = %e, "Failed to mark job failed");
                }

                if retries < MAX_RETRIES {
                    info!(job_id = %id, retries, "Re-enqueueing job for retry");
                    if let Err(e) = self.queue.enqueue(id.clone()).await {
                        error!(job_id = %id, error = %e, "Failed to re-enqueue job");
                    }
                } else {
                    warn!(job_id = %id, retries, "Job failed permanently");
                }
            }
        }
    }
}

async fn store_call<T>(
    deadline: Instant,
    op: impl Future<Output = Result<T, StorageError>>,
) -> Result<T, StorageError> {
    match timeout_at(deadline, op).await {
        Ok(result) => result,
        Err(_) => Err(StorageError::Timeout),
    }
}
