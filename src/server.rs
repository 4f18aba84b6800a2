use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::api;
use crate::config::Config;
use crate::executor::JobExecutor;
use crate::job::{Job, JobId, Payload};
use crate::queue::{JobQueue, JobReceiver};
use crate::storage::Storage;
use crate::worker::Worker;

/// Coordinates the bounded job queue and the worker pool over a shared store.
pub struct JobServer {
    storage: Arc<dyn Storage>,
    executor: Arc<dyn JobExecutor>,
    queue: JobQueue,
    receiver: JobReceiver,
    shutdown: CancellationToken,
    worker_handles: Vec<JoinHandle<()>>,
    config: Config,
}

impl JobServer {
    /// Create a server over the given store and executor.
    ///
    /// Workers are not started until you call `start()`.
    pub fn new(
        storage: Arc<dyn Storage>,
        executor: Arc<dyn JobExecutor>,
        config: Config,
    ) -> Self {
        let (queue, receiver) = JobQueue::bounded(config.queue_size);

        Self {
            storage,
            executor,
            queue,
            receiver,
            shutdown: CancellationToken::new(),
            worker_handles: Vec::new(),
            config,
        }
    }

    /// Launch the configured number of workers and return immediately.
    ///
    /// Calling `start` twice launches a second set of workers.
    pub fn start(&mut self) {
        info!(workers = self.config.num_workers, "Starting job workers");

        for worker_id in 0..self.config.num_workers {
            self.spawn_worker(worker_id);
        }
    }

    fn spawn_worker(&mut self, worker_id: usize) {
        let worker = Worker::new(
            worker_id,
            Arc::clone(&self.storage),
            Arc::clone(&self.executor),
            self.queue.clone(),
            self.receiver.clone(),
            self.config.op_timeout(),
        );

        let shutdown = self.shutdown.clone();
        let handle = tokio::spawn(async move {
            worker.run(shutdown).await;
        });

        self.worker_handles.push(handle);
    }

    /// Persist a new job record and hand its identifier to the queue.
    ///
    /// The record exists in the store before the identifier is enqueued, so
    /// a worker always has something to fetch. Blocks while the queue is at
    /// capacity.
    pub async fn create_job<S: Into<String>>(
        &self,
        job_type: S,
        payload: Payload,
    ) -> Result<Job, String> {
        let job = Job::new(job_type, payload);
        let id = self.storage.insert(&job).await.map_err(|e| e.to_string())?;
        self.enqueue_job(id).await?;
        Ok(job)
    }

    /// Hand an already-persisted job's identifier to the queue.
    ///
    /// Blocks while the queue is at capacity. Nothing guards against the
    /// same identifier being put in flight twice: two concurrent deliveries
    /// of one id would race their record updates, so callers must not
    /// enqueue an id that is already queued or being processed.
    pub async fn enqueue_job(&self, id: JobId) -> Result<(), String> {
        self.queue.enqueue(id).await.map_err(|e| e.to_string())
    }

    pub async fn get_job(&self, id: &JobId) -> Result<Option<Job>, String> {
        self.storage.find_by_id(id).await.map_err(|e| e.to_string())
    }

    pub async fn list_jobs(&self, limit: u32) -> Result<Vec<Job>, String> {
        self.storage
            .list_recent(limit)
            .await
            .map_err(|e| e.to_string())
    }

    /// Build the HTTP router backed by this server's store and queue.
    pub fn router(&self) -> axum::Router {
        api::router(Arc::clone(&self.storage), self.queue.clone())
    }

    /// Get a reference to the storage backend
    pub fn storage(&self) -> Arc<dyn Storage> {
        Arc::clone(&self.storage)
    }

    /// Queue handle for producers that enqueue identifiers directly.
    pub fn queue(&self) -> JobQueue {
        self.queue.clone()
    }

    /// Raise the one-shot stop signal observed by every worker.
    ///
    /// Returns immediately: in-flight jobs finish on their own, and
    /// identifiers still buffered in the queue are never drained.
    pub fn stop(&self) {
        info!("Stopping all workers");
        self.shutdown.cancel();
    }

    /// Get the shutdown token for external shutdown control
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stop the workers and wait for their loops to exit.
    pub async fn shutdown(&mut self) {
        self.stop();

        for handle in self.worker_handles.drain(..) {
            let _ = handle.await;
        }

        info!("Shutdown complete");
    }

    /// Wait for shutdown signal (e.g., Ctrl+C)
    pub async fn wait_for_shutdown(&mut self) {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");

        self.shutdown().await;
    }
}
