pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::job::{Job, JobId, JobStatus};

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Payload codec error: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Store call timed out")]
    Timeout,

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Partial update applied to a job record.
///
/// `updated_at` is refreshed by the backend on every write.
#[derive(Debug, Clone)]
pub struct JobUpdate {
    pub status: JobStatus,
    pub retry_count: Option<u32>,
}

/// Durable repository of job records, addressed by identifier.
///
/// Backends are shared across workers and are expected to provide their own
/// internal concurrency control.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Persist a new record, returning its identifier.
    async fn insert(&self, job: &Job) -> Result<JobId>;

    /// Fetch a record; `None` when no record matches.
    async fn find_by_id(&self, id: &JobId) -> Result<Option<Job>>;

    /// Apply a partial status/retry-count update, refreshing `updated_at`.
    async fn update_fields(&self, id: &JobId, update: JobUpdate) -> Result<()>;

    /// The most recently created records, newest first.
    async fn list_recent(&self, limit: u32) -> Result<Vec<Job>>;
}
