mod api;
mod config;
mod executor;
mod job;
mod queue;
mod server;
mod storage;
mod worker;

pub use config::Config;
pub use executor::{ExecutionError, JobExecutor, SimulatedExecutor};
pub use job::{Job, JobId, JobStatus, Payload, MAX_RETRIES};
pub use queue::{JobQueue, JobReceiver, QueueClosed};
pub use server::JobServer;
pub use storage::{JobUpdate, MemoryStorage, SqliteStorage, Storage, StorageError};
