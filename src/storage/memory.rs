use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::job::{Job, JobId};

use super::{JobUpdate, Result, Storage};

/// In-memory store for tests and embedded use.
pub struct MemoryStorage {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn insert(&self, job: &Job) -> Result<JobId> {
        let mut jobs = self.jobs.write().await;
        jobs.insert(job.id.clone(), job.clone());
        Ok(job.id.clone())
    }

    async fn find_by_id(&self, id: &JobId) -> Result<Option<Job>> {
        let jobs = self.jobs.read().await;
        Ok(jobs.get(id).cloned())
    }

    async fn update_fields(&self, id: &JobId, update: JobUpdate) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(id) {
            job.status = update.status;
            if let Some(retry_count) = update.retry_count {
                job.retry_count = retry_count;
            }
            job.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<Job>> {
        let jobs = self.jobs.read().await;
        let mut recent: Vec<Job> = jobs.values().cloned().collect();
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        recent.truncate(limit as usize);
        Ok(recent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobStatus, Payload};

    #[tokio::test]
    async fn insert_and_find_round_trip() {
        let storage = MemoryStorage::new();
        let job = Job::new("demo", Payload::new());

        let id = storage.insert(&job).await.unwrap();
        let found = storage.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(found.id, job.id);
        assert_eq!(found.status, JobStatus::Pending);

        assert!(storage.find_by_id(&JobId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_merges_fields() {
        let storage = MemoryStorage::new();
        let job = Job::new("demo", Payload::new());
        storage.insert(&job).await.unwrap();

        storage
            .update_fields(
                &job.id,
                JobUpdate {
                    status: JobStatus::Failed,
                    retry_count: Some(1),
                },
            )
            .await
            .unwrap();

        let found = storage.find_by_id(&job.id).await.unwrap().unwrap();
        assert_eq!(found.status, JobStatus::Failed);
        assert_eq!(found.retry_count, 1);
        assert!(found.updated_at >= found.created_at);
    }

    #[tokio::test]
    async fn list_recent_orders_newest_first() {
        let storage = MemoryStorage::new();

        let base = Utc::now();
        for i in 0..5 {
            let mut job = Job::new("demo", Payload::new());
            job.created_at = base + chrono::Duration::seconds(i);
            job.updated_at = job.created_at;
            storage.insert(&job).await.unwrap();
        }

        let recent = storage.list_recent(3).await.unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].created_at, base + chrono::Duration::seconds(4));
        assert_eq!(recent[2].created_at, base + chrono::Duration::seconds(2));
    }
}
