use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::job::{Job, JobId, JobStatus, Payload};

use super::{JobUpdate, Result, Storage};

pub struct SqliteStorage {
    pub pool: SqlitePool,
}

impl SqliteStorage {
    pub async fn new(database_url: &str) -> std::result::Result<Self, sqlx::Error> {
        let pool = SqlitePool::connect(database_url).await?;
        let storage = Self { pool };
        storage.configure().await?;
        storage.migrate().await?;
        Ok(storage)
    }

    async fn configure(&self) -> std::result::Result<(), sqlx::Error> {
        sqlx::query("PRAGMA journal_mode=WAL;")
            .execute(&self.pool)
            .await?;

        sqlx::query("PRAGMA busy_timeout=5000;")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Run database migrations
    async fn migrate(&self) -> std::result::Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id TEXT PRIMARY KEY,
                type TEXT NOT NULL,
                payload TEXT NOT NULL,
                status TEXT NOT NULL,
                retry_count INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_jobs_created_at ON jobs(created_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn row_to_job(&self, row: sqlx::sqlite::SqliteRow) -> Result<Job> {
        let id: String = row.get("id");
        let job_type: String = row.get("type");
        let payload_json: String = row.get("payload");
        let status: String = row.get("status");
        let retry_count: i32 = row.get("retry_count");
        let created_at_str: String = row.get("created_at");
        let updated_at_str: String = row.get("updated_at");

        let payload: Payload = serde_json::from_str(&payload_json)?;

        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        let updated_at = DateTime::parse_from_rfc3339(&updated_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(Job {
            id: JobId(id),
            job_type,
            payload,
            status: JobStatus::from_db(&status),
            retry_count: retry_count as u32,
            created_at,
            updated_at,
        })
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn insert(&self, job: &Job) -> Result<JobId> {
        let payload_json = serde_json::to_string(&job.payload)?;

        sqlx::query(
            r#"
            INSERT INTO jobs (id, type, payload, status, retry_count, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&job.id.0)
        .bind(&job.job_type)
        .bind(payload_json)
        .bind(job.status.as_str())
        .bind(job.retry_count as i32)
        .bind(job.created_at.to_rfc3339())
        .bind(job.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(job.id.clone())
    }

    async fn find_by_id(&self, id: &JobId) -> Result<Option<Job>> {
        let row = sqlx::query("SELECT * FROM jobs WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.row_to_job(row)?)),
            None => Ok(None),
        }
    }

    async fn update_fields(&self, id: &JobId, update: JobUpdate) -> Result<()> {
        let now = Utc::now().to_rfc3339();

        match update.retry_count {
            Some(retry_count) => {
                sqlx::query(
                    r#"
                    UPDATE jobs
                    SET status = ?, retry_count = ?, updated_at = ?
                    WHERE id = ?
                    "#,
                )
                .bind(update.status.as_str())
                .bind(retry_count as i32)
                .bind(now)
                .bind(&id.0)
                .execute(&self.pool)
                .await?;
            }
            None => {
                sqlx::query(
                    r#"
                    UPDATE jobs
                    SET status = ?, updated_at = ?
                    WHERE id = ?
                    "#,
                )
                .bind(update.status.as_str())
                .bind(now)
                .bind(&id.0)
                .execute(&self.pool)
                .await?;
            }
        }

        Ok(())
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<Job>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM jobs
            ORDER BY created_at DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i32)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|row| self.row_to_job(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::MAX_RETRIES;
    use serde_json::json;
    use tempfile::TempDir;

    async fn open_storage(dir: &TempDir) -> SqliteStorage {
        let url = format!("sqlite://{}/jobs.db?mode=rwc", dir.path().display());
        SqliteStorage::new(&url).await.unwrap()
    }

    fn payload(value: serde_json::Value) -> Payload {
        match value {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn insert_and_find_round_trip() {
        let dir = TempDir::new().unwrap();
        let storage = open_storage(&dir).await;

        let job = Job::new("send_email", payload(json!({"to": "user@example.com"})));
        let id = storage.insert(&job).await.unwrap();

        let found = storage.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(found.id, job.id);
        assert_eq!(found.job_type, "send_email");
        assert_eq!(found.status, JobStatus::Pending);
        assert_eq!(found.retry_count, 0);
        assert_eq!(found.payload, job.payload);
    }

    #[tokio::test]
    async fn find_missing_returns_none() {
        let dir = TempDir::new().unwrap();
        let storage = open_storage(&dir).await;

        let missing = storage.find_by_id(&JobId::new()).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn update_status_refreshes_timestamp() {
        let dir = TempDir::new().unwrap();
        let storage = open_storage(&dir).await;

        let mut job = Job::new("demo", Payload::new());
        job.created_at = Utc::now() - chrono::Duration::minutes(5);
        job.updated_at = job.created_at;
        storage.insert(&job).await.unwrap();

        storage
            .update_fields(
                &job.id,
                JobUpdate {
                    status: JobStatus::Processing,
                    retry_count: None,
                },
            )
            .await
            .unwrap();

        let found = storage.find_by_id(&job.id).await.unwrap().unwrap();
        assert_eq!(found.status, JobStatus::Processing);
        assert_eq!(found.retry_count, 0);
        assert!(found.updated_at > found.created_at);
    }

    #[tokio::test]
    async fn update_can_set_retry_count() {
        let dir = TempDir::new().unwrap();
        let storage = open_storage(&dir).await;

        let job = Job::new("demo", Payload::new());
        storage.insert(&job).await.unwrap();

        storage
            .update_fields(
                &job.id,
                JobUpdate {
                    status: JobStatus::Failed,
                    retry_count: Some(MAX_RETRIES),
                },
            )
            .await
            .unwrap();

        let found = storage.find_by_id(&job.id).await.unwrap().unwrap();
        assert_eq!(found.status, JobStatus::Failed);
        assert_eq!(found.retry_count, MAX_RETRIES);
    }

    #[tokio::test]
    async fn list_recent_caps_and_orders_newest_first() {
        let dir = TempDir::new().unwrap();
        let storage = open_storage(&dir).await;

        let base = Utc::now();
        for i in 0..60 {
            let mut job = Job::new("demo", Payload::new());
            job.created_at = base + chrono::Duration::seconds(i);
            job.updated_at = job.created_at;
            storage.insert(&job).await.unwrap();
        }

        let recent = storage.list_recent(50).await.unwrap();
        assert_eq!(recent.len(), 50);
        for pair in recent.windows(2) {
            assert!(pair[0].created_at >= pair[1].created_at);
        }
        assert_eq!(recent[0].created_at, base + chrono::Duration::seconds(59));
    }
}
