use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of failed attempts after which a job is left permanently failed.
pub const MAX_RETRIES: u32 = 3;

/// Opaque job payload: string keys, loosely typed values.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Unique identifier for a job
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl JobId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for JobId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Current state of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn from_db(status: &str) -> Self {
        match status {
            "pending" => JobStatus::Pending,
            "processing" => JobStatus::Processing,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Pending,
        }
    }
}

/// A background job
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    #[serde(rename = "type")]
    pub job_type: String,
    pub payload: Payload,
    pub status: JobStatus,
    pub retry_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new<S: Into<String>>(job_type: S, payload: Payload) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            job_type: job_type.into(),
            payload,
            status: JobStatus::Pending,
            retry_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether a further failed attempt would still be retried.
    pub fn can_retry(&self) -> bool {
        self.retry_count < MAX_RETRIES
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_job_starts_pending() {
        let job = Job::new("send_email", Payload::new());
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.retry_count, 0);
        assert_eq!(job.created_at, job.updated_at);
    }

    #[test]
    fn status_string_round_trip() {
        for status in [
            JobStatus::Pending,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            assert_eq!(JobStatus::from_db(status.as_str()), status);
        }
        assert_eq!(JobStatus::from_db("garbage"), JobStatus::Pending);
    }

    #[test]
    fn can_retry_bounded_by_max() {
        let mut job = Job::new("demo", Payload::new());
        assert!(job.can_retry());

        job.retry_count = MAX_RETRIES - 1;
        assert!(job.can_retry());

        job.retry_count = MAX_RETRIES;
        assert!(!job.can_retry());
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let job = Job::new("send_email", Payload::new());
        let value = serde_json::to_value(&job).unwrap();
        assert!(value.get("type").is_some());
        assert!(value.get("retryCount").is_some());
        assert!(value.get("createdAt").is_some());
        assert_eq!(value["status"], "pending");
    }
}
