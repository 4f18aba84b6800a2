use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::job::Job;

/// Error reported by a job's unit of work.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ExecutionError(pub String);

/// The unit of work behind each job: the extension point for real workloads.
///
/// The worker only observes the binary outcome; retries and state
/// transitions stay with the worker.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    async fn execute(&self, job: &Job) -> Result<(), ExecutionError>;
}

/// Simulated execution: fails when the payload carries `"fail": true`,
/// otherwise sleeps for the configured work delay and succeeds.
pub struct SimulatedExecutor {
    work_delay: Duration,
}

impl SimulatedExecutor {
    pub fn new() -> Self {
        Self {
            work_delay: Duration::from_secs(2),
        }
    }

    pub fn with_work_delay(work_delay: Duration) -> Self {
        Self { work_delay }
    }
}

impl Default for SimulatedExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobExecutor for SimulatedExecutor {
    async fn execute(&self, job: &Job) -> Result<(), ExecutionError> {
        if matches!(job.payload.get("fail"), Some(Value::Bool(true))) {
            return Err(ExecutionError("job flagged to fail".to_string()));
        }

        debug!(job_id = %job.id, "Simulating work");
        tokio::time::sleep(self.work_delay).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::Payload;
    use serde_json::json;

    fn executor() -> SimulatedExecutor {
        SimulatedExecutor::with_work_delay(Duration::ZERO)
    }

    fn job_with_payload(value: serde_json::Value) -> Job {
        match value {
            Value::Object(map) => Job::new("demo", map),
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn fail_flag_reports_failure() {
        let job = job_with_payload(json!({"fail": true}));
        assert!(executor().execute(&job).await.is_err());
    }

    #[tokio::test]
    async fn false_flag_succeeds() {
        let job = job_with_payload(json!({"fail": false}));
        assert!(executor().execute(&job).await.is_ok());
    }

    #[tokio::test]
    async fn missing_or_non_bool_flag_succeeds() {
        let absent = Job::new("demo", Payload::new());
        assert!(executor().execute(&absent).await.is_ok());

        let non_bool = job_with_payload(json!({"fail": "yes"}));
        assert!(executor().execute(&non_bool).await.is_ok());
    }
}
