use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Runtime configuration for the job server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Maximum number of job identifiers buffered in the queue.
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,

    /// Number of concurrent workers.
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,

    /// Deadline covering the store calls of one processing attempt, in
    /// seconds.
    #[serde(default = "default_op_timeout")]
    pub op_timeout_secs: u64,

    /// Store connection string.
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// HTTP listen port.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_queue_size() -> usize {
    100
}

fn default_num_workers() -> usize {
    2
}

fn default_op_timeout() -> u64 {
    30
}

fn default_database_url() -> String {
    "sqlite://jobs.db?mode=rwc".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for Config {
    fn default() -> Self {
        Self {
            queue_size: default_queue_size(),
            num_workers: default_num_workers(),
            op_timeout_secs: default_op_timeout(),
            database_url: default_database_url(),
            port: default_port(),
        }
    }
}

impl Config {
    /// Read configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Config::default();

        if let Ok(url) = env::var("DATABASE_URL") {
            config.database_url = url;
        }
        if let Some(port) = env::var("PORT").ok().and_then(|v| v.parse().ok()) {
            config.port = port;
        }
        if let Some(size) = env::var("QUEUE_SIZE").ok().and_then(|v| v.parse().ok()) {
            config.queue_size = size;
        }
        if let Some(count) = env::var("NUM_WORKERS").ok().and_then(|v| v.parse().ok()) {
            config.num_workers = count;
        }

        config
    }

    pub fn op_timeout(&self) -> Duration {
        Duration::from_secs(self.op_timeout_secs)
    }
}
