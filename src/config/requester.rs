//! Requester process configuration: pool, dispatch timing and outbound HTTP.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::queue::QueueConfig;
use crate::core::{AppResult, DEFAULT_WORKER_COUNT, MAX_WORKER_COUNT};

/// Name of the task queue when none is configured.
pub const DEFAULT_TASK_QUEUE: &str = "task-queue";
/// Longest long-poll wait a single receive may request.
pub const MAX_RECEIVE_WAIT_SECS: u64 = 20;

/// Root configuration for a requester process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequesterConfig {
    /// Number of pool members.
    pub workers: usize,
    /// Name of the queue carrying task identifiers.
    pub task_queue: String,
    /// Long-poll wait per receive, in seconds.
    pub receive_wait_secs: u64,
    /// Deadline of a single receive call, in seconds.
    pub receive_deadline_secs: u64,
    /// Pause after a failed receive, in milliseconds.
    pub receive_error_backoff_ms: u64,
    /// Overall outbound request timeout, in seconds.
    pub http_timeout_secs: u64,
    /// Outbound connect timeout, in seconds.
    pub http_connect_timeout_secs: u64,
    /// Queue transport settings.
    pub queue: QueueConfig,
}

impl Default for RequesterConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKER_COUNT,
            task_queue: DEFAULT_TASK_QUEUE.to_string(),
            receive_wait_secs: 10,
            receive_deadline_secs: 20,
            receive_error_backoff_ms: 1_000,
            http_timeout_secs: 10,
            http_connect_timeout_secs: 5,
            queue: QueueConfig::default(),
        }
    }
}

impl RequesterConfig {
    /// Long-poll wait as a duration.
    #[must_use]
    pub const fn receive_wait(&self) -> Duration {
        Duration::from_secs(self.receive_wait_secs)
    }

    /// Receive deadline as a duration.
    #[must_use]
    pub const fn receive_deadline(&self) -> Duration {
        Duration::from_secs(self.receive_deadline_secs)
    }

    /// Receive error back-off as a duration.
    #[must_use]
    pub const fn receive_error_backoff(&self) -> Duration {
        Duration::from_millis(self.receive_error_backoff_ms)
    }

    /// Outbound request timeout as a duration.
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Outbound connect timeout as a duration.
    #[must_use]
    pub const fn http_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.http_connect_timeout_secs)
    }

    /// Validate all settings, including the nested queue settings.
    pub fn validate(&self) -> Result<(), String> {
        if self.workers == 0 || self.workers > MAX_WORKER_COUNT {
            return Err(format!(
                "workers must be between 1 and {MAX_WORKER_COUNT}, got {}",
                self.workers
            ));
        }
        if self.task_queue.trim().is_empty() {
            return Err("task_queue must not be empty".into());
        }
        if self.receive_wait_secs > MAX_RECEIVE_WAIT_SECS {
            return Err(format!(
                "receive_wait_secs must be at most {MAX_RECEIVE_WAIT_SECS}, got {}",
                self.receive_wait_secs
            ));
        }
        if self.receive_deadline_secs <= self.receive_wait_secs {
            return Err("receive_deadline_secs must exceed receive_wait_secs".into());
        }
        if self.http_timeout_secs == 0 {
            return Err("http_timeout_secs must be greater than 0".into());
        }
        if self.http_connect_timeout_secs == 0 {
            return Err("http_connect_timeout_secs must be greater than 0".into());
        }
        self.queue
            .validate()
            .map_err(|e| format!("queue invalid: {e}"))
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read overrides from a key lookup on top of the defaults, then validate.
    ///
    /// Keys: `WORKERS`, `TASK_QUEUE`, `RECEIVE_WAIT_SECS`,
    /// `RECEIVE_DEADLINE_SECS`, `RECEIVE_ERROR_BACKOFF_MS`,
    /// `HTTP_TIMEOUT_SECS`, `HTTP_CONNECT_TIMEOUT_SECS`, plus the keys read
    /// by [`QueueConfig::from_lookup`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self {
            queue: QueueConfig::from_lookup(&lookup)?,
            ..Self::default()
        };
        if let Some(v) = super::parse_var(&lookup, "WORKERS")? {
            cfg.workers = v;
        }
        if let Some(v) = lookup("TASK_QUEUE") {
            cfg.task_queue = v;
        }
        if let Some(v) = super::parse_var(&lookup, "RECEIVE_WAIT_SECS")? {
            cfg.receive_wait_secs = v;
        }
        if let Some(v) = super::parse_var(&lookup, "RECEIVE_DEADLINE_SECS")? {
            cfg.receive_deadline_secs = v;
        }
        if let Some(v) = super::parse_var(&lookup, "RECEIVE_ERROR_BACKOFF_MS")? {
            cfg.receive_error_backoff_ms = v;
        }
        if let Some(v) = super::parse_var(&lookup, "HTTP_TIMEOUT_SECS")? {
            cfg.http_timeout_secs = v;
        }
        if let Some(v) = super::parse_var(&lookup, "HTTP_CONNECT_TIMEOUT_SECS")? {
            cfg.http_connect_timeout_secs = v;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from the process environment, reading a `.env`
    /// file first when one exists.
    ///
    /// # Errors
    ///
    /// Returns an error when a variable does not parse or the result fails validation.
    pub fn from_env() -> AppResult<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(anyhow::anyhow!("failed to read .env file: {e}"));
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
            .map_err(|e| anyhow::anyhow!("invalid environment configuration: {e}"))
    }
}
