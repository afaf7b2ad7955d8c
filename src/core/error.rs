//! Error types for dispatch, processing and persistence.

use thiserror::Error;

use super::task::TaskId;

/// Reasons a queue message is treated as poison and evicted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoisonError {
    /// The message was delivered more often than the configured limit.
    #[error("attempt limit exceeded: received {receive_count} times, limit {max_attempts}")]
    AttemptLimitExceeded {
        /// Approximate number of deliveries reported by the broker.
        receive_count: u32,
        /// Configured maximum number of deliveries.
        max_attempts: u32,
    },
    /// The message body could not be parsed into the expected payload.
    #[error("malformed body: {0}")]
    MalformedBody(String),
}

/// Errors produced by task store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No task exists with the given identifier.
    #[error("task {0} not found")]
    NotFound(TaskId),
    /// Backend-specific failure with context.
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Errors produced by requester components.
#[derive(Debug, Error)]
pub enum RequesterError {
    /// Invalid or missing configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Broker unreachable or rejected an operation.
    #[error("transport error: {0}")]
    Transport(String),
    /// Message evicted from the queue without being processed.
    #[error("poison message: {0}")]
    Poison(#[from] PoisonError),
    /// Task persistence failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The outbound call could not be built or did not complete.
    #[error("outbound request failed: {0}")]
    Outbound(String),
    /// Processing failed and the follow-up write of the `Error` status failed too.
    #[error("{cause}; additionally failed to mark task as error: {status_write}")]
    StatusWrite {
        /// The failure that aborted processing.
        cause: Box<RequesterError>,
        /// The failure of the best-effort `Error` status write.
        status_write: Box<RequesterError>,
    },
    /// A unit of work panicked and the panic was recovered.
    #[error("panic: {0}")]
    Panic(String),
    /// Payload encoding failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RequesterError {
    /// Whether this error reports a poison message that the transport already evicted.
    #[must_use]
    pub const fn is_poison(&self) -> bool {
        matches!(self, Self::Poison(_))
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
