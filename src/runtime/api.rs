//! Acceptance-side helpers called by the request API: submit, status, health.

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::core::{
    QueueTransport, QueueTransportExt, RequesterError, ResponseHeaders, Task, TaskId, TaskSpec,
    TaskStatus, TaskStore, TaskUpdate,
};

/// Task status response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatusResponse {
    /// Task identifier.
    pub id: TaskId,
    /// Current status.
    pub status: TaskStatus,
    /// Response status code once done.
    #[serde(rename = "httpStatusCode", skip_serializing_if = "Option::is_none")]
    pub http_status_code: Option<u16>,
    /// Response headers once done.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<ResponseHeaders>,
    /// Response content length once done.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<i64>,
}

impl From<Task> for TaskStatusResponse {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            status: task.status,
            http_status_code: task.response_status_code,
            headers: task.response_headers,
            length: task.response_content_length,
        }
    }
}

/// Health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    /// Healthy flag.
    pub ok: bool,
}

/// Create a task and enqueue its identifier.
///
/// When the enqueue fails the task is marked `Error` so it does not sit in
/// `New` forever; the enqueue failure is returned either way.
///
/// # Errors
///
/// - store failure while creating the task
/// - the enqueue failure, or [`RequesterError::StatusWrite`] when marking
///   the task `Error` failed as well
pub async fn submit_task(
    store: &dyn TaskStore,
    transport: &dyn QueueTransport,
    queue_url: &str,
    spec: TaskSpec,
) -> Result<Task, RequesterError> {
    let task = store.create(spec).await?;

    if let Err(cause) = transport.send(queue_url, &task.id).await {
        error!(task_id = %task.id, error = %cause, "failed to enqueue task");
        if let Err(status_write) = store
            .update(task.id, TaskUpdate::status(TaskStatus::Error))
            .await
        {
            return Err(RequesterError::StatusWrite {
                cause: Box::new(cause),
                status_write: Box::new(status_write.into()),
            });
        }
        return Err(cause);
    }

    info!(task_id = %task.id, "task submitted");
    Ok(task)
}

/// Current status of a task, `None` when it does not exist.
///
/// # Errors
///
/// Returns the store failure, if any.
pub async fn task_status(
    store: &dyn TaskStore,
    id: TaskId,
) -> Result<Option<TaskStatusResponse>, RequesterError> {
    Ok(store.get(id).await?.map(TaskStatusResponse::from))
}

/// Return a health payload.
#[must_use]
pub const fn health() -> Health {
    Health { ok: true }
}
