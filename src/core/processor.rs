//! Per-task state machine: load, guard, call out, persist.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tracing::{debug, error, info, Instrument};

use super::error::RequesterError;
use super::outbound::{OutboundClient, OutboundRequest};
use super::store::TaskStore;
use super::task::{Task, TaskId, TaskStatus, TaskUpdate};
use crate::util::panic_message;

/// Processes one task identified by a queue message.
#[async_trait]
pub trait TaskProcessor: Send + Sync {
    /// Drive the task to a terminal status.
    ///
    /// `Ok` means the originating message may be deleted; `Err` means it
    /// must be left for redelivery.
    async fn process(&self, task_id: TaskId) -> Result<(), RequesterError>;
}

/// Processor that executes the stored HTTP call and records the response.
#[derive(Clone)]
pub struct HttpTaskProcessor {
    store: Arc<dyn TaskStore>,
    client: Arc<dyn OutboundClient>,
}

impl HttpTaskProcessor {
    /// Create a processor over a task store and an outbound client.
    pub fn new(store: Arc<dyn TaskStore>, client: Arc<dyn OutboundClient>) -> Self {
        Self { store, client }
    }

    /// `InProcess`, outbound call, `Done`.
    async fn execute(&self, task: &Task) -> Result<(), RequesterError> {
        self.store
            .update(task.id, TaskUpdate::status(TaskStatus::InProcess))
            .await?;

        let request = OutboundRequest::from_task(task)?;
        debug!(method = %request.method, url = %request.url, "issuing outbound request");
        let response = self.client.execute(request).await?;
        let status_code = response.status_code;

        self.store.update(task.id, TaskUpdate::done(response)).await?;
        info!(status_code, "task done");
        Ok(())
    }

    async fn process_in_span(&self, task_id: TaskId) -> Result<(), RequesterError> {
        let Some(task) = self.store.get(task_id).await? else {
            info!("task not found");
            return Ok(());
        };
        if task.status == TaskStatus::Done {
            info!("task already done");
            return Ok(());
        }

        // Any exit other than a persisted `Done`, panics included, marks the task `Error`.
        let outcome = AssertUnwindSafe(self.execute(&task))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(RequesterError::Panic(panic_message(&*panic))));

        match outcome {
            Ok(()) => Ok(()),
            Err(cause) => self.mark_error(task_id, cause).await,
        }
    }

    /// Best-effort `Error` write after a failed attempt; always returns the failure.
    async fn mark_error(&self, task_id: TaskId, cause: RequesterError) -> Result<(), RequesterError> {
        match self
            .store
            .update(task_id, TaskUpdate::status(TaskStatus::Error))
            .await
        {
            Ok(()) => Err(cause),
            Err(status_write) => {
                error!(error = %status_write, "failed to update task status");
                Err(RequesterError::StatusWrite {
                    cause: Box::new(cause),
                    status_write: Box::new(status_write.into()),
                })
            }
        }
    }
}

#[async_trait]
impl TaskProcessor for HttpTaskProcessor {
    async fn process(&self, task_id: TaskId) -> Result<(), RequesterError> {
        let span = tracing::info_span!("process_task", %task_id);
        self.process_in_span(task_id).instrument(span).await
    }
}
