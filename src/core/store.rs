//! Task store port.

use async_trait::async_trait;

use super::error::StoreError;
use super::task::{Task, TaskId, TaskSpec, TaskUpdate};

/// Persistence for task entities and their status transitions.
///
/// Implementations are shared between the acceptance path, the processor
/// and every pool member, so they must be safe for concurrent use. An
/// update addressed to a `Done` task must be accepted and ignored.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Create a task in `New` status.
    async fn create(&self, spec: TaskSpec) -> Result<Task, StoreError>;

    /// Fetch a task, `None` when it does not exist.
    async fn get(&self, id: TaskId) -> Result<Option<Task>, StoreError>;

    /// Apply a partial update as a single write.
    async fn update(&self, id: TaskId, update: TaskUpdate) -> Result<(), StoreError>;
}
