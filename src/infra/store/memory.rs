//! In-memory task store.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::core::{StoreError, Task, TaskId, TaskSpec, TaskStore, TaskUpdate};

/// Task store backed by a map, for development and tests.
#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<TaskId, Task>>,
}

impl InMemoryTaskStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.read().len()
    }

    /// Copy of every stored task, in no particular order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Task> {
        self.tasks.read().values().cloned().collect()
    }

    /// Whether the store holds no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.read().is_empty()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create(&self, spec: TaskSpec) -> Result<Task, StoreError> {
        let task = Task::from_spec(Uuid::new_v4(), spec);
        self.tasks.write().insert(task.id, task.clone());
        Ok(task)
    }

    async fn get(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.read().get(&id).cloned())
    }

    async fn update(&self, id: TaskId, update: TaskUpdate) -> Result<(), StoreError> {
        let mut tasks = self.tasks.write();
        let task = tasks.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        task.apply(update);
        Ok(())
    }
}
