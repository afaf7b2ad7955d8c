//! File-backed task store.
//!
//! Tasks are kept in memory and persisted as a JSON-lines snapshot that is
//! reloaded on open and rewritten after every mutation. Suitable for a
//! single process that must survive restarts.

use std::collections::BTreeMap;
use std::fs::{self, create_dir_all, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::core::{StoreError, Task, TaskId, TaskSpec, TaskStore, TaskUpdate};

/// JSON-lines task store.
pub struct FileTaskStore {
    path: PathBuf,
    tasks: Mutex<BTreeMap<TaskId, Task>>,
}

impl FileTaskStore {
    /// Open (or create) a store at `path`, loading any existing snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the directory cannot be created
    /// or the snapshot cannot be read.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            create_dir_all(dir).map_err(backend)?;
        }
        let tasks = Self::load(&path)?;
        debug!(path = %path.display(), count = tasks.len(), "task store opened");
        Ok(Self {
            path,
            tasks: Mutex::new(tasks),
        })
    }

    /// Location of the snapshot file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> Result<BTreeMap<TaskId, Task>, StoreError> {
        let mut tasks = BTreeMap::new();
        if !path.exists() {
            return Ok(tasks);
        }
        let file = OpenOptions::new().read(true).open(path).map_err(backend)?;
        for line in BufReader::new(file).lines() {
            let line = line.map_err(backend)?;
            if line.trim().is_empty() {
                continue;
            }
            let task: Task = serde_json::from_str(&line).map_err(backend)?;
            tasks.insert(task.id, task);
        }
        Ok(tasks)
    }

    /// Write the snapshot to a sibling file and move it into place.
    fn persist(&self, tasks: &BTreeMap<TaskId, Task>) -> Result<(), StoreError> {
        let tmp = self.path.with_extension("jsonl.tmp");
        {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp)
                .map_err(backend)?;
            let mut writer = BufWriter::new(file);
            for task in tasks.values() {
                let line = serde_json::to_string(task).map_err(backend)?;
                writeln!(writer, "{line}").map_err(backend)?;
            }
            writer.flush().map_err(backend)?;
        }
        fs::rename(&tmp, &self.path).map_err(backend)
    }
}

#[async_trait]
impl TaskStore for FileTaskStore {
    async fn create(&self, spec: TaskSpec) -> Result<Task, StoreError> {
        let task = Task::from_spec(Uuid::new_v4(), spec);
        let mut tasks = self.tasks.lock();
        tasks.insert(task.id, task.clone());
        if let Err(e) = self.persist(&tasks) {
            tasks.remove(&task.id);
            return Err(e);
        }
        Ok(task)
    }

    async fn get(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.lock().get(&id).cloned())
    }

    async fn update(&self, id: TaskId, update: TaskUpdate) -> Result<(), StoreError> {
        let mut tasks = self.tasks.lock();
        let task = tasks.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        let previous = task.clone();
        if !task.apply(update) {
            return Ok(());
        }
        if let Err(e) = self.persist(&tasks) {
            tasks.insert(id, previous);
            return Err(e);
        }
        Ok(())
    }
}

fn backend(e: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(e.to_string())
}
