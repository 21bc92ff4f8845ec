//! Task repository trait definitions.

use async_trait::async_trait;
use entities::{NewTask, Task, TaskUpdate};
use serde_json::{Map, Value};

use crate::{BackendKind, TaskStoreResult};

pub(crate) mod sealed {
    /// Restricts implementations to the backends in this crate.
    pub trait Sealed {}
}

/// CRUD access to persisted tasks.
///
/// There are exactly two implementations, [`SqliteTaskRepository`] and
/// [`RemoteTaskRepository`], and both honour the same contract:
///
/// - a missing id is `Ok(None)` / `Ok(false)`, never an error;
/// - input is validated before anything is written;
/// - every call is a fresh round trip to the store.
///
/// Obtain one through [`open_repository`] once per process and share it.
///
/// [`SqliteTaskRepository`]: crate::SqliteTaskRepository
/// [`RemoteTaskRepository`]: crate::RemoteTaskRepository
/// [`open_repository`]: crate::open_repository
#[async_trait]
pub trait TaskRepository: sealed::Sealed + Send + Sync {
    /// Which backend this repository talks to.
    fn backend(&self) -> BackendKind;

    /// Inserts a task and returns it as stored, with `id` and `created_at`.
    async fn create(&self, task: NewTask) -> TaskStoreResult<Task>;

    /// Gets a task by ID.
    async fn get(&self, id: i64) -> TaskStoreResult<Option<Task>>;

    /// Lists all tasks in store order.
    async fn list(&self) -> TaskStoreResult<Vec<Task>>;

    /// Applies a partial update and returns the updated task.
    ///
    /// An empty update returns the task unchanged.
    async fn update(&self, id: i64, update: TaskUpdate) -> TaskStoreResult<Option<Task>>;

    /// Deletes a task. Returns whether a row was removed.
    async fn delete(&self, id: i64) -> TaskStoreResult<bool>;

    /// Creates a task from a wire mapping.
    async fn create_from_fields(&self, fields: &Map<String, Value>) -> TaskStoreResult<Task> {
        let task = NewTask::from_fields(fields)?;
        self.create(task).await
    }

    /// Updates a task from a wire mapping of the fields to change.
    async fn update_from_fields(
        &self,
        id: i64,
        fields: &Map<String, Value>,
    ) -> TaskStoreResult<Option<Task>> {
        let update = TaskUpdate::from_fields(fields)?;
        self.update(id, update).await
    }
}
