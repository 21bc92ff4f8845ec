//! SQLite-backed task repository.
//!
//! Every operation opens its own connection and drops it before returning,
//! so the repository holds no connection between calls and can be shared
//! freely across request handlers.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use entities::{NewTask, Task, TaskField, TaskUpdate};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteConnection},
    ConnectOptions, QueryBuilder, Sqlite,
};
use tracing::{debug, info};

use crate::{
    record::{into_tasks, TaskRecord, TASK_COLUMNS},
    traits::sealed,
    BackendKind, TaskRepository, TaskStoreError, TaskStoreResult,
};

/// SQL schema definition
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    description TEXT,
    status TEXT NOT NULL,
    priority TEXT NOT NULL,
    due_date TEXT,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)
"#;

/// Opens connections to a SQLite file.
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    path: PathBuf,
    options: SqliteConnectOptions,
}

impl SqliteConnector {
    /// Creates a connector for the database file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true);
        Self { path, options }
    }

    /// Sets how long a connection waits on a locked database before
    /// failing with a retryable error.
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.options = self.options.busy_timeout(timeout);
        self
    }

    /// Returns the database file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the containing directory and the `tasks` table if missing.
    ///
    /// Idempotent; safe to call on every startup.
    pub async fn prepare(&self) -> TaskStoreResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| TaskStoreError::Storage {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let mut conn = self.connect().await?;
        sqlx::query(SCHEMA_SQL).execute(&mut conn).await?;

        info!(path = %self.path.display(), "SQLite task store ready");
        Ok(())
    }

    /// Opens a fresh connection. It is closed when dropped.
    pub async fn connect(&self) -> TaskStoreResult<SqliteConnection> {
        Ok(self.options.connect().await?)
    }
}

/// Task repository over a SQLite file.
#[derive(Debug, Clone)]
pub struct SqliteTaskRepository {
    connector: SqliteConnector,
}

impl SqliteTaskRepository {
    /// Creates a repository. Call [`SqliteConnector::prepare`] first, or use
    /// [`SqliteTaskRepository::open`].
    pub fn new(connector: SqliteConnector) -> Self {
        Self { connector }
    }

    /// Prepares the database at `path` and returns a repository over it.
    pub async fn open(path: impl Into<PathBuf>) -> TaskStoreResult<Self> {
        let connector = SqliteConnector::new(path);
        connector.prepare().await?;
        Ok(Self::new(connector))
    }

    /// Returns the underlying connector.
    pub fn connector(&self) -> &SqliteConnector {
        &self.connector
    }
}

impl sealed::Sealed for SqliteTaskRepository {}

/// The text stored for a supplied field. `None` binds SQL NULL.
fn column_value(update: &TaskUpdate, field: TaskField) -> Option<String> {
    match field {
        TaskField::Title => update.title.clone(),
        TaskField::Description => update.description.clone(),
        TaskField::Status => update.status.map(|s| s.as_str().to_string()),
        TaskField::Priority => update.priority.map(|p| p.as_str().to_string()),
        TaskField::DueDate => update.due_date.clone().flatten(),
    }
}

#[async_trait]
impl TaskRepository for SqliteTaskRepository {
    fn backend(&self) -> BackendKind {
        BackendKind::Embedded
    }

    async fn create(&self, task: NewTask) -> TaskStoreResult<Task> {
        task.validate()?;

        let mut conn = self.connector.connect().await?;
        let record: TaskRecord = sqlx::query_as(&format!(
            "INSERT INTO tasks (title, description, status, priority, due_date)
             VALUES (?, ?, ?, ?, ?)
             RETURNING {TASK_COLUMNS}"
        ))
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(&task.due_date)
        .fetch_one(&mut conn)
        .await?;

        debug!(task_id = record.id, "Created task");
        Task::try_from(record)
    }

    async fn get(&self, id: i64) -> TaskStoreResult<Option<Task>> {
        let mut conn = self.connector.connect().await?;
        let record: Option<TaskRecord> =
            sqlx::query_as(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?"))
                .bind(id)
                .fetch_optional(&mut conn)
                .await?;

        record.map(Task::try_from).transpose()
    }

    async fn list(&self) -> TaskStoreResult<Vec<Task>> {
        let mut conn = self.connector.connect().await?;
        let records: Vec<TaskRecord> =
            sqlx::query_as(&format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY id"))
                .fetch_all(&mut conn)
                .await?;

        into_tasks(records)
    }

    async fn update(&self, id: i64, update: TaskUpdate) -> TaskStoreResult<Option<Task>> {
        update.validate()?;

        let fields = update.fields();
        if fields.is_empty() {
            return self.get(id).await;
        }

        // Column names come from the closed TaskField list; values are bound.
        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE tasks SET ");
        let mut assignments = builder.separated(", ");
        for field in &fields {
            assignments
                .push(field.column())
                .push_unseparated(" = ")
                .push_bind_unseparated(column_value(&update, *field));
        }
        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(TASK_COLUMNS);

        let mut conn = self.connector.connect().await?;
        let record: Option<TaskRecord> = builder
            .build_query_as::<TaskRecord>()
            .fetch_optional(&mut conn)
            .await?;

        debug!(task_id = id, ?fields, found = record.is_some(), "Updated task");
        record.map(Task::try_from).transpose()
    }

    async fn delete(&self, id: i64) -> TaskStoreResult<bool> {
        let mut conn = self.connector.connect().await?;
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&mut conn)
            .await?;

        let deleted = result.rows_affected() > 0;
        debug!(task_id = id, deleted, "Deleted task");
        Ok(deleted)
    }
}
