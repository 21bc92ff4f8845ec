//! Stored task records and their conversion into entities.

use chrono::{DateTime, NaiveDateTime, Utc};
use entities::{Task, ValidationError};
use serde::Deserialize;
use sqlx::FromRow;

use crate::{TaskStoreError, TaskStoreResult};

/// Columns selected for every task read, in schema order.
pub(crate) const TASK_COLUMNS: &str =
    "id, title, description, status, priority, due_date, created_at";

/// A task as either backend returns it, before validation.
#[derive(Debug, Clone, FromRow, Deserialize)]
pub(crate) struct TaskRecord {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: String,
    pub due_date: Option<String>,
    pub created_at: String,
}

impl TryFrom<TaskRecord> for Task {
    type Error = TaskStoreError;

    fn try_from(record: TaskRecord) -> TaskStoreResult<Self> {
        let invalid =
            |e: ValidationError| TaskStoreError::invalid_row(format!("task {}: {}", record.id, e));

        Ok(Task {
            id: record.id,
            status: record.status.parse().map_err(invalid)?,
            priority: record.priority.parse().map_err(invalid)?,
            created_at: parse_timestamp(&record.created_at).ok_or_else(|| {
                TaskStoreError::invalid_row(format!(
                    "task {}: unreadable created_at {:?}",
                    record.id, record.created_at
                ))
            })?,
            title: record.title,
            description: record.description.unwrap_or_default(),
            due_date: record.due_date,
        })
    }
}

/// Parses the timestamp forms both backends produce.
///
/// SQLite's `CURRENT_TIMESTAMP` yields `YYYY-MM-DD HH:MM:SS` in UTC;
/// Postgres yields RFC 3339 with an offset.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .into_iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

pub(crate) fn into_tasks(records: Vec<TaskRecord>) -> TaskStoreResult<Vec<Task>> {
    records.into_iter().map(Task::try_from).collect()
}
