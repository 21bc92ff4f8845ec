//! Task entity definitions.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{TaskUpdate, ValidationError};

/// Board column a task sits in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum TaskStatus {
    /// Not started.
    #[default]
    #[serde(rename = "To Do")]
    ToDo,
    /// Being worked on.
    #[serde(rename = "In Progress")]
    InProgress,
    /// Finished.
    #[serde(rename = "Done")]
    Done,
}

impl TaskStatus {
    /// All statuses in board order.
    pub const ALL: [TaskStatus; 3] = [Self::ToDo, Self::InProgress, Self::Done];

    /// Returns the canonical string form used on the wire and in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ToDo => "To Do",
            Self::InProgress => "In Progress",
            Self::Done => "Done",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ValidationError::invalid_enum("status", s))
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How urgent a task is.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum TaskPriority {
    High,
    #[default]
    Medium,
    Low,
}

impl TaskPriority {
    /// All priorities, most urgent first.
    pub const ALL: [TaskPriority; 3] = [Self::High, Self::Medium, Self::Low];

    /// Returns the canonical string form used on the wire and in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

impl FromStr for TaskPriority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|priority| priority.as_str() == s)
            .ok_or_else(|| ValidationError::invalid_enum("priority", s))
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A card on the Kanban board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Identifier assigned by the backing store. Never reused.
    pub id: i64,
    /// Short title, never empty.
    pub title: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Current column.
    #[serde(default)]
    pub status: TaskStatus,
    /// Urgency.
    #[serde(default)]
    pub priority: TaskPriority,
    /// Due date as entered by the user; not validated.
    #[serde(default)]
    pub due_date: Option<String>,
    /// When the store inserted this record.
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Creates a task with default description, status, priority and no due
    /// date.
    pub fn new(id: i64, title: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: title.into(),
            description: String::new(),
            status: TaskStatus::default(),
            priority: TaskPriority::default(),
            due_date: None,
            created_at,
        }
    }

    /// Sets the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the status
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the priority
    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the due date
    pub fn with_due_date(mut self, due_date: impl Into<String>) -> Self {
        self.due_date = Some(due_date.into());
        self
    }

    /// Flattens the task into a field name to primitive value mapping.
    pub fn to_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("id".into(), Value::from(self.id));
        fields.insert("title".into(), Value::from(self.title.clone()));
        fields.insert("description".into(), Value::from(self.description.clone()));
        fields.insert("status".into(), Value::from(self.status.as_str()));
        fields.insert("priority".into(), Value::from(self.priority.as_str()));
        fields.insert(
            "due_date".into(),
            self.due_date.clone().map_or(Value::Null, Value::from),
        );
        fields.insert("created_at".into(), Value::from(self.created_at.to_rfc3339()));
        fields
    }

    /// Merges loose fields into this task.
    ///
    /// Lenient: only recognized, mutable keys whose values fit the field are
    /// applied. Everything else is skipped without an error. Use
    /// [`TaskUpdate::from_fields`] where input must be rejected instead.
    pub fn merge_fields(&mut self, fields: &Map<String, Value>) {
        for (key, value) in fields {
            match (key.as_str(), value) {
                ("title", Value::String(title)) if !title.trim().is_empty() => {
                    self.title = title.clone();
                }
                ("description", Value::String(description)) => {
                    self.description = description.clone();
                }
                ("status", Value::String(status)) => {
                    if let Ok(status) = status.parse() {
                        self.status = status;
                    }
                }
                ("priority", Value::String(priority)) => {
                    if let Ok(priority) = priority.parse() {
                        self.priority = priority;
                    }
                }
                ("due_date", Value::String(due_date)) => self.due_date = Some(due_date.clone()),
                ("due_date", Value::Null) => self.due_date = None,
                _ => {}
            }
        }
    }

    /// Applies a validated partial update. Fields left `None` are untouched.
    pub fn apply(&mut self, update: &TaskUpdate) {
        if let Some(title) = &update.title {
            self.title = title.clone();
        }
        if let Some(description) = &update.description {
            self.description = description.clone();
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        if let Some(due_date) = &update.due_date {
            self.due_date = due_date.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample() -> Task {
        Task::new(7, "Write docs", Utc::now())
    }

    #[test]
    fn test_task_defaults() {
        let task = sample();
        assert_eq!(task.description, "");
        assert_eq!(task.status, TaskStatus::ToDo);
        assert_eq!(task.priority, TaskPriority::Medium);
        assert_eq!(task.due_date, None);
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("In Progress".parse::<TaskStatus>(), Ok(TaskStatus::InProgress));
        assert_eq!(
            "in progress".parse::<TaskStatus>(),
            Err(ValidationError::invalid_enum("status", "in progress"))
        );
        assert!("Planned".parse::<TaskStatus>().is_err());
        assert_eq!("Low".parse::<TaskPriority>(), Ok(TaskPriority::Low));
        assert!("Urgent".parse::<TaskPriority>().is_err());
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_value(TaskStatus::ToDo).unwrap(), json!("To Do"));
        assert_eq!(
            serde_json::from_value::<TaskStatus>(json!("Done")).unwrap(),
            TaskStatus::Done
        );
    }

    #[test]
    fn test_to_fields_uses_wire_strings() {
        let task = sample()
            .with_status(TaskStatus::InProgress)
            .with_priority(TaskPriority::High)
            .with_due_date("2024-05-01");
        let fields = task.to_fields();

        assert_eq!(fields["id"], json!(7));
        assert_eq!(fields["status"], json!("In Progress"));
        assert_eq!(fields["priority"], json!("High"));
        assert_eq!(fields["due_date"], json!("2024-05-01"));
        assert_eq!(fields["description"], json!(""));
        assert!(fields["created_at"].is_string());
    }

    #[test]
    fn test_merge_fields_is_lenient() {
        let mut task = sample();
        let original = task.clone();
        let fields = json!({
            "status": "Done",
            "priority": "Whenever",
            "colour": "red",
            "id": 99,
            "due_date": "tomorrow"
        });
        task.merge_fields(fields.as_object().unwrap());

        assert_eq!(task.status, TaskStatus::Done);
        assert_eq!(task.priority, original.priority);
        assert_eq!(task.id, 7);
        assert_eq!(task.due_date.as_deref(), Some("tomorrow"));
        assert_eq!(task.created_at, original.created_at);
    }

    #[test]
    fn test_apply_only_touches_supplied_fields() {
        let mut task = sample().with_description("keep me").with_due_date("2024-01-01");
        let update = TaskUpdate::new().status(TaskStatus::Done).due_date(None);
        task.apply(&update);

        assert_eq!(task.status, TaskStatus::Done);
        assert_eq!(task.description, "keep me");
        assert_eq!(task.due_date, None);
        assert_eq!(task.title, "Write docs");
    }
}
