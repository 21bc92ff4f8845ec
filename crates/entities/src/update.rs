//! Typed create and partial-update requests.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::{TaskPriority, TaskStatus, ValidationError, ValidationResult};

/// The task fields a caller may write.
///
/// This is the closed allow-list used to build update statements; nothing
/// outside it ever reaches a query as an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskField {
    Title,
    Description,
    Status,
    Priority,
    DueDate,
}

impl TaskField {
    /// All writable fields in schema order.
    pub const ALL: [TaskField; 5] = [
        Self::Title,
        Self::Description,
        Self::Status,
        Self::Priority,
        Self::DueDate,
    ];

    /// Column name in the `tasks` table.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::Status => "status",
            Self::Priority => "priority",
            Self::DueDate => "due_date",
        }
    }

    /// Looks up a writable field by name.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.column() == name)
    }
}

/// A request to create a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<String>,
}

impl NewTask {
    /// Creates a request with default description, status and priority.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            status: TaskStatus::default(),
            priority: TaskPriority::default(),
            due_date: None,
        }
    }

    /// Sets the description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the status
    pub fn status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the priority
    pub fn priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the due date
    pub fn due_date(mut self, due_date: impl Into<String>) -> Self {
        self.due_date = Some(due_date.into());
        self
    }

    /// Checks invariants that the type system cannot express.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_title(&self.title)
    }

    /// Parses a create request from a wire mapping.
    ///
    /// Missing keys take their defaults. Unknown keys and store-assigned keys
    /// (`id`, `created_at`) are rejected.
    pub fn from_fields(fields: &Map<String, Value>) -> ValidationResult<Self> {
        let mut title = None;
        let mut task = Self::new(String::new());

        for (key, value) in fields {
            let field = TaskField::parse(key)
                .ok_or_else(|| ValidationError::InvalidField(key.clone()))?;
            match field {
                TaskField::Title => title = Some(expect_string(field, value)?),
                TaskField::Description => {
                    task.description = expect_optional_string(field, value)?.unwrap_or_default();
                }
                TaskField::Status => task.status = expect_string(field, value)?.parse()?,
                TaskField::Priority => task.priority = expect_string(field, value)?.parse()?,
                TaskField::DueDate => task.due_date = expect_optional_string(field, value)?,
            }
        }

        task.title = title.ok_or_else(|| ValidationError::invalid_value("title", "required"))?;
        task.validate()?;
        Ok(task)
    }
}

/// A partial update: only the `Some` fields change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    /// `Some(None)` clears the due date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<String>>,
}

impl TaskUpdate {
    /// Creates an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the title
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the status
    pub fn status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the priority
    pub fn priority(mut self, priority: TaskPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Sets or clears the due date
    pub fn due_date(mut self, due_date: Option<String>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Returns true when no field would change.
    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    /// The fields this update writes, in schema order.
    pub fn fields(&self) -> Vec<TaskField> {
        TaskField::ALL
            .into_iter()
            .filter(|field| match field {
                TaskField::Title => self.title.is_some(),
                TaskField::Description => self.description.is_some(),
                TaskField::Status => self.status.is_some(),
                TaskField::Priority => self.priority.is_some(),
                TaskField::DueDate => self.due_date.is_some(),
            })
            .collect()
    }

    /// Checks invariants that the type system cannot express.
    pub fn validate(&self) -> ValidationResult<()> {
        match &self.title {
            Some(title) => validate_title(title),
            None => Ok(()),
        }
    }

    /// Parses a partial update from a wire mapping.
    ///
    /// Every key must name a writable field; the whole mapping is validated
    /// before anything is returned, so a rejected update never half-applies.
    pub fn from_fields(fields: &Map<String, Value>) -> ValidationResult<Self> {
        let mut update = Self::new();

        for (key, value) in fields {
            let field = TaskField::parse(key)
                .ok_or_else(|| ValidationError::InvalidField(key.clone()))?;
            match field {
                TaskField::Title => update.title = Some(expect_string(field, value)?),
                TaskField::Description => {
                    update.description =
                        Some(expect_optional_string(field, value)?.unwrap_or_default());
                }
                TaskField::Status => {
                    update.status = Some(expect_string(field, value)?.parse()?);
                }
                TaskField::Priority => {
                    update.priority = Some(expect_string(field, value)?.parse()?);
                }
                TaskField::DueDate => update.due_date = Some(expect_optional_string(field, value)?),
            }
        }

        update.validate()?;
        Ok(update)
    }
}

fn validate_title(title: &str) -> ValidationResult<()> {
    if title.trim().is_empty() {
        return Err(ValidationError::invalid_value("title", "must not be empty"));
    }
    Ok(())
}

fn expect_string(field: TaskField, value: &Value) -> ValidationResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => Err(ValidationError::invalid_value(
            field.column(),
            format!("expected a string, got {other}"),
        )),
    }
}

fn expect_optional_string(field: TaskField, value: &Value) -> ValidationResult<Option<String>> {
    match value {
        Value::Null => Ok(None),
        _ => expect_string(field, value).map(Some),
    }
}
