//! Shared test fixtures: the repository contract and a fake hosted service.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use entities::{NewTask, TaskPriority, TaskStatus, TaskUpdate, ValidationError};
use serde_json::{json, Map, Value};
use wiremock::{matchers::path, Mock, MockServer, Request, Respond, ResponseTemplate};

use crate::{TaskRepository, TaskStoreError};

pub(crate) const TABLE_PATH: &str = "/rest/v1/tasks";
pub(crate) const API_KEY: &str = "test-service-key";

fn object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

/// Properties every backend must satisfy on an empty store.
pub(crate) async fn check_contract(repo: &dyn TaskRepository) {
    // create then get echoes every field
    let created = repo
        .create(
            NewTask::new("Plan sprint")
                .description("Pick stories")
                .status(TaskStatus::InProgress)
                .priority(TaskPriority::High)
                .due_date("2024-07-01"),
        )
        .await
        .unwrap();
    assert!(created.id > 0);
    assert_eq!(created.title, "Plan sprint");
    assert_eq!(created.description, "Pick stories");
    assert_eq!(created.status, TaskStatus::InProgress);
    assert_eq!(created.priority, TaskPriority::High);
    assert_eq!(created.due_date.as_deref(), Some("2024-07-01"));
    assert_eq!(repo.get(created.id).await.unwrap(), Some(created.clone()));

    // empty update is a no-op
    let unchanged = repo.update(created.id, TaskUpdate::new()).await.unwrap();
    assert_eq!(unchanged, Some(created.clone()));
    let unchanged = repo.update_from_fields(created.id, &Map::new()).await.unwrap();
    assert_eq!(unchanged, Some(created.clone()));
    assert_eq!(repo.get(created.id).await.unwrap(), Some(created.clone()));

    // a status-only update changes only the status
    let done = repo
        .update_from_fields(created.id, &object(json!({ "status": "Done" })))
        .await
        .unwrap()
        .unwrap();
    let mut expected = created.clone();
    expected.status = TaskStatus::Done;
    assert_eq!(done, expected);
    assert_eq!(repo.get(created.id).await.unwrap(), Some(expected.clone()));

    // invalid enums create nothing
    let before = repo.list().await.unwrap().len();
    let err = repo
        .create_from_fields(&object(json!({ "title": "Bad", "status": "Bogus" })))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TaskStoreError::Validation(ValidationError::InvalidEnum { field: "status", .. })
    ));
    let err = repo
        .create_from_fields(&object(json!({ "title": "Bad", "priority": "Urgent" })))
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert_eq!(repo.list().await.unwrap().len(), before);

    // typed input is validated too
    let err = repo.create(NewTask::new("  ")).await.unwrap_err();
    assert!(err.is_validation());
    let err = repo
        .update(created.id, TaskUpdate::new().title(""))
        .await
        .unwrap_err();
    assert!(err.is_validation());

    // unknown fields reject the whole update
    let err = repo
        .update_from_fields(
            created.id,
            &object(json!({ "status": "To Do", "colour": "red" })),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TaskStoreError::Validation(ValidationError::InvalidField(ref f)) if f == "colour"
    ));
    assert_eq!(repo.get(created.id).await.unwrap(), Some(expected.clone()));

    // missing ids are absent, not errors
    let missing = created.id + 1000;
    assert_eq!(repo.get(missing).await.unwrap(), None);
    assert_eq!(
        repo.update(missing, TaskUpdate::new().status(TaskStatus::Done))
            .await
            .unwrap(),
        None
    );
    assert_eq!(repo.update(missing, TaskUpdate::new()).await.unwrap(), None);
    assert!(!repo.delete(missing).await.unwrap());

    // delete is idempotent
    let other = repo.create(NewTask::new("Keep me")).await.unwrap();
    assert!(repo.delete(created.id).await.unwrap());
    assert_eq!(repo.get(created.id).await.unwrap(), None);
    assert!(!repo.delete(created.id).await.unwrap());

    let remaining: Vec<i64> = repo.list().await.unwrap().iter().map(|t| t.id).collect();
    assert_eq!(remaining, vec![other.id]);
}

/// The create, move, delete walk-through on a fresh store.
pub(crate) async fn check_concrete_scenario(repo: &dyn TaskRepository) {
    let task = repo
        .create_from_fields(&object(json!({
            "title": "A",
            "status": "To Do",
            "priority": "High"
        })))
        .await
        .unwrap();
    let mut fields = task.to_fields();
    fields.remove("created_at");
    assert_eq!(
        Value::Object(fields),
        json!({
            "id": 1,
            "title": "A",
            "description": "",
            "status": "To Do",
            "priority": "High",
            "due_date": null
        })
    );

    let moved = repo
        .update_from_fields(1, &object(json!({ "status": "In Progress" })))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(moved.id, 1);
    assert_eq!(moved.status, TaskStatus::InProgress);
    assert_eq!(moved.title, "A");
    assert_eq!(moved.priority, TaskPriority::High);

    assert!(repo.delete(1).await.unwrap());
    assert_eq!(repo.get(1).await.unwrap(), None);
}

#[derive(Default)]
struct FakeTable {
    rows: Vec<Map<String, Value>>,
    last_id: i64,
}

/// An in-process stand-in for the hosted REST endpoint over `tasks`.
///
/// Understands the subset of the protocol the remote repository speaks:
/// `id=eq.N` filters, `limit`, and row representations in responses.
#[derive(Clone, Default)]
pub(crate) struct FakeTaskService {
    table: Arc<Mutex<FakeTable>>,
}

impl FakeTaskService {
    /// Starts a mock server with the service mounted on the tasks table.
    pub(crate) async fn start() -> (MockServer, Self) {
        let server = MockServer::start().await;
        let service = Self::default();
        Mock::given(path(TABLE_PATH))
            .respond_with(service.clone())
            .mount(&server)
            .await;
        (server, service)
    }

    pub(crate) fn row_count(&self) -> usize {
        self.table.lock().unwrap().rows.len()
    }

    fn id_filter(request: &Request) -> Option<i64> {
        request
            .url
            .query_pairs()
            .find(|(key, _)| key == "id")
            .and_then(|(_, value)| value.strip_prefix("eq.").and_then(|id| id.parse().ok()))
    }

    fn matches(row: &Map<String, Value>, id: Option<i64>) -> bool {
        id.is_none_or(|id| row.get("id").and_then(Value::as_i64) == Some(id))
    }
}

impl Respond for FakeTaskService {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let authorized = request
            .headers
            .get("apikey")
            .is_some_and(|key| key.as_bytes() == API_KEY.as_bytes());
        if !authorized {
            return ResponseTemplate::new(401).set_body_json(json!({ "message": "Invalid API key" }));
        }

        let mut table = self.table.lock().unwrap();
        let id = Self::id_filter(request);

        match request.method.as_str() {
            "GET" => {
                let limit = request
                    .url
                    .query_pairs()
                    .find(|(key, _)| key == "limit")
                    .and_then(|(_, value)| value.parse().ok())
                    .unwrap_or(usize::MAX);
                let rows: Vec<_> = table
                    .rows
                    .iter()
                    .filter(|row| Self::matches(row, id))
                    .take(limit)
                    .cloned()
                    .collect();
                ResponseTemplate::new(200).set_body_json(rows)
            }
            "POST" => {
                let Ok(Value::Object(mut row)) = serde_json::from_slice(&request.body) else {
                    return ResponseTemplate::new(400);
                };
                table.last_id += 1;
                row.insert("id".into(), json!(table.last_id));
                row.insert("created_at".into(), json!(Utc::now().to_rfc3339()));
                table.rows.push(row.clone());
                ResponseTemplate::new(201).set_body_json(vec![row])
            }
            "PATCH" => {
                let Ok(Value::Object(changes)) = serde_json::from_slice(&request.body) else {
                    return ResponseTemplate::new(400);
                };
                let mut updated = Vec::new();
                for row in table.rows.iter_mut().filter(|row| Self::matches(row, id)) {
                    row.extend(changes.clone());
                    updated.push(row.clone());
                }
                ResponseTemplate::new(200).set_body_json(updated)
            }
            "DELETE" => {
                let (removed, kept) = std::mem::take(&mut table.rows)
                    .into_iter()
                    .partition(|row| Self::matches(row, id));
                table.rows = kept;
                ResponseTemplate::new(200).set_body_json::<Vec<Map<String, Value>>>(removed)
            }
            _ => ResponseTemplate::new(405),
        }
    }
}
