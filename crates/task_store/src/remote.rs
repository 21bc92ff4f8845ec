//! Task repository over a hosted Postgres service's REST interface.
//!
//! The service exposes each table at `{base}/rest/v1/{table}` and filters
//! rows with `column=eq.value` query parameters. Writes ask for the affected
//! rows back with `Prefer: return=representation`.

use async_trait::async_trait;
use entities::{NewTask, Task, TaskUpdate};
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Client, Method, RequestBuilder, Response, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    record::{into_tasks, TaskRecord},
    traits::sealed,
    BackendKind, ConfigError, RemoteSettings, TaskRepository, TaskStoreError, TaskStoreResult,
};

const TABLE_PATH: &str = "rest/v1/tasks";
const RETURN_REPRESENTATION: &str = "return=representation";

/// HTTP client bound to the hosted `tasks` table.
#[derive(Debug, Clone)]
pub struct RemoteConnector {
    client: Client,
    table_url: Url,
    settings: RemoteSettings,
}

impl RemoteConnector {
    /// Builds a client that authenticates every request with the API key.
    pub fn new(settings: RemoteSettings) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();

        let mut api_key = HeaderValue::from_str(&settings.api_key)
            .map_err(|_| ConfigError::Client("API key is not a valid header value".to_string()))?;
        api_key.set_sensitive(true);
        headers.insert("apikey", api_key);

        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", settings.api_key))
            .map_err(|_| ConfigError::Client("API key is not a valid header value".to_string()))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;

        let table_url =
            settings
                .service_url
                .join(TABLE_PATH)
                .map_err(|e| ConfigError::InvalidServiceUrl {
                    url: settings.service_url.to_string(),
                    reason: e.to_string(),
                })?;

        Ok(Self {
            client,
            table_url,
            settings,
        })
    }

    /// Returns the URL of the tasks table endpoint.
    pub fn table_url(&self) -> &Url {
        &self.table_url
    }

    /// Checks that the `tasks` table answers.
    ///
    /// Failure is logged and otherwise ignored: the service may provision the
    /// table on first write.
    pub async fn ensure_table(&self) {
        match self.probe().await {
            Ok(()) => info!(database = %self.settings.describe(), "Remote task table reachable"),
            Err(e) => warn!(error = %e, "Remote task table check failed; continuing"),
        }
    }

    async fn probe(&self) -> TaskStoreResult<()> {
        let response = self
            .request(Method::GET)
            .query(&[("select", "*"), ("limit", "1")])
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    fn request(&self, method: Method) -> RequestBuilder {
        self.client.request(method, self.table_url.clone())
    }

    fn request_by_id(&self, method: Method, id: i64) -> RequestBuilder {
        self.request(method)
            .query(&[("select", "*".to_string()), ("id", format!("eq.{id}"))])
    }
}

/// Maps error statuses onto the store's error taxonomy.
async fn check_status(response: Response) -> TaskStoreResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    if status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
    {
        return Err(TaskStoreError::Unavailable(format!("{status}: {message}")));
    }
    Err(TaskStoreError::Remote {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: DeserializeOwned>(request: RequestBuilder) -> TaskStoreResult<Vec<T>> {
    let response = check_status(request.send().await?).await?;
    Ok(response.json().await?)
}

/// Task repository backed by the hosted service.
#[derive(Debug, Clone)]
pub struct RemoteTaskRepository {
    connector: RemoteConnector,
}

impl RemoteTaskRepository {
    /// Creates a repository. The connector's client is shared by all calls.
    pub fn new(connector: RemoteConnector) -> Self {
        Self { connector }
    }

    /// Builds the connector, checks the table, and returns a repository.
    pub async fn open(settings: RemoteSettings) -> TaskStoreResult<Self> {
        let connector = RemoteConnector::new(settings)?;
        connector.ensure_table().await;
        Ok(Self::new(connector))
    }

    /// Returns the underlying connector.
    pub fn connector(&self) -> &RemoteConnector {
        &self.connector
    }
}

impl sealed::Sealed for RemoteTaskRepository {}

#[async_trait]
impl TaskRepository for RemoteTaskRepository {
    fn backend(&self) -> BackendKind {
        BackendKind::Remote
    }

    async fn create(&self, task: NewTask) -> TaskStoreResult<Task> {
        task.validate()?;

        let request = self
            .connector
            .request(Method::POST)
            .query(&[("select", "*")])
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&task);
        let record = decode::<TaskRecord>(request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| TaskStoreError::invalid_row("insert returned no rows"))?;

        debug!(task_id = record.id, "Created task");
        Task::try_from(record)
    }

    async fn get(&self, id: i64) -> TaskStoreResult<Option<Task>> {
        let request = self.connector.request_by_id(Method::GET, id);
        decode::<TaskRecord>(request)
            .await?
            .into_iter()
            .next()
            .map(Task::try_from)
            .transpose()
    }

    async fn list(&self) -> TaskStoreResult<Vec<Task>> {
        let request = self.connector.request(Method::GET).query(&[("select", "*")]);
        into_tasks(decode(request).await?)
    }

    async fn update(&self, id: i64, update: TaskUpdate) -> TaskStoreResult<Option<Task>> {
        update.validate()?;
        if update.is_empty() {
            return self.get(id).await;
        }

        // The body only carries keys from the closed TaskField list.
        let request = self
            .connector
            .request_by_id(Method::PATCH, id)
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&update);
        let record = decode::<TaskRecord>(request).await?.into_iter().next();

        debug!(task_id = id, fields = ?update.fields(), found = record.is_some(), "Updated task");
        record.map(Task::try_from).transpose()
    }

    async fn delete(&self, id: i64) -> TaskStoreResult<bool> {
        let request = self
            .connector
            .request_by_id(Method::DELETE, id)
            .header("Prefer", RETURN_REPRESENTATION);
        let deleted = !decode::<Value>(request).await?.is_empty();

        debug!(task_id = id, deleted, "Deleted task");
        Ok(deleted)
    }
}
