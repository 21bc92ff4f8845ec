//! Task store error types.

use std::path::PathBuf;

use entities::ValidationError;
use thiserror::Error;

/// Errors in the store configuration. These are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The connection string could not be parsed or lacks a required part.
    #[error("Invalid DATABASE_URL: {0}")]
    InvalidDatabaseUrl(String),

    /// The connection string names a backend we do not support.
    #[error("Unsupported DATABASE_URL scheme: {0}")]
    UnsupportedScheme(String),

    /// A credential required by the remote backend is not set.
    #[error("{0} must be set to use a remote database")]
    MissingCredentials(&'static str),

    /// The remote service URL is not a valid base URL.
    #[error("Invalid service URL {url}: {reason}")]
    InvalidServiceUrl { url: String, reason: String },

    /// The HTTP client could not be built from the given settings.
    #[error("Failed to build remote client: {0}")]
    Client(String),
}

/// Errors that can occur during task store operations.
#[derive(Debug, Error)]
pub enum TaskStoreError {
    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Caller input rejected before reaching the store.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The store could not be reached. Safe to retry.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    /// The remote service answered with an error status.
    #[error("Remote store returned {status}: {message}")]
    Remote { status: u16, message: String },

    /// A stored record does not decode into a task.
    #[error("Invalid task record: {0}")]
    InvalidRow(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The embedded store's directory could not be prepared.
    #[error("Failed to prepare storage at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TaskStoreError {
    /// Creates an invalid row error.
    pub fn invalid_row(reason: impl Into<String>) -> Self {
        Self::InvalidRow(reason.into())
    }

    /// Whether the caller may retry the same operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    /// Whether the error is the caller's fault.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

// Primary result codes; extended codes carry them in the low byte.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

fn is_contention(code: Option<&str>) -> bool {
    code.and_then(|c| c.parse::<i32>().ok())
        .is_some_and(|c| matches!(c & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
}

impl From<sqlx::Error> for TaskStoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                Self::Unavailable(err.to_string())
            }
            sqlx::Error::Database(db) if is_contention(db.code().as_deref()) => {
                Self::Unavailable(err.to_string())
            }
            _ => Self::Database(err),
        }
    }
}

impl From<reqwest::Error> for TaskStoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() || err.is_request() {
            return Self::Unavailable(err.to_string());
        }
        if err.is_decode() {
            return Self::InvalidRow(err.to_string());
        }
        match err.status() {
            Some(status) => Self::Remote {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => Self::Unavailable(err.to_string()),
        }
    }
}

/// Result type for task store operations.
pub type TaskStoreResult<T> = Result<T, TaskStoreError>;
