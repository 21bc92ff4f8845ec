//! Store configuration and backend selection.

use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::ConfigError;

/// Settings that decide where tasks are persisted.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Connection string. Unset selects the embedded store.
    #[serde(default)]
    pub database_url: Option<String>,

    /// SQLite file used when no connection string is given
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Base URL of the hosted service (remote backend only)
    #[serde(default)]
    pub supabase_url: Option<String>,

    /// API key for the hosted service (remote backend only)
    #[serde(default)]
    pub supabase_key: Option<String>,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("instance").join("miniban.sqlite")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            database_path: default_database_path(),
            supabase_url: None,
            supabase_key: None,
        }
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("database_url", &self.database_url.as_ref().map(|_| "<redacted>"))
            .field("database_path", &self.database_path)
            .field("supabase_url", &self.supabase_url)
            .field("supabase_key", &self.supabase_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl StoreConfig {
    /// Loads configuration from the environment, honouring a `.env` file.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    ///
    /// Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let mut config = Self::default();
        config.database_url = get("DATABASE_URL");
        if let Some(path) = get("DATABASE") {
            config.database_path = PathBuf::from(path);
        }
        config.supabase_url = get("SUPABASE_URL");
        config.supabase_key = get("SUPABASE_KEY");
        config
    }

    /// Decides which backend this configuration selects.
    pub fn backend(&self) -> Result<BackendSelection, ConfigError> {
        let Some(url) = self.database_url.as_deref().map(str::trim) else {
            return Ok(BackendSelection::Embedded {
                path: self.database_path.clone(),
            });
        };

        if let Some(rest) = url.strip_prefix("sqlite:") {
            return sqlite_path(rest).map(|path| BackendSelection::Embedded { path });
        }

        match url.split_once("://").map(|(scheme, _)| scheme) {
            Some("postgres" | "postgresql") => {
                let connection = postgres_url(url)?;
                let service_url = self
                    .supabase_url
                    .as_deref()
                    .ok_or(ConfigError::MissingCredentials("SUPABASE_URL"))?;
                let api_key = self
                    .supabase_key
                    .clone()
                    .ok_or(ConfigError::MissingCredentials("SUPABASE_KEY"))?;

                Ok(BackendSelection::Remote(RemoteSettings {
                    connection,
                    service_url: service_url_base(service_url)?,
                    api_key,
                }))
            }
            Some(scheme) => Err(ConfigError::UnsupportedScheme(scheme.to_string())),
            None => Err(ConfigError::InvalidDatabaseUrl(
                "expected <scheme>://... or sqlite:<path>".to_string(),
            )),
        }
    }
}

fn sqlite_path(rest: &str) -> Result<PathBuf, ConfigError> {
    let rest = rest.strip_prefix("//").unwrap_or(rest);
    let path = rest.split('?').next().unwrap_or_default();

    if path.is_empty() {
        return Err(ConfigError::InvalidDatabaseUrl(
            "sqlite URL has no file path".to_string(),
        ));
    }
    if path == ":memory:" {
        return Err(ConfigError::InvalidDatabaseUrl(
            "in-memory SQLite cannot be shared between connections".to_string(),
        ));
    }
    Ok(PathBuf::from(path))
}

fn postgres_url(raw: &str) -> Result<Url, ConfigError> {
    // Messages never echo the URL; it carries a password.
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidDatabaseUrl(e.to_string()))?;

    if url.username().is_empty() {
        return Err(ConfigError::InvalidDatabaseUrl("missing user name".to_string()));
    }
    if url.password().is_none_or(str::is_empty) {
        return Err(ConfigError::InvalidDatabaseUrl("missing password".to_string()));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ConfigError::InvalidDatabaseUrl("missing host".to_string()));
    }
    if url.path().trim_matches('/').is_empty() {
        return Err(ConfigError::InvalidDatabaseUrl("missing database name".to_string()));
    }
    Ok(url)
}

fn service_url_base(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidServiceUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    };

    let mut url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("expected http or https"));
    }
    if url.cannot_be_a_base() {
        return Err(invalid("not a base URL"));
    }
    // Url::join replaces the last segment unless the path ends with '/'.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Which backend a repository talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// SQLite file in the local filesystem.
    Embedded,
    /// Hosted Postgres reached over HTTP.
    Remote,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Embedded => f.write_str("embedded"),
            Self::Remote => f.write_str("remote"),
        }
    }
}

/// The resolved backend choice.
#[derive(Debug, Clone)]
pub enum BackendSelection {
    Embedded { path: PathBuf },
    Remote(RemoteSettings),
}

impl BackendSelection {
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Embedded { .. } => BackendKind::Embedded,
            Self::Remote(_) => BackendKind::Remote,
        }
    }
}

/// Validated settings for the hosted service.
#[derive(Clone)]
pub struct RemoteSettings {
    /// Postgres connection string, validated but only used for diagnostics.
    pub connection: Url,
    /// Service base URL, always ending in '/'.
    pub service_url: Url,
    pub api_key: String,
}

impl RemoteSettings {
    /// Host and database of the connection string, safe to log.
    pub fn describe(&self) -> String {
        format!(
            "{}/{}",
            self.connection.host_str().unwrap_or_default(),
            self.connection.path().trim_matches('/')
        )
    }
}

impl fmt::Debug for RemoteSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteSettings")
            .field("database", &self.describe())
            .field("service_url", &self.service_url.as_str())
            .field("api_key", &"<redacted>")
            .finish()
    }
}
