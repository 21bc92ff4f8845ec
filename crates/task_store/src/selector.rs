//! Backend selection at startup.

use std::sync::Arc;

use tracing::info;

use crate::{
    BackendSelection, RemoteTaskRepository, SqliteTaskRepository, StoreConfig, TaskRepository,
    TaskStoreResult,
};

/// Opens the repository the configuration selects.
///
/// Call this once at startup and hand the result to whatever serves
/// requests. Any configuration problem surfaces here rather than on the
/// first request, and the choice of backend never changes afterwards.
pub async fn open_repository(config: &StoreConfig) -> TaskStoreResult<Arc<dyn TaskRepository>> {
    let selection = config.backend()?;
    open_selected(selection).await
}

async fn open_selected(selection: BackendSelection) -> TaskStoreResult<Arc<dyn TaskRepository>> {
    let repository: Arc<dyn TaskRepository> = match selection {
        BackendSelection::Embedded { path } => {
            info!(path = %path.display(), "Connecting to SQLite");
            Arc::new(SqliteTaskRepository::open(path).await?)
        }
        BackendSelection::Remote(settings) => {
            info!(database = %settings.describe(), "Connecting to hosted Postgres");
            Arc::new(RemoteTaskRepository::open(settings).await?)
        }
    };
    Ok(repository)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        testing::{self, FakeTaskService, API_KEY},
        BackendKind, ConfigError, TaskStoreError,
    };

    fn embedded_config(dir: &tempfile::TempDir) -> StoreConfig {
        StoreConfig {
            database_path: dir.path().join("instance").join("miniban.sqlite"),
            ..StoreConfig::default()
        }
    }

    fn remote_config(service_url: String) -> StoreConfig {
        StoreConfig {
            database_url: Some("postgres://postgres:pw@db.example.com:6543/postgres".into()),
            supabase_url: Some(service_url),
            supabase_key: Some(API_KEY.into()),
            ..StoreConfig::default()
        }
    }

    #[tokio::test]
    async fn test_default_selects_embedded() {
        let dir = tempfile::tempdir().unwrap();
        let config = embedded_config(&dir);

        let repo = open_repository(&config).await.unwrap();
        assert_eq!(repo.backend(), BackendKind::Embedded);
        assert!(config.database_path.exists());
    }

    #[tokio::test]
    async fn test_postgres_url_selects_remote() {
        let (server, _service) = FakeTaskService::start().await;
        let repo = open_repository(&remote_config(server.uri())).await.unwrap();
        assert_eq!(repo.backend(), BackendKind::Remote);
    }

    #[tokio::test]
    async fn test_behaviour_does_not_depend_on_backend() {
        let dir = tempfile::tempdir().unwrap();
        let (server, _service) = FakeTaskService::start().await;

        for config in [embedded_config(&dir), remote_config(server.uri())] {
            let repo = open_repository(&config).await.unwrap();
            testing::check_concrete_scenario(repo.as_ref()).await;
        }
    }

    #[tokio::test]
    async fn test_bad_configuration_fails_at_startup() {
        let config = StoreConfig {
            database_url: Some("postgresql://postgres:pw@db.example.com/postgres".into()),
            ..StoreConfig::default()
        };
        let err = open_repository(&config).await.err().unwrap();
        assert!(matches!(
            err,
            TaskStoreError::Config(ConfigError::MissingCredentials(_))
        ));

        let config = StoreConfig {
            database_url: Some("redis://localhost".into()),
            ..StoreConfig::default()
        };
        assert!(matches!(
            open_repository(&config).await.err().unwrap(),
            TaskStoreError::Config(ConfigError::UnsupportedScheme(_))
        ));
    }
}
