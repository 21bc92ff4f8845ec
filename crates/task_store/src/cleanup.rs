//! Bulk removal of finished tasks.

use entities::{TaskStatus, ValidationError};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{TaskRepository, TaskStoreResult};

/// Which Done tasks to remove. At most one selector may be non-empty; both
/// empty means every Done task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupRequest {
    /// Remove exactly these tasks. Each must exist and be Done.
    #[serde(default)]
    pub ids: Vec<i64>,
    /// Remove every Done task except these.
    #[serde(default)]
    pub exceptions: Vec<i64>,
}

impl CleanupRequest {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn only(ids: impl Into<Vec<i64>>) -> Self {
        Self {
            ids: ids.into(),
            ..Self::default()
        }
    }

    pub fn except(exceptions: impl Into<Vec<i64>>) -> Self {
        Self {
            exceptions: exceptions.into(),
            ..Self::default()
        }
    }

    fn mode(&self) -> Result<CleanupMode, ValidationError> {
        match (self.ids.is_empty(), self.exceptions.is_empty()) {
            (false, false) => Err(ValidationError::invalid_value(
                "ids",
                "provide either ids or exceptions, not both",
            )),
            (false, true) => Ok(CleanupMode::SpecificIds),
            (true, false) => Ok(CleanupMode::AllExceptExceptions),
            (true, true) => Ok(CleanupMode::AllDoneTasks),
        }
    }
}

/// How the tasks to delete were chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupMode {
    SpecificIds,
    AllExceptExceptions,
    AllDoneTasks,
}

/// Summary of a cleanup that ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub mode: CleanupMode,
    /// Ids that were removed.
    pub deleted: Vec<i64>,
    /// Ids that vanished before we could remove them.
    pub failed: Vec<i64>,
    /// Number of Done tasks when the cleanup started.
    pub done_before: usize,
}

/// Result of a cleanup request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CleanupOutcome {
    /// There were no Done tasks.
    NothingToClean,
    /// Deletions were attempted.
    Completed(CleanupReport),
    /// Some requested ids are missing or not Done. Nothing was deleted.
    InvalidIds {
        invalid_ids: Vec<i64>,
        valid_ids: Vec<i64>,
    },
    /// Some exceptions are missing or not Done. Nothing was deleted.
    UnknownExceptions {
        invalid_exceptions: Vec<i64>,
        pending_deletions: usize,
    },
}

/// Deletes Done tasks as selected by `request`.
///
/// Selection is checked against a single listing before anything is
/// deleted; a task that disappears in between is reported in
/// [`CleanupReport::failed`].
pub async fn cleanup_done_tasks(
    repo: &dyn TaskRepository,
    request: &CleanupRequest,
) -> TaskStoreResult<CleanupOutcome> {
    let mode = request.mode()?;

    let done: Vec<i64> = repo
        .list()
        .await?
        .into_iter()
        .filter(|task| task.status == TaskStatus::Done)
        .map(|task| task.id)
        .collect();
    if done.is_empty() {
        return Ok(CleanupOutcome::NothingToClean);
    }

    let targets: Vec<i64> = match mode {
        CleanupMode::SpecificIds => {
            let valid_ids: Vec<i64> = done
                .iter()
                .copied()
                .filter(|id| request.ids.contains(id))
                .collect();
            let mut invalid_ids: Vec<i64> = request
                .ids
                .iter()
                .copied()
                .filter(|id| !done.contains(id))
                .collect();
            invalid_ids.sort_unstable();
            invalid_ids.dedup();
            if !invalid_ids.is_empty() {
                return Ok(CleanupOutcome::InvalidIds {
                    invalid_ids,
                    valid_ids,
                });
            }
            valid_ids
        }
        CleanupMode::AllExceptExceptions => {
            let targets: Vec<i64> = done
                .iter()
                .copied()
                .filter(|id| !request.exceptions.contains(id))
                .collect();
            let invalid_exceptions: Vec<i64> = request
                .exceptions
                .iter()
                .copied()
                .filter(|id| !done.contains(id))
                .collect();
            if !invalid_exceptions.is_empty() {
                return Ok(CleanupOutcome::UnknownExceptions {
                    invalid_exceptions,
                    pending_deletions: targets.len(),
                });
            }
            targets
        }
        CleanupMode::AllDoneTasks => done.clone(),
    };

    let mut deleted = Vec::new();
    let mut failed = Vec::new();
    for id in targets {
        if repo.delete(id).await? {
            deleted.push(id);
        } else {
            failed.push(id);
        }
    }

    if !failed.is_empty() {
        warn!(?failed, "Some Done tasks were already gone");
    }
    info!(?mode, deleted = deleted.len(), "Cleaned up Done tasks");

    Ok(CleanupOutcome::Completed(CleanupReport {
        mode,
        deleted,
        failed,
        done_before: done.len(),
    }))
}
