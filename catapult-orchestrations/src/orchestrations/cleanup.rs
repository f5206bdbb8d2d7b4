//! Operator cleanup of a flung project

use crate::error::{FlingError, PlatformError};
use crate::names::{orchestrations, steps};
use crate::types::CleanupProjectOutput;

use super::bounded;
use super::fling::FlingOrchestrator;

impl FlingOrchestrator {
    /// Delete a project with operator credentials.
    ///
    /// Never invoked by [`FlingOrchestrator::fling`]. Deleting a project that
    /// does not exist succeeds with `deleted: false`.
    pub async fn cleanup_project(&self, name: &str) -> Result<CleanupProjectOutput, FlingError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PlatformError::Client("project name is required".to_string()).into());
        }

        tracing::info!(
            orchestration = orchestrations::CLEANUP_PROJECT,
            project = name,
            step = steps::DELETE_PROJECT,
            "Cleaning up project"
        );
        let deleted = bounded(
            steps::DELETE_PROJECT,
            self.settings().delete_project_timeout,
            self.platform().delete_project(name),
            |step, after| PlatformError::Timeout { step, after },
        )
        .await
        .map_err(|e| {
            tracing::error!(project = name, error = %e, "Project cleanup failed");
            FlingError::from(e)
        })?;

        tracing::info!(project = name, deleted, "Project cleanup complete");
        Ok(CleanupProjectOutput {
            project_name: name.to_string(),
            deleted,
        })
    }
}
