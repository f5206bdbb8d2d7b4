//! Platform (cluster) clients
//!
//! [`OpenShiftPlatform`] manages OpenShift projects; [`MemoryPlatform`] keeps
//! projects in a map for tests and dry runs.

mod memory;
mod openshift;

pub use memory::MemoryPlatform;
pub use openshift::OpenShiftPlatform;

use async_trait::async_trait;
use catapult_models::{Identity, Project, SourceRepo};

use crate::error::PlatformError;

#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Create a project owned by the caller for a fling of `source`.
    ///
    /// Fails with [`PlatformError::Conflict`] if the name is taken and with
    /// [`PlatformError::Unauthorized`] if the caller's token is rejected.
    /// Never retried silently on conflict.
    async fn create_project(
        &self,
        name: &str,
        source: &SourceRepo,
        identity: &Identity,
    ) -> Result<Project, PlatformError>;

    /// Read a project back as the caller sees it
    async fn get_project(
        &self,
        name: &str,
        identity: &Identity,
    ) -> Result<Option<Project>, PlatformError>;

    /// Delete a project with operator credentials.
    ///
    /// Returns `false` if the project did not exist. Used by cleanup paths
    /// only, never by the fling pipeline.
    async fn delete_project(&self, name: &str) -> Result<bool, PlatformError>;

    /// Console URL of the project's overview page.
    ///
    /// Built from configuration, no round trip.
    fn console_url(&self, project_name: &str) -> String;
}

/// `<console>/console/project/<name>/overview`
pub fn overview_url(console_base: &str, project_name: &str) -> String {
    format!(
        "{}/console/project/{}/overview",
        console_base.trim_end_matches('/'),
        project_name
    )
}
