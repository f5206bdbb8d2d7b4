//! Source-control host clients
//!
//! The orchestrator only needs one operation from the host: fork a repository
//! into the caller's namespace. [`GitHubClient`] talks to the GitHub REST API;
//! [`MemorySourceControl`] is an in-process stand-in for tests and dry runs.

mod github;
mod memory;

pub use github::{GitHubClient, DEFAULT_GITHUB_API_URL};
pub use memory::MemorySourceControl;

use async_trait::async_trait;
use catapult_models::{ForkResult, Identity, SourceRepo};

use crate::error::SourceControlError;

#[async_trait]
pub trait SourceControl: Send + Sync {
    /// Fork `repo` into the caller's namespace.
    ///
    /// A fork the caller already owns is reused and returned as a success, so
    /// calling this twice for the same repository and identity yields the same
    /// [`ForkResult`]. A missing repository is
    /// [`SourceControlError::RepositoryNotFound`]; a rejected token is
    /// [`SourceControlError::Unauthorized`].
    async fn fork(
        &self,
        repo: &SourceRepo,
        identity: &Identity,
    ) -> Result<ForkResult, SourceControlError>;
}
