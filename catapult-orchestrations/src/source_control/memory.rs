//! In-memory source-control host for testing and local dry runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use catapult_models::{ForkResult, Identity, SourceRepo};

use super::SourceControl;
use crate::error::SourceControlError;

#[derive(Debug, Default)]
struct HostState {
    /// token -> login
    users: HashMap<String, String>,
    /// "owner/repo" -> primary language
    repositories: HashMap<String, Option<String>>,
    /// (login, source "owner/repo") -> fork
    forks: HashMap<(String, String), ForkResult>,
    failure: Option<(u16, String)>,
    delay: Option<Duration>,
}

/// In-memory source-control host.
///
/// Tracks users, repositories and forks, counts calls, and can inject
/// failures or latency. Forks are keyed by caller and source repository, so
/// forking twice returns the same [`ForkResult`].
#[derive(Debug)]
pub struct MemorySourceControl {
    base_url: String,
    state: Mutex<HostState>,
    fork_calls: AtomicUsize,
}

impl Default for MemorySourceControl {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySourceControl {
    pub fn new() -> Self {
        Self {
            base_url: "https://github.test".to_string(),
            state: Mutex::new(HostState::default()),
            fork_calls: AtomicUsize::new(0),
        }
    }

    /// Register a token and the login it authenticates as.
    pub fn with_user(self, token: &str, login: &str) -> Self {
        self.state()
            .users
            .insert(token.to_string(), login.to_string());
        self
    }

    pub fn with_repository(self, full_name: &str, language: Option<&str>) -> Self {
        self.state()
            .repositories
            .insert(full_name.to_string(), language.map(str::to_string));
        self
    }

    /// Every fork attempt fails with the given status and message.
    pub fn with_failure(self, status: u16, message: &str) -> Self {
        self.state().failure = Some((status, message.to_string()));
        self
    }

    /// Every fork attempt sleeps before answering.
    pub fn with_delay(self, delay: Duration) -> Self {
        self.state().delay = Some(delay);
        self
    }

    pub fn fork_calls(&self) -> usize {
        self.fork_calls.load(Ordering::SeqCst)
    }

    pub fn forks(&self) -> Vec<ForkResult> {
        self.state().forks.values().cloned().collect()
    }

    /// Simulate the caller deleting their fork on the host.
    pub fn delete_fork(&self, login: &str, source: &str) -> bool {
        self.state()
            .forks
            .remove(&(login.to_string(), source.to_string()))
            .is_some()
    }

    fn state(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SourceControl for MemorySourceControl {
    async fn fork(
        &self,
        repo: &SourceRepo,
        identity: &Identity,
    ) -> Result<ForkResult, SourceControlError> {
        self.fork_calls.fetch_add(1, Ordering::SeqCst);

        let delay = self.state().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        if let Some((status, message)) = &state.failure {
            return Err(SourceControlError::Unexpected {
                status: *status,
                message: message.clone(),
            });
        }

        let login = state
            .users
            .get(&identity.source_control_token)
            .cloned()
            .ok_or_else(|| SourceControlError::Unauthorized("Bad credentials".to_string()))?;

        let full_name = repo.full_name();
        let language = state
            .repositories
            .get(&full_name)
            .cloned()
            .ok_or_else(|| SourceControlError::RepositoryNotFound(full_name.clone()))?;

        let key = (login.clone(), full_name);
        if let Some(existing) = state.forks.get(&key) {
            tracing::debug!(fork = %existing.full_name(), "Reusing existing fork");
            return Ok(existing.clone());
        }

        let fork = ForkResult {
            url: format!("{}/{}/{}.git", self.base_url, login, repo.repo),
            html_url: format!("{}/{}/{}", self.base_url, login, repo.repo),
            owner: login,
            name: repo.repo.clone(),
            language,
        };
        state.forks.insert(key, fork.clone());
        Ok(fork)
    }
}
