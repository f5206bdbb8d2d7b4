//! In-memory platform for testing and local dry runs.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use catapult_models::{Identity, Project, ProjectState, SourceRepo};
use uuid::Uuid;

use super::{overview_url, PlatformClient};
use crate::error::PlatformError;

#[derive(Debug)]
struct StoredProject {
    project: Project,
    /// Reads left before a Requested project turns Active
    reads_until_active: u32,
}

#[derive(Debug, Default)]
struct PlatformState {
    projects: HashMap<String, StoredProject>,
    /// Accepted platform tokens; `None` accepts any non-empty token
    tokens: Option<HashSet<String>>,
    activation_reads: u32,
    create_delay: Option<Duration>,
    read_delay: Option<Duration>,
}

/// In-memory platform.
///
/// Projects live in a map keyed by name. Call counters let tests assert which
/// operations the orchestrator issued.
#[derive(Debug)]
pub struct MemoryPlatform {
    console_base: String,
    state: Mutex<PlatformState>,
    create_calls: AtomicUsize,
    get_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl MemoryPlatform {
    pub fn new(console_base: impl Into<String>) -> Self {
        Self {
            console_base: console_base.into().trim_end_matches('/').to_string(),
            state: Mutex::new(PlatformState::default()),
            create_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        }
    }

    /// Only accept the given token (may be called repeatedly).
    pub fn with_token(self, token: &str) -> Self {
        self.state()
            .tokens
            .get_or_insert_with(HashSet::new)
            .insert(token.to_string());
        self
    }

    /// New projects stay Requested for this many reads before turning Active.
    pub fn with_activation_reads(self, reads: u32) -> Self {
        self.state().activation_reads = reads;
        self
    }

    /// Every project creation sleeps before answering.
    pub fn with_delay(self, delay: Duration) -> Self {
        self.state().create_delay = Some(delay);
        self
    }

    /// Every project read sleeps before answering.
    pub fn with_read_delay(self, delay: Duration) -> Self {
        self.state().read_delay = Some(delay);
        self
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// Current view of a project without counting as a client call
    pub fn project(&self, name: &str) -> Option<Project> {
        self.state().projects.get(name).map(|p| p.project.clone())
    }

    pub fn project_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state().projects.keys().cloned().collect();
        names.sort();
        names
    }

    fn state(&self) -> MutexGuard<'_, PlatformState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn authorize(&self, state: &PlatformState, identity: &Identity) -> Result<(), PlatformError> {
        let token = identity.platform_token.as_str();
        let accepted = match &state.tokens {
            Some(tokens) => tokens.contains(token),
            None => !token.is_empty(),
        };
        if accepted {
            Ok(())
        } else {
            Err(PlatformError::Unauthorized("token rejected".to_string()))
        }
    }
}

#[async_trait]
impl PlatformClient for MemoryPlatform {
    async fn create_project(
        &self,
        name: &str,
        _source: &SourceRepo,
        identity: &Identity,
    ) -> Result<Project, PlatformError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.state().create_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        self.authorize(&state, identity)?;

        if state.projects.contains_key(name) {
            return Err(PlatformError::Conflict(name.to_string()));
        }

        let reads_until_active = state.activation_reads;
        let project = Project {
            name: name.to_string(),
            namespace_id: Uuid::new_v4().to_string(),
            console_url: self.console_url(name),
            state: if reads_until_active == 0 {
                ProjectState::Active
            } else {
                ProjectState::Requested
            },
            created_at: Some(chrono::Utc::now()),
        };
        state.projects.insert(
            name.to_string(),
            StoredProject {
                project: project.clone(),
                reads_until_active,
            },
        );
        Ok(project)
    }

    async fn get_project(
        &self,
        name: &str,
        identity: &Identity,
    ) -> Result<Option<Project>, PlatformError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.state().read_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        self.authorize(&state, identity)?;

        Ok(state.projects.get_mut(name).map(|stored| {
            if stored.project.state == ProjectState::Requested {
                stored.reads_until_active = stored.reads_until_active.saturating_sub(1);
                if stored.reads_until_active == 0 {
                    stored.project.state = ProjectState::Active;
                }
            }
            stored.project.clone()
        }))
    }

    async fn delete_project(&self, name: &str) -> Result<bool, PlatformError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.state().projects.remove(name).is_some())
    }

    fn console_url(&self, project_name: &str) -> String {
        overview_url(&self.console_base, project_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity::new("gh", "sha256~ok", "alice")
    }

    fn source() -> SourceRepo {
        SourceRepo::parse("acme/widgets").unwrap()
    }

    #[tokio::test]
    async fn test_create_conflicts_on_existing_name() {
        let platform = MemoryPlatform::new("https://console.test");
        let first = platform.create_project("widgets", &source(), &identity()).await.unwrap();
        assert!(first.is_active());

        let err = platform
            .create_project("widgets", &source(), &identity())
            .await
            .unwrap_err();
        assert!(matches!(err, PlatformError::Conflict(ref n) if n == "widgets"));
        assert_eq!(platform.project("widgets").unwrap(), first);
    }

    #[tokio::test]
    async fn test_delete_missing_project_returns_false() {
        let platform = MemoryPlatform::new("https://console.test");
        assert!(!platform.delete_project("nothing").await.unwrap());

        platform.create_project("widgets", &source(), &identity()).await.unwrap();
        assert!(platform.delete_project("widgets").await.unwrap());
        assert!(!platform.delete_project("widgets").await.unwrap());
        assert_eq!(platform.delete_calls(), 3);
    }

    #[tokio::test]
    async fn test_rejected_token_is_unauthorized() {
        let platform = MemoryPlatform::new("https://console.test").with_token("sha256~other");
        let err = platform
            .create_project("widgets", &source(), &identity())
            .await
            .unwrap_err();
        assert!(matches!(err, PlatformError::Unauthorized(_)));
        assert!(platform.project_names().is_empty());
    }

    #[tokio::test]
    async fn test_project_activates_after_reads() {
        let platform = MemoryPlatform::new("https://console.test").with_activation_reads(2);
        let created = platform.create_project("widgets", &source(), &identity()).await.unwrap();
        assert_eq!(created.state, ProjectState::Requested);

        let first = platform.get_project("widgets", &identity()).await.unwrap().unwrap();
        assert_eq!(first.state, ProjectState::Requested);
        let second = platform.get_project("widgets", &identity()).await.unwrap().unwrap();
        assert_eq!(second.state, ProjectState::Active);
    }
}
