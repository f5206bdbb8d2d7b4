//! Fling orchestration
//!
//! Fork, create project, import, read back. Steps run strictly in sequence and
//! each one is bounded by its own timeout. Nothing is rolled back on failure:
//! a fork or project created before the failing step stays in place.

use std::sync::Arc;

use catapult_models::{FlingRequest, FlingResult, Identity, Project, ProjectState, SourceRepo};
use chrono::Utc;
use tracing::Instrument;
use uuid::Uuid;

use super::bounded;
use crate::error::{FlingError, ImportError, PlatformError, SourceControlError};
use crate::importer::Importer;
use crate::names::{orchestrations, steps};
use crate::platform::PlatformClient;
use crate::source_control::SourceControl;
use crate::types::FlingSettings;

#[derive(Clone)]
pub struct FlingOrchestrator {
    source_control: Arc<dyn SourceControl>,
    platform: Arc<dyn PlatformClient>,
    importer: Arc<dyn Importer>,
    settings: FlingSettings,
}

impl FlingOrchestrator {
    pub fn new(
        source_control: Arc<dyn SourceControl>,
        platform: Arc<dyn PlatformClient>,
        importer: Arc<dyn Importer>,
    ) -> Self {
        Self {
            source_control,
            platform,
            importer,
            settings: FlingSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: FlingSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &FlingSettings {
        &self.settings
    }

    pub(crate) fn platform(&self) -> &dyn PlatformClient {
        self.platform.as_ref()
    }

    /// Fork `request.source_repo` and deploy it as a new project.
    ///
    /// The request is validated before any client is called. Dropping the
    /// returned future stops the pipeline before its next step.
    pub async fn fling(
        &self,
        request: FlingRequest,
        identity: Identity,
    ) -> Result<FlingResult, FlingError> {
        let repo = request.validate()?;
        let project_name = repo.project_name()?;
        let fling_id = Uuid::new_v4();

        let span = tracing::info_span!(
            "fling",
            orchestration = orchestrations::FLING,
            %fling_id,
            source_repo = %repo
        );
        self.run(fling_id, repo, project_name, identity)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        fling_id: Uuid,
        repo: SourceRepo,
        project_name: String,
        identity: Identity,
    ) -> Result<FlingResult, FlingError> {
        tracing::info!(
            project = %project_name,
            user = %identity.platform_user_namespace,
            "Starting fling"
        );

        // Step 1: fork
        tracing::info!(step = steps::FORK, "Forking source repository");
        let fork = bounded(
            steps::FORK,
            self.settings.fork_timeout,
            self.source_control.fork(&repo, &identity),
            |step, after| SourceControlError::Timeout { step, after },
        )
        .await
        .map_err(|e| step_failed(steps::FORK, e.into()))?;
        tracing::info!(fork = %fork.full_name(), "Fork ready");

        // Step 2: project
        tracing::info!(step = steps::CREATE_PROJECT, project = %project_name, "Creating project");
        let project = bounded(
            steps::CREATE_PROJECT,
            self.settings.create_project_timeout,
            self.platform.create_project(&project_name, &repo, &identity),
            |step, after| PlatformError::Timeout { step, after },
        )
        .await
        .map_err(|e| step_failed(steps::CREATE_PROJECT, e.into()))?;

        // Step 3: import
        tracing::info!(step = steps::IMPORT_SOURCE, "Importing source into project");
        bounded(
            steps::IMPORT_SOURCE,
            self.settings.import_timeout,
            self.importer.import_source(&fork, &project, &identity),
            |step, after| ImportError::Timeout { step, after },
        )
        .await
        .map_err(|e| partial_failure(steps::IMPORT_SOURCE, &project.name, e.into()))?;

        // Step 4: read back
        tracing::info!(step = steps::READ_BACK_PROJECT, "Reading project back");
        let project = bounded(
            steps::READ_BACK_PROJECT,
            self.settings.read_back_timeout,
            self.wait_for_active(&project.name, &identity),
            |step, after| PlatformError::Timeout { step, after },
        )
        .await
        .map_err(|e| partial_failure(steps::READ_BACK_PROJECT, &project.name, e.into()))?;

        let redirect_url = self.platform.console_url(&project.name);
        tracing::info!(redirect = %redirect_url, "Fling complete");

        Ok(FlingResult {
            fling_id,
            fork,
            project,
            redirect_url,
            completed_at: Utc::now(),
        })
    }

    /// Poll the project until it reports Active, up to the configured number of reads
    async fn wait_for_active(
        &self,
        name: &str,
        identity: &Identity,
    ) -> Result<Project, PlatformError> {
        let max_attempts = self.settings.activation_max_attempts.max(1);
        let mut last_seen: Option<ProjectState> = None;

        for attempt in 1..=max_attempts {
            match self.platform.get_project(name, identity).await? {
                Some(project) if project.is_active() => return Ok(project),
                Some(project) => {
                    tracing::debug!(attempt, state = %project.state, "Project not active yet");
                    last_seen = Some(project.state);
                }
                None => tracing::debug!(attempt, "Project not visible yet"),
            }
            if attempt < max_attempts {
                tokio::time::sleep(self.settings.activation_poll_interval).await;
            }
        }

        match last_seen {
            Some(state) => Err(PlatformError::NotActive {
                name: name.to_string(),
                state: state.to_string(),
                attempts: max_attempts,
            }),
            None => Err(PlatformError::NotFound(name.to_string())),
        }
    }
}

fn step_failed(step: &'static str, err: FlingError) -> FlingError {
    tracing::error!(step, error = %err, "Fling step failed");
    err
}

fn partial_failure(step: &'static str, project: &str, err: FlingError) -> FlingError {
    tracing::error!(step, error = %err, "Fling step failed");
    tracing::warn!(project, "Fork and project left in place; use cleanup to remove the project");
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::MemoryImporter;
    use crate::platform::MemoryPlatform;
    use crate::source_control::MemorySourceControl;
    use catapult_models::RepoIdentifierError;
    use std::time::Duration;

    const CONSOLE: &str = "https://console.openshift.test";

    struct Harness {
        source_control: Arc<MemorySourceControl>,
        platform: Arc<MemoryPlatform>,
        importer: Arc<MemoryImporter>,
        orchestrator: FlingOrchestrator,
    }

    fn fast_settings() -> FlingSettings {
        FlingSettings {
            activation_poll_interval: Duration::from_millis(1),
            ..FlingSettings::with_step_timeout(Duration::from_secs(5))
        }
    }

    fn harness_with(
        source_control: MemorySourceControl,
        platform: MemoryPlatform,
        importer: MemoryImporter,
    ) -> Harness {
        let source_control = Arc::new(source_control);
        let platform = Arc::new(platform);
        let importer = Arc::new(importer);
        let orchestrator = FlingOrchestrator::new(
            source_control.clone(),
            platform.clone(),
            importer.clone(),
        )
        .with_settings(fast_settings());
        Harness {
            source_control,
            platform,
            importer,
            orchestrator,
        }
    }

    fn github() -> MemorySourceControl {
        MemorySourceControl::new()
            .with_user("gho_alice", "alice")
            .with_repository("acme/widgets", Some("Java"))
    }

    fn harness() -> Harness {
        harness_with(github(), MemoryPlatform::new(CONSOLE), MemoryImporter::new())
    }

    fn identity() -> Identity {
        Identity::new("gho_alice", "sha256~alice", "alice")
    }

    fn assert_untouched(h: &Harness) {
        assert_eq!(h.source_control.fork_calls(), 0);
        assert_eq!(h.platform.create_calls(), 0);
        assert_eq!(h.platform.get_calls(), 0);
        assert_eq!(h.importer.import_calls(), 0);
    }

    #[tokio::test]
    async fn test_fling_acme_widgets() {
        let h = harness();
        let result = h
            .orchestrator
            .fling(FlingRequest::new("acme/widgets"), identity())
            .await
            .unwrap();

        assert_eq!(result.fork.owner, "alice");
        assert_eq!(result.fork.name, "widgets");
        assert_eq!(result.project.name, "widgets");
        assert!(result.project.is_active());
        assert_eq!(
            result.redirect_url,
            "https://console.openshift.test/console/project/widgets/overview"
        );
        assert!(result.redirect_url.starts_with(CONSOLE));

        let imports = h.importer.imports();
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].project_name, "widgets");
        assert_eq!(imports[0].builder.name, "wildfly");
    }

    #[tokio::test]
    async fn test_invalid_requests_make_no_calls() {
        let h = harness();
        for request in [
            FlingRequest::default(),
            FlingRequest::new(""),
            FlingRequest::new("widgets"),
            FlingRequest::new("acme/widgets/extra"),
            FlingRequest::new("acme/wid gets"),
        ] {
            let err = h.orchestrator.fling(request, identity()).await.unwrap_err();
            assert!(matches!(err, FlingError::InvalidRequest(_)), "{:?}", err);
        }
        assert_untouched(&h);
    }

    #[tokio::test]
    async fn test_missing_source_repo_reason() {
        let h = harness();
        let err = h
            .orchestrator
            .fling(FlingRequest::default(), identity())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FlingError::InvalidRequest(RepoIdentifierError::Missing)
        ));
    }

    #[tokio::test]
    async fn test_second_fling_conflicts_and_keeps_first_project() {
        let h = harness();
        let first = h
            .orchestrator
            .fling(FlingRequest::new("acme/widgets"), identity())
            .await
            .unwrap();

        let err = h
            .orchestrator
            .fling(FlingRequest::new("acme/widgets"), identity())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FlingError::Platform(PlatformError::Conflict(ref name)) if name == "widgets"
        ));

        assert_eq!(h.platform.project("widgets").unwrap(), first.project);
        assert_eq!(h.source_control.fork_calls(), 2);
        assert_eq!(h.source_control.forks(), vec![first.fork]);
        assert_eq!(h.importer.import_calls(), 1);
    }

    #[tokio::test]
    async fn test_import_failure_leaves_project_active() {
        let h = harness_with(
            github(),
            MemoryPlatform::new(CONSOLE),
            MemoryImporter::failing("no builder for this source"),
        );
        let err = h
            .orchestrator
            .fling(FlingRequest::new("acme/widgets"), identity())
            .await
            .unwrap_err();

        assert!(matches!(err, FlingError::Import(ImportError::Rejected { .. })));
        let project = h.platform.project("widgets").unwrap();
        assert!(project.is_active());
        assert_eq!(h.platform.delete_calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_repository_stops_before_project() {
        let h = harness();
        let err = h
            .orchestrator
            .fling(FlingRequest::new("acme/gadgets"), identity())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            FlingError::SourceControl(SourceControlError::RepositoryNotFound(ref r)) if r == "acme/gadgets"
        ));
        assert_eq!(h.platform.create_calls(), 0);
        assert_eq!(h.importer.import_calls(), 0);
    }

    #[tokio::test]
    async fn test_rejected_tokens_are_unauthorized() {
        let h = harness();
        let err = h
            .orchestrator
            .fling(
                FlingRequest::new("acme/widgets"),
                Identity::new("gho_mallory", "sha256~alice", "mallory"),
            )
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(h.platform.create_calls(), 0);

        let h = harness_with(
            github(),
            MemoryPlatform::new(CONSOLE).with_token("sha256~someone-else"),
            MemoryImporter::new(),
        );
        let err = h
            .orchestrator
            .fling(FlingRequest::new("acme/widgets"), identity())
            .await
            .unwrap_err();
        assert!(matches!(err, FlingError::Platform(PlatformError::Unauthorized(_))));
        assert_eq!(h.importer.import_calls(), 0);
    }

    #[tokio::test]
    async fn test_fork_timeout_surfaces_as_source_control_error() {
        let mut h = harness_with(
            github().with_delay(Duration::from_millis(500)),
            MemoryPlatform::new(CONSOLE),
            MemoryImporter::new(),
        );
        h.orchestrator = h.orchestrator.clone().with_settings(FlingSettings {
            fork_timeout: Duration::from_millis(20),
            ..fast_settings()
        });

        let err = h
            .orchestrator
            .fling(FlingRequest::new("acme/widgets"), identity())
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(matches!(
            err,
            FlingError::SourceControl(SourceControlError::Timeout { step: "fork", .. })
        ));
        assert_eq!(h.platform.create_calls(), 0);
    }

    fn short_timeouts() -> FlingSettings {
        FlingSettings {
            activation_poll_interval: Duration::from_millis(1),
            ..FlingSettings::with_step_timeout(Duration::from_millis(50))
        }
    }

    #[tokio::test]
    async fn test_create_project_timeout_surfaces_as_platform_error() {
        let mut h = harness_with(
            github(),
            MemoryPlatform::new(CONSOLE).with_delay(Duration::from_secs(5)),
            MemoryImporter::new(),
        );
        h.orchestrator = h.orchestrator.clone().with_settings(short_timeouts());

        let err = h
            .orchestrator
            .fling(FlingRequest::new("acme/widgets"), identity())
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(matches!(
            err,
            FlingError::Platform(PlatformError::Timeout { step: "create-project", after })
                if after == Duration::from_millis(50)
        ));
        assert_eq!(h.importer.import_calls(), 0);
    }

    #[tokio::test]
    async fn test_import_timeout_surfaces_as_import_error() {
        let mut h = harness_with(
            github(),
            MemoryPlatform::new(CONSOLE),
            MemoryImporter::new().with_delay(Duration::from_secs(5)),
        );
        h.orchestrator = h.orchestrator.clone().with_settings(short_timeouts());

        let err = h
            .orchestrator
            .fling(FlingRequest::new("acme/widgets"), identity())
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(matches!(
            err,
            FlingError::Import(ImportError::Timeout { step: "import-source", .. })
        ));
        assert!(h.platform.project("widgets").unwrap().is_active());
        assert_eq!(h.platform.get_calls(), 0);
        assert_eq!(h.platform.delete_calls(), 0);
    }

    #[tokio::test]
    async fn test_read_back_timeout_surfaces_as_platform_error() {
        let mut h = harness_with(
            github(),
            MemoryPlatform::new(CONSOLE).with_read_delay(Duration::from_secs(5)),
            MemoryImporter::new(),
        );
        h.orchestrator = h.orchestrator.clone().with_settings(short_timeouts());

        let err = h
            .orchestrator
            .fling(FlingRequest::new("acme/widgets"), identity())
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(matches!(
            err,
            FlingError::Platform(PlatformError::Timeout { step: "read-back-project", .. })
        ));
        assert_eq!(h.importer.import_calls(), 1);
        assert_eq!(h.platform.delete_calls(), 0);
    }

    #[tokio::test]
    async fn test_read_back_waits_for_activation() {
        let h = harness_with(
            github(),
            MemoryPlatform::new(CONSOLE).with_activation_reads(3),
            MemoryImporter::new(),
        );
        let result = h
            .orchestrator
            .fling(FlingRequest::new("acme/widgets"), identity())
            .await
            .unwrap();

        assert!(result.project.is_active());
        assert_eq!(h.platform.get_calls(), 3);
    }

    #[tokio::test]
    async fn test_read_back_gives_up_when_never_active() {
        let mut h = harness_with(
            github(),
            MemoryPlatform::new(CONSOLE).with_activation_reads(50),
            MemoryImporter::new(),
        );
        h.orchestrator = h.orchestrator.clone().with_settings(FlingSettings {
            activation_max_attempts: 3,
            ..fast_settings()
        });

        let err = h
            .orchestrator
            .fling(FlingRequest::new("acme/widgets"), identity())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FlingError::Platform(PlatformError::NotActive { attempts: 3, ref state, .. }) if state == "requested"
        ));
        assert_eq!(h.platform.get_calls(), 3);
        assert_eq!(h.importer.import_calls(), 1);
    }

    #[tokio::test]
    async fn test_refling_after_fork_deleted() {
        let h = harness();
        let first = h
            .orchestrator
            .fling(FlingRequest::new("acme/widgets"), identity())
            .await
            .unwrap();

        assert!(h.source_control.delete_fork("alice", "acme/widgets"));
        h.orchestrator.cleanup_project("widgets").await.unwrap();

        let second = h
            .orchestrator
            .fling(FlingRequest::new("acme/widgets"), identity())
            .await
            .unwrap();
        assert_eq!(second.fork, first.fork);
        assert_ne!(second.fling_id, first.fling_id);
        assert_eq!(h.source_control.forks().len(), 1);
    }

    #[tokio::test]
    async fn test_dropped_fling_runs_no_further_steps() {
        let h = harness_with(
            github().with_delay(Duration::from_millis(200)),
            MemoryPlatform::new(CONSOLE),
            MemoryImporter::new(),
        );

        let abandoned = tokio::time::timeout(
            Duration::from_millis(20),
            h.orchestrator
                .fling(FlingRequest::new("acme/widgets"), identity()),
        )
        .await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(h.source_control.fork_calls(), 1);
        assert_eq!(h.platform.create_calls(), 0);
        assert!(h.platform.project_names().is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_project() {
        let h = harness();
        h.orchestrator
            .fling(FlingRequest::new("acme/widgets"), identity())
            .await
            .unwrap();

        let output = h.orchestrator.cleanup_project("widgets").await.unwrap();
        assert!(output.deleted);
        assert_eq!(output.project_name, "widgets");
        assert!(h.platform.project("widgets").is_none());

        let output = h.orchestrator.cleanup_project("widgets").await.unwrap();
        assert!(!output.deleted);
        assert_eq!(h.platform.delete_calls(), 2);
    }

    #[tokio::test]
    async fn test_fling_never_deletes_projects() {
        let h = harness();
        h.orchestrator
            .fling(FlingRequest::new("acme/widgets"), identity())
            .await
            .unwrap();
        let _ = h
            .orchestrator
            .fling(FlingRequest::new("acme/widgets"), identity())
            .await;
        assert_eq!(h.platform.delete_calls(), 0);
    }
}
