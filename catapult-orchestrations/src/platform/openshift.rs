//! OpenShift project management

use async_trait::async_trait;
use catapult_models::{Identity, Project, ProjectState, SourceRepo};
use kube::api::{Api, DeleteParams, DynamicObject, PostParams};
use serde_json::json;

use super::{overview_url, PlatformClient};
use crate::error::PlatformError;
use crate::k8s_client::{
    call_with_retry, client_with_token, operator_client, project_request_resource,
    project_resource, KubeCallError, OpenShiftSettings,
};
use crate::retry::RetryPolicy;

/// Creates projects through `ProjectRequest` with the caller's token, so the
/// caller becomes the project admin. Deletion uses operator credentials.
#[derive(Debug, Clone)]
pub struct OpenShiftPlatform {
    settings: OpenShiftSettings,
    retry: RetryPolicy,
}

impl OpenShiftPlatform {
    pub fn new(settings: OpenShiftSettings) -> Self {
        Self {
            settings,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn settings(&self) -> &OpenShiftSettings {
        &self.settings
    }

    fn user_client(&self, identity: &Identity) -> Result<kube::Client, PlatformError> {
        client_with_token(&self.settings, &identity.platform_token)
            .map_err(|e| PlatformError::Client(format!("{:#}", e)))
    }

    fn to_project(&self, object: DynamicObject) -> Project {
        let name = object.metadata.name.clone().unwrap_or_default();
        Project {
            console_url: self.console_url(&name),
            namespace_id: object.metadata.uid.clone().unwrap_or_default(),
            state: project_state(&object),
            created_at: object.metadata.creation_timestamp.as_ref().map(|t| t.0),
            name,
        }
    }
}

#[async_trait]
impl PlatformClient for OpenShiftPlatform {
    async fn create_project(
        &self,
        name: &str,
        source: &SourceRepo,
        identity: &Identity,
    ) -> Result<Project, PlatformError> {
        tracing::info!(project = name, source_repo = %source, "Requesting OpenShift project");

        let client = self.user_client(identity)?;
        let api: Api<DynamicObject> = Api::all_with(client, &project_request_resource());

        let request = project_request(name, source, identity);
        let params = PostParams::default();
        let (api, params, request) = (&api, &params, &request);

        let created = call_with_retry(&self.retry, "create project", move || {
            api.create(params, request)
        })
        .await
        .map_err(|e| platform_error(e, name))?;

        let project = self.to_project(created);
        tracing::info!(project = %project.name, state = %project.state, "OpenShift project created");
        Ok(project)
    }

    async fn get_project(
        &self,
        name: &str,
        identity: &Identity,
    ) -> Result<Option<Project>, PlatformError> {
        let client = self.user_client(identity)?;
        let api: Api<DynamicObject> = Api::all_with(client, &project_resource());
        let api = &api;

        let object = call_with_retry(&self.retry, "get project", move || api.get_opt(name))
            .await
            .map_err(|e| platform_error(e, name))?;

        Ok(object.map(|o| self.to_project(o)))
    }

    async fn delete_project(&self, name: &str) -> Result<bool, PlatformError> {
        let client = operator_client(&self.settings)
            .await
            .map_err(|e| PlatformError::Client(format!("{:#}", e)))?;
        let api: Api<DynamicObject> = Api::all_with(client, &project_resource());
        let params = DeleteParams::default();
        let (api, params) = (&api, &params);

        match call_with_retry(&self.retry, "delete project", move || api.delete(name, params)).await {
            Ok(_) => {
                tracing::info!(project = name, "OpenShift project deleted");
                Ok(true)
            }
            Err(e) if e.status_code() == Some(404) => {
                tracing::info!(project = name, "Project not found, nothing to delete");
                Ok(false)
            }
            Err(e) => Err(platform_error(e, name)),
        }
    }

    fn console_url(&self, project_name: &str) -> String {
        overview_url(&self.settings.console_url, project_name)
    }
}

/// ProjectRequest whose description records what was flung and by whom
fn project_request(name: &str, source: &SourceRepo, identity: &Identity) -> DynamicObject {
    DynamicObject::new(name, &project_request_resource()).data(json!({
        "displayName": name,
        "description": format!(
            "Flung from {} by {}",
            source.full_name(),
            identity.platform_user_namespace
        ),
    }))
}

fn project_state(object: &DynamicObject) -> ProjectState {
    let phase = object
        .data
        .get("status")
        .and_then(|status| status.get("phase"))
        .and_then(|phase| phase.as_str());

    match phase {
        Some("Active") => ProjectState::Active,
        Some("Terminating") => ProjectState::Deleted,
        _ => ProjectState::Requested,
    }
}

fn platform_error(err: KubeCallError, name: &str) -> PlatformError {
    match err {
        KubeCallError::RateLimited { attempts } => PlatformError::RateLimited { attempts },
        KubeCallError::Kube(kube::Error::Api(response)) => match response.code {
            409 => PlatformError::Conflict(name.to_string()),
            401 | 403 => PlatformError::Unauthorized(response.message),
            404 => PlatformError::NotFound(name.to_string()),
            code => PlatformError::Api {
                code,
                message: response.message,
            },
        },
        KubeCallError::Kube(e) => PlatformError::Client(e.to_string()),
    }
}
