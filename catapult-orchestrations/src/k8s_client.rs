//! Shared Kubernetes/OpenShift client utilities

use std::future::Future;

use anyhow::{Context, Result};
use kube::core::{ApiResource, GroupVersionKind};
use kube::Client;

use crate::retry::RetryPolicy;

/// Connection settings for the OpenShift API
#[derive(Debug, Clone, PartialEq)]
pub struct OpenShiftSettings {
    /// API server URL, e.g. `https://openshift.example.com:8443`
    pub api_url: String,
    /// Base URL of the web console
    pub console_url: String,
    /// Token used for operator actions (project deletion); falls back to the
    /// ambient kubeconfig / in-cluster config when absent
    pub operator_token: Option<String>,
    /// Skip TLS verification (development clusters with self-signed certs)
    pub accept_invalid_certs: bool,
}

impl OpenShiftSettings {
    pub fn new(api_url: impl Into<String>) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self {
            console_url: api_url.clone(),
            api_url,
            operator_token: None,
            accept_invalid_certs: false,
        }
    }

    pub fn with_console_url(mut self, console_url: impl Into<String>) -> Self {
        self.console_url = console_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_operator_token(mut self, token: Option<String>) -> Self {
        self.operator_token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }
}

/// Get a client from the ambient kubeconfig or in-cluster config
pub async fn get_k8s_client() -> Result<Client> {
    Client::try_default()
        .await
        .context("Failed to create Kubernetes client")
}

/// Get a client authenticated with a bearer token
pub fn client_with_token(settings: &OpenShiftSettings, token: &str) -> Result<Client> {
    let cluster_url = settings
        .api_url
        .parse()
        .with_context(|| format!("Invalid OpenShift API URL '{}'", settings.api_url))?;

    let mut config = kube::Config::new(cluster_url);
    config.accept_invalid_certs = settings.accept_invalid_certs;
    config.auth_info.token = Some(token.to_string().into());

    Client::try_from(config).context("Failed to create OpenShift client")
}

/// Get the client used for operator actions
pub async fn operator_client(settings: &OpenShiftSettings) -> Result<Client> {
    match &settings.operator_token {
        Some(token) => client_with_token(settings, token),
        None => get_k8s_client().await,
    }
}

/// `project.openshift.io/v1` Project
pub fn project_resource() -> ApiResource {
    ApiResource::from_gvk(&GroupVersionKind::gvk("project.openshift.io", "v1", "Project"))
}

/// `project.openshift.io/v1` ProjectRequest, the self-service way to create a Project
pub fn project_request_resource() -> ApiResource {
    ApiResource::from_gvk(&GroupVersionKind::gvk(
        "project.openshift.io",
        "v1",
        "ProjectRequest",
    ))
}

/// Outcome of a call that failed after rate-limit retries
#[derive(Debug)]
pub enum KubeCallError {
    RateLimited { attempts: u32 },
    Kube(kube::Error),
}

impl KubeCallError {
    /// HTTP status of an API error, if the server answered
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Kube(kube::Error::Api(response)) => Some(response.code),
            _ => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::RateLimited { attempts } => format!("rate limited after {} attempts", attempts),
            Self::Kube(kube::Error::Api(response)) => response.message.clone(),
            Self::Kube(e) => e.to_string(),
        }
    }
}

/// Run an API call, retrying while the server answers 429
pub async fn call_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    what: &str,
    mut call: F,
) -> std::result::Result<T, KubeCallError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, kube::Error>>,
{
    let mut attempt = 1;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(kube::Error::Api(response)) if response.code == 429 => {
                if !policy.should_retry(attempt) {
                    return Err(KubeCallError::RateLimited { attempts: attempt });
                }
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    what,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Platform API rate limited, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(KubeCallError::Kube(e)),
        }
    }
}
