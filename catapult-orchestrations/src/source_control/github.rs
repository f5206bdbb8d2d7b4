//! GitHub REST client

use std::time::Duration;

use async_trait::async_trait;
use catapult_models::{ForkResult, Identity, SourceRepo};
use reqwest::header::{HeaderMap, ACCEPT, RETRY_AFTER};
use reqwest::{Method, Response, StatusCode};
use serde::Deserialize;

use super::SourceControl;
use crate::error::SourceControlError;
use crate::names::steps;
use crate::retry::RetryPolicy;

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";

#[derive(Debug, Deserialize)]
struct GitHubUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct GitHubRepoRef {
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct GitHubRepository {
    name: String,
    full_name: String,
    owner: GitHubUser,
    clone_url: String,
    html_url: String,
    language: Option<String>,
    #[serde(default)]
    fork: bool,
    parent: Option<GitHubRepoRef>,
}

impl GitHubRepository {
    fn is_fork_of(&self, source: &GitHubRepository) -> bool {
        self.fork
            && self
                .parent
                .as_ref()
                .is_some_and(|parent| parent.full_name.eq_ignore_ascii_case(&source.full_name))
    }

    fn into_fork_result(self) -> ForkResult {
        ForkResult {
            url: self.clone_url,
            html_url: self.html_url,
            owner: self.owner.login,
            name: self.name,
            language: self.language,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GitHubErrorBody {
    message: String,
}

/// Forks repositories through the GitHub REST API using the caller's token.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    request_timeout: Duration,
    retry: RetryPolicy,
}

impl GitHubClient {
    pub fn new(
        api_url: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, SourceControlError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("catapult/", env!("CARGO_PKG_VERSION")))
            .timeout(request_timeout)
            .build()
            .map_err(|e| SourceControlError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            request_timeout,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Send a request, retrying while the host reports rate limiting.
    async fn send(
        &self,
        method: Method,
        path: &str,
        identity: &Identity,
    ) -> Result<Response, SourceControlError> {
        let url = format!("{}{}", self.api_url, path);
        let mut attempt = 1;

        loop {
            let response = self
                .http
                .request(method.clone(), &url)
                .bearer_auth(&identity.source_control_token)
                .header(ACCEPT, GITHUB_MEDIA_TYPE)
                .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
                .send()
                .await
                .map_err(|e| self.transport_error(e))?;

            if !is_rate_limited(response.status(), response.headers()) {
                return Ok(response);
            }

            if !self.retry.should_retry(attempt) {
                tracing::warn!(%url, attempt, "GitHub rate limit persisted, giving up");
                return Err(SourceControlError::RateLimited { attempts: attempt });
            }

            let delay = self
                .retry
                .delay_with_hint(attempt, retry_after(response.headers()));
            tracing::warn!(
                %url,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "GitHub rate limited, backing off"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    fn transport_error(&self, err: reqwest::Error) -> SourceControlError {
        if err.is_timeout() {
            SourceControlError::Timeout {
                step: steps::FORK,
                after: self.request_timeout,
            }
        } else {
            SourceControlError::Transport(err.to_string())
        }
    }

    async fn authenticated_login(&self, identity: &Identity) -> Result<String, SourceControlError> {
        let response = self.send(Method::GET, "/user", identity).await?;
        if !response.status().is_success() {
            return Err(error_from_response(response, || {
                SourceControlError::Unauthorized("Authenticated user not found".to_string())
            })
            .await);
        }
        let user: GitHubUser = self.decode(response).await?;
        Ok(user.login)
    }

    async fn get_repository(
        &self,
        full_name: &str,
        identity: &Identity,
    ) -> Result<Option<GitHubRepository>, SourceControlError> {
        let response = self
            .send(Method::GET, &format!("/repos/{}", full_name), identity)
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let full_name = full_name.to_string();
            return Err(error_from_response(response, move || {
                SourceControlError::RepositoryNotFound(full_name)
            })
            .await);
        }
        Ok(Some(self.decode(response).await?))
    }

    async fn create_fork(
        &self,
        source: &GitHubRepository,
        identity: &Identity,
    ) -> Result<GitHubRepository, SourceControlError> {
        let response = self
            .send(
                Method::POST,
                &format!("/repos/{}/forks", source.full_name),
                identity,
            )
            .await?;
        if !response.status().is_success() {
            let full_name = source.full_name.clone();
            return Err(error_from_response(response, move || {
                SourceControlError::RepositoryNotFound(full_name)
            })
            .await);
        }
        self.decode(response).await
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        &self,
        response: Response,
    ) -> Result<T, SourceControlError> {
        let status = response.status().as_u16();
        response
            .json::<T>()
            .await
            .map_err(|e| SourceControlError::Unexpected {
                status,
                message: format!("Failed to decode GitHub response: {}", e),
            })
    }
}

#[async_trait]
impl SourceControl for GitHubClient {
    async fn fork(
        &self,
        repo: &SourceRepo,
        identity: &Identity,
    ) -> Result<ForkResult, SourceControlError> {
        let login = self.authenticated_login(identity).await?;
        tracing::debug!(%login, "Authenticated against GitHub");

        let source = self
            .get_repository(&repo.full_name(), identity)
            .await?
            .ok_or_else(|| SourceControlError::RepositoryNotFound(repo.full_name()))?;

        if source.owner.login.eq_ignore_ascii_case(&login) {
            tracing::info!(repo = %source.full_name, "Caller owns the source repository, using it directly");
            return Ok(source.into_fork_result());
        }

        // An earlier fling may already have forked this repository
        let candidate = format!("{}/{}", login, source.name);
        if let Some(existing) = self.get_repository(&candidate, identity).await? {
            if existing.is_fork_of(&source) {
                tracing::info!(fork = %existing.full_name, "Reusing existing fork");
                return Ok(existing.into_fork_result());
            }
        }

        let fork = self.create_fork(&source, identity).await?;
        tracing::info!(fork = %fork.full_name, source = %source.full_name, "Fork created");
        Ok(fork.into_fork_result())
    }
}

fn is_rate_limited(status: StatusCode, headers: &HeaderMap) -> bool {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return true;
    }
    if status != StatusCode::FORBIDDEN {
        return false;
    }
    // primary limit exhausted, or a secondary limit that only sends Retry-After
    let exhausted = headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "0");
    exhausted || headers.contains_key(RETRY_AFTER)
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

async fn error_from_response(
    response: Response,
    not_found: impl FnOnce() -> SourceControlError,
) -> SourceControlError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<GitHubErrorBody>(&body)
        .map(|b| b.message)
        .unwrap_or(body);

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SourceControlError::Unauthorized(message),
        StatusCode::NOT_FOUND => not_found(),
        _ => SourceControlError::Unexpected {
            status: status.as_u16(),
            message,
        },
    }
}
