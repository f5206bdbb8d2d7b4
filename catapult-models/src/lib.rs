use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Maximum length of a platform project name (DNS-1123 label)
pub const MAX_PROJECT_NAME_LEN: usize = 63;

/// Why a source repository identifier was rejected
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepoIdentifierError {
    #[error("source_repo is required")]
    Missing,

    #[error("source_repo must be formatted as <owner>/<repo>, got '{0}'")]
    Malformed(String),

    #[error("source_repo segment '{0}' contains characters outside [A-Za-z0-9-_.]")]
    InvalidCharacters(String),

    #[error("repository name '{0}' cannot be turned into a project name")]
    UnusableProjectName(String),
}

/// Request to fling a repository onto the platform
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FlingRequest {
    /// Repository identifier as `<owner>/<repo>`
    pub source_repo: Option<String>,
}

impl FlingRequest {
    pub fn new(source_repo: impl Into<String>) -> Self {
        Self {
            source_repo: Some(source_repo.into()),
        }
    }

    /// Validate the request without touching any remote system.
    pub fn validate(&self) -> Result<SourceRepo, RepoIdentifierError> {
        let raw = self
            .source_repo
            .as_deref()
            .ok_or(RepoIdentifierError::Missing)?;
        SourceRepo::parse(raw)
    }
}

/// A validated `<owner>/<repo>` pair
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SourceRepo {
    pub owner: String,
    pub repo: String,
}

impl SourceRepo {
    pub fn parse(raw: &str) -> Result<Self, RepoIdentifierError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(RepoIdentifierError::Missing);
        }

        let mut segments = trimmed.split('/');
        let (owner, repo) = match (segments.next(), segments.next(), segments.next()) {
            (Some(owner), Some(repo), None) if !owner.is_empty() && !repo.is_empty() => {
                (owner, repo)
            }
            _ => return Err(RepoIdentifierError::Malformed(trimmed.to_string())),
        };

        for segment in [owner, repo] {
            if !segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            {
                return Err(RepoIdentifierError::InvalidCharacters(segment.to_string()));
            }
        }
        if repo == "." || repo == ".." {
            return Err(RepoIdentifierError::Malformed(trimmed.to_string()));
        }

        let parsed = Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
        };
        // A repo that cannot name a project is as unusable as a malformed one
        parsed.project_name()?;
        Ok(parsed)
    }

    /// Project name derived from the repository name.
    ///
    /// Lower-cased, `_` and `.` mapped to `-`, leading/trailing `-` removed,
    /// truncated to a DNS-1123 label. `acme/Widgets_App` becomes `widgets-app`.
    pub fn project_name(&self) -> Result<String, RepoIdentifierError> {
        let mapped: String = self
            .repo
            .chars()
            .map(|c| match c {
                '_' | '.' => '-',
                c => c.to_ascii_lowercase(),
            })
            .collect();

        let mut name = mapped.trim_matches('-').to_string();
        if name.len() > MAX_PROJECT_NAME_LEN {
            name.truncate(MAX_PROJECT_NAME_LEN);
            name = name.trim_end_matches('-').to_string();
        }

        if name.is_empty() {
            return Err(RepoIdentifierError::UnusableProjectName(self.repo.clone()));
        }
        Ok(name)
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

impl fmt::Display for SourceRepo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Caller credentials for one fling.
///
/// Never serialized and never cached; `Debug` redacts the tokens.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    pub source_control_token: String,
    pub platform_token: String,
    pub platform_user_namespace: String,
}

impl Identity {
    pub fn new(
        source_control_token: impl Into<String>,
        platform_token: impl Into<String>,
        platform_user_namespace: impl Into<String>,
    ) -> Self {
        Self {
            source_control_token: source_control_token.into(),
            platform_token: platform_token.into(),
            platform_user_namespace: platform_user_namespace.into(),
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("source_control_token", &"<redacted>")
            .field("platform_token", &"<redacted>")
            .field("platform_user_namespace", &self.platform_user_namespace)
            .finish()
    }
}

/// A fork in the caller's namespace on the source-control host
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForkResult {
    /// Git clone URL of the fork
    pub url: String,
    /// Browser URL of the fork
    pub html_url: String,
    /// Owner of the fork (the caller)
    pub owner: String,
    /// Repository name of the fork
    pub name: String,
    /// Primary language detected by the host
    pub language: Option<String>,
}

impl ForkResult {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// Lifecycle of a platform project
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProjectState {
    Requested,
    Active,
    Deleted,
}

impl fmt::Display for ProjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProjectState::Requested => "requested",
            ProjectState::Active => "active",
            ProjectState::Deleted => "deleted",
        };
        f.write_str(s)
    }
}

/// An isolated namespace on the platform
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub name: String,
    /// Platform-assigned identifier (object UID)
    pub namespace_id: String,
    pub console_url: String,
    pub state: ProjectState,
    pub created_at: Option<DateTime<Utc>>,
}

impl Project {
    pub fn is_active(&self) -> bool {
        self.state == ProjectState::Active
    }
}

/// Terminal artifact of a successful fling
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlingResult {
    pub fling_id: Uuid,
    pub fork: ForkResult,
    pub project: Project,
    pub redirect_url: String,
    pub completed_at: DateTime<Utc>,
}
