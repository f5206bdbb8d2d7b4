//! Error taxonomy for the fling pipeline
//!
//! Each client reports its own error type. The orchestrator wraps them in
//! [`FlingError`] without altering the cause.

use std::time::Duration;

use catapult_models::RepoIdentifierError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlingError {
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] RepoIdentifierError),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Source control error: {0}")]
    SourceControl(#[from] SourceControlError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Import error: {0}")]
    Import(#[from] ImportError),
}

impl FlingError {
    /// Machine-readable error code for API responses
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::Unauthorized(_) => "unauthorized",
            Self::SourceControl(_) => "source_control_error",
            Self::Platform(_) => "platform_error",
            Self::Import(_) => "import_error",
        }
    }

    /// Whether the failure is an authentication/authorization failure,
    /// either at the request edge or reported by one of the clients.
    pub const fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized(_)
                | Self::SourceControl(SourceControlError::Unauthorized(_))
                | Self::Platform(PlatformError::Unauthorized(_))
                | Self::Import(ImportError::Unauthorized(_))
        )
    }

    pub const fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::SourceControl(SourceControlError::Timeout { .. })
                | Self::Platform(PlatformError::Timeout { .. })
                | Self::Import(ImportError::Timeout { .. })
        )
    }
}

#[derive(Debug, Error)]
pub enum SourceControlError {
    #[error("Repository '{0}' not found")]
    RepositoryNotFound(String),

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Rate limited by source control host after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("Step '{step}' timed out after {after:?}")]
    Timeout { step: &'static str, after: Duration },

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Unexpected response {status}: {message}")]
    Unexpected { status: u16, message: String },
}

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Project '{0}' already exists")]
    Conflict(String),

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Project '{0}' not found")]
    NotFound(String),

    #[error("Project '{name}' is still {state} after {attempts} reads")]
    NotActive {
        name: String,
        state: String,
        attempts: u32,
    },

    #[error("Rate limited by platform after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("Step '{step}' timed out after {after:?}")]
    Timeout { step: &'static str, after: Duration },

    #[error("Platform API returned {code}: {message}")]
    Api { code: u16, message: String },

    #[error("Platform client failure: {0}")]
    Client(String),
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("No builder image for language '{0}'")]
    UnsupportedLanguage(String),

    #[error("Failed to render import template '{template}': {message}")]
    Template { template: String, message: String },

    #[error("Platform rejected {kind} '{name}' ({code}): {message}")]
    Rejected {
        kind: String,
        name: String,
        code: u16,
        message: String,
    },

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Step '{step}' timed out after {after:?}")]
    Timeout { step: &'static str, after: Duration },

    #[error("Platform client failure: {0}")]
    Client(String),
}
