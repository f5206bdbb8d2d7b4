//! Caller identity acquisition
//!
//! The fling endpoint sits behind an authenticating proxy that completes the
//! GitHub and OpenShift OAuth handshakes and forwards the resulting tokens as
//! request headers.

use axum::http::HeaderMap;
use catapult_models::Identity;
use catapult_orchestrations::FlingError;

pub const GITHUB_TOKEN_HEADER: &str = "x-forwarded-access-token";
pub const OPENSHIFT_TOKEN_HEADER: &str = "x-openshift-token";
pub const OPENSHIFT_USER_HEADER: &str = "x-openshift-user";
pub const FORWARDED_USER_HEADER: &str = "x-forwarded-user";

pub trait IdentityProvider: Send + Sync {
    /// Resolve the caller's credentials, or fail with [`FlingError::Unauthorized`]
    fn acquire(&self, headers: &HeaderMap) -> Result<Identity, FlingError>;
}

#[derive(Debug, Clone, Default)]
pub struct HeaderIdentityProvider;

impl IdentityProvider for HeaderIdentityProvider {
    fn acquire(&self, headers: &HeaderMap) -> Result<Identity, FlingError> {
        let github_token = header(headers, GITHUB_TOKEN_HEADER)
            .ok_or_else(|| missing("GitHub authorization"))?;
        let openshift_token = header(headers, OPENSHIFT_TOKEN_HEADER)
            .ok_or_else(|| missing("OpenShift authorization"))?;
        let user = header(headers, OPENSHIFT_USER_HEADER)
            .or_else(|| header(headers, FORWARDED_USER_HEADER))
            .ok_or_else(|| missing("OpenShift user"))?;

        Ok(Identity::new(github_token, openshift_token, user))
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().trim_start_matches("Bearer ").trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn missing(what: &str) -> FlingError {
    FlingError::Unauthorized(format!("{} missing from request", what))
}
