use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use catapult_orchestrations::source_control::DEFAULT_GITHUB_API_URL;
use catapult_orchestrations::{
    BuilderImage, FlingOrchestrator, FlingSettings, GitHubClient, OpenShiftImporter,
    OpenShiftPlatform, OpenShiftSettings,
};

pub const DEFAULT_STEP_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_BUILDER: &str = "wildfly:latest";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub openshift: OpenShiftSettings,
    pub github_api_url: String,
    pub step_timeout: Duration,
    /// Builder for forks whose language has no mapping; `None` rejects them
    pub default_builder: Option<BuilderImage>,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_url = lookup("CATAPULT_OPENSHIFT_API_URL")
            .filter(|v| !v.trim().is_empty())
            .context("CATAPULT_OPENSHIFT_API_URL must be set")?;

        let mut openshift = OpenShiftSettings::new(api_url)
            .with_operator_token(lookup("CATAPULT_OPENSHIFT_TOKEN"))
            .with_accept_invalid_certs(
                lookup("CATAPULT_OPENSHIFT_ACCEPT_INVALID_CERTS")
                    .map(|v| parse_bool(&v))
                    .transpose()
                    .context("CATAPULT_OPENSHIFT_ACCEPT_INVALID_CERTS must be true or false")?
                    .unwrap_or(false),
            );
        if let Some(console_url) = lookup("CATAPULT_OPENSHIFT_CONSOLE_URL").filter(|v| !v.is_empty()) {
            openshift = openshift.with_console_url(console_url);
        }

        let step_timeout_secs: u64 = match lookup("CATAPULT_STEP_TIMEOUT_SECS") {
            Some(v) => v
                .parse()
                .context("CATAPULT_STEP_TIMEOUT_SECS must be a number of seconds")?,
            None => DEFAULT_STEP_TIMEOUT_SECS,
        };
        if step_timeout_secs == 0 {
            anyhow::bail!("CATAPULT_STEP_TIMEOUT_SECS must be greater than zero");
        }

        let default_builder = match lookup("CATAPULT_DEFAULT_BUILDER") {
            Some(v) if v.trim().is_empty() => None,
            Some(v) => Some(
                BuilderImage::parse(&v)
                    .with_context(|| format!("Invalid CATAPULT_DEFAULT_BUILDER '{}'", v))?,
            ),
            None => BuilderImage::parse(DEFAULT_BUILDER),
        };

        Ok(Self {
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            server_port: lookup("SERVER_PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
            openshift,
            github_api_url: lookup("CATAPULT_GITHUB_API_URL")
                .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string()),
            step_timeout: Duration::from_secs(step_timeout_secs),
            default_builder,
        })
    }

    pub fn fling_settings(&self) -> FlingSettings {
        FlingSettings::with_step_timeout(self.step_timeout)
    }

    /// Wire the GitHub and OpenShift clients into an orchestrator
    pub fn build_orchestrator(&self) -> Result<FlingOrchestrator> {
        let github = GitHubClient::new(&self.github_api_url, self.step_timeout)
            .context("Failed to create GitHub client")?;
        let platform = OpenShiftPlatform::new(self.openshift.clone());
        let importer = OpenShiftImporter::new(self.openshift.clone())
            .with_default_builder(self.default_builder.clone());

        Ok(
            FlingOrchestrator::new(Arc::new(github), Arc::new(platform), Arc::new(importer))
                .with_settings(self.fling_settings()),
        )
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        other => anyhow::bail!("not a boolean: '{}'", other),
    }
}
