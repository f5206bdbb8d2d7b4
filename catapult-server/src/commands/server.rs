use std::sync::Arc;

use anyhow::Result;

use crate::api::{self, AppState};
use crate::config::Config;
use crate::identity::HeaderIdentityProvider;

pub async fn run(port: Option<u16>) -> Result<()> {
    let config = Config::load()?;
    let port = port.unwrap_or(config.server_port);

    tracing::info!("Starting Catapult API server");
    tracing::info!(
        openshift = %config.openshift.api_url,
        console = %config.openshift.console_url,
        github = %config.github_api_url,
        step_timeout_secs = config.step_timeout.as_secs(),
        "Upstream configuration"
    );

    let state = AppState {
        orchestrator: Arc::new(config.build_orchestrator()?),
        identity: Arc::new(HeaderIdentityProvider),
    };

    tracing::info!("✓ Catapult server ready");
    tracing::info!("  Fling: http://{}:{}/api/catapult/fling?source_repo=<owner>/<repo>", config.server_host, port);
    tracing::info!("  Press Ctrl+C to stop");

    api::start_server(&config.server_host, port, state).await
}
