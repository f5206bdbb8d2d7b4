use anyhow::{Context, Result};
use catapult_models::{FlingRequest, Identity};

use crate::config::Config;

/// Run a single fling with tokens supplied on the command line
pub async fn run(
    source_repo: String,
    github_token: String,
    openshift_token: String,
    openshift_user: String,
) -> Result<()> {
    let request = FlingRequest::new(source_repo);
    request.validate().context("Invalid repository")?;

    let config = Config::load()?;
    let orchestrator = config.build_orchestrator()?;
    let identity = Identity::new(github_token, openshift_token, openshift_user);

    let result = orchestrator
        .fling(request, identity)
        .await
        .context("Fling failed")?;

    println!("✓ Fling complete");
    println!("  Fork:     {}", result.fork.html_url);
    println!("  Project:  {} ({})", result.project.name, result.project.state);
    println!("  Console:  {}", result.redirect_url);

    Ok(())
}
