use anyhow::{Context, Result};

use crate::config::Config;

/// Operator cleanup of a flung project
pub async fn run_delete(name: &str) -> Result<()> {
    let config = Config::load()?;
    let orchestrator = config.build_orchestrator()?;

    let output = orchestrator
        .cleanup_project(name)
        .await
        .with_context(|| format!("Failed to delete project '{}'", name))?;

    if output.deleted {
        println!("✓ Project '{}' deleted", output.project_name);
    } else {
        println!("Project '{}' not found, nothing to delete", output.project_name);
    }

    Ok(())
}
