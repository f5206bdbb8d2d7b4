use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod cli;
mod commands;
mod config;
mod identity;

use cli::{Args, Command};

/// Initialize tracing with two outputs:
/// 1. stderr - for interactive use
/// 2. ~/.catapult/server.log - flat text for later inspection
fn initialize_tracing() -> Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "info,\
         catapult_server=debug,\
         catapult_orchestrations=debug,\
         tower_http=debug"
            .into()
    });

    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    let catapult_dir = PathBuf::from(home).join(".catapult");
    std::fs::create_dir_all(&catapult_dir).ok();

    let file_appender = tracing_appender::rolling::never(&catapult_dir, "server.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    // Keep guard alive for the lifetime of the program
    std::mem::forget(guard);

    let file_layer = fmt::layer().with_writer(file_writer).with_ansi(false);
    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let args = Args::parse();

    initialize_tracing()?;

    match args.command {
        Command::Serve { port } => commands::server::run(port).await,
        Command::Fling {
            source_repo,
            github_token,
            openshift_token,
            openshift_user,
        } => {
            commands::fling::run(source_repo, github_token, openshift_token, openshift_user).await
        }
        Command::DeleteProject { name } => commands::project::run_delete(&name).await,
        Command::Config { show_secrets } => commands::system::config(show_secrets),
    }
}
