use clap::{Parser, Subcommand};

/// Catapult - fork a GitHub repository and deploy it on OpenShift
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API server
    Serve {
        /// API port (default: SERVER_PORT or 8080)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Fling a repository once from the command line
    Fling {
        /// Repository to fling, as <owner>/<repo>
        source_repo: String,

        /// GitHub token of the caller
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        github_token: String,

        /// OpenShift token of the caller
        #[arg(long, env = "OPENSHIFT_TOKEN", hide_env_values = true)]
        openshift_token: String,

        /// OpenShift user the project is requested for
        #[arg(long, env = "OPENSHIFT_USER")]
        openshift_user: String,
    },

    /// Delete a flung project with operator credentials
    DeleteProject {
        /// Project name
        name: String,
    },

    /// Show the effective configuration
    Config {
        /// Print tokens instead of masking them
        #[arg(long)]
        show_secrets: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fling() {
        let args = Args::try_parse_from([
            "catapult-server",
            "fling",
            "acme/widgets",
            "--github-token",
            "gho_abc",
            "--openshift-token",
            "sha256~xyz",
            "--openshift-user",
            "alice",
        ])
        .unwrap();

        match args.command {
            Command::Fling {
                source_repo,
                openshift_user,
                ..
            } => {
                assert_eq!(source_repo, "acme/widgets");
                assert_eq!(openshift_user, "alice");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_serve_and_delete() {
        let args = Args::try_parse_from(["catapult-server", "serve", "--port", "9000"]).unwrap();
        assert!(matches!(args.command, Command::Serve { port: Some(9000) }));

        let args = Args::try_parse_from(["catapult-server", "delete-project", "widgets"]).unwrap();
        assert!(matches!(args.command, Command::DeleteProject { ref name } if name == "widgets"));
    }
}
