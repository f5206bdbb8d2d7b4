use anyhow::Result;

use crate::config::{Config, DEFAULT_BUILDER, DEFAULT_STEP_TIMEOUT_SECS};

const SECRET_VARS: &[&str] = &["CATAPULT_OPENSHIFT_TOKEN"];

/// Variables read by the server, with the default shown when unset
const VARIABLES: &[(&str, Option<&str>)] = &[
    ("CATAPULT_OPENSHIFT_API_URL", None),
    ("CATAPULT_OPENSHIFT_CONSOLE_URL", Some("same as API URL")),
    ("CATAPULT_OPENSHIFT_TOKEN", Some("ambient kubeconfig")),
    ("CATAPULT_OPENSHIFT_ACCEPT_INVALID_CERTS", Some("false")),
    ("CATAPULT_GITHUB_API_URL", Some("https://api.github.com")),
    ("CATAPULT_STEP_TIMEOUT_SECS", Some("60")),
    ("CATAPULT_DEFAULT_BUILDER", Some(DEFAULT_BUILDER)),
    ("SERVER_HOST", Some("0.0.0.0")),
    ("SERVER_PORT", Some("8080")),
    ("RUST_LOG", Some("info")),
];

pub fn config(show_secrets: bool) -> Result<()> {
    println!("Environment Variables");
    println!("{}", "=".repeat(80));
    println!();

    for (name, default) in VARIABLES {
        let value = std::env::var(name).ok();
        println!("  {:<42} {}", name, describe(name, value.as_deref(), *default, show_secrets));
    }
    println!();

    println!("Effective Configuration");
    println!("{}", "=".repeat(80));
    println!();

    match Config::load() {
        Ok(config) => {
            println!("  Listen:            {}:{}", config.server_host, config.server_port);
            println!("  OpenShift API:     {}", config.openshift.api_url);
            println!("  OpenShift Console: {}", config.openshift.console_url);
            println!("  GitHub API:        {}", config.github_api_url);
            println!("  Step timeout:      {}s", config.step_timeout.as_secs());
            println!(
                "  Default builder:   {}",
                config
                    .default_builder
                    .map(|b| b.to_string())
                    .unwrap_or_else(|| "none (unknown languages rejected)".to_string())
            );
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            println!("  Log file:          {}/.catapult/server.log", home);
        }
        Err(e) => {
            println!("  ✗ Invalid configuration: {:#}", e);
            println!("  (step timeout default is {}s)", DEFAULT_STEP_TIMEOUT_SECS);
        }
    }

    Ok(())
}

fn describe(name: &str, value: Option<&str>, default: Option<&str>, show_secrets: bool) -> String {
    match (value, default) {
        (Some(v), _) if SECRET_VARS.contains(&name) && !show_secrets => {
            format!("✓ Set ({})", mask(v))
        }
        (Some(v), _) => format!("✓ Set ({})", v),
        (None, Some(d)) => format!("✗ Not set (using default: {})", d),
        (None, None) => "✗ Not set (required)".to_string(),
    }
}

fn mask(secret: &str) -> String {
    if secret.chars().count() <= 8 {
        return "***hidden***".to_string();
    }
    let prefix: String = secret.chars().take(4).collect();
    format!("{}…***", prefix)
}
