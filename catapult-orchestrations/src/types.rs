//! Settings and outputs for the Catapult orchestrations

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ============================================================================
// Fling Orchestration
// ============================================================================

/// Request-scoped bounds for each fling step
#[derive(Debug, Clone, PartialEq)]
pub struct FlingSettings {
    /// Bound on the fork step (including client-side rate-limit retries)
    pub fork_timeout: Duration,
    /// Bound on project creation
    pub create_project_timeout: Duration,
    /// Bound on creating the import objects
    pub import_timeout: Duration,
    /// Bound on reading the project back until it is Active
    pub read_back_timeout: Duration,
    /// Pause between read-back attempts while the project is still Requested
    pub activation_poll_interval: Duration,
    /// Read-back attempts before giving up on activation
    pub activation_max_attempts: u32,
    /// Bound on operator project deletion
    pub delete_project_timeout: Duration,
}

impl Default for FlingSettings {
    fn default() -> Self {
        Self {
            fork_timeout: Duration::from_secs(60),
            create_project_timeout: Duration::from_secs(30),
            import_timeout: Duration::from_secs(60),
            read_back_timeout: Duration::from_secs(30),
            activation_poll_interval: Duration::from_secs(1),
            activation_max_attempts: 10,
            delete_project_timeout: Duration::from_secs(30),
        }
    }
}

impl FlingSettings {
    /// Same bound for every remote step
    pub fn with_step_timeout(timeout: Duration) -> Self {
        Self {
            fork_timeout: timeout,
            create_project_timeout: timeout,
            import_timeout: timeout,
            read_back_timeout: timeout,
            delete_project_timeout: timeout,
            ..Self::default()
        }
    }
}

// ============================================================================
// Cleanup Project Orchestration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CleanupProjectOutput {
    /// Project name
    pub project_name: String,
    /// Whether the project was deleted (false if it didn't exist)
    pub deleted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_timeout_applies_to_every_remote_step() {
        let settings = FlingSettings::with_step_timeout(Duration::from_secs(7));
        assert_eq!(settings.fork_timeout, Duration::from_secs(7));
        assert_eq!(settings.create_project_timeout, Duration::from_secs(7));
        assert_eq!(settings.import_timeout, Duration::from_secs(7));
        assert_eq!(settings.read_back_timeout, Duration::from_secs(7));
        assert_eq!(settings.activation_max_attempts, 10);
    }
}
