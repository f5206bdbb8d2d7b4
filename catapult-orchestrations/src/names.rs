//! Name constants for the fling pipeline
//!
//! Following the convention: {crate-name}::{type}::{name}

/// Orchestration names
pub mod orchestrations {
    /// Fork a repository and deploy it as a platform project
    ///
    /// **Input:** [`catapult_models::FlingRequest`] + [`catapult_models::Identity`]
    /// **Output:** [`catapult_models::FlingResult`]
    /// **Steps:** [`super::steps::FORK`], [`super::steps::CREATE_PROJECT`],
    /// [`super::steps::IMPORT_SOURCE`], [`super::steps::READ_BACK_PROJECT`]
    pub const FLING: &str = "catapult-orchestrations::orchestration::fling";

    /// Operator cleanup of a flung project
    ///
    /// **Input:** project name
    /// **Output:** whether the project existed
    /// **Idempotent:** Yes
    pub const CLEANUP_PROJECT: &str = "catapult-orchestrations::orchestration::cleanup-project";
}

/// Step names, used in logs and timeout errors
pub mod steps {
    /// Fork the source repository into the caller's namespace
    ///
    /// **Idempotent:** Yes (an existing fork is reused)
    pub const FORK: &str = "fork";

    /// Create the platform project
    ///
    /// **Idempotent:** No (a second attempt fails with a conflict)
    pub const CREATE_PROJECT: &str = "create-project";

    /// Create the build and deployment objects inside the project
    ///
    /// **Idempotent:** Yes (existing objects are left untouched)
    pub const IMPORT_SOURCE: &str = "import-source";

    /// Read the project back until it reports Active
    pub const READ_BACK_PROJECT: &str = "read-back-project";

    /// Delete a project (operator path only)
    pub const DELETE_PROJECT: &str = "delete-project";
}
