//! Source importers
//!
//! An importer turns a fork into build and deployment objects inside a
//! project. [`OpenShiftImporter`] creates an S2I pipeline; [`MemoryImporter`]
//! records what it was asked to import.

mod memory;
mod openshift;
pub mod strategy;

pub use memory::{MemoryImporter, RecordedImport};
pub use openshift::{render_import_objects, OpenShiftImporter, APPLICATION_PORT};
pub use strategy::{builder_for_language, detect_builder, BuilderImage};

use async_trait::async_trait;
use catapult_models::{ForkResult, Identity, Project};

use crate::error::ImportError;

#[async_trait]
pub trait Importer: Send + Sync {
    /// Create the import objects for `fork` in `project`.
    ///
    /// Returns once the platform has accepted the objects, not when the first
    /// build completes.
    async fn import_source(
        &self,
        fork: &ForkResult,
        project: &Project,
        identity: &Identity,
    ) -> Result<(), ImportError>;
}
