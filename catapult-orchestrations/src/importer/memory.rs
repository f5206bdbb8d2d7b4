//! In-memory importer for testing and local dry runs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use catapult_models::{ForkResult, Identity, Project};

use super::strategy::{detect_builder, BuilderImage};
use super::Importer;
use crate::error::ImportError;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedImport {
    pub fork: ForkResult,
    pub project_name: String,
    pub builder: BuilderImage,
}

#[derive(Debug)]
pub struct MemoryImporter {
    default_builder: Option<BuilderImage>,
    failure: Option<String>,
    delay: Option<Duration>,
    imports: Mutex<Vec<RecordedImport>>,
    import_calls: AtomicUsize,
}

impl Default for MemoryImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryImporter {
    pub fn new() -> Self {
        Self {
            default_builder: Some(BuilderImage::new("wildfly", "latest")),
            failure: None,
            delay: None,
            imports: Mutex::new(Vec::new()),
            import_calls: AtomicUsize::new(0),
        }
    }

    /// Every import is rejected with `message`
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new()
        }
    }

    pub fn with_default_builder(mut self, builder: Option<BuilderImage>) -> Self {
        self.default_builder = builder;
        self
    }

    /// Every import sleeps before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn import_calls(&self) -> usize {
        self.import_calls.load(Ordering::SeqCst)
    }

    pub fn imports(&self) -> Vec<RecordedImport> {
        self.recorded().clone()
    }

    fn recorded(&self) -> MutexGuard<'_, Vec<RecordedImport>> {
        self.imports.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Importer for MemoryImporter {
    async fn import_source(
        &self,
        fork: &ForkResult,
        project: &Project,
        identity: &Identity,
    ) -> Result<(), ImportError> {
        self.import_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if identity.platform_token.is_empty() {
            return Err(ImportError::Unauthorized("token rejected".to_string()));
        }
        if let Some(message) = &self.failure {
            return Err(ImportError::Rejected {
                kind: "BuildConfig".to_string(),
                name: project.name.clone(),
                code: 422,
                message: message.clone(),
            });
        }

        let builder = detect_builder(fork.language.as_deref(), self.default_builder.as_ref())?;
        self.recorded().push(RecordedImport {
            fork: fork.clone(),
            project_name: project.name.clone(),
            builder,
        });
        Ok(())
    }
}
