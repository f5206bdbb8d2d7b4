//! Catapult Orchestrations - fork a repository and deploy it on OpenShift
//!
//! This crate holds the client abstractions the fling pipeline talks to
//! (source control, platform, importer), their GitHub/OpenShift and
//! in-memory implementations, and the [`FlingOrchestrator`] that sequences
//! them.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use catapult_models::{FlingRequest, Identity};
//! use catapult_orchestrations::{
//!     FlingOrchestrator, MemoryImporter, MemoryPlatform, MemorySourceControl,
//! };
//!
//! # async fn example() -> anyhow::Result<()> {
//! let orchestrator = FlingOrchestrator::new(
//!     Arc::new(MemorySourceControl::new().with_user("gho_token", "alice")),
//!     Arc::new(MemoryPlatform::new("https://console.example.com")),
//!     Arc::new(MemoryImporter::new()),
//! );
//!
//! let identity = Identity::new("gho_token", "sha256~token", "alice");
//! let result = orchestrator
//!     .fling(FlingRequest::new("acme/widgets"), identity)
//!     .await?;
//! println!("{}", result.redirect_url);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod importer;
pub mod k8s_client;
pub mod names;
pub mod platform;
pub mod retry;
pub mod source_control;
pub mod types;

mod orchestrations;

// Re-export key types for convenience
pub use error::{FlingError, ImportError, PlatformError, SourceControlError};
pub use importer::{BuilderImage, Importer, MemoryImporter, OpenShiftImporter};
pub use k8s_client::OpenShiftSettings;
pub use orchestrations::FlingOrchestrator;
pub use platform::{MemoryPlatform, OpenShiftPlatform, PlatformClient};
pub use retry::{BackoffStrategy, RetryPolicy};
pub use source_control::{GitHubClient, MemorySourceControl, SourceControl};
pub use types::*;
