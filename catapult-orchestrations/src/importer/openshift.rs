//! OpenShift build-from-source import
//!
//! Renders the import objects from YAML templates and creates them in the
//! project namespace with the caller's token.

use async_trait::async_trait;
use catapult_models::{ForkResult, Identity, Project};
use kube::api::{Api, DynamicObject, PostParams};
use kube::core::{ApiResource, GroupVersionKind};
use once_cell::sync::OnceCell;
use tera::{Context as TeraContext, Tera};

use super::strategy::{detect_builder, BuilderImage};
use super::Importer;
use crate::error::ImportError;
use crate::k8s_client::{call_with_retry, client_with_token, KubeCallError, OpenShiftSettings};
use crate::retry::RetryPolicy;

/// Port the builder images listen on
pub const APPLICATION_PORT: u16 = 8080;

struct ImportObject {
    template: &'static str,
    source: &'static str,
    group: &'static str,
    version: &'static str,
    kind: &'static str,
}

impl ImportObject {
    fn resource(&self) -> ApiResource {
        ApiResource::from_gvk(&GroupVersionKind::gvk(self.group, self.version, self.kind))
    }
}

/// Creation order matters: the BuildConfig pushes to the ImageStream and the
/// DeploymentConfig triggers on it.
const IMPORT_OBJECTS: &[ImportObject] = &[
    ImportObject {
        template: "imagestream",
        source: include_str!("../templates/imagestream.yaml"),
        group: "image.openshift.io",
        version: "v1",
        kind: "ImageStream",
    },
    ImportObject {
        template: "buildconfig",
        source: include_str!("../templates/buildconfig.yaml"),
        group: "build.openshift.io",
        version: "v1",
        kind: "BuildConfig",
    },
    ImportObject {
        template: "deploymentconfig",
        source: include_str!("../templates/deploymentconfig.yaml"),
        group: "apps.openshift.io",
        version: "v1",
        kind: "DeploymentConfig",
    },
    ImportObject {
        template: "service",
        source: include_str!("../templates/service.yaml"),
        group: "",
        version: "v1",
        kind: "Service",
    },
    ImportObject {
        template: "route",
        source: include_str!("../templates/route.yaml"),
        group: "route.openshift.io",
        version: "v1",
        kind: "Route",
    },
];

static TEMPLATES: OnceCell<Tera> = OnceCell::new();

fn templates() -> Result<&'static Tera, ImportError> {
    TEMPLATES.get_or_try_init(|| {
        let mut tera = Tera::default();
        for object in IMPORT_OBJECTS {
            tera.add_raw_template(object.template, object.source)
                .map_err(|e| ImportError::Template {
                    template: object.template.to_string(),
                    message: format!("{:#}", e),
                })?;
        }
        Ok(tera)
    })
}

/// Render every import object for a fork, in creation order
pub fn render_import_objects(
    fork: &ForkResult,
    project: &Project,
    builder: &BuilderImage,
) -> Result<Vec<DynamicObject>, ImportError> {
    let tera = templates()?;

    let mut ctx = TeraContext::new();
    ctx.insert("name", &project.name);
    ctx.insert("namespace", &project.name);
    ctx.insert("source_repo", &fork.full_name());
    ctx.insert("git_url", &fork.url);
    ctx.insert("builder_namespace", &builder.namespace);
    ctx.insert("builder_tag", &builder.stream_tag());
    ctx.insert("port", &APPLICATION_PORT);

    IMPORT_OBJECTS
        .iter()
        .map(|object| {
            let template_error = |message: String| ImportError::Template {
                template: object.template.to_string(),
                message,
            };
            let yaml = tera
                .render(object.template, &ctx)
                .map_err(|e| template_error(format!("{:#}", e)))?;
            serde_yaml::from_str::<DynamicObject>(&yaml).map_err(|e| template_error(e.to_string()))
        })
        .collect()
}

/// Imports a fork by creating an S2I build pipeline in the project
#[derive(Debug, Clone)]
pub struct OpenShiftImporter {
    settings: OpenShiftSettings,
    default_builder: Option<BuilderImage>,
    retry: RetryPolicy,
}

impl OpenShiftImporter {
    pub fn new(settings: OpenShiftSettings) -> Self {
        Self {
            settings,
            default_builder: Some(BuilderImage::new("wildfly", "latest")),
            retry: RetryPolicy::default(),
        }
    }

    /// Builder used when the fork's language is unknown; `None` disables the fallback
    pub fn with_default_builder(mut self, builder: Option<BuilderImage>) -> Self {
        self.default_builder = builder;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn create_object(
        &self,
        client: &kube::Client,
        namespace: &str,
        object: &ImportObject,
        data: &DynamicObject,
    ) -> Result<(), ImportError> {
        let name = data.metadata.name.clone().unwrap_or_default();
        let api: Api<DynamicObject> =
            Api::namespaced_with(client.clone(), namespace, &object.resource());
        let params = PostParams::default();
        let (api, params) = (&api, &params);

        match call_with_retry(&self.retry, object.kind, move || api.create(params, data)).await {
            Ok(_) => {
                tracing::info!(kind = object.kind, name = %name, "Import object created");
                Ok(())
            }
            Err(e) if e.status_code() == Some(409) => {
                tracing::info!(kind = object.kind, name = %name, "Import object already exists, leaving it");
                Ok(())
            }
            Err(e) => Err(import_error(e, object.kind, &name)),
        }
    }
}

#[async_trait]
impl Importer for OpenShiftImporter {
    async fn import_source(
        &self,
        fork: &ForkResult,
        project: &Project,
        identity: &Identity,
    ) -> Result<(), ImportError> {
        let builder = detect_builder(fork.language.as_deref(), self.default_builder.as_ref())?;
        tracing::info!(
            fork = %fork.full_name(),
            project = %project.name,
            builder = %builder,
            "Importing source"
        );

        let objects = render_import_objects(fork, project, &builder)?;
        let client = client_with_token(&self.settings, &identity.platform_token)
            .map_err(|e| ImportError::Client(format!("{:#}", e)))?;

        for (object, data) in IMPORT_OBJECTS.iter().zip(objects.iter()) {
            self.create_object(&client, &project.name, object, data).await?;
        }

        tracing::info!(project = %project.name, "Import objects accepted");
        Ok(())
    }
}

fn import_error(err: KubeCallError, kind: &str, name: &str) -> ImportError {
    match err.status_code() {
        Some(401) | Some(403) => ImportError::Unauthorized(err.message()),
        Some(code) => ImportError::Rejected {
            kind: kind.to_string(),
            name: name.to_string(),
            code,
            message: err.message(),
        },
        None => match err {
            KubeCallError::RateLimited { attempts } => ImportError::Rejected {
                kind: kind.to_string(),
                name: name.to_string(),
                code: 429,
                message: format!("rate limited after {} attempts", attempts),
            },
            other => ImportError::Client(other.message()),
        },
    }
}
