//! Build-strategy detection
//!
//! Maps a repository's primary language to a Source-to-Image builder.

use std::fmt;

use crate::error::ImportError;

/// Namespace holding the shared builder image streams
pub const BUILDER_NAMESPACE: &str = "openshift";

/// A Source-to-Image builder image stream tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderImage {
    pub namespace: String,
    pub name: String,
    pub tag: String,
}

impl BuilderImage {
    pub fn new(name: &str, tag: &str) -> Self {
        Self {
            namespace: BUILDER_NAMESPACE.to_string(),
            name: name.to_string(),
            tag: tag.to_string(),
        }
    }

    /// Parse `name`, `name:tag` or `namespace/name:tag`
    pub fn parse(spec: &str) -> Option<Self> {
        let spec = spec.trim();
        if spec.is_empty() {
            return None;
        }
        let (namespace, rest) = match spec.split_once('/') {
            Some((namespace, rest)) => (namespace, rest),
            None => (BUILDER_NAMESPACE, spec),
        };
        let (name, tag) = rest.split_once(':').unwrap_or((rest, "latest"));
        if namespace.is_empty() || name.is_empty() || tag.is_empty() {
            return None;
        }
        Some(Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            tag: tag.to_string(),
        })
    }

    /// Image stream tag reference, `name:tag`
    pub fn stream_tag(&self) -> String {
        format!("{}:{}", self.name, self.tag)
    }
}

impl fmt::Display for BuilderImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.namespace, self.name, self.tag)
    }
}

/// Builder for a language as reported by the source-control host
pub fn builder_for_language(language: &str) -> Option<BuilderImage> {
    let name = match language.trim().to_ascii_lowercase().as_str() {
        "java" => "wildfly",
        "javascript" | "typescript" => "nodejs",
        "python" => "python",
        "ruby" => "ruby",
        "php" => "php",
        "perl" => "perl",
        "go" => "golang",
        "c#" => "dotnet",
        _ => return None,
    };
    Some(BuilderImage::new(name, "latest"))
}

/// Pick the builder for a fork, falling back to `default` when the language
/// is missing or unknown.
pub fn detect_builder(
    language: Option<&str>,
    default: Option<&BuilderImage>,
) -> Result<BuilderImage, ImportError> {
    if let Some(builder) = language.and_then(builder_for_language) {
        return Ok(builder);
    }
    default.cloned().ok_or_else(|| {
        ImportError::UnsupportedLanguage(language.unwrap_or("unknown").to_string())
    })
}
