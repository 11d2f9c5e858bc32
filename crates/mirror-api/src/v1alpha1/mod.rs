//! External `mirror.extensions.gardener.cloud/v1alpha1` MirrorConfig
//!
//! This is the form users write into `providerConfig` and that is persisted
//! by the platform. Unknown fields are rejected on decode.
//!
//! Example:
//! ```yaml
//! apiVersion: mirror.extensions.gardener.cloud/v1alpha1
//! kind: MirrorConfig
//! mirrors:
//!   - upstream: docker.io
//!     hosts:
//!       - host: https://mirror.gcr.io
//!         capabilities: [pull]
//! ```

mod conversion;
mod defaults;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub use defaults::set_defaults_mirror_config;

/// Version of this API
pub const VERSION: &str = "v1alpha1";
/// `apiVersion` of documents in this version
pub const API_VERSION: &str = "mirror.extensions.gardener.cloud/v1alpha1";
/// `kind` of the root document
pub const KIND: &str = "MirrorConfig";

/// Mirror configuration for a shoot
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MirrorConfig {
    /// Always `mirror.extensions.gardener.cloud/v1alpha1`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,

    /// Always `MirrorConfig`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,

    /// Mirrors for upstream registries
    #[serde(default)]
    pub mirrors: Vec<MirrorConfiguration>,
}

impl MirrorConfig {
    /// A config carrying this version's type meta
    pub fn new(mirrors: Vec<MirrorConfiguration>) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            mirrors,
        }
    }
}

/// Mirror hosts for one upstream registry
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MirrorConfiguration {
    /// Remote registry host being mirrored (e.g. `docker.io`)
    pub upstream: String,

    /// URL of the upstream registry API (e.g. `https://registry-1.docker.io`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,

    /// Mirror hosts in priority order
    #[serde(default)]
    pub hosts: Vec<MirrorHost>,
}

/// A single mirror host
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MirrorHost {
    /// Mirror URL (e.g. `https://mirror.gcr.io`)
    pub host: String,

    /// Operations the host may serve; defaults to `[pull]`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<MirrorHostCapability>,

    /// The API root is at the URL path instead of `/v2/`
    #[serde(
        rename = "override_path",
        alias = "overridePath",
        default,
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub override_path: bool,

    /// Name of a `spec.resources` entry referencing upstream credentials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_reference_name: Option<String>,
}

/// Capability of a mirror host (`pull` or `resolve`)
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct MirrorHostCapability(pub String);

impl MirrorHostCapability {
    /// The `pull` capability
    pub fn pull() -> Self {
        Self(crate::mirror::CAPABILITY_PULL.to_string())
    }

    /// The `resolve` capability
    pub fn resolve() -> Self {
        Self(crate::mirror::CAPABILITY_RESOLVE.to_string())
    }
}

impl From<&str> for MirrorHostCapability {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
