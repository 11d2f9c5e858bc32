//! Container runtime section of an OperatingSystemConfig
//!
//! Fields this extension does not touch are kept in `extra` so that a
//! decode/encode cycle leaves them as they were.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `spec.criConfig` of an OperatingSystemConfig
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CriConfig {
    /// Runtime name, `containerd` for every node this extension serves
    #[serde(default)]
    pub name: String,

    /// containerd specific settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub containerd: Option<ContainerdConfig>,

    /// Fields not interpreted here
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// containerd settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerdConfig {
    /// Registry host configurations, one per upstream
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub registries: Vec<RegistryConfig>,

    /// Fields not interpreted here
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Registry configuration rendered into containerd's `hosts.toml`
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegistryConfig {
    /// Upstream registry host
    pub upstream: String,

    /// URL used when none of the hosts can serve a request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,

    /// Hosts tried in order before the server
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hosts: Vec<RegistryHost>,

    /// Wait for the hosts to become reachable before starting containerd
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readiness_probe: Option<bool>,

    /// Fields not interpreted here
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single registry host
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegistryHost {
    /// Host URL
    pub url: String,

    /// Operations the host may be used for
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<RegistryCapability>,

    /// CA bundles trusted for this host
    #[serde(default, rename = "caCerts", skip_serializing_if = "Vec::is_empty")]
    pub ca_certs: Vec<String>,

    /// Fields not interpreted here
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// containerd host capability
///
/// Kept as a string so entries written by other components with values this
/// extension does not know still decode and are passed through unchanged.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct RegistryCapability(String);

impl RegistryCapability {
    /// Fetch content
    pub fn pull() -> Self {
        Self("pull".to_string())
    }

    /// Resolve tags to digests
    pub fn resolve() -> Self {
        Self("resolve".to_string())
    }

    /// Push content
    pub fn push() -> Self {
        Self("push".to_string())
    }

    /// Raw capability value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RegistryCapability {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
