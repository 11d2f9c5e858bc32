//! Provider config of the sibling registry-cache extension
//!
//! Only decoded so a shoot's mirror upstreams can be checked against its
//! cache upstreams. Decoding is strict like the MirrorConfig codec.

use mirror_common::Error;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// `apiVersion` of registry-cache provider configs
pub const API_VERSION: &str = "registry.extensions.gardener.cloud/v1alpha3";
/// `kind` of registry-cache provider configs
pub const KIND: &str = "RegistryConfig";

/// Registry cache configuration of a shoot
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegistryConfig {
    /// Always `registry.extensions.gardener.cloud/v1alpha3`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,

    /// Always `RegistryConfig`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,

    /// Pull-through caches
    #[serde(default)]
    pub caches: Vec<RegistryCache>,
}

impl RegistryConfig {
    /// Cache upstreams in declaration order
    pub fn upstreams(&self) -> impl Iterator<Item = &str> {
        self.caches.iter().map(|c| c.upstream.as_str())
    }
}

/// A single pull-through cache
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegistryCache {
    /// Remote registry host being cached
    pub upstream: String,

    /// Remote registry URL, if it differs from the upstream
    #[serde(rename = "remoteURL", default, skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,

    /// Cache volume settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<Volume>,

    /// Garbage collection settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub garbage_collection: Option<GarbageCollection>,

    /// Name of a `spec.resources` entry referencing upstream credentials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_reference_name: Option<String>,

    /// Proxy settings for reaching the upstream
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<Proxy>,

    /// High availability settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_availability: Option<HighAvailability>,

    /// HTTP settings of the cache endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<Http>,
}

/// Cache volume settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Volume {
    /// Volume size as a Kubernetes quantity (e.g. `10Gi`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    /// Storage class of the volume
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class_name: Option<String>,
}

/// Garbage collection settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GarbageCollection {
    /// Time to live of cached blobs (e.g. `168h`)
    pub ttl: String,
}

/// Proxy settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Proxy {
    /// HTTP proxy URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_proxy: Option<String>,

    /// HTTPS proxy URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub https_proxy: Option<String>,
}

/// High availability settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct HighAvailability {
    /// Run more than one replica of the cache
    #[serde(default)]
    pub enabled: bool,
}

/// HTTP settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Http {
    /// Serve the cache over TLS
    #[serde(default)]
    pub tls: bool,
}

/// Strictly decode a registry-cache provider config
pub fn decode_registry_config(raw: &[u8]) -> Result<RegistryConfig, Error> {
    let cfg: RegistryConfig =
        serde_json::from_slice(raw).map_err(|e| Error::decode_for_kind(KIND, e.to_string()))?;
    if cfg.api_version != API_VERSION || cfg.kind != KIND {
        return Err(Error::decode_for_kind(
            KIND,
            format!(
                "no kind {:?} is registered for version {:?}",
                cfg.kind, cfg.api_version
            ),
        ));
    }
    Ok(cfg)
}

/// Strictly decode a registry-cache provider config from a JSON value
pub fn decode_registry_config_value(value: &serde_json::Value) -> Result<RegistryConfig, Error> {
    let raw = serde_json::to_vec(value).map_err(|e| Error::decode(e.to_string()))?;
    decode_registry_config(&raw)
}
