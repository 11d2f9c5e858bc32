//! Extension and Cluster resources in a seed

use kube::{CustomResource, ResourceExt};
use mirror_common::Error;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::shoot::Shoot;

/// Per-shoot extension resource created by gardenlet in the technical namespace
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "extensions.gardener.cloud",
    version = "v1alpha1",
    kind = "Extension",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionSpec {
    /// Extension type (e.g. `registry-mirror`)
    #[serde(rename = "type")]
    pub extension_type: String,

    /// Extension specific configuration copied from the shoot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_config: Option<serde_json::Value>,
}

impl ExtensionSpec {
    /// Provider config, treating an explicit `null` as absent
    pub fn provider_config(&self) -> Option<&serde_json::Value> {
        self.provider_config.as_ref().filter(|v| !v.is_null())
    }
}

/// Cluster-scoped view of a shoot and its seed, named after the technical namespace
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(group = "extensions.gardener.cloud", version = "v1alpha1", kind = "Cluster")]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// The complete shoot object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shoot: Option<serde_json::Value>,

    /// The complete seed object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<serde_json::Value>,

    /// The complete cloud profile object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_profile: Option<serde_json::Value>,
}

impl Cluster {
    /// Decode the embedded shoot
    pub fn shoot(&self) -> Result<Shoot, Error> {
        let raw = self.spec.shoot.as_ref().ok_or_else(|| {
            Error::internal_with_context(
                "cluster",
                format!("cluster {} does not contain a shoot", self.name_any()),
            )
        })?;
        serde_json::from_value(raw.clone()).map_err(|e| {
            Error::internal_with_context(
                "cluster",
                format!("failed to decode shoot of cluster {}: {}", self.name_any(), e),
            )
        })
    }

    /// Technical namespace of the shoot in the seed
    pub fn technical_namespace(&self) -> String {
        self.name_any()
    }
}
