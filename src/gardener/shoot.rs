//! Shoot resource as seen by the admission webhook
//!
//! Only the fields the extension reads are modelled. Everything else in a
//! shoot is ignored on decode.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Kind of the object referenced by a secret resource entry
pub const SECRET_KIND: &str = "Secret";

/// Desired state of a shoot cluster
///
/// Example:
/// ```yaml
/// apiVersion: core.gardener.cloud/v1beta1
/// kind: Shoot
/// metadata:
///   name: dev
///   namespace: garden-team
/// spec:
///   extensions:
///     - type: registry-mirror
///       providerConfig:
///         apiVersion: mirror.extensions.gardener.cloud/v1alpha1
///         kind: MirrorConfig
///         mirrors:
///           - upstream: docker.io
///             hosts:
///               - host: https://mirror.gcr.io
///   provider:
///     workers:
///       - name: worker-a
///         cri:
///           name: containerd
/// ```
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "core.gardener.cloud",
    version = "v1beta1",
    kind = "Shoot",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct ShootSpec {
    /// Extensions enabled for this shoot
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<ShootExtension>,

    /// Infrastructure provider settings
    #[serde(default)]
    pub provider: Provider,

    /// Named references to resources in the shoot's project namespace
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<NamedResourceReference>,
}

impl ShootSpec {
    /// Index and entry of the first enabled extension of the given type
    ///
    /// Entries with `disabled: true` are skipped; the index still refers to
    /// the position in `spec.extensions`.
    pub fn find_extension(&self, extension_type: &str) -> Option<(usize, &ShootExtension)> {
        self.extensions
            .iter()
            .enumerate()
            .find(|(_, ext)| ext.extension_type == extension_type && ext.is_enabled())
    }

    /// Resource reference with the given name
    pub fn find_resource(&self, name: &str) -> Option<&NamedResourceReference> {
        self.resources.iter().find(|r| r.name == name)
    }
}

/// An extension entry in a shoot spec
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShootExtension {
    /// Extension type (e.g. `registry-mirror`)
    #[serde(rename = "type")]
    pub extension_type: String,

    /// Extension specific configuration, embedded as a JSON object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_config: Option<serde_json::Value>,

    /// Whether the extension is explicitly disabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
}

impl ShootExtension {
    /// Whether the extension takes part in the shoot's reconciliation
    pub fn is_enabled(&self) -> bool {
        !self.disabled.unwrap_or(false)
    }

    /// Provider config, treating an explicit `null` as absent
    pub fn provider_config(&self) -> Option<&serde_json::Value> {
        self.provider_config.as_ref().filter(|v| !v.is_null())
    }
}

/// Infrastructure provider settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    /// Provider type (e.g. `aws`)
    #[serde(default, rename = "type")]
    pub provider_type: String,

    /// Worker pools
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub workers: Vec<Worker>,
}

/// A worker pool
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Worker {
    /// Pool name
    pub name: String,

    /// Container runtime of the pool's nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cri: Option<WorkerCri>,
}

impl Worker {
    /// Container runtime name, `containerd` when not set
    pub fn cri_name(&self) -> &str {
        self.cri
            .as_ref()
            .map(|c| c.name.as_str())
            .unwrap_or(mirror_common::CONTAINERD_RUNTIME)
    }
}

/// Container runtime of a worker pool
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct WorkerCri {
    /// Runtime name (e.g. `containerd`)
    pub name: String,
}

/// A named reference to a resource in the shoot's namespace
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NamedResourceReference {
    /// Name other fields use to refer to this entry
    pub name: String,

    /// The referenced object
    pub resource_ref: CrossVersionObjectReference,
}

/// Reference to an object of any kind and version
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CrossVersionObjectReference {
    /// Kind of the referenced object
    pub kind: String,

    /// Name of the referenced object
    pub name: String,

    /// API version of the referenced object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shoot_json() -> serde_json::Value {
        serde_json::json!({
            "apiVersion": "core.gardener.cloud/v1beta1",
            "kind": "Shoot",
            "metadata": {"name": "dev", "namespace": "garden-team"},
            "spec": {
                "region": "eu-west-1",
                "extensions": [
                    {"type": "registry-cache"},
                    {"type": "registry-mirror", "providerConfig": {"kind": "MirrorConfig"}}
                ],
                "provider": {
                    "type": "aws",
                    "workers": [
                        {"name": "a", "machine": {"type": "m5.large"}},
                        {"name": "b", "cri": {"name": "containerd"}}
                    ]
                },
                "resources": [
                    {"name": "creds", "resourceRef": {"apiVersion": "v1", "kind": "Secret", "name": "ro-docker"}}
                ]
            },
            "status": {"technicalID": "shoot--team--dev"}
        })
    }

    #[test]
    fn decodes_the_fields_it_needs_and_ignores_the_rest() {
        let shoot: Shoot = serde_json::from_value(shoot_json()).expect("decode");
        assert_eq!(shoot.spec.extensions.len(), 2);
        assert_eq!(shoot.spec.provider.workers.len(), 2);
        assert_eq!(shoot.spec.resources[0].resource_ref.kind, SECRET_KIND);
    }

    #[test]
    fn finds_extension_with_its_index() {
        let shoot: Shoot = serde_json::from_value(shoot_json()).expect("decode");
        let (i, ext) = shoot.spec.find_extension("registry-mirror").expect("present");
        assert_eq!(i, 1);
        assert!(ext.provider_config().is_some());
        assert!(shoot.spec.find_extension("shoot-dns-service").is_none());
    }

    #[test]
    fn disabled_extensions_are_not_found() {
        let mut value = shoot_json();
        value["spec"]["extensions"][1]["disabled"] = serde_json::json!(true);
        let shoot: Shoot = serde_json::from_value(value).expect("decode");
        assert!(shoot.spec.find_extension("registry-mirror").is_none());

        value = shoot_json();
        value["spec"]["extensions"][1]["disabled"] = serde_json::json!(false);
        let shoot: Shoot = serde_json::from_value(value).expect("decode");
        assert_eq!(shoot.spec.find_extension("registry-mirror").map(|(i, _)| i), Some(1));
    }

    #[test]
    fn null_provider_config_counts_as_absent() {
        let ext: ShootExtension =
            serde_json::from_value(serde_json::json!({"type": "registry-mirror", "providerConfig": null}))
                .expect("decode");
        assert!(ext.provider_config().is_none());
    }

    #[test]
    fn worker_without_cri_defaults_to_containerd() {
        let shoot: Shoot = serde_json::from_value(shoot_json()).expect("decode");
        let names: Vec<&str> = shoot.spec.provider.workers.iter().map(Worker::cri_name).collect();
        assert_eq!(names, vec!["containerd", "containerd"]);
    }

    #[test]
    fn resources_are_looked_up_by_name() {
        let shoot: Shoot = serde_json::from_value(shoot_json()).expect("decode");
        assert_eq!(
            shoot.spec.find_resource("creds").map(|r| r.resource_ref.name.as_str()),
            Some("ro-docker")
        );
        assert!(shoot.spec.find_resource("missing").is_none());
    }
}
