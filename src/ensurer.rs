//! Injection of registry mirrors into OperatingSystemConfig CRI settings

use std::sync::Arc;

use tracing::{debug, info, instrument};

use mirror_api::helper::upstream_url;
use mirror_api::mirror::{MirrorConfiguration, MirrorHostCapability, CAPABILITY_PULL, CAPABILITY_RESOLVE};
use mirror_api::scheme::Decoder;
use mirror_common::kube_utils::object_key;
use mirror_common::{Error, REGISTRY_MIRROR_EXTENSION_TYPE};

use crate::gardener::{
    CriConfig, ExtensionReader, GardenContext, RegistryCapability, RegistryConfig, RegistryHost,
};

/// Ensures the containerd registry configuration of OperatingSystemConfigs
pub struct Ensurer {
    extensions: Arc<dyn ExtensionReader>,
    decoder: Decoder,
}

impl Ensurer {
    /// Create an ensurer reading Extensions through the given reader
    pub fn new(extensions: Arc<dyn ExtensionReader>) -> Self {
        Self {
            extensions,
            decoder: Decoder::new(),
        }
    }

    /// Add or replace one registry entry per configured mirror
    ///
    /// Entries for upstreams that are not mirrored stay untouched. Nothing is
    /// changed once the shoot is being deleted. `_old` is not consulted.
    #[instrument(skip_all)]
    pub async fn ensure_cri_config(
        &self,
        garden: &dyn GardenContext,
        new: &mut CriConfig,
        _old: Option<&CriConfig>,
    ) -> Result<(), Error> {
        let cluster = garden.get_cluster().await.map_err(|e| {
            Error::internal_with_context(
                "ensure_cri_config",
                format!("failed to get the cluster resource: {e}"),
            )
        })?;

        let shoot = cluster.shoot()?;
        if shoot.metadata.deletion_timestamp.is_some() {
            debug!("shoot is being deleted, leaving CRI config unchanged");
            return Ok(());
        }

        let namespace = cluster.technical_namespace();
        let extension = self
            .extensions
            .get_extension(&namespace, REGISTRY_MIRROR_EXTENSION_TYPE)
            .await?;

        let raw = extension.spec.provider_config().ok_or_else(|| {
            Error::precondition(format!(
                "extension {} does not have a .spec.providerConfig specified",
                object_key(&namespace, REGISTRY_MIRROR_EXTENSION_TYPE)
            ))
        })?;
        let config = self.decoder.decode_value(raw)?;

        let registries = config
            .mirrors
            .iter()
            .map(registry_config)
            .collect::<Result<Vec<_>, _>>()?;

        let containerd = new.containerd.get_or_insert_with(Default::default);
        for registry in registries {
            merge_registry(&mut containerd.registries, registry);
        }

        info!(
            namespace = %namespace,
            mirrors = config.mirrors.len(),
            registries = containerd.registries.len(),
            "ensured containerd registry config"
        );
        Ok(())
    }
}

/// Put `registry` in place of the first entry for its upstream and drop any
/// later entries for the same upstream. Appends when there is none.
fn merge_registry(registries: &mut Vec<RegistryConfig>, registry: RegistryConfig) {
    let Some(first) = registries
        .iter()
        .position(|r| r.upstream == registry.upstream)
    else {
        registries.push(registry);
        return;
    };

    let mut index = 0;
    registries.retain(|r| {
        let keep = index <= first || r.upstream != registry.upstream;
        index += 1;
        keep
    });
    registries[first] = registry;
}

/// The containerd registry entry for a mirror
///
/// The server is always the canonical URL of the upstream. Capability order
/// and multiplicity are kept as declared.
pub fn registry_config(mirror: &MirrorConfiguration) -> Result<RegistryConfig, Error> {
    let hosts = mirror
        .hosts
        .iter()
        .map(|host| {
            let capabilities = host
                .capabilities
                .iter()
                .map(registry_capability)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(RegistryHost {
                url: host.host.clone(),
                capabilities,
                ..Default::default()
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;

    Ok(RegistryConfig {
        upstream: mirror.upstream.clone(),
        server: Some(upstream_url(&mirror.upstream)),
        hosts,
        ..Default::default()
    })
}

fn registry_capability(capability: &MirrorHostCapability) -> Result<RegistryCapability, Error> {
    match capability.as_str() {
        CAPABILITY_PULL => Ok(RegistryCapability::pull()),
        CAPABILITY_RESOLVE => Ok(RegistryCapability::resolve()),
        other => Err(Error::internal_with_context(
            "ensure_cri_config",
            format!("unsupported mirror host capability {other:?}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gardener::readers::{MockExtensionReader, MockGardenContext};
    use crate::gardener::{Cluster, ClusterSpec, ContainerdConfig, Extension, ExtensionSpec};
    use mirror_api::mirror::MirrorHost;
    use serde_json::{json, Value};

    const NAMESPACE: &str = "shoot--team--dev";

    fn cluster(deleting: bool) -> Cluster {
        let mut metadata = json!({"name": "dev", "namespace": "garden-team"});
        if deleting {
            metadata["deletionTimestamp"] = json!("2024-01-01T00:00:00Z");
        }
        Cluster::new(
            NAMESPACE,
            ClusterSpec {
                shoot: Some(json!({
                    "apiVersion": "core.gardener.cloud/v1beta1",
                    "kind": "Shoot",
                    "metadata": metadata,
                    "spec": {}
                })),
                ..Default::default()
            },
        )
    }

    fn garden(deleting: bool) -> MockGardenContext {
        let mut garden = MockGardenContext::new();
        garden
            .expect_get_cluster()
            .returning(move || Ok(cluster(deleting)));
        garden
    }

    fn extension(provider_config: Option<Value>) -> Extension {
        let mut ext = Extension::new(
            REGISTRY_MIRROR_EXTENSION_TYPE,
            ExtensionSpec {
                extension_type: REGISTRY_MIRROR_EXTENSION_TYPE.to_string(),
                provider_config,
            },
        );
        ext.metadata.namespace = Some(NAMESPACE.to_string());
        ext
    }

    fn extensions(mirrors: Value) -> MockExtensionReader {
        let mut reader = MockExtensionReader::new();
        reader
            .expect_get_extension()
            .withf(|ns, name| ns == NAMESPACE && name == REGISTRY_MIRROR_EXTENSION_TYPE)
            .returning(move |_, _| {
                Ok(extension(Some(json!({
                    "apiVersion": "mirror.extensions.gardener.cloud/v1alpha1",
                    "kind": "MirrorConfig",
                    "mirrors": mirrors.clone()
                }))))
            });
        reader
    }

    fn docker_mirror() -> Value {
        json!([{"upstream": "docker.io", "hosts": [{"host": "https://mirror.gcr.io"}]}])
    }

    fn expected_docker_registry() -> RegistryConfig {
        RegistryConfig {
            upstream: "docker.io".to_string(),
            server: Some("https://registry-1.docker.io".to_string()),
            hosts: vec![RegistryHost {
                url: "https://mirror.gcr.io".to_string(),
                capabilities: vec![RegistryCapability::pull()],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn registry(upstream: &str) -> RegistryConfig {
        RegistryConfig {
            upstream: upstream.to_string(),
            server: Some(format!("https://{upstream}")),
            hosts: vec![RegistryHost {
                url: format!("https://mirror.{upstream}"),
                capabilities: vec![RegistryCapability::pull(), RegistryCapability::push()],
                ..Default::default()
            }],
            readiness_probe: Some(true),
            ..Default::default()
        }
    }

    fn cri_with(registries: Vec<RegistryConfig>) -> CriConfig {
        CriConfig {
            name: "containerd".to_string(),
            containerd: Some(ContainerdConfig {
                registries,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    // =========================================================================
    // Story Tests
    // =========================================================================

    /// Story: an empty containerd section receives the mirror entry
    #[tokio::test]
    async fn story_empty_containerd_gets_mirror() {
        let ensurer = Ensurer::new(Arc::new(extensions(docker_mirror())));
        let mut cri = CriConfig {
            name: "containerd".to_string(),
            ..Default::default()
        };

        ensurer
            .ensure_cri_config(&garden(false), &mut cri, None)
            .await
            .expect("ensure");

        assert_eq!(
            cri.containerd.expect("allocated").registries,
            vec![expected_docker_registry()]
        );
    }

    /// Story: unrelated registries are kept and the mirror is appended
    #[tokio::test]
    async fn story_new_upstream_is_appended() {
        let ensurer = Ensurer::new(Arc::new(extensions(docker_mirror())));
        let mut cri = cri_with(vec![registry("foo.io")]);

        ensurer
            .ensure_cri_config(&garden(false), &mut cri, None)
            .await
            .expect("ensure");

        let registries = cri.containerd.expect("containerd").registries;
        assert_eq!(registries, vec![registry("foo.io"), expected_docker_registry()]);
    }

    /// Story: a stale entry for the same upstream is replaced wholesale
    #[tokio::test]
    async fn story_existing_upstream_is_replaced() {
        let ensurer = Ensurer::new(Arc::new(extensions(docker_mirror())));
        let mut stale = registry("docker.io");
        stale.server = Some("foo".to_string());
        stale.hosts[0].url = "bar".to_string();
        stale.hosts[0].capabilities = vec![RegistryCapability::push()];
        stale.extra.insert("legacy".to_string(), json!(true));
        let mut cri = cri_with(vec![registry("foo.io"), stale]);

        ensurer
            .ensure_cri_config(&garden(false), &mut cri, None)
            .await
            .expect("ensure");

        let registries = cri.containerd.expect("containerd").registries;
        assert_eq!(registries, vec![registry("foo.io"), expected_docker_registry()]);
    }

    /// Story: nothing changes while the shoot is being deleted
    #[tokio::test]
    async fn story_deletion_leaves_config_untouched() {
        let ensurer = Ensurer::new(Arc::new(MockExtensionReader::new()));
        let mut cri = cri_with(vec![registry("docker.io")]);
        let before = serde_json::to_vec(&cri).unwrap();

        ensurer
            .ensure_cri_config(&garden(true), &mut cri, None)
            .await
            .expect("no-op");

        assert_eq!(serde_json::to_vec(&cri).unwrap(), before);
    }

    /// Story: running twice gives the same result as running once
    #[tokio::test]
    async fn story_ensure_is_idempotent() {
        let ensurer = Ensurer::new(Arc::new(extensions(json!([
            {"upstream": "docker.io", "hosts": [{"host": "https://mirror.gcr.io"}]},
            {"upstream": "quay.io", "hosts": [{"host": "https://quay-mirror.example.com",
                                               "capabilities": ["pull", "resolve"]}]}
        ]))));
        let mut cri = cri_with(vec![registry("foo.io")]);

        ensurer
            .ensure_cri_config(&garden(false), &mut cri, None)
            .await
            .expect("first");
        let once = serde_json::to_vec(&cri).unwrap();
        ensurer
            .ensure_cri_config(&garden(false), &mut cri, None)
            .await
            .expect("second");

        assert_eq!(serde_json::to_vec(&cri).unwrap(), once);
        assert_eq!(cri.containerd.unwrap().registries.len(), 3);
    }

    #[tokio::test]
    async fn missing_provider_config_is_an_error() {
        let mut reader = MockExtensionReader::new();
        reader
            .expect_get_extension()
            .returning(|_, _| Ok(extension(None)));
        let ensurer = Ensurer::new(Arc::new(reader));
        let mut cri = CriConfig::default();

        let err = ensurer
            .ensure_cri_config(&garden(false), &mut cri, None)
            .await
            .unwrap_err();

        assert!(err
            .to_string()
            .contains("does not have a .spec.providerConfig specified"));
        assert!(cri.containerd.is_none());
    }

    #[tokio::test]
    async fn cluster_lookup_failure_is_wrapped() {
        let mut garden = MockGardenContext::new();
        garden
            .expect_get_cluster()
            .returning(|| Err(Error::internal("boom")));
        let ensurer = Ensurer::new(Arc::new(MockExtensionReader::new()));

        let err = ensurer
            .ensure_cri_config(&garden, &mut CriConfig::default(), None)
            .await
            .unwrap_err();

        assert_eq!(err.context(), Some("ensure_cri_config"));
        assert!(err.to_string().contains("failed to get the cluster resource"));
    }

    #[tokio::test]
    async fn extension_read_failure_is_returned() {
        let mut reader = MockExtensionReader::new();
        reader
            .expect_get_extension()
            .returning(|_, _| Err(Error::internal_with_context("read", "timeout")));
        let ensurer = Ensurer::new(Arc::new(reader));

        let err = ensurer
            .ensure_cri_config(&garden(false), &mut CriConfig::default(), None)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn capabilities_keep_order_and_multiplicity() {
        let mirror = MirrorConfiguration {
            upstream: "quay.io".to_string(),
            hosts: vec![MirrorHost {
                host: "https://quay-mirror.example.com".to_string(),
                capabilities: vec![
                    MirrorHostCapability::resolve(),
                    MirrorHostCapability::pull(),
                    MirrorHostCapability::resolve(),
                ],
                secret_reference_name: None,
            }],
        };

        let registry = registry_config(&mirror).expect("translate");

        assert_eq!(registry.server.as_deref(), Some("https://quay.io"));
        assert_eq!(
            registry.hosts[0].capabilities,
            vec![
                RegistryCapability::resolve(),
                RegistryCapability::pull(),
                RegistryCapability::resolve()
            ]
        );
    }

    #[test]
    fn unsupported_capability_fails_translation() {
        let mirror = MirrorConfiguration {
            upstream: "quay.io".to_string(),
            hosts: vec![MirrorHost {
                host: "https://quay-mirror.example.com".to_string(),
                capabilities: vec![MirrorHostCapability::from("push")],
                secret_reference_name: None,
            }],
        };
        assert!(registry_config(&mirror).is_err());
    }

    /// Story: a mirror that cannot be translated leaves the config as it was
    #[tokio::test]
    async fn story_translation_failure_leaves_config_untouched() {
        let ensurer = Ensurer::new(Arc::new(extensions(json!([
            {"upstream": "docker.io", "hosts": [{"host": "https://mirror.gcr.io"}]},
            {"upstream": "quay.io", "hosts": [{"host": "https://quay-mirror.example.com", "capabilities": ["push"]}]}
        ]))));
        let mut cri = CriConfig {
            name: "containerd".to_string(),
            ..Default::default()
        };
        let original = cri.clone();

        let result = ensurer
            .ensure_cri_config(&garden(false), &mut cri, None)
            .await;

        assert!(result.is_err());
        assert_eq!(cri, original);
        assert!(cri.containerd.is_none());
    }

    /// Story: every stale entry for a mirrored upstream goes, not just the first
    #[tokio::test]
    async fn story_duplicate_stale_entries_are_collapsed() {
        let ensurer = Ensurer::new(Arc::new(extensions(docker_mirror())));
        let mut stale = registry("docker.io");
        stale.server = Some("stale".to_string());
        let mut cri = cri_with(vec![
            stale.clone(),
            registry("foo.io"),
            stale,
            registry("bar.io"),
        ]);

        ensurer
            .ensure_cri_config(&garden(false), &mut cri, None)
            .await
            .expect("ensure");

        assert_eq!(
            cri.containerd.expect("containerd").registries,
            vec![
                expected_docker_registry(),
                registry("foo.io"),
                registry("bar.io")
            ]
        );
    }
}
