//! Read access to seed resources
//!
//! Admission reads secrets live so it never needs a secret watch. Mutation
//! reads Extension resources through a watch-backed cache.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube::api::Api;
use kube::runtime::reflector::{self, ObjectRef, Store};
use kube::runtime::{watcher, WatchStreamExt};
use kube::Client;
use tracing::{debug, warn};

#[cfg(test)]
use mockall::automock;

use mirror_common::kube_utils::object_key;
use mirror_common::Error;

use super::extension::{Cluster, Extension};

/// Live (uncached) secret reads
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SecretReader: Send + Sync {
    /// Get a secret by namespace and name
    ///
    /// A missing secret is an error like any other read failure.
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, Error>;
}

/// Extension reads, cache permitted
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ExtensionReader: Send + Sync {
    /// Get an Extension by namespace and name
    async fn get_extension(&self, namespace: &str, name: &str) -> Result<Extension, Error>;
}

/// Access to the garden-side view of the shoot an object belongs to
#[cfg_attr(test, automock)]
#[async_trait]
pub trait GardenContext: Send + Sync {
    /// The Cluster resource of the enclosing shoot
    async fn get_cluster(&self) -> Result<Cluster, Error>;
}

/// [`SecretReader`] backed by direct API calls
pub struct ApiSecretReader {
    client: Client,
}

impl ApiSecretReader {
    /// Create a reader using the given client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretReader for ApiSecretReader {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, Error> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        api.get(name)
            .await
            .map_err(|e| Error::read("Secret", object_key(namespace, name), e))
    }
}

/// [`ExtensionReader`] serving from a reflector store, falling back to the API
///
/// The store is empty until the first watch list completes, and may lag behind
/// freshly created Extensions, so a miss is retried against the API server.
#[derive(Clone)]
pub struct CachedExtensionReader {
    client: Client,
    store: Store<Extension>,
}

impl CachedExtensionReader {
    /// Start watching Extensions cluster-wide and return the reader
    ///
    /// The watch runs on a background task for the life of the process.
    pub fn spawn(client: Client) -> Self {
        let (store, writer) = reflector::store();
        let api: Api<Extension> = Api::all(client.clone());
        let stream = reflector::reflector(
            writer,
            watcher(api, watcher::Config::default()).default_backoff(),
        )
        .touched_objects();

        tokio::spawn(async move {
            futures::pin_mut!(stream);
            while let Some(event) = stream.next().await {
                if let Err(e) = event {
                    warn!(error = %e, "Extension watch error");
                }
            }
        });

        Self { client, store }
    }
}

#[async_trait]
impl ExtensionReader for CachedExtensionReader {
    async fn get_extension(&self, namespace: &str, name: &str) -> Result<Extension, Error> {
        let key = ObjectRef::new(name).within(namespace);
        if let Some(ext) = self.store.get(&key) {
            return Ok(Arc::unwrap_or_clone(ext));
        }

        debug!(namespace = %namespace, name = %name, "Extension not cached, reading from API");
        let api: Api<Extension> = Api::namespaced(self.client.clone(), namespace);
        api.get(name)
            .await
            .map_err(|e| Error::read("Extension", object_key(namespace, name), e))
    }
}

/// Cluster reads
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterReader: Send + Sync {
    /// Get a Cluster by name
    async fn get_cluster(&self, name: &str) -> Result<Cluster, Error>;
}

/// [`ClusterReader`] backed by direct API calls
pub struct ApiClusterReader {
    client: Client,
}

impl ApiClusterReader {
    /// Create a reader using the given client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClusterReader for ApiClusterReader {
    async fn get_cluster(&self, name: &str) -> Result<Cluster, Error> {
        let api: Api<Cluster> = Api::all(self.client.clone());
        api.get(name)
            .await
            .map_err(|e| Error::read("Cluster", name, e))
    }
}

/// [`GardenContext`] of an object in a shoot's technical namespace
///
/// The Cluster resource carries the same name as the technical namespace.
pub struct ClusterContext {
    clusters: Arc<dyn ClusterReader>,
    namespace: String,
}

impl ClusterContext {
    /// Context for objects in the given technical namespace
    pub fn new(clusters: Arc<dyn ClusterReader>, namespace: impl Into<String>) -> Self {
        Self {
            clusters,
            namespace: namespace.into(),
        }
    }
}

#[async_trait]
impl GardenContext for ClusterContext {
    async fn get_cluster(&self) -> Result<Cluster, Error> {
        self.clusters.get_cluster(&self.namespace).await
    }
}
