//! Command line and environment configuration of the webhook server

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::Parser;
use k8s_openapi::api::core::v1::Secret;
use kube::api::Api;
use kube::Client;

use mirror_common::kube_utils::object_key;
use mirror_common::Error;

/// Certificate file name inside a TLS directory or secret
pub const TLS_CERT_KEY: &str = "tls.crt";
/// Private key file name inside a TLS directory or secret
pub const TLS_KEY_KEY: &str = "tls.key";
/// CA file name inside a TLS directory or secret
pub const CA_CERT_KEY: &str = "ca.crt";

/// registry-mirror - admission and mutation webhooks for container registry mirrors
#[derive(Parser, Clone, Debug, PartialEq)]
#[command(name = "registry-mirror", version, about, long_about = None)]
pub struct WebhookServerConfig {
    /// Namespace holding the webhook service and its TLS secret
    #[arg(long, env = "WEBHOOK_CONFIG_NAMESPACE", default_value = "garden")]
    pub webhook_config_namespace: String,

    /// Kubeconfig of the garden cluster, used for admission reads when set
    #[arg(long, env = "GARDEN_KUBECONFIG")]
    pub garden_kubeconfig: Option<PathBuf>,

    /// Read the webhook certificate secret from a dedicated source cluster
    #[arg(long, env = "SOURCE_CLUSTER")]
    pub source_cluster: bool,

    /// Kubeconfig of the source cluster
    #[arg(long, env = "SOURCE_KUBECONFIG")]
    pub source_kubeconfig: Option<PathBuf>,

    /// Address the HTTPS server listens on
    #[arg(long, default_value = "0.0.0.0:9443")]
    pub bind_address: SocketAddr,

    /// Directory with tls.crt, tls.key and optionally ca.crt
    #[arg(long)]
    pub tls_cert_dir: Option<PathBuf>,

    /// Secret holding the webhook certificate when no directory is given
    #[arg(long, default_value = "registry-mirror-webhook-tls")]
    pub tls_secret_name: String,

    /// Service the API server uses to reach the webhooks
    #[arg(long, default_value = "gardener-extension-registry-mirror")]
    pub service_name: String,

    /// Port of that service
    #[arg(long, default_value_t = 443)]
    pub service_port: i32,
}

impl WebhookServerConfig {
    /// Reject inconsistent combinations of options
    pub fn validate(&self) -> Result<(), Error> {
        if self.source_cluster && self.source_kubeconfig.is_none() {
            return Err(Error::internal_with_context(
                "config",
                "SOURCE_CLUSTER is set but SOURCE_KUBECONFIG is not",
            ));
        }
        if !(1..=65535).contains(&self.service_port) {
            return Err(Error::internal_with_context(
                "config",
                format!("service port {} is out of range", self.service_port),
            ));
        }
        Ok(())
    }

    /// Kubeconfig of the cluster holding the certificate secret, if not the default one
    pub fn source_kubeconfig(&self) -> Option<&Path> {
        self.source_kubeconfig
            .as_deref()
            .filter(|_| self.source_cluster)
    }
}

/// Serving certificate of the webhook server
#[derive(Clone, Debug, PartialEq)]
pub struct TlsMaterial {
    /// PEM certificate chain
    pub cert_pem: Vec<u8>,
    /// PEM private key
    pub key_pem: Vec<u8>,
    /// PEM CA bundle for webhook registration
    pub ca_pem: Vec<u8>,
}

impl TlsMaterial {
    /// Read certificate files from a directory
    ///
    /// Without `ca.crt` the certificate itself is used as CA bundle.
    pub async fn from_dir(dir: &Path) -> Result<Self, Error> {
        let read = |name: &'static str| {
            let path = dir.join(name);
            async move {
                tokio::fs::read(&path).await.map_err(|e| {
                    Error::internal_with_context(
                        "tls",
                        format!("failed to read {}: {}", path.display(), e),
                    )
                })
            }
        };

        let cert_pem = read(TLS_CERT_KEY).await?;
        let key_pem = read(TLS_KEY_KEY).await?;
        let ca_pem = match read(CA_CERT_KEY).await {
            Ok(ca) => ca,
            Err(_) => cert_pem.clone(),
        };
        Ok(Self {
            cert_pem,
            key_pem,
            ca_pem,
        })
    }

    /// Extract certificate entries from a secret
    pub fn from_secret(secret: &Secret) -> Result<Self, Error> {
        let data = secret.data.as_ref();
        let entry = |key: &str| data.and_then(|d| d.get(key)).map(|v| v.0.clone());
        let missing = |key: &str| {
            Error::internal_with_context(
                "tls",
                format!(
                    "secret {} has no {key} entry",
                    secret.metadata.name.as_deref().unwrap_or_default()
                ),
            )
        };

        let cert_pem = entry(TLS_CERT_KEY).ok_or_else(|| missing(TLS_CERT_KEY))?;
        let key_pem = entry(TLS_KEY_KEY).ok_or_else(|| missing(TLS_KEY_KEY))?;
        let ca_pem = entry(CA_CERT_KEY).unwrap_or_else(|| cert_pem.clone());
        Ok(Self {
            cert_pem,
            key_pem,
            ca_pem,
        })
    }

    /// Load the serving certificate the way the configuration asks for
    ///
    /// The secret is read through a namespaced API so only access to the
    /// webhook namespace is required.
    pub async fn load(config: &WebhookServerConfig, client: &Client) -> Result<Self, Error> {
        if let Some(dir) = &config.tls_cert_dir {
            return Self::from_dir(dir).await;
        }

        let namespace = &config.webhook_config_namespace;
        let api: Api<Secret> = Api::namespaced(client.clone(), namespace);
        let secret = api.get(&config.tls_secret_name).await.map_err(|e| {
            Error::read("Secret", object_key(namespace, &config.tls_secret_name), e)
        })?;
        Self::from_secret(&secret)
    }
}
