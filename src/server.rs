//! Webhook server wiring

use std::sync::Arc;

use axum_server::tls_rustls::RustlsConfig;
use kube::Client;
use tracing::info;

use mirror_common::kube_utils::create_client;
use mirror_common::Error;

use crate::admission::ShootValidator;
use crate::config::{TlsMaterial, WebhookServerConfig};
use crate::ensurer::Ensurer;
use crate::gardener::{ApiClusterReader, ApiSecretReader, CachedExtensionReader};
use crate::webhook::registration::{apply_webhook_configurations, WebhookEndpoint};
use crate::webhook::{webhook_router, WebhookState};

/// Build clients, register the webhooks and serve until the server stops
pub async fn start_server(config: WebhookServerConfig) -> Result<(), Error> {
    config.validate()?;

    let seed = create_client(None).await?;
    let admission_client = match &config.garden_kubeconfig {
        Some(path) => create_client(Some(path.as_path())).await?,
        None => seed.clone(),
    };
    let source = match config.source_kubeconfig() {
        Some(path) => create_client(Some(path)).await?,
        None => seed.clone(),
    };

    let tls = TlsMaterial::load(&config, &source).await?;
    register(&config, &seed, &tls).await?;

    let state = Arc::new(WebhookState::new(
        ShootValidator::new(Arc::new(ApiSecretReader::new(admission_client))),
        Ensurer::new(Arc::new(CachedExtensionReader::spawn(seed.clone()))),
        Arc::new(ApiClusterReader::new(seed)),
    ));
    let app = webhook_router(state);

    let tls_config = RustlsConfig::from_pem(tls.cert_pem, tls.key_pem)
        .await
        .map_err(|e| Error::internal_with_context("server", format!("TLS config error: {e}")))?;

    info!(addr = %config.bind_address, "Starting webhook server");

    axum_server::bind_rustls(config.bind_address, tls_config)
        .serve(app.into_make_service())
        .await
        .map_err(|e| Error::internal_with_context("server", format!("server error: {e}")))
}

async fn register(
    config: &WebhookServerConfig,
    client: &Client,
    tls: &TlsMaterial,
) -> Result<(), Error> {
    let endpoint = WebhookEndpoint {
        service_name: config.service_name.clone(),
        namespace: config.webhook_config_namespace.clone(),
        port: config.service_port,
        ca_bundle: tls.ca_pem.clone(),
    };
    apply_webhook_configurations(client, &endpoint).await
}
